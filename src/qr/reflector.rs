use crate::team::TeamMember;
use faer_entity::{ComplexField, SimpleEntity};

/// Applies the Householder reflection $H = I - \tau v v^H$ from the left to the `m×n` matrix `q`,
/// where $v_0 = 1$ is implicit and $v_{1\dots}$ is stored in the `m - 1` entries of `v`.
///
/// The computation happens in two phases, separated by a team barrier:
/// - $w := \tau v^H q$, with the columns of `q` split between the members of the team,
/// - $q := q - v w$, with the rows of `q` split between the members of the team.
///
/// Every member observes the updated `q` once the function returns. Does nothing if `tau` is zero.
///
/// # Safety
///
/// - `v.offset(i * vs0)` must be valid for reads for every `i` in `0..m - 1`.
/// - `q.offset(i * qs0 + j * qs1)` must be valid for reads and writes for every `i` in `0..m` and
/// `j` in `0..n`.
/// - `w` must be valid for reads and writes for `n` contiguous elements.
/// - `v` must not overlap with `q` or `w`, and `q` must not overlap with `w`.
/// - every member of the team must call this function with the same arguments.
#[inline]
pub unsafe fn apply_reflector_internal<E: ComplexField + SimpleEntity>(
    member: &TeamMember<'_>,
    m: usize,
    n: usize,
    tau: E,
    v: *const E,
    vs0: isize,
    q: *mut E,
    qs0: isize,
    qs1: isize,
    w: *mut E,
) {
    if m == 0 || n == 0 || tau == E::faer_zero() {
        return;
    }

    for j in member.team_range(n) {
        let q_j = q.offset(j as isize * qs1);
        let mut acc = *q_j;
        for i in 1..m {
            let v_i = *v.offset((i - 1) as isize * vs0);
            acc = acc.faer_add(v_i.faer_conj().faer_mul(*q_j.offset(i as isize * qs0)));
        }
        *w.add(j) = tau.faer_mul(acc);
    }
    member.team_barrier();

    for i in member.team_range(m) {
        let v_i = if i == 0 {
            E::faer_one()
        } else {
            *v.offset((i - 1) as isize * vs0)
        };
        let q_i = q.offset(i as isize * qs0);
        for j in 0..n {
            let q_ij = q_i.offset(j as isize * qs1);
            *q_ij = (*q_ij).faer_sub(v_i.faer_mul(*w.add(j)));
        }
    }
    member.team_barrier();
}

/// Overwrites the `m×n` matrix `q` with the first `n` columns of the factor $Q$ of a QR
/// decomposition, given the `k` Householder reflections stored below the diagonal of `a` and their
/// scalar multipliers `tau`, so that $Q = H_0 H_1 \dots H_{k-1}$ with
/// $H_i = I - \tau_i v_i v_i^H$.
///
/// The reflections are accumulated from the last one to the first one, starting from the identity.
/// Each accumulation step only touches the trailing block of `q` the reflection acts on.
///
/// # Safety
///
/// - `k <= n <= m`.
/// - `a.offset(i * as0 + j * as1)` must be valid for reads for every `j` in `0..k` and `i` in
/// `j + 1..m`.
/// - `tau.offset(j * ts0)` must be valid for reads for every `j` in `0..k`.
/// - `q.offset(i * qs0 + j * qs1)` must be valid for reads and writes for every `i` in `0..m` and
/// `j` in `0..n`.
/// - `w` must be valid for reads and writes for `n` contiguous elements.
/// - `q` must not overlap with `a`, `tau` or `w`.
/// - every member of the team must call this function with the same arguments.
pub unsafe fn form_q_internal<E: ComplexField + SimpleEntity>(
    member: &TeamMember<'_>,
    m: usize,
    n: usize,
    k: usize,
    a: *const E,
    as0: isize,
    as1: isize,
    tau: *const E,
    ts0: isize,
    q: *mut E,
    qs0: isize,
    qs1: isize,
    w: *mut E,
) {
    crate::debug_assert!(all(k <= n, n <= m));

    for j in member.team_range(n) {
        let q_j = q.offset(j as isize * qs1);
        for i in 0..m {
            q_j.offset(i as isize * qs0).write(if i == j {
                E::faer_one()
            } else {
                E::faer_zero()
            });
        }
    }
    member.team_barrier();

    for j in (0..k).rev() {
        let j_ = j as isize;
        apply_reflector_internal(
            member,
            m - j,
            n - j,
            *tau.offset(j_ * ts0),
            a.wrapping_offset((j_ + 1) * as0 + j_ * as1),
            as0,
            q.offset(j_ * qs0 + j_ * qs1),
            qs0,
            qs1,
            w,
        );
    }
}
