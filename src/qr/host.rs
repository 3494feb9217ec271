use super::FormQParams;
use crate::assert;
use dyn_stack::{GlobalPodBuffer, PodStack};
use faer::{
    linalg::{
        householder::{
            apply_block_householder_sequence_on_the_left_in_place_req,
            apply_block_householder_sequence_on_the_left_in_place_with_conj,
            upgrade_householder_factor,
        },
        qr::no_pivoting::compute::recommended_blocksize,
    },
    Conj, Mat, Parallelism,
};
use faer_entity::{ComplexField, SimpleEntity};
use reborrow::*;

/// Status returned by [`form_q_host`] when the size of the required workspace overflows.
pub const STATUS_SIZE_OVERFLOW: i32 = 1;

/// Overwrites the `m×q_ncols` matrix `q` with the first `q_ncols` columns of the unitary factor of
/// the QR decomposition stored in the `m×n` matrix `a` and the `min(m, n)` scalar multipliers
/// `tau`, using host optimized routines.
///
/// With the `lapack` feature, `f32` and `f64` matrices with column-major `q` are formed with
/// LAPACK's `?orgqr`. Otherwise, the reflections are grouped into blocks of size
/// `params.host_blocksize`, and applied with faer's block Householder routines.
///
/// Returns `0` on success, the `info` value reported by LAPACK if it is nonzero, or
/// [`STATUS_SIZE_OVERFLOW`].
///
/// # Panics
///
/// Panics if `E` is not a real type.
///
/// # Safety
///
/// - `min(m, n) <= q_ncols <= m`.
/// - `a.offset(i * as0 + j * as1)` must be valid for reads for every `i` in `0..m` and `j` in
/// `0..min(m, n)`.
/// - `tau` must be valid for reads for `min(m, n)` contiguous elements.
/// - `q.offset(i * qs0 + j * qs1)` must be valid for reads and writes for every `i` in `0..m` and
/// `j` in `0..q_ncols`, and must not overlap with `a` or `tau`.
#[track_caller]
pub unsafe fn form_q_host<E: ComplexField + SimpleEntity>(
    m: usize,
    n: usize,
    a: *const E,
    as0: isize,
    as1: isize,
    tau: *const E,
    q: *mut E,
    q_ncols: usize,
    qs0: isize,
    qs1: isize,
    parallelism: Parallelism,
    params: FormQParams,
) -> i32 {
    assert!(coe::is_same::<E, E::Real>());
    let k = Ord::min(m, n);
    crate::debug_assert!(all(k <= q_ncols, q_ncols <= m));

    #[cfg(feature = "lapack")]
    if let Some(info) = lapack::form_q(m, k, a, as0, as1, tau, q, q_ncols, qs0, qs1) {
        log::debug!("formed a {m}×{q_ncols} Q factor with LAPACK, info = {info}");
        return info;
    }

    let a = faer::mat::from_raw_parts::<E>(a, m, k, as0, as1);
    let mut q = faer::mat::from_raw_parts_mut::<E>(q, m, q_ncols, qs0, qs1);

    q.fill_zero();
    for j in 0..q_ncols {
        q.write(j, j, E::faer_one());
    }
    if k == 0 {
        return 0;
    }

    let blocksize = params
        .host_blocksize
        .unwrap_or_else(|| recommended_blocksize::<E>(m, k));
    let blocksize = blocksize.clamp(1, k);
    log::debug!("forming a {m}×{q_ncols} Q factor with faer, blocksize = {blocksize}");

    let mut householder_factor = Mat::<E>::zeros(blocksize, k);
    let mut j = 0;
    while j < k {
        let bs = Ord::min(blocksize, k - j);
        let mut block = householder_factor.as_mut().submatrix_mut(0, j, bs, bs);
        for i in 0..bs {
            block.write(i, i, (*tau.add(j + i)).faer_inv());
        }
        upgrade_householder_factor(
            block,
            a.submatrix(j, j, m - j, bs),
            blocksize,
            1,
            parallelism,
        );
        j += bs;
    }

    let req = match apply_block_householder_sequence_on_the_left_in_place_req::<E>(
        m, blocksize, q_ncols,
    ) {
        Ok(req) => req,
        Err(_) => return STATUS_SIZE_OVERFLOW,
    };
    let mut mem = GlobalPodBuffer::new(req);
    apply_block_householder_sequence_on_the_left_in_place_with_conj(
        a,
        householder_factor.as_ref(),
        Conj::No,
        q.rb_mut(),
        parallelism,
        PodStack::new(&mut mem),
    );
    0
}

#[cfg(feature = "lapack")]
mod lapack {
    use faer_entity::SimpleEntity;

    /// Forms `q` with `?orgqr` if the element type and the layout of `q` allow it. Returns `None`
    /// otherwise, without touching `q`.
    pub unsafe fn form_q<E: SimpleEntity>(
        m: usize,
        k: usize,
        a: *const E,
        as0: isize,
        as1: isize,
        tau: *const E,
        q: *mut E,
        q_ncols: usize,
        qs0: isize,
        qs1: isize,
    ) -> Option<i32> {
        let ldq = if q_ncols <= 1 {
            Ord::max(m, 1) as isize
        } else {
            qs1
        };
        if qs0 != 1 || ldq < Ord::max(m, 1) as isize || ldq > i32::MAX as isize {
            return None;
        }
        if m > i32::MAX as usize {
            return None;
        }

        macro_rules! orgqr {
            ($orgqr: ident, $ty: ty) => {{
                let q = q as *mut $ty;
                let a = a as *const $ty;
                let tau = tau as *const $ty;

                // ?orgqr works in place, starting from the reflections stored below the diagonal
                for j in 0..k {
                    for i in j + 1..m {
                        *q.offset(i as isize + j as isize * ldq) =
                            *a.offset(i as isize * as0 + j as isize * as1);
                    }
                }

                let (m, n, k, ldq) = (m as i32, q_ncols as i32, k as i32, ldq as i32);
                let mut info = 0;
                let mut lwork = 0.0 as $ty;
                ::lapack_sys::$orgqr(&m, &n, &k, q, &ldq, tau, &mut lwork, &-1, &mut info);
                if info != 0 {
                    return Some(info);
                }

                let lwork = Ord::max(lwork as i32, 1);
                let mut work = vec![0.0 as $ty; lwork as usize];
                ::lapack_sys::$orgqr(
                    &m,
                    &n,
                    &k,
                    q,
                    &ldq,
                    tau,
                    work.as_mut_ptr(),
                    &lwork,
                    &mut info,
                );
                Some(info)
            }};
        }

        if coe::is_same::<E, f64>() {
            orgqr!(dorgqr_, f64)
        } else if coe::is_same::<E, f32>() {
            orgqr!(sorgqr_, f32)
        } else {
            None
        }
    }
}
