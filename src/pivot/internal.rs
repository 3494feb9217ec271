use super::Direction;
use crate::{debug_assert, team::TeamMember};

/// Calls `op(i)` for every `i` in `0..plen`, in the order specified by `direction`.
#[inline(always)]
fn for_each_index(direction: Direction, plen: usize, op: impl FnMut(usize)) {
    match direction {
        Direction::Forward => (0..plen).for_each(op),
        Direction::Backward => (0..plen).rev().for_each(op),
    }
}

#[inline(always)]
unsafe fn swap<E>(a: *mut E, i: isize, piv: isize, as0: isize) {
    core::ptr::swap(a.offset(i * as0), a.offset((i + piv) * as0));
}

#[inline(always)]
unsafe fn swap_sequence<I: num_traits::AsPrimitive<isize>, E>(
    direction: Direction,
    plen: usize,
    p: *const I,
    ps0: isize,
    len: usize,
    a: *mut E,
    as0: isize,
) {
    for_each_index(direction, plen, |i| {
        let i = i as isize;
        let piv: isize = (*p.offset(i * ps0)).as_();
        if piv != 0 {
            debug_assert!(all(i + piv >= 0, i + piv < len as isize));
            swap(a, i, piv, as0);
        }
    });
}

/// Swaps `a[0]` and `a[piv]` on a single member of the team, where `a` has `len` elements. Does
/// nothing if `piv` is zero.
///
/// # Safety
///
/// - `piv` must be zero, or in `1..len`.
/// - `a` and `a.offset(piv * as0)` must be valid for reads and writes, and must not be accessed by
/// other threads for the duration of the call.
#[inline]
pub unsafe fn apply_pivot_vector_internal<E>(
    member: &TeamMember<'_>,
    piv: isize,
    len: usize,
    a: *mut E,
    as0: isize,
) {
    if piv != 0 {
        debug_assert!(all(piv > 0, piv < len as isize));
        member.single(|| swap(a, 0, piv, as0));
    }
}

/// For each `i` in `0..plen`, in the order specified by `direction`, swaps `a[i]` and
/// `a[i + p[i]]`, where `a` has `len` elements.
///
/// Consecutive swaps depend on each other, so the whole sequence runs on a single member of the
/// team.
///
/// # Safety
///
/// - `p.offset(i * ps0)` must be valid for reads for every `i` in `0..plen`.
/// - `i + p[i]` must be in `0..len` for every `i` in `0..plen`.
/// - `a.offset(i * as0)` and `a.offset((i + p[i]) * as0)` must be valid for reads and writes for
/// every `i` in `0..plen`, and must not be accessed by other threads for the duration of the call.
#[inline]
pub unsafe fn apply_pivot_list_vector_internal<I: num_traits::AsPrimitive<isize>, E>(
    member: &TeamMember<'_>,
    direction: Direction,
    plen: usize,
    p: *const I,
    ps0: isize,
    len: usize,
    a: *mut E,
    as0: isize,
) {
    debug_assert!(plen <= len);
    member.single(|| swap_sequence(direction, plen, p, ps0, len, a, as0));
}

/// Swaps the lines `0` and `piv` of the matrix `a`, where `as0` is the stride between two
/// consecutive lines, and `as1` is the stride between two consecutive elements of the same line.
/// The matrix has `len` lines of `n` elements.
///
/// With `as0` and `as1` respectively set to the row and column stride of a matrix, this swaps two
/// rows. With the strides exchanged, it swaps two columns.
///
/// The `n` independent element swaps are split between the members of the team.
///
/// # Safety
///
/// - `piv` must be zero, or in `1..len`.
/// - `a.offset(l * as0 + j * as1)` must be valid for reads and writes for every `l` in `[0, piv]`
/// and `j` in `0..n`, and must not be accessed by other threads for the duration of the call.
#[inline]
pub unsafe fn apply_pivot_matrix_internal<E>(
    member: &TeamMember<'_>,
    piv: isize,
    len: usize,
    n: usize,
    a: *mut E,
    as0: isize,
    as1: isize,
) {
    if piv != 0 {
        debug_assert!(all(piv > 0, piv < len as isize));
        for j in member.team_range(n) {
            swap(a.offset(j as isize * as1), 0, piv, as0);
        }
    }
}

/// For each `i` in `0..plen`, in the order specified by `direction`, swaps the lines `i` and
/// `i + p[i]` of the matrix `a`, where `as0` is the stride between two consecutive lines, and
/// `as1` is the stride between two consecutive elements of the same line. The matrix has `len`
/// lines of `n` elements.
///
/// Each member of the team replays the whole sequence on its own subset of the `n` positions
/// along the lines.
///
/// # Safety
///
/// - `p.offset(i * ps0)` must be valid for reads for every `i` in `0..plen`.
/// - `i + p[i]` must be in `0..len` for every `i` in `0..plen`.
/// - `a.offset(l * as0 + j * as1)` must be valid for reads and writes for every line `l` touched
/// by the sequence and `j` in `0..n`, and must not be accessed by other threads for the duration
/// of the call.
#[inline]
pub unsafe fn apply_pivot_list_matrix_internal<I: num_traits::AsPrimitive<isize>, E>(
    member: &TeamMember<'_>,
    direction: Direction,
    plen: usize,
    len: usize,
    n: usize,
    p: *const I,
    ps0: isize,
    a: *mut E,
    as0: isize,
    as1: isize,
) {
    debug_assert!(plen <= len);
    for j in member.team_range(n) {
        swap_sequence(direction, plen, p, ps0, len, a.offset(j as isize * as1), as0);
    }
}
