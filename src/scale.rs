//! Scaling and filling of strided vectors.

use crate::team::{Ptr, Team, TeamMember};
use faer::col::ColMut;
use faer_entity::{ComplexField, SimpleEntity};

/// Computes `a[i] := alpha * a[i]` for `i` in `0..m`, with the work split between the members of
/// the team.
///
/// # Safety
///
/// `a.offset(i * as0)` must be valid for reads and writes for every `i` in `0..m`, and must not
/// be accessed by other threads for the duration of the call.
#[inline]
pub unsafe fn scale_internal<E: ComplexField + SimpleEntity>(
    member: &TeamMember<'_>,
    m: usize,
    alpha: E,
    a: *mut E,
    as0: isize,
) {
    for i in member.team_range(m) {
        let a_i = a.offset(i as isize * as0);
        *a_i = alpha.faer_mul(*a_i);
    }
}

/// Computes `a[i] := alpha` for `i` in `0..m`, with the work split between the members of the
/// team. The previous contents of `a` are never read.
///
/// # Safety
///
/// `a.offset(i * as0)` must be valid for writes for every `i` in `0..m`, and must not be accessed
/// by other threads for the duration of the call.
#[inline]
pub unsafe fn set_internal<E: SimpleEntity>(
    member: &TeamMember<'_>,
    m: usize,
    alpha: E,
    a: *mut E,
    as0: isize,
) {
    for i in member.team_range(m) {
        a.offset(i as isize * as0).write(alpha);
    }
}

/// Multiplies every element of `x` by `alpha`.
///
/// # Example
///
/// ```
/// use faer::col;
/// use faer_team::{scale, Team};
///
/// let mut x = col![1.0, -2.0, 3.0_f64];
/// scale(&Team::serial(), 2.0, x.as_mut());
/// assert_eq!(x, col![2.0, -4.0, 6.0]);
/// ```
pub fn scale<E: ComplexField + SimpleEntity>(team: &Team, alpha: E, x: ColMut<'_, E>) {
    let m = x.nrows();
    let xs0 = x.row_stride();
    let x = Ptr::new(x.as_ptr_mut());
    team.run(|member| unsafe { scale_internal(member, m, alpha, x.get(), xs0) });
}

/// Overwrites every element of `x` with `value`.
pub fn fill<E: SimpleEntity>(team: &Team, value: E, x: ColMut<'_, E>) {
    let m = x.nrows();
    let xs0 = x.row_stride();
    let x = Ptr::new(x.as_ptr_mut());
    team.run(|member| unsafe { set_internal(member, m, value, x.get(), xs0) });
}
