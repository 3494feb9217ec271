//! Scaled matrix-vector product.
//!
//! [`gemv`] computes $y := \beta y + \alpha A x$, with the special cases of the BLAS:
//! - if $\beta = 0$, $y$ is overwritten, and its previous contents are never read, so that it may
//!   contain garbage or `NaN` values,
//! - if $\beta = 1$, $y$ is left untouched before the accumulation,
//! - if $\alpha = 0$, $A$ and $x$ are never read, and the result is exactly $\beta y$.

use crate::{
    assert,
    scale::{scale_internal, set_internal},
    team::{Ptr, Team, TeamMember},
};
use faer::{
    col::{ColMut, ColRef},
    MatRef,
};
use faer_entity::{ComplexField, SimpleEntity};

/// Computes `y := beta * y + alpha * a * x`, where `a` is `m×n`, `x` has `n` elements and `y`
/// has `m` elements.
///
/// The rows of `a` are split between the members of the team. Each member computes the dot
/// products of its rows with `x`, and commits them to the corresponding elements of `y`.
///
/// # Safety
///
/// - `a.offset(i * as0 + j * as1)` must be valid for reads for every `i` in `0..m` and `j` in
/// `0..n`, unless `alpha` is zero.
/// - `x.offset(j * xs0)` must be valid for reads for every `j` in `0..n`, unless `alpha` is zero.
/// - `y.offset(i * ys0)` must be valid for reads and writes for every `i` in `0..m`, and must not
/// overlap with `a` or `x`.
/// - every member of the team must call this function with the same arguments.
#[inline]
pub unsafe fn gemv_internal<E: ComplexField + SimpleEntity>(
    member: &TeamMember<'_>,
    m: usize,
    n: usize,
    alpha: E,
    a: *const E,
    as0: isize,
    as1: isize,
    x: *const E,
    xs0: isize,
    beta: E,
    y: *mut E,
    ys0: isize,
) {
    let zero = E::faer_zero();
    let one = E::faer_one();

    if beta == zero {
        set_internal(member, m, zero, y, ys0);
    } else if beta != one {
        scale_internal(member, m, beta, y, ys0);
    }

    if alpha == zero || m == 0 || n == 0 {
        return;
    }

    if beta != one {
        member.team_barrier();
    }

    for i in member.team_range(m) {
        let a_i = a.offset(i as isize * as0);
        let mut acc = zero;
        for j in 0..n {
            let j = j as isize;
            acc = acc.faer_add((*a_i.offset(j * as1)).faer_mul(*x.offset(j * xs0)));
        }
        let y_i = y.offset(i as isize * ys0);
        *y_i = (*y_i).faer_add(alpha.faer_mul(acc));
    }
}

/// Computes `y := beta * y + alpha * a * x`.
///
/// # Panics
///
/// Panics if `a.nrows() != y.nrows()` or `a.ncols() != x.nrows()`.
#[track_caller]
pub fn gemv<E: ComplexField + SimpleEntity>(
    team: &Team,
    alpha: E,
    a: MatRef<'_, E>,
    x: ColRef<'_, E>,
    beta: E,
    y: ColMut<'_, E>,
) {
    assert!(all(a.nrows() == y.nrows(), a.ncols() == x.nrows()));

    let (m, n) = (a.nrows(), a.ncols());
    let (as0, as1) = (a.row_stride(), a.col_stride());
    let xs0 = x.row_stride();
    let ys0 = y.row_stride();

    let a = Ptr::from_const(a.as_ptr());
    let x = Ptr::from_const(x.as_ptr());
    let y = Ptr::new(y.as_ptr_mut());

    team.run(|member| unsafe {
        gemv_internal(
            member,
            m,
            n,
            alpha,
            a.get(),
            as0,
            as1,
            x.get(),
            xs0,
            beta,
            y.get(),
            ys0,
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert;
    use assert_approx_eq::assert_approx_eq;
    use faer::{col::Col, Mat};
    use rand::prelude::*;
    use std::cell::RefCell;

    thread_local! {
        static RNG: RefCell<StdRng> = RefCell::new(StdRng::seed_from_u64(0));
    }

    fn random_value() -> f64 {
        RNG.with(|rng| rng.borrow_mut().gen_range(-1.0..1.0))
    }

    fn reference(
        alpha: f64,
        a: MatRef<'_, f64>,
        x: ColRef<'_, f64>,
        beta: f64,
        y: &Col<f64>,
    ) -> Col<f64> {
        Col::from_fn(a.nrows(), |i| {
            let dot = (0..a.ncols()).map(|j| a.read(i, j) * x.read(j)).sum::<f64>();
            beta * y.read(i) + alpha * dot
        })
    }

    #[test]
    fn test_identity() {
        let a = Mat::<f64>::identity(3, 3);
        let x = faer::col![1.0, 2.0, 3.0];
        let mut y = Col::<f64>::zeros(3);
        gemv(&Team::serial(), 1.0, a.as_ref(), x.as_ref(), 0.0, y.as_mut());
        assert!(y == x);
    }

    #[test]
    fn test_beta_zero_ignores_y() {
        for (m, n) in [(1, 1), (5, 3), (3, 5), (16, 16)] {
            let a = Mat::from_fn(m, n, |_, _| random_value());
            let x = Col::from_fn(n, |_| random_value());
            let mut y = Col::<f64>::from_fn(m, |_| f64::NAN);

            gemv(&Team::serial(), 1.0, a.as_ref(), x.as_ref(), 0.0, y.as_mut());

            let expected = reference(1.0, a.as_ref(), x.as_ref(), 0.0, &Col::zeros(m));
            for i in 0..m {
                assert_approx_eq!(y.read(i), expected.read(i), 1e-12);
            }
        }
    }

    #[test]
    fn test_alpha_zero_ignores_a_and_x() {
        let (m, n) = (6, 4);
        let a = Mat::<f64>::from_fn(m, n, |i, j| {
            if (i + j) % 2 == 0 {
                f64::NAN
            } else {
                f64::INFINITY
            }
        });
        let x = Col::<f64>::from_fn(n, |_| f64::NAN);
        let y_orig = Col::<f64>::from_fn(m, |_| random_value());

        for beta in [0.0, 1.0, -2.5] {
            let mut y = y_orig.clone();
            gemv(&Team::serial(), 0.0, a.as_ref(), x.as_ref(), beta, y.as_mut());
            for i in 0..m {
                assert!(y.read(i) == beta * y_orig.read(i));
            }
        }
    }

    #[test]
    fn test_beta() {
        let (m, n) = (7, 5);
        let a = Mat::from_fn(m, n, |_, _| random_value());
        let x = Col::from_fn(n, |_| random_value());
        let y_orig = Col::from_fn(m, |_| random_value());

        for (alpha, beta) in [(1.0, 1.0), (-0.5, 1.0), (2.0, 3.0), (1.0, -1.0)] {
            let mut y = y_orig.clone();
            gemv(&Team::serial(), alpha, a.as_ref(), x.as_ref(), beta, y.as_mut());
            let expected = reference(alpha, a.as_ref(), x.as_ref(), beta, &y_orig);
            for i in 0..m {
                assert_approx_eq!(y.read(i), expected.read(i), 1e-12);
            }
        }
    }

    #[test]
    fn test_strided() {
        let (m, n) = (5, 4);
        // row-major matrix
        let a_t = Mat::from_fn(n, m, |_, _| random_value());
        let a = a_t.transpose();

        // x and y are the columns 1 of larger matrices, read every third row
        let x_storage = Mat::from_fn(3 * n, 2, |_, _| random_value());
        let x = unsafe { faer::col::from_raw_parts::<f64>(x_storage.col(1).as_ptr(), n, 3) };
        let mut y_storage = Mat::from_fn(3 * m, 2, |_, _| random_value());
        let y_orig = Col::<f64>::from_fn(m, |i| y_storage.read(3 * i, 1));
        let skipped = Col::<f64>::from_fn(m, |i| y_storage.read(3 * i + 1, 1));
        let y_ptr = y_storage.as_mut().col_mut(1).as_ptr_mut();
        let y = unsafe { faer::col::from_raw_parts_mut::<f64>(y_ptr, m, 3) };

        gemv(&Team::serial(), 0.75, a, x, -1.5, y);

        let x = Col::<f64>::from_fn(n, |j| x_storage.read(3 * j, 1));
        let expected = reference(0.75, a, x.as_ref(), -1.5, &y_orig);
        for i in 0..m {
            assert_approx_eq!(y_storage.read(3 * i, 1), expected.read(i), 1e-12);
        }
        // the skipped rows are left untouched
        assert!(Col::<f64>::from_fn(m, |i| y_storage.read(3 * i + 1, 1)) == skipped);
    }

    #[test]
    fn test_empty() {
        let x = Col::<f64>::zeros(0);
        let mut y = faer::col![1.0, -2.0];
        let a = Mat::<f64>::zeros(2, 0);
        gemv(&Team::serial(), 1.0, a.as_ref(), x.as_ref(), 2.0, y.as_mut());
        assert!(y == faer::col![2.0, -4.0]);

        let x = faer::col![1.0, 2.0];
        let mut y = Col::<f64>::zeros(0);
        let a = Mat::<f64>::zeros(0, 2);
        gemv(&Team::serial(), 1.0, a.as_ref(), x.as_ref(), 0.0, y.as_mut());
    }

    #[test]
    #[should_panic]
    fn test_dimension_mismatch() {
        let a = Mat::<f64>::zeros(3, 2);
        let x = Col::<f64>::zeros(3);
        let mut y = Col::<f64>::zeros(3);
        gemv(&Team::serial(), 1.0, a.as_ref(), x.as_ref(), 0.0, y.as_mut());
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_team_matches_serial() {
        let team = Team::new(4).unwrap();
        for (m, n) in [(1, 9), (3, 3), (50, 31), (101, 7)] {
            let a = Mat::from_fn(m, n, |_, _| random_value());
            let x = Col::from_fn(n, |_| random_value());
            let y_orig = Col::from_fn(m, |_| random_value());

            for (alpha, beta) in [(1.0, 0.0), (0.5, 1.0), (-1.0, 2.0), (0.0, 3.0)] {
                let mut serial = y_orig.clone();
                gemv(&Team::serial(), alpha, a.as_ref(), x.as_ref(), beta, serial.as_mut());
                let mut parallel = y_orig.clone();
                gemv(&team, alpha, a.as_ref(), x.as_ref(), beta, parallel.as_mut());
                assert!(serial == parallel);
            }
        }
    }
}
