//! `faer-team` provides dense linear algebra kernels that are executed cooperatively by a group of
//! work units, operating on [`faer`] matrix views with arbitrary strides.
//!
//! Every kernel comes in two flavors:
//! - a safe view interface, taking a [`Team`] and faer views, which checks its arguments and
//!   launches a single cooperative body on the team,
//! - an `unsafe` pointer interface (the `*_internal` functions), taking a [`TeamMember`], raw
//!   pointers and strides, meant to be composed inside a body launched with [`Team::run`].
//!
//! The kernels never allocate or free the memory they operate on. The inputs are only read, and
//! the outputs are updated in place.
//!
//! # Kernels
//!
//! - [`scale`] and [`fill`]: scaling and filling of strided vectors.
//! - [`ApplyPivot`]: application of a single pivot or a sequence of pivots to the rows or columns
//!   of a vector or matrix, in forward or backward order.
//! - [`form_q`]: reconstruction of the explicit orthogonal factor of a Householder QR
//!   factorization, with a host optimized path.
//! - [`gemv`]: scaled matrix-vector product.
//!
//! # Example
//!
//! ```
//! use faer::{col, col::Col, mat};
//! use faer_team::{gemv, Team};
//!
//! let a = mat![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0_f64]];
//! let x = col![1.0, 2.0, 3.0_f64];
//! let mut y = Col::<f64>::zeros(3);
//!
//! gemv(&Team::serial(), 1.0, a.as_ref(), x.as_ref(), 0.0, y.as_mut());
//! assert_eq!(y, x);
//! ```

#![allow(clippy::too_many_arguments)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use equator::{assert, debug_assert};

pub mod gemv;
pub mod pivot;
pub mod qr;
pub mod scale;
pub mod team;

pub use gemv::gemv;
pub use pivot::{ApplyPivot, Direction, PivotList, PivotTarget, Side};
pub use qr::{form_q, FormQError, FormQParams};
pub use scale::{fill, scale};
pub use team::{ExecSpace, Team, TeamMember};

#[macro_export]
#[doc(hidden)]
macro_rules! __perf_warn {
    ($name: ident) => {{
        #[inline(always)]
        #[allow(non_snake_case)]
        fn $name() -> &'static ::core::sync::atomic::AtomicBool {
            static $name: ::core::sync::atomic::AtomicBool =
                ::core::sync::atomic::AtomicBool::new(false);
            &$name
        }
        ::core::matches!(
            $name().compare_exchange(
                false,
                true,
                ::core::sync::atomic::Ordering::Relaxed,
                ::core::sync::atomic::Ordering::Relaxed,
            ),
            Ok(_)
        )
    }};
}
