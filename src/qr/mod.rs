//! Reconstruction of the explicit unitary factor of a Householder QR decomposition.
//!
//! A QR factorization routine such as LAPACK's `?geqrf` overwrites an `m×n` matrix $A$ with its
//! upper triangular factor $R$, and stores the Householder vectors $v_0, \dots, v_{k-1}$ below the
//! diagonal, where $k = \min(m, n)$. Together with the scalar multipliers $\tau_0, \dots,
//! \tau_{k-1}$, they implicitly encode the unitary factor
//! $$Q = H_0 H_1 \dots H_{k-1}, \quad H_i = I - \tau_i v_i v_i^H,$$
//! where the component $i$ of $v_i$ is an implicit one.
//!
//! [`form_q`] materializes the first columns of $Q$. On a host team, when the layout of the
//! buffers allows it, it dispatches to a host optimized routine, otherwise it runs the portable
//! cooperative kernel [`form_q_internal`].
//!
//! # Example
//!
//! ```
//! use faer::{col::Col, mat, Mat};
//! use faer_team::{form_q, ExecSpace, FormQParams, Team};
//!
//! // QR factors of [[3, 1], [4, 1]], in the LAPACK convention
//! let qr = mat![[-5.0, -1.4], [0.5, -0.2_f64]];
//! let tau = faer::col![1.6, 0.0_f64];
//!
//! let mut q = Mat::<f64>::zeros(2, 2);
//! let mut work = Col::<f64>::zeros(2);
//! let team = Team::serial().with_space(ExecSpace::Device);
//! form_q(&team, qr.as_ref(), tau.as_ref(), q.as_mut(), work.as_mut(), FormQParams::default())
//!     .unwrap();
//!
//! let expected = mat![[-0.6, -0.8], [-0.8, 0.6_f64]];
//! for j in 0..2 {
//!     for i in 0..2 {
//!         assert!((q.read(i, j) - expected.read(i, j)).abs() < 1e-12);
//!     }
//! }
//! ```

use crate::{
    assert,
    team::{Ptr, Team},
};
use faer::{
    col::{ColMut, ColRef},
    MatMut, MatRef,
};
use faer_entity::{ComplexField, SimpleEntity};

mod host;
mod reflector;

pub use host::{form_q_host, STATUS_SIZE_OVERFLOW};
pub use reflector::{apply_reflector_internal, form_q_internal};

/// Tuning parameters for [`form_q`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct FormQParams {
    /// Number of reflections grouped in a single block by the host path. `None` picks faer's
    /// recommended QR block size.
    pub host_blocksize: Option<usize>,
}

impl FormQParams {
    /// Returns the same parameters, with the host block size set to `host_blocksize`.
    #[inline]
    pub fn with_host_blocksize(self, host_blocksize: usize) -> Self {
        Self {
            host_blocksize: Some(host_blocksize),
        }
    }
}

/// Failure reported by the host path of [`form_q`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FormQError {
    /// The host library rejected the argument at the given (one-based) position.
    IllegalArgument { position: i32 },
    /// The size of the workspace needed by the host path overflows.
    SizeOverflow,
    /// The host path returned a status code with no known meaning.
    Unknown { status: i32 },
}

impl FormQError {
    /// Converts a host status code into a result.
    #[inline]
    pub fn from_status(status: i32) -> Result<(), Self> {
        match status {
            0 => Ok(()),
            STATUS_SIZE_OVERFLOW => Err(Self::SizeOverflow),
            status if status < 0 && status != i32::MIN => Err(Self::IllegalArgument {
                position: -status,
            }),
            status => Err(Self::Unknown { status }),
        }
    }

    /// Returns the nonzero host status code corresponding to the error.
    #[inline]
    pub fn status(&self) -> i32 {
        match *self {
            Self::IllegalArgument { position } => -position,
            Self::SizeOverflow => STATUS_SIZE_OVERFLOW,
            Self::Unknown { status } => status,
        }
    }
}

impl core::fmt::Display for FormQError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::IllegalArgument { position } => {
                write!(f, "the host library rejected argument {position}")
            }
            Self::SizeOverflow => f.write_str("the workspace size overflows"),
            Self::Unknown { status } => write!(f, "the host path returned status {status}"),
        }
    }
}

impl std::error::Error for FormQError {}

/// Overwrites `q` with the first `q.ncols()` columns of the unitary factor of the QR decomposition
/// stored in `qr_factors` and `tau`.
///
/// `qr_factors` is `m×n`, with the Householder vectors stored below its diagonal, and `tau` holds
/// the `k = min(m, n)` scalar multipliers. `q` must have `m` rows and between `k` and `m` columns.
/// With `m` columns, the whole square factor is formed. `work` is used as scratch space by the
/// portable kernel.
///
/// The host path is taken when the team runs on the host, the element type is real, `tau` is
/// contiguous, and both `qr_factors` and `q` have a unit stride in one of their dimensions.
///
/// # Errors
///
/// Returns an error if the host library reports a failure. The portable path never fails.
///
/// # Panics
///
/// Panics if the dimensions don't match, if `work` is not contiguous, or if it has fewer than
/// `q.ncols()` elements.
#[track_caller]
pub fn form_q<E: ComplexField + SimpleEntity>(
    team: &Team,
    qr_factors: MatRef<'_, E>,
    tau: ColRef<'_, E>,
    q: MatMut<'_, E>,
    work: ColMut<'_, E>,
    params: FormQParams,
) -> Result<(), FormQError> {
    let m = qr_factors.nrows();
    let n = qr_factors.ncols();
    let k = Ord::min(m, n);
    let q_ncols = q.ncols();

    assert!(all(
        tau.nrows() == k,
        q.nrows() == m,
        q_ncols >= k,
        q_ncols <= m,
    ));
    assert!(work.row_stride() == 1);
    assert!(work.nrows() >= q_ncols);

    let (as0, as1) = (qr_factors.row_stride(), qr_factors.col_stride());
    let ts0 = tau.row_stride();
    let (qs0, qs1) = (q.row_stride(), q.col_stride());

    let a = Ptr::from_const(qr_factors.as_ptr());
    let tau = Ptr::from_const(tau.as_ptr());
    let q = Ptr::new(q.as_ptr_mut());
    let w = Ptr::new(work.as_ptr_mut());

    let is_real = coe::is_same::<E, E::Real>();
    let has_host_layout = (ts0 == 1 || k <= 1)
        && (as0 == 1 || as1 == 1)
        && (qs0 == 1 || qs1 == 1);

    if team.is_host() && is_real && has_host_layout {
        let status = team.install(|parallelism| unsafe {
            form_q_host(
                m,
                n,
                a.get(),
                as0,
                as1,
                tau.get(),
                q.get(),
                q_ncols,
                qs0,
                qs1,
                parallelism,
                params,
            )
        });
        return FormQError::from_status(status);
    }

    #[cfg(feature = "perf-warn")]
    if team.is_host() && crate::__perf_warn!(FORM_Q_WARN) {
        if !is_real {
            log::warn!(target: "faer_perf", "Q formation on the host has no optimized path for complex matrices. Falling back to the portable kernel.");
        } else {
            log::warn!(target: "faer_perf", "Q formation on the host prefers contiguous buffers. Found matrices with generic strides. Falling back to the portable kernel.");
        }
    }
    log::debug!("forming a {m}×{q_ncols} Q factor with the portable kernel");

    team.run(|member| unsafe {
        form_q_internal(
            member,
            m,
            q_ncols,
            k,
            a.get(),
            as0,
            as1,
            tau.get(),
            ts0,
            q.get(),
            qs0,
            qs1,
            w.get(),
        )
    });
    Ok(())
}
