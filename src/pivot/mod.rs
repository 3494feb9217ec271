//! Application of row and column pivots.
//!
//! A pivot list is a sequence of displacements `p` of length `k`, where the entry `p[i]` means
//! that the index `i` is swapped with the index `i + p[i]`. A displacement of `0` leaves the index
//! in place. This is the convention used to record the row interchanges of an LU factorization
//! with partial pivoting.
//!
//! Replaying the list in [`Direction::Forward`] order (`i = 0, 1, ..., k - 1`) applies the swaps
//! in the order they were recorded. Replaying it in [`Direction::Backward`] order applies the
//! inverse permutation, so that a forward application followed by a backward one leaves the
//! target unchanged.
//!
//! # Example
//!
//! ```
//! use faer::col;
//! use faer_team::{ApplyPivot, Direction, PivotList, Side, Team};
//!
//! let team = Team::serial();
//! let mut x = col![1.0, 2.0, 3.0, 4.0_f64];
//! let pivots = [0i32, 1, 0];
//!
//! let forward = ApplyPivot::new(Side::Left, Direction::Forward);
//! forward.list(&team, PivotList::from_slice(&pivots), x.as_mut());
//! assert_eq!(x, col![1.0, 3.0, 2.0, 4.0]);
//!
//! let backward = ApplyPivot::new(Side::Left, Direction::Backward);
//! backward.list(&team, PivotList::from_slice(&pivots), x.as_mut());
//! assert_eq!(x, col![1.0, 2.0, 3.0, 4.0]);
//! ```

use crate::{
    assert,
    team::{Ptr, Team},
};
use core::marker::PhantomData;
use faer::{col::ColMut, row::RowMut, MatMut};
use faer_entity::SimpleEntity;
use num_traits::AsPrimitive;

pub mod internal;

/// Which dimension of a matrix is permuted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    /// The rows are permuted, as if the matrix was multiplied by a permutation on the left.
    Left,
    /// The columns are permuted, as if the matrix was multiplied by a permutation on the right.
    Right,
}

/// Order in which a pivot list is replayed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Increasing indices, replaying the swaps in the order they were recorded.
    Forward,
    /// Decreasing indices, replaying the inverse of the forward permutation.
    Backward,
}

/// Borrowed strided view over a sequence of pivot displacements.
#[derive(Debug)]
pub struct PivotList<'a, I> {
    ptr: *const I,
    len: usize,
    stride: isize,
    __marker: PhantomData<&'a I>,
}

impl<I> Copy for PivotList<'_, I> {}
impl<I> Clone for PivotList<'_, I> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, I: AsPrimitive<isize>> PivotList<'a, I> {
    /// Returns a view over the contiguous displacements in `pivots`.
    #[inline]
    pub fn from_slice(pivots: &'a [I]) -> Self {
        Self {
            ptr: pivots.as_ptr(),
            len: pivots.len(),
            stride: 1,
            __marker: PhantomData,
        }
    }

    /// Returns a view over every `stride`-th element of `pivots`, starting at the first one.
    ///
    /// # Panics
    ///
    /// Panics if `stride` is zero.
    #[inline]
    #[track_caller]
    pub fn from_slice_with_stride(pivots: &'a [I], stride: usize) -> Self {
        assert!(stride > 0);
        Self {
            ptr: pivots.as_ptr(),
            len: (pivots.len() + stride - 1) / stride,
            stride: stride as isize,
            __marker: PhantomData,
        }
    }

    /// Returns a view over `len` displacements starting at `ptr`, separated by `stride` elements.
    ///
    /// # Safety
    ///
    /// `ptr.offset(i * stride)` must be valid for reads for every `i` in `0..len`, for the lifetime
    /// `'a`, and the pointees must not be written during that time.
    #[inline]
    pub unsafe fn from_raw_parts(ptr: *const I, len: usize, stride: isize) -> Self {
        Self {
            ptr,
            len,
            stride,
            __marker: PhantomData,
        }
    }

    /// Returns the number of displacements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks whether the list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the stride between two consecutive displacements, in number of elements.
    #[inline]
    pub fn stride(&self) -> isize {
        self.stride
    }

    /// Returns a pointer to the first displacement.
    #[inline]
    pub fn as_ptr(&self) -> *const I {
        self.ptr
    }

    /// Returns the displacement at index `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    #[inline]
    #[track_caller]
    pub fn read(&self, i: usize) -> isize {
        assert!(i < self.len);
        unsafe { (*self.ptr.offset(i as isize * self.stride)).as_() }
    }
}

mod seal {
    use super::Side;

    /// Raw description of a pivot target. Lines of `len` positions along `stride` are permuted.
    /// `sweep` holds the number of lines and the stride between them for rank-2 targets.
    pub struct RawTarget<E> {
        pub ptr: *mut E,
        pub len: usize,
        pub stride: isize,
        pub sweep: Option<(usize, isize)>,
    }

    pub trait Seal<E> {
        fn into_raw(self, side: Side) -> RawTarget<E>;
    }
}

/// Vector or matrix view that pivots can be applied to.
///
/// Implemented for [`ColMut`], [`RowMut`] and [`MatMut`]. Vectors are permuted along their only
/// dimension, regardless of the [`Side`].
pub trait PivotTarget<E>: seal::Seal<E> {}

impl<E: SimpleEntity> seal::Seal<E> for ColMut<'_, E> {
    #[inline]
    fn into_raw(self, _: Side) -> seal::RawTarget<E> {
        seal::RawTarget {
            len: self.nrows(),
            stride: self.row_stride(),
            ptr: self.as_ptr_mut(),
            sweep: None,
        }
    }
}
impl<E: SimpleEntity> PivotTarget<E> for ColMut<'_, E> {}

impl<E: SimpleEntity> seal::Seal<E> for RowMut<'_, E> {
    #[inline]
    fn into_raw(self, _: Side) -> seal::RawTarget<E> {
        seal::RawTarget {
            len: self.ncols(),
            stride: self.col_stride(),
            ptr: self.as_ptr_mut(),
            sweep: None,
        }
    }
}
impl<E: SimpleEntity> PivotTarget<E> for RowMut<'_, E> {}

impl<E: SimpleEntity> seal::Seal<E> for MatMut<'_, E> {
    #[inline]
    fn into_raw(self, side: Side) -> seal::RawTarget<E> {
        let (m, n) = (self.nrows(), self.ncols());
        let (rs, cs) = (self.row_stride(), self.col_stride());
        let ptr = self.as_ptr_mut();
        match side {
            Side::Left => seal::RawTarget {
                ptr,
                len: m,
                stride: rs,
                sweep: Some((n, cs)),
            },
            Side::Right => seal::RawTarget {
                ptr,
                len: n,
                stride: cs,
                sweep: Some((m, rs)),
            },
        }
    }
}
impl<E: SimpleEntity> PivotTarget<E> for MatMut<'_, E> {}

/// Pivot applicator, parameterized by the permuted side and the scan direction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ApplyPivot {
    side: Side,
    direction: Direction,
}

impl ApplyPivot {
    /// Returns an applicator permuting the `side` dimension, replaying lists in `direction` order.
    #[inline]
    pub fn new(side: Side, direction: Direction) -> Self {
        Self { side, direction }
    }

    /// Returns the permuted side.
    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Returns the order in which pivot lists are replayed.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Swaps the element, row or column `0` of `target` with the one at index `piv`. Does nothing
    /// if `piv` is zero.
    ///
    /// The direction of the applicator has no effect on a single displacement.
    ///
    /// # Panics
    ///
    /// Panics if `piv` is nonzero and out of bounds for the permuted dimension.
    #[track_caller]
    pub fn single<E: SimpleEntity>(&self, team: &Team, piv: usize, target: impl PivotTarget<E>) {
        let raw = seal::Seal::into_raw(target, self.side);
        assert!(any(piv == 0, piv < raw.len));
        if piv == 0 {
            return;
        }

        let piv = piv as isize;
        let len = raw.len;
        let stride = raw.stride;
        let ptr = Ptr::new(raw.ptr);
        match raw.sweep {
            None => team.run(|member| unsafe {
                internal::apply_pivot_vector_internal(member, piv, len, ptr.get(), stride)
            }),
            Some((n, sweep_stride)) => team.run(|member| unsafe {
                internal::apply_pivot_matrix_internal(
                    member,
                    piv,
                    len,
                    n,
                    ptr.get(),
                    stride,
                    sweep_stride,
                )
            }),
        }
    }

    /// Applies the swaps of `pivots` to `target`, in the order specified by the direction of the
    /// applicator.
    ///
    /// # Panics
    ///
    /// Panics if `pivots` is longer than the permuted dimension of `target`, or if any swap would
    /// move an index out of bounds.
    #[track_caller]
    pub fn list<I: AsPrimitive<isize> + Send, E: SimpleEntity>(
        &self,
        team: &Team,
        pivots: PivotList<'_, I>,
        target: impl PivotTarget<E>,
    ) {
        let raw = seal::Seal::into_raw(target, self.side);
        let plen = pivots.len();
        assert!(plen <= raw.len);
        for i in 0..plen {
            let dst = i as isize + pivots.read(i);
            assert!(all(dst >= 0, dst < raw.len as isize));
        }
        if plen == 0 {
            return;
        }

        let direction = self.direction;
        let ps0 = pivots.stride();
        let p = Ptr::from_const(pivots.as_ptr());
        let len = raw.len;
        let stride = raw.stride;
        let ptr = Ptr::new(raw.ptr);
        match raw.sweep {
            None => team.run(|member| unsafe {
                internal::apply_pivot_list_vector_internal(
                    member,
                    direction,
                    plen,
                    p.get(),
                    ps0,
                    len,
                    ptr.get(),
                    stride,
                )
            }),
            Some((n, sweep_stride)) => team.run(|member| unsafe {
                internal::apply_pivot_list_matrix_internal(
                    member,
                    direction,
                    plen,
                    len,
                    n,
                    p.get(),
                    ps0,
                    ptr.get(),
                    stride,
                    sweep_stride,
                )
            }),
        }
    }
}
