//! Cooperative execution groups.
//!
//! A [`Team`] is a fixed-size group of work units that jointly execute one kernel body against
//! one problem instance. Inside the body, each unit is represented by a [`TeamMember`], which
//! exposes the two synchronization primitives the kernels of this crate rely on:
//!
//! - [`TeamMember::team_barrier`], where every member of the group waits until all of them have
//!   reached it,
//! - [`TeamMember::single`], where exactly one member of the group executes a closure. The other
//!   members skip it, and observe its effects after the next barrier or once the body returns.
//!
//! Work is distributed with [`TeamMember::team_range`], which hands each member a contiguous
//! subrange of an index space. The subranges of all the members of a team partition the index
//! space.
//!
//! # Example
//!
//! ```
//! use faer_team::team::{Ptr, Team};
//!
//! let team = Team::serial();
//! let mut data = [1.0_f64, 2.0, 3.0, 4.0];
//! let ptr = Ptr::new(data.as_mut_ptr());
//!
//! team.run(|member| {
//!     for i in member.team_range(4) {
//!         unsafe { *ptr.get().add(i) *= 2.0 };
//!     }
//! });
//!
//! assert_eq!(data, [2.0, 4.0, 6.0, 8.0]);
//! ```

use crate::assert;
use core::ops::Range;
use faer::Parallelism;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Execution space the members of a team run in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExecSpace {
    /// The kernels run on the host, and may dispatch to host optimized numerical libraries.
    Host,
    /// The kernels may not call into host libraries, and always use the portable cooperative
    /// implementation.
    Device,
}

/// Error returned when the threads backing a [`Team`] can't be created.
#[derive(Debug)]
pub struct TeamBuildError {
    #[cfg(feature = "rayon")]
    inner: rayon::ThreadPoolBuildError,
}

impl core::fmt::Display for TeamBuildError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        #[cfg(feature = "rayon")]
        {
            write!(f, "failed to build the team thread pool: {}", self.inner)
        }
        #[cfg(not(feature = "rayon"))]
        {
            f.write_str("failed to build the team thread pool")
        }
    }
}

impl std::error::Error for TeamBuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        #[cfg(feature = "rayon")]
        {
            Some(&self.inner)
        }
        #[cfg(not(feature = "rayon"))]
        {
            None
        }
    }
}

/// Fixed-size cooperative execution group.
///
/// A team with a single member runs its kernel bodies on the calling thread. Larger teams own a
/// dedicated thread pool with exactly one thread per member, so that all the members of the group
/// are live at the same time and barriers always make progress.
///
/// If a member panics while running a body, the members blocked in, or later reaching, a
/// [`TeamMember::team_barrier`] unwind as well, and [`Team::run`] resumes the original panic once
/// every member has returned.
#[derive(Debug)]
pub struct Team {
    #[cfg(feature = "rayon")]
    pool: Option<rayon::ThreadPool>,
    size: usize,
    space: ExecSpace,
}

impl Team {
    /// Returns a team with a single member, running on the host.
    #[inline]
    pub fn serial() -> Self {
        Self {
            #[cfg(feature = "rayon")]
            pool: None,
            size: 1,
            space: ExecSpace::Host,
        }
    }

    /// Returns a team of `size` members running on the host, each backed by its own thread.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    #[cfg(feature = "rayon")]
    #[cfg_attr(docsrs, doc(cfg(feature = "rayon")))]
    #[track_caller]
    pub fn new(size: usize) -> Result<Self, TeamBuildError> {
        assert!(size > 0);
        if size == 1 {
            return Ok(Self::serial());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|idx| format!("faer-team-{idx}"))
            .build()
            .map_err(|inner| TeamBuildError { inner })?;

        Ok(Self {
            pool: Some(pool),
            size,
            space: ExecSpace::Host,
        })
    }

    /// Returns the same team, running in the execution space `space`.
    #[inline]
    pub fn with_space(self, space: ExecSpace) -> Self {
        Self { space, ..self }
    }

    /// Returns the number of members of the team.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the execution space of the team.
    #[inline]
    pub fn space(&self) -> ExecSpace {
        self.space
    }

    /// Checks whether the team runs on the host.
    #[inline]
    pub fn is_host(&self) -> bool {
        self.space == ExecSpace::Host
    }

    /// Returns the parallelism that library routines called on behalf of the team should use.
    #[inline]
    pub fn parallelism(&self) -> Parallelism<'_> {
        #[cfg(feature = "rayon")]
        if self.size > 1 {
            return Parallelism::Rayon(self.size);
        }
        Parallelism::None
    }

    /// Executes `body` once on every member of the team, and returns the value computed by the
    /// member of rank `0`.
    ///
    /// All the members have finished executing `body` when this function returns.
    ///
    /// This function must not be called from inside a body running on the same team.
    ///
    /// # Panics
    ///
    /// Resumes the panic of a member if `body` panics on any member of the team.
    pub fn run<R: Send>(&self, body: impl Sync + Fn(&TeamMember<'_>) -> R) -> R {
        #[cfg(feature = "rayon")]
        if let Some(pool) = &self.pool {
            let barrier = TeamBarrier::new(self.size);
            let space = self.space;
            let mut results = pool.broadcast(|ctx| {
                let member = TeamMember {
                    rank: ctx.index(),
                    size: ctx.num_threads(),
                    barrier: Some(&barrier),
                    space,
                };
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| body(&member)))
                    .map_err(|payload| {
                        barrier.poison();
                        payload
                    })
            });

            // members unwinding at a barrier only report that another member panicked
            let failed = results
                .iter()
                .position(|result| matches!(result, Err(payload) if !(**payload).is::<TeamPanicked>()))
                .or_else(|| results.iter().position(Result::is_err))
                .unwrap_or(0);

            return match results.swap_remove(failed) {
                Ok(value) => value,
                Err(payload) => std::panic::resume_unwind(payload),
            };
        }

        body(&TeamMember {
            rank: 0,
            size: 1,
            barrier: None,
            space: self.space,
        })
    }

    /// Executes `op` on the calling thread, with the team threads available to `op` through the
    /// provided parallelism.
    pub(crate) fn install<R: Send>(&self, op: impl Send + FnOnce(Parallelism<'_>) -> R) -> R {
        let parallelism = self.parallelism();
        #[cfg(feature = "rayon")]
        if let Some(pool) = &self.pool {
            return pool.install(move || op(parallelism));
        }
        op(parallelism)
    }
}

/// Handle to one member of a [`Team`], passed to the kernel body.
#[derive(Debug)]
pub struct TeamMember<'a> {
    rank: usize,
    size: usize,
    barrier: Option<&'a TeamBarrier>,
    space: ExecSpace,
}

impl TeamMember<'static> {
    /// Returns the only member of a serial host team.
    #[inline]
    pub const fn serial() -> Self {
        Self {
            rank: 0,
            size: 1,
            barrier: None,
            space: ExecSpace::Host,
        }
    }
}

impl TeamMember<'_> {
    /// Returns the rank of the member, in `0..self.team_size()`.
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Returns the number of members of the team.
    #[inline]
    pub fn team_size(&self) -> usize {
        self.size
    }

    /// Returns the execution space of the team.
    #[inline]
    pub fn space(&self) -> ExecSpace {
        self.space
    }

    /// Checks whether the team runs on the host.
    #[inline]
    pub fn is_host(&self) -> bool {
        self.space == ExecSpace::Host
    }

    /// Blocks until every member of the team has reached this barrier.
    ///
    /// Writes performed by any member before the barrier are visible to all members after it.
    ///
    /// If another member of the team has panicked, this function unwinds instead of blocking.
    #[inline]
    pub fn team_barrier(&self) {
        if let Some(barrier) = self.barrier {
            barrier.wait();
        }
    }

    /// Executes `op` on exactly one member of the team.
    #[inline]
    pub fn single(&self, op: impl FnOnce()) {
        if self.rank == 0 {
            op();
        }
    }

    /// Returns the subrange of `0..n` owned by this member.
    #[inline]
    pub fn team_range(&self, n: usize) -> Range<usize> {
        let (start, len) = split_indices(n, self.rank, self.size);
        start..start + len
    }
}

/// Panic payload of the members unwinding because another member of their team panicked.
struct TeamPanicked;

#[derive(Debug)]
struct BarrierState {
    count: usize,
    generation: usize,
    poisoned: bool,
}

/// Reusable barrier that can be poisoned by a panicking member.
#[derive(Debug)]
pub(crate) struct TeamBarrier {
    state: Mutex<BarrierState>,
    cvar: Condvar,
    size: usize,
}

#[cfg_attr(not(feature = "rayon"), allow(dead_code))]
impl TeamBarrier {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            state: Mutex::new(BarrierState {
                count: 0,
                generation: 0,
                poisoned: false,
            }),
            cvar: Condvar::new(),
            size,
        }
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until `size` calls have reached the barrier, or unwinds with a [`TeamPanicked`]
    /// payload once the barrier is poisoned.
    pub(crate) fn wait(&self) {
        let mut state = self.lock();
        if !state.poisoned {
            let generation = state.generation;
            state.count += 1;
            if state.count == self.size {
                state.count = 0;
                state.generation = generation.wrapping_add(1);
                drop(state);
                self.cvar.notify_all();
                return;
            }

            while state.generation == generation && !state.poisoned {
                state = self.cvar.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
            if state.generation != generation {
                return;
            }
        }
        drop(state);
        std::panic::resume_unwind(Box::new(TeamPanicked));
    }

    /// Wakes up every member blocked in [`Self::wait`], and makes all the later calls unwind.
    pub(crate) fn poison(&self) {
        self.lock().poisoned = true;
        self.cvar.notify_all();
    }
}

/// Returns the start and length of a subsegment of `0..n`, split between `chunk_count` consumers,
/// for the consumer at index `idx`.
#[inline]
pub(crate) fn split_indices(n: usize, idx: usize, chunk_count: usize) -> (usize, usize) {
    let chunk_size = n / chunk_count;
    let rem = n % chunk_count;

    let start_of = move |idx| {
        if idx < rem {
            idx * (chunk_size + 1)
        } else {
            rem + idx * chunk_size
        }
    };

    let start = start_of(idx);
    let end = start_of(idx + 1);
    (start, end - start)
}

/// Raw pointer that can be shared between the members of a team.
///
/// The members are responsible for accessing disjoint elements between two barriers.
#[derive(Debug)]
pub struct Ptr<T>(*mut T);

unsafe impl<T: Send> Send for Ptr<T> {}
unsafe impl<T: Send> Sync for Ptr<T> {}

impl<T> Copy for Ptr<T> {}
impl<T> Clone for Ptr<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Ptr<T> {
    /// Wraps a mutable pointer.
    #[inline]
    pub fn new(ptr: *mut T) -> Self {
        Self(ptr)
    }

    /// Wraps a const pointer. The pointee must not be written through the wrapper.
    #[inline]
    pub fn from_const(ptr: *const T) -> Self {
        Self(ptr as *mut T)
    }

    /// Returns the wrapped pointer.
    #[inline]
    pub fn get(self) -> *mut T {
        self.0
    }
}
