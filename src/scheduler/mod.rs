//! Scheduling strategies.
//!
//! A scheduler decides *when* and *on which thread* a message reaches the
//! [`Renderer`]. Three interchangeable strategies implement the same
//! [`Scheduler`] contract:
//!
//! | Strategy | Per-thread state | Renders on | Ordering |
//! |----------|------------------|------------|----------|
//! | [`ImmediateScheduler`] | one shared level | caller | unsynchronized |
//! | [`BlockingScheduler`] | level + name | caller, under a lock | global call order |
//! | [`NonblockingScheduler`] | level + name + queue | consumer thread | per-thread FIFO |

use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, ThreadId};

use crate::renderer::Renderer;

mod blocking;
mod immediate;
mod nonblocking;
mod queue;

pub use blocking::BlockingScheduler;
pub use immediate::ImmediateScheduler;
pub use nonblocking::NonblockingScheduler;

/// The renderer as shared between the logger and its scheduler.
pub type SharedRenderer = Arc<Mutex<Renderer>>;

/// Name given to the thread that installs a scheduler.
pub const MAIN_THREAD_NAME: &str = "main";

/// Level of a thread that has not been given one explicitly.
pub const INITIAL_LEVEL: u32 = 1;

/// Which strategy a scheduler implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulerKind {
    Immediate,
    Blocking,
    Nonblocking,
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Immediate => "immediate",
            Self::Blocking => "blocking",
            Self::Nonblocking => "nonblocking",
        })
    }
}

/// Contract shared by every scheduling strategy.
///
/// Levels are tracked per calling thread (except by the immediate
/// scheduler). Operations from a thread the scheduler has never seen are
/// accepted: it gets an implicit entry at [`INITIAL_LEVEL`].
pub trait Scheduler: Send + Sync + fmt::Debug {
    fn kind(&self) -> SchedulerKind;

    /// Emit a permanent line at the caller's level plus `level_increase`.
    fn println(&self, level_increase: u32, text: String);

    /// Set the held line of `scope` at the caller's level.
    fn hold(&self, scope: String, text: String);

    /// Remove the held line of `scope` (and the ones held after it).
    fn release(&self, scope: String);

    fn current_level(&self) -> u32;

    fn current_thread_name(&self) -> String;

    /// Cell width of the longest thread name known to the scheduler.
    fn largest_thread_name_width(&self) -> usize;

    fn increase_level(&self, by: u32);

    fn decrease_level(&self, by: u32);

    /// Stop accepting asynchronous work and wait until all of it has been
    /// rendered. Calling it again is a no-op.
    fn terminate(&self);

    /// Per-thread registration, when the strategy tracks threads.
    fn thread_registration(&self) -> Option<&dyn ThreadRegistration> {
        None
    }
}

/// Capability of schedulers that keep per-thread state.
pub trait ThreadRegistration {
    /// Create the state of thread `id`. `level` defaults to the caller's
    /// current level. An explicit entry that already exists is kept.
    fn register(&self, id: ThreadId, name: String, level: Option<u32>);

    /// Forget thread `id`; messages it already queued are still rendered.
    fn unregister(&self, id: ThreadId);
}

/// Name for a thread that was never registered.
pub(crate) fn implicit_thread_name() -> String {
    let current = thread::current();
    current
        .name()
        .map_or_else(|| format!("{:?}", current.id()), str::to_string)
}

thread_local! {
    static LIVENESS: Arc<()> = Arc::new(());
}

/// Token of the calling thread that expires once the thread has exited.
///
/// Implicit per-thread entries hold one, so the scheduler can forget them
/// after their thread is gone. During thread teardown the token is already
/// expired.
pub(crate) fn liveness_token() -> Weak<()> {
    LIVENESS.try_with(|alive| Arc::downgrade(alive)).unwrap_or_default()
}

/// Whether the thread that issued `token` has exited.
pub(crate) fn has_exited(token: &Weak<()>) -> bool {
    token.strong_count() == 0
}
