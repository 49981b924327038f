//! Per-thread state of the non-blocking scheduler.

use std::collections::VecDeque;
use std::sync::Weak;
use std::thread::ThreadId;

use super::{INITIAL_LEVEL, has_exited, liveness_token};
use crate::message::RawMessage;

/// How a thread became known to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// The thread that installed the scheduler.
    Main,
    /// Registered through the thread registration API.
    Registered,
    /// Seen for the first time while logging.
    Implicit,
}

/// Level, name and pending messages of one producer thread.
#[derive(Debug)]
pub(crate) struct ThreadQueue {
    pub(crate) id: ThreadId,
    pub(crate) name: String,
    pub(crate) level: u32,
    pub(crate) origin: Origin,
    pub(crate) alive: bool,
    /// Set for implicit entries only.
    liveness: Option<Weak<()>>,
    pending: VecDeque<RawMessage>,
}

impl ThreadQueue {
    pub(crate) fn new(id: ThreadId, name: String, level: u32, origin: Origin) -> Self {
        Self {
            id,
            name,
            level,
            origin,
            alive: true,
            liveness: None,
            pending: VecDeque::new(),
        }
    }

    /// Entry of the calling thread, seen for the first time while logging.
    pub(crate) fn implicit(id: ThreadId, name: String) -> Self {
        let mut queue = Self::new(id, name, INITIAL_LEVEL, Origin::Implicit);
        queue.liveness = Some(liveness_token());
        queue
    }

    /// Give a dead entry a new life, keeping the messages it still holds.
    pub(crate) fn revive(&mut self, name: String, level: u32, origin: Origin) {
        self.name = name;
        self.level = level;
        self.origin = origin;
        self.alive = true;
        self.liveness = (origin == Origin::Implicit).then(liveness_token);
    }

    /// Turn an implicit entry into a registered one.
    pub(crate) fn promote(&mut self, name: String, level: u32) {
        self.revive(name, level, Origin::Registered);
    }

    pub(crate) fn push(&mut self, msg: RawMessage) {
        self.pending.push_back(msg);
    }

    pub(crate) fn pop(&mut self) -> Option<RawMessage> {
        self.pending.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// An explicitly registered, still running producer.
    pub(crate) fn is_active_producer(&self) -> bool {
        self.alive && self.origin == Origin::Registered
    }

    /// Dead, or implicit with its thread gone, and fully drained.
    pub(crate) fn is_disposable(&self) -> bool {
        let gone = !self.alive || self.liveness.as_ref().is_some_and(has_exited);
        gone && self.pending.is_empty()
    }
}

/// All producer queues, in registration order.
#[derive(Debug, Default)]
pub(crate) struct QueueSet {
    queues: Vec<ThreadQueue>,
}

impl QueueSet {
    /// Entry of `id`, dead or alive. There is at most one per thread.
    pub(crate) fn get_mut(&mut self, id: ThreadId) -> Option<&mut ThreadQueue> {
        self.queues.iter_mut().find(|q| q.id == id)
    }

    pub(crate) fn insert(&mut self, queue: ThreadQueue) {
        self.queues.push(queue);
    }

    /// Live entry of `id`, created implicitly on first use. A dead entry
    /// still draining is revived in place so its messages keep their order.
    pub(crate) fn entry(&mut self, id: ThreadId, name: impl FnOnce() -> String) -> &mut ThreadQueue {
        let idx = match self.queues.iter().position(|q| q.id == id) {
            Some(idx) => {
                let queue = &mut self.queues[idx];
                if !queue.alive {
                    queue.revive(name(), INITIAL_LEVEL, Origin::Implicit);
                }
                idx
            }
            None => {
                self.queues.push(ThreadQueue::implicit(id, name()));
                self.queues.len() - 1
            }
        };
        &mut self.queues[idx]
    }

    /// Pop from the queue with the most pending messages; ties go to the
    /// earliest registered thread.
    pub(crate) fn dequeue_busiest(&mut self) -> Option<RawMessage> {
        let mut busiest: Option<(usize, usize)> = None;
        for (idx, queue) in self.queues.iter().enumerate() {
            let len = queue.len();
            if len > 0 && busiest.is_none_or(|(_, best)| len > best) {
                busiest = Some((idx, len));
            }
        }
        let (idx, _) = busiest?;
        self.queues[idx].pop()
    }

    pub(crate) fn all_empty(&self) -> bool {
        self.queues.iter().all(ThreadQueue::is_empty)
    }

    pub(crate) fn has_active_producers(&self) -> bool {
        self.queues.iter().any(ThreadQueue::is_active_producer)
    }

    pub(crate) fn prune(&mut self) {
        self.queues.retain(|q| !q.is_disposable());
    }

    pub(crate) fn largest_name_width(&self) -> usize {
        self.queues
            .iter()
            .map(|q| crate::cells::cell_len(&q.name))
            .max()
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.queues.len()
    }
}
