//! Scheduler handoff
//!
//! Once a thread is resumed it belongs to the scheduler. The bootstrapper
//! hands it over through [`Dispatcher`]: the thread's slot and a snapshot of
//! the register file it starts with.

extern crate alloc;

use alloc::collections::VecDeque;

use hatch_cap::CPtr;
use hatch_cap::objects::UserContext;

/// Receives threads that have become runnable.
pub trait Dispatcher {
    /// Take ownership of the runnable thread in `tcb`.
    fn dispatch(&mut self, tcb: CPtr, context: &UserContext);
}

/// One thread waiting in a [`RunQueue`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dispatched {
    /// Thread slot.
    pub tcb: CPtr,
    /// Register file at handoff.
    pub context: UserContext,
}

/// FIFO queue of runnable threads.
#[derive(Clone, Debug, Default)]
pub struct RunQueue {
    queue: VecDeque<Dispatched>,
}

impl RunQueue {
    /// Create an empty run queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Number of queued threads.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if no thread is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Check if `tcb` is queued.
    #[must_use]
    pub fn contains(&self, tcb: CPtr) -> bool {
        self.queue.iter().any(|d| d.tcb == tcb)
    }

    /// Take the oldest queued thread.
    pub fn pop(&mut self) -> Option<Dispatched> {
        self.queue.pop_front()
    }
}

impl Dispatcher for RunQueue {
    fn dispatch(&mut self, tcb: CPtr, context: &UserContext) {
        self.queue.push_back(Dispatched {
            tcb,
            context: context.clone(),
        });
    }
}

impl<D: Dispatcher + ?Sized> Dispatcher for &mut D {
    fn dispatch(&mut self, tcb: CPtr, context: &UserContext) {
        (**self).dispatch(tcb, context);
    }
}
