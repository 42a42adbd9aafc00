//! Bootstrap configuration
//!
//! Compile-time constants for the 64-bit ABI plus [`SpawnConfig`], the
//! per-spawn runtime knobs.

use hatch_cap::objects::{
    Microseconds, NodeId, Priority, SchedContextObject, SchedPolicy, TcbObject,
};

/// Machine word size in bytes (64-bit ABI)
pub const WORD_SIZE: u64 = 8;

/// Required stack pointer alignment: two machine words
pub const STACK_ALIGNMENT: u64 = 2 * WORD_SIZE;

/// Size class of a thread control block
pub const TCB_SIZE_BITS: u8 = TcbObject::SIZE_BITS;

/// Smallest size class a scheduling context may be built with
pub const MIN_SCHED_CONTEXT_SIZE_BITS: u8 = SchedContextObject::MIN_SIZE_BITS;

/// Microseconds per millisecond
pub const US_IN_MS: Microseconds = 1000;

/// Default timeslice: 10 ms of budget in a 10 ms period
pub const DEFAULT_TIMESLICE_US: Microseconds = 10 * US_IN_MS;

/// Longest thread name kept, in bytes
pub const MAX_THREAD_NAME: usize = 16;

/// Highest thread priority
pub const MAX_PRIORITY: Priority = hatch_cap::objects::MAX_PRIORITY;

/// Parameters for spawning one thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnConfig<'a> {
    /// Diagnostic name.
    pub name: &'a str,
    /// Scheduling priority.
    pub priority: Priority,
    /// CPU time policy for the new scheduling context.
    pub policy: SchedPolicy,
    /// Node to bind the policy on; `None` uses the directory's own node.
    pub node: Option<NodeId>,
    /// Size class requested for the TCB.
    pub tcb_size_bits: u8,
    /// Size class requested for the scheduling context.
    pub sched_context_size_bits: u8,
}

impl<'a> SpawnConfig<'a> {
    /// Default spawn parameters under the given name.
    #[must_use]
    pub const fn new(name: &'a str) -> Self {
        Self {
            name,
            priority: MAX_PRIORITY,
            policy: SchedPolicy::round_robin(DEFAULT_TIMESLICE_US),
            node: None,
            tcb_size_bits: TCB_SIZE_BITS,
            sched_context_size_bits: MIN_SCHED_CONTEXT_SIZE_BITS,
        }
    }

    /// Set the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the scheduling policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: SchedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bind on an explicit node.
    #[must_use]
    pub const fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    /// Set the requested TCB size class.
    #[must_use]
    pub const fn with_tcb_size_bits(mut self, size_bits: u8) -> Self {
        self.tcb_size_bits = size_bits;
        self
    }

    /// Set the requested scheduling context size class.
    #[must_use]
    pub const fn with_sched_context_size_bits(mut self, size_bits: u8) -> Self {
        self.sched_context_size_bits = size_bits;
        self
    }
}

impl Default for SpawnConfig<'_> {
    fn default() -> Self {
        Self::new("thread")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_alignment() {
        assert_eq!(STACK_ALIGNMENT, 16);
    }

    #[test]
    fn test_default_spawn_config() {
        let config = SpawnConfig::default();
        assert_eq!(config.priority, 255);
        assert_eq!(config.policy, SchedPolicy::new(10_000, 10_000, 0));
        assert_eq!(config.node, None);
        assert_eq!(config.tcb_size_bits, 10);
        assert_eq!(config.sched_context_size_bits, 8);
    }

    #[test]
    fn test_builders() {
        let config = SpawnConfig::new("worker")
            .with_priority(100)
            .with_node(1)
            .with_sched_context_size_bits(16)
            .with_policy(SchedPolicy::new(20 * US_IN_MS, 5 * US_IN_MS, 2));
        assert_eq!(config.name, "worker");
        assert_eq!(config.priority, 100);
        assert_eq!(config.node, Some(1));
        assert_eq!(config.sched_context_size_bits, 16);
        assert_eq!(config.policy.budget, 5_000);
    }
}
