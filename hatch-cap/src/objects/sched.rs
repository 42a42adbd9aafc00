//! Scheduling capabilities
//!
//! The scheduling system uses capability-based CPU time management:
//!
//! - **SchedControl**: Authority to configure scheduling contexts on one node
//! - **SchedContext**: CPU time budget that a thread consumes to execute
//!
//! # Sporadic servers
//!
//! A scheduling context is configured with a period and a budget. The
//! thread running on it may consume at most `budget` microseconds in every
//! `period`; budget equal to period is a plain round-robin timeslice.
//! Refills are the bookkeeping entries the kernel keeps to replenish budget;
//! `extra_refills` asks for more of them than the minimum, which lets the
//! budget be split into more chunks per period. Refills are stored inside the
//! scheduling context object, so a larger object holds more.

use core::fmt;

use crate::CPtr;

/// Time in microseconds.
pub type Microseconds = u64;

/// Execution node (CPU) identifier.
pub type NodeId = u32;

/// Why a scheduling policy was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyFault {
    /// The period is zero.
    ZeroPeriod,
    /// The budget is zero.
    ZeroBudget,
    /// The budget is larger than the period.
    BudgetExceedsPeriod,
    /// More extra refills were requested than the context can store.
    TooManyRefills {
        /// Largest accepted `extra_refills` for this context.
        max: u32,
    },
}

impl fmt::Display for PolicyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPeriod => write!(f, "period must be positive"),
            Self::ZeroBudget => write!(f, "budget must be positive"),
            Self::BudgetExceedsPeriod => write!(f, "budget exceeds period"),
            Self::TooManyRefills { max } => write!(f, "at most {max} extra refills fit"),
        }
    }
}

/// Timing policy for a scheduling context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedPolicy {
    /// Period in microseconds.
    pub period: Microseconds,
    /// Budget in microseconds per period.
    pub budget: Microseconds,
    /// Refills beyond the minimum.
    pub extra_refills: u32,
}

impl SchedPolicy {
    /// Create a policy.
    #[inline]
    #[must_use]
    pub const fn new(period: Microseconds, budget: Microseconds, extra_refills: u32) -> Self {
        Self {
            period,
            budget,
            extra_refills,
        }
    }

    /// A round-robin timeslice: the whole period is budget.
    #[inline]
    #[must_use]
    pub const fn round_robin(timeslice: Microseconds) -> Self {
        Self::new(timeslice, timeslice, 0)
    }

    /// Check the policy against a scheduling context of size class `size_bits`.
    pub const fn validate(&self, size_bits: u8) -> Result<(), PolicyFault> {
        if self.period == 0 {
            return Err(PolicyFault::ZeroPeriod);
        }
        if self.budget == 0 {
            return Err(PolicyFault::ZeroBudget);
        }
        if self.budget > self.period {
            return Err(PolicyFault::BudgetExceedsPeriod);
        }
        let max = SchedContextObject::max_extra_refills(size_bits);
        if self.extra_refills > max {
            return Err(PolicyFault::TooManyRefills { max });
        }
        Ok(())
    }
}

impl fmt::Display for SchedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "budget {}us / period {}us (+{} refills)",
            self.budget, self.period, self.extra_refills
        )
    }
}

/// Scheduling context object metadata.
///
/// A scheduling context is bound to exactly one policy and, once a thread is
/// configured with it, to exactly one thread.
#[derive(Clone, Debug)]
pub struct SchedContextObject {
    /// Object size class (log2 bytes); bounds the refill capacity.
    pub size_bits: u8,
    /// Timing policy, once bound.
    pub policy: Option<SchedPolicy>,
    /// Node the policy was bound for.
    pub node: Option<NodeId>,
    /// TCB using this context (null if none).
    pub bound_tcb: CPtr,
}

impl SchedContextObject {
    /// Minimum size class of a scheduling context (256 bytes).
    pub const MIN_SIZE_BITS: u8 = 8;

    /// Bytes of fixed bookkeeping at the start of the object.
    pub const HEADER_SIZE: u64 = 64;

    /// Bytes per refill entry.
    pub const REFILL_SIZE: u64 = 16;

    /// Refills every context keeps regardless of policy.
    pub const MIN_REFILLS: u64 = 2;

    /// Create an unbound scheduling context of size class `size_bits`.
    #[inline]
    #[must_use]
    pub const fn new(size_bits: u8) -> Self {
        Self {
            size_bits,
            policy: None,
            node: None,
            bound_tcb: CPtr::NULL,
        }
    }

    /// Largest `extra_refills` a context of size class `size_bits` can store.
    #[must_use]
    pub const fn max_extra_refills(size_bits: u8) -> u32 {
        if size_bits >= 64 {
            return u32::MAX;
        }
        let size = 1u64 << size_bits;
        if size <= Self::HEADER_SIZE {
            return 0;
        }
        let refills = (size - Self::HEADER_SIZE) / Self::REFILL_SIZE;
        let extra = refills.saturating_sub(Self::MIN_REFILLS);
        if extra > u32::MAX as u64 {
            u32::MAX
        } else {
            extra as u32
        }
    }

    /// Check if a policy has been bound.
    #[inline]
    #[must_use]
    pub const fn has_policy(&self) -> bool {
        self.policy.is_some()
    }

    /// Check if a thread has been configured to run on this context.
    #[inline]
    #[must_use]
    pub const fn is_associated(&self) -> bool {
        !self.bound_tcb.is_null()
    }
}

/// Scheduling control object metadata.
///
/// One per execution node, handed to the process at startup.
#[derive(Clone, Debug, Default)]
pub struct SchedControlObject {
    /// Node this control configures contexts for.
    pub node: NodeId,
    /// Total budget handed out per period (sum over configured contexts).
    pub total_allocated: Microseconds,
    /// Number of scheduling contexts configured.
    pub context_count: u32,
}

impl SchedControlObject {
    /// Create a scheduling control object for `node`.
    #[inline]
    #[must_use]
    pub const fn new(node: NodeId) -> Self {
        Self {
            node,
            total_allocated: 0,
            context_count: 0,
        }
    }

    /// Record configuration of a new scheduling context.
    #[inline]
    pub fn record_allocation(&mut self, budget: Microseconds) {
        self.total_allocated = self.total_allocated.saturating_add(budget);
        self.context_count = self.context_count.saturating_add(1);
    }
}
