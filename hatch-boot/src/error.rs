//! Bootstrap error types
//!
//! Every bootstrap operation returns `Result<T, BootError>`. Resources are
//! one-shot (a retired grant or consumed slot cannot come back), so none of
//! these errors is retriable within the same bootstrap attempt: the caller
//! aborts the sequence and reports the error.
//!
//! Operations validate everything before mutating, so an `Err` always means
//! nothing changed.

use core::fmt;

use hatch_cap::objects::{NodeId, PolicyFault, RunState, SchedPolicy};
use hatch_cap::{CPtr, ObjectType, SlotRange};
use hatch_common::VirtAddr;

/// State-machine transitions of a thread being bootstrapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Write the initial instruction and stack pointer.
    LoadRegisters,
    /// Change priority before the thread runs.
    SetPriority,
}

impl Transition {
    /// Get the operation name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoadRegisters => "load_registers",
            Self::SetPriority => "set_priority",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why `configure` rejected its arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigureFault {
    /// The thread was not in the unconfigured state.
    NotUnconfigured,
    /// The CSpace root does not name a CNode.
    InvalidCSpace,
    /// The VSpace root does not name a VSpace.
    InvalidVSpace,
    /// The scheduling-context handle does not name a scheduling context.
    InvalidSchedContext,
    /// The scheduling context already belongs to another thread.
    SchedContextInUse {
        /// Thread already using it.
        owner: CPtr,
    },
}

impl fmt::Display for ConfigureFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotUnconfigured => write!(f, "thread already configured"),
            Self::InvalidCSpace => write!(f, "invalid cspace root"),
            Self::InvalidVSpace => write!(f, "invalid vspace root"),
            Self::InvalidSchedContext => write!(f, "invalid scheduling context"),
            Self::SchedContextInUse { owner } => {
                write!(f, "scheduling context already used by thread {owner}")
            }
        }
    }
}

/// Why `resume` refused to start a thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResumeFault {
    /// `configure` has not run.
    NotConfigured,
    /// `load_registers` has not run.
    RegistersNotLoaded,
}

impl fmt::Display for ResumeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "thread not configured"),
            Self::RegistersNotLoaded => write!(f, "registers never loaded"),
        }
    }
}

/// Errors that can occur while bootstrapping a thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use = "bootstrap errors must be handled"]
pub enum BootError {
    // -- Resource exhaustion

    /// The free slot range is used up.
    ExhaustedSlots {
        /// The (now empty) range.
        range: SlotRange,
        /// Class and size class the slot was wanted for, when known.
        request: Option<(ObjectType, u8)>,
    },
    /// No unretired, non-device grant is large enough.
    NoSuitableGrant {
        /// Class that was requested.
        class: ObjectType,
        /// Size class that was requested.
        size_bits: u8,
    },
    /// The destination slot already holds a capability.
    SlotOccupied {
        /// Destination slot.
        slot: CPtr,
        /// Class already there.
        found: ObjectType,
    },

    // -- Policy binding misuse

    /// No scheduling control exists for the node.
    NoSchedulingControl {
        /// Requested node.
        node: NodeId,
    },
    /// The policy is not a valid slice within its period.
    InvalidPolicy {
        /// Rejected policy.
        policy: SchedPolicy,
        /// Reason.
        fault: PolicyFault,
    },
    /// The scheduling context already has a policy.
    AlreadyBound {
        /// Scheduling context slot.
        sched_context: CPtr,
    },

    // -- Thread state machine

    /// `configure` rejected its arguments.
    ConfigurationFailed {
        /// Thread slot.
        tcb: CPtr,
        /// State the thread was in.
        from: RunState,
        /// Reason.
        fault: ConfigureFault,
    },
    /// The stack pointer violates the platform stack alignment.
    MisalignedStack {
        /// Thread slot.
        tcb: CPtr,
        /// Rejected stack pointer.
        stack_pointer: VirtAddr,
        /// Required alignment in bytes.
        alignment: u64,
    },
    /// The thread cannot be started yet.
    ResumeFailed {
        /// Thread slot.
        tcb: CPtr,
        /// State the thread was in.
        from: RunState,
        /// Reason.
        fault: ResumeFault,
    },
    /// The thread was already started.
    AlreadyRunning {
        /// Thread slot.
        tcb: CPtr,
    },
    /// The transition is not allowed from the thread's current state.
    InvalidTransition {
        /// Thread slot.
        tcb: CPtr,
        /// Attempted transition.
        transition: Transition,
        /// State the thread was in.
        from: RunState,
    },

    // -- Handles and handoff

    /// The handle does not name an object of the expected class.
    InvalidHandle {
        /// Slot named by the handle.
        slot: CPtr,
        /// Class the operation needs.
        expected: ObjectType,
        /// Class actually found.
        found: ObjectType,
    },
    /// The startup handoff block failed validation.
    InvalidBootInfo,
}

impl BootError {
    /// Get a short name for the error kind.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::ExhaustedSlots { .. } => "ExhaustedSlots",
            Self::NoSuitableGrant { .. } => "NoSuitableGrant",
            Self::SlotOccupied { .. } => "SlotOccupied",
            Self::NoSchedulingControl { .. } => "NoSchedulingControl",
            Self::InvalidPolicy { .. } => "InvalidPolicy",
            Self::AlreadyBound { .. } => "AlreadyBound",
            Self::ConfigurationFailed { .. } => "ConfigurationFailed",
            Self::MisalignedStack { .. } => "MisalignedStack",
            Self::ResumeFailed { .. } => "ResumeFailed",
            Self::AlreadyRunning { .. } => "AlreadyRunning",
            Self::InvalidTransition { .. } => "InvalidTransition",
            Self::InvalidHandle { .. } => "InvalidHandle",
            Self::InvalidBootInfo => "InvalidBootInfo",
        }
    }

    /// Attach the object request a slot was wanted for to `ExhaustedSlots`.
    ///
    /// Other errors are returned unchanged.
    pub const fn for_request(self, class: ObjectType, size_bits: u8) -> Self {
        match self {
            Self::ExhaustedSlots { range, .. } => Self::ExhaustedSlots {
                range,
                request: Some((class, size_bits)),
            },
            other => other,
        }
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ExhaustedSlots { range, request } => {
                write!(f, "no free capability slots left in {range}")?;
                if let Some((class, size_bits)) = request {
                    write!(f, " for {class} of 2^{size_bits} bytes")?;
                }
                Ok(())
            }
            Self::NoSuitableGrant { class, size_bits } => write!(
                f,
                "no untyped grant of at least 2^{size_bits} bytes left for {class}"
            ),
            Self::SlotOccupied { slot, found } => {
                write!(f, "slot {slot} already holds a {found}")
            }
            Self::NoSchedulingControl { node } => {
                write!(f, "no scheduling control for node {node}")
            }
            Self::InvalidPolicy { policy, fault } => {
                write!(f, "invalid scheduling policy ({policy}): {fault}")
            }
            Self::AlreadyBound { sched_context } => {
                write!(f, "scheduling context {sched_context} already bound")
            }
            Self::ConfigurationFailed { tcb, from, fault } => {
                write!(f, "configure of thread {tcb} from {from} failed: {fault}")
            }
            Self::MisalignedStack {
                tcb,
                stack_pointer,
                alignment,
            } => write!(
                f,
                "load_registers of thread {tcb}: stack pointer {stack_pointer} not aligned to {alignment} bytes"
            ),
            Self::ResumeFailed { tcb, from, fault } => {
                write!(f, "resume of thread {tcb} from {from} failed: {fault}")
            }
            Self::AlreadyRunning { tcb } => {
                write!(f, "resume of thread {tcb}: already running")
            }
            Self::InvalidTransition {
                tcb,
                transition,
                from,
            } => write!(f, "{transition} of thread {tcb} not allowed from {from}"),
            Self::InvalidHandle {
                slot,
                expected,
                found,
            } => write!(f, "slot {slot} holds {found}, expected {expected}"),
            Self::InvalidBootInfo => write!(f, "startup handoff block is invalid"),
        }
    }
}

impl core::error::Error for BootError {}

/// Result type for bootstrap operations.
pub type BootResult<T> = Result<T, BootError>;
