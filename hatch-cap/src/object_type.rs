//! Object type discriminant
//!
//! The runtime class tag carried by every capability and stored by the
//! kernel object table alongside each object.

use core::fmt;

/// Object type discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ObjectType {
    /// Empty slot (no capability).
    #[default]
    Empty = 0,

    // Memory objects
    /// Untyped memory.
    Untyped = 1,
    /// Virtual address space.
    VSpace = 2,

    // Execution objects
    /// Capability node (CNode).
    CNode = 3,
    /// Thread control block.
    TCB = 4,

    // Scheduling objects
    /// Scheduling context.
    SchedContext = 5,
    /// Scheduling control (one per node).
    SchedControl = 6,
}

impl ObjectType {
    /// Get the human-readable name for this object type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Untyped => "Untyped",
            Self::VSpace => "VSpace",
            Self::CNode => "CNode",
            Self::TCB => "TCB",
            Self::SchedContext => "SchedContext",
            Self::SchedControl => "SchedControl",
        }
    }

    /// Check if this is an empty slot.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
