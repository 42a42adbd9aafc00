//! Root capability slot layout
//!
//! Well-known capability slot indices in a freshly started process's CSpace.
//! The environment places these before handing over; everything else
//! (untyped grants, scheduling control, empty slots) is described by the
//! startup handoff.

use crate::CPtr;

/// Well-known capability slot indices in the root CSpace.
#[repr(u64)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Null capability.
    Null = 0,
    /// The process's own TCB.
    RootTcb = 1,
    /// Root CNode (self-reference).
    RootCNode = 2,
    /// Root VSpace.
    RootVSpace = 3,
}

impl Slot {
    /// The slot as a capability pointer.
    #[inline]
    #[must_use]
    pub const fn cptr(self) -> CPtr {
        CPtr::from_raw(self as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_slot() {
        assert!(Slot::Null.cptr().is_null());
        assert_eq!(Slot::RootCNode.cptr(), CPtr::from_raw(2));
    }
}
