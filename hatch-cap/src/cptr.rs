//! Capability pointer (CPtr) addressing
//!
//! A bootstrapping process has a single-level CSpace: its root CNode. A CPtr
//! is therefore just the slot index in that CNode (retypes are done with
//! a depth covering the whole word, so no guard or multi-level decoding is
//! needed).
//!
//! Slot 0 is the null capability and never names an object.

use core::fmt;

use hatch_common::boot::SlotRegion;

/// Capability pointer - addresses a slot in the root CNode.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct CPtr(u64);

impl CPtr {
    /// Null capability pointer.
    pub const NULL: Self = Self(0);

    /// Create a CPtr from a raw slot index.
    #[inline]
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw slot index.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Check if this is the null CPtr.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The slot immediately after this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// This slot offset by `n`.
    #[inline]
    #[must_use]
    pub const fn offset(self, n: u64) -> Self {
        Self(self.0 + n)
    }
}

impl fmt::Debug for CPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "CPtr::NULL")
        } else {
            write!(f, "CPtr({})", self.0)
        }
    }
}

impl fmt::Display for CPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CPtr {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A half-open range of capability slots (`start..end`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotRange {
    /// First slot in the range.
    pub start: CPtr,
    /// One past the last slot.
    pub end: CPtr,
}

impl SlotRange {
    /// Create a slot range.
    #[inline]
    #[must_use]
    pub const fn new(start: CPtr, end: CPtr) -> Self {
        Self { start, end }
    }

    /// Number of slots in the range.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end.raw().saturating_sub(self.start.raw())
    }

    /// Check if the range holds no slots.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start.raw() >= self.end.raw()
    }

    /// Check if the two ranges share a slot.
    #[inline]
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start.raw() < other.end.raw()
            && other.start.raw() < self.end.raw()
    }

    /// The `idx`th slot of the range, if the range is that long.
    #[inline]
    #[must_use]
    pub const fn nth(&self, idx: u64) -> Option<CPtr> {
        if idx < self.len() {
            Some(self.start.offset(idx))
        } else {
            None
        }
    }
}

impl From<SlotRegion> for SlotRange {
    fn from(region: SlotRegion) -> Self {
        Self::new(CPtr::from_raw(region.start), CPtr::from_raw(region.end))
    }
}

impl fmt::Display for SlotRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
