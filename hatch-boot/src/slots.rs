//! Capability slot allocator
//!
//! A strict bump allocator over the empty slot range from the resource
//! directory. Slots come out in increasing order and are never handed out
//! twice; there is no free operation.

use hatch_cap::{CPtr, SlotRange};

use crate::error::{BootError, BootResult};

/// Hands out empty capability slots.
#[derive(Clone, Copy, Debug)]
pub struct SlotAllocator {
    range: SlotRange,
}

impl SlotAllocator {
    /// Create an allocator over `range`.
    #[inline]
    #[must_use]
    pub const fn new(range: SlotRange) -> Self {
        Self { range }
    }

    /// Take the next free slot.
    pub fn next_slot(&mut self) -> BootResult<CPtr> {
        if self.range.is_empty() {
            return Err(BootError::ExhaustedSlots {
                range: self.range,
                request: None,
            });
        }
        let slot = self.range.start;
        self.range.start = slot.next();
        Ok(slot)
    }

    /// Number of slots still available.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.range.len()
    }

    /// The unconsumed part of the range.
    #[inline]
    #[must_use]
    pub const fn range(&self) -> SlotRange {
        self.range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u64, end: u64) -> SlotRange {
        SlotRange::new(CPtr::from_raw(start), CPtr::from_raw(end))
    }

    #[test]
    fn test_slots_distinct_and_increasing() {
        for len in 0..16 {
            let mut alloc = SlotAllocator::new(range(100, 100 + len));
            let mut last: Option<CPtr> = None;
            for _ in 0..len {
                let slot = alloc.next_slot().unwrap();
                if let Some(prev) = last {
                    assert!(slot > prev);
                }
                last = Some(slot);
            }
            assert_eq!(alloc.remaining(), 0);
            assert!(matches!(
                alloc.next_slot(),
                Err(BootError::ExhaustedSlots { .. })
            ));
        }
    }

    #[test]
    fn test_exhausted_reports_range() {
        let mut alloc = SlotAllocator::new(range(100, 101));
        assert_eq!(alloc.next_slot(), Ok(CPtr::from_raw(100)));
        assert_eq!(
            alloc.next_slot(),
            Err(BootError::ExhaustedSlots {
                range: range(101, 101),
                request: None
            })
        );
        // Still exhausted, nothing wrapped
        assert!(alloc.next_slot().is_err());
    }

    #[test]
    fn test_remaining() {
        let mut alloc = SlotAllocator::new(range(100, 110));
        assert_eq!(alloc.next_slot(), Ok(CPtr::from_raw(100)));
        assert_eq!(alloc.remaining(), 9);
        assert_eq!(alloc.range(), range(101, 110));
    }
}
