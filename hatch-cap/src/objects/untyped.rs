//! Untyped memory grant
//!
//! Represents a coarse region of memory handed to the process at startup.
//! Untyped memory is the root of all memory authority: every kernel object
//! the process creates comes from converting (retyping) one of these.
//!
//! # One-shot conversion
//!
//! Unlike a general-purpose untyped allocator that carves many objects out
//! of one region behind a watermark, a grant here is converted exactly once:
//! the whole region backs one object and is retired afterwards. Retirement is
//! tracked by the object constructor in `hatch-boot`, not by the grant.

use hatch_common::PhysAddr;
use hatch_common::boot::UntypedDesc;

use crate::CPtr;

/// Untyped memory grant metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grant {
    /// Slot holding the untyped capability; grants are scanned in ascending id order.
    pub id: CPtr,
    /// Physical base address.
    pub phys_base: PhysAddr,
    /// Total size as log2 (size = 1 << size_bits).
    pub size_bits: u8,
    /// Whether this is device memory.
    pub is_device: bool,
}

impl Grant {
    /// Minimum untyped size (16 bytes, for a single capability slot).
    pub const MIN_SIZE_BITS: u8 = 4;

    /// Maximum untyped size (2^47 bytes, 128 TB).
    pub const MAX_SIZE_BITS: u8 = 47;

    /// Create a grant.
    #[inline]
    #[must_use]
    pub const fn new(id: CPtr, phys_base: PhysAddr, size_bits: u8, is_device: bool) -> Self {
        Self {
            id,
            phys_base,
            size_bits,
            is_device,
        }
    }

    /// Create a grant from its handoff description and the slot holding it.
    #[inline]
    #[must_use]
    pub const fn from_desc(id: CPtr, desc: &UntypedDesc) -> Self {
        Self::new(id, desc.phys_base, desc.size_bits, desc.is_device())
    }

    /// Total size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u64 {
        1 << self.size_bits
    }

    /// Check whether an object of size class `size_bits` fits in this grant.
    #[inline]
    #[must_use]
    pub const fn fits(&self, size_bits: u8) -> bool {
        self.size_bits >= size_bits
    }

    /// Check whether kernel objects may be built from this grant.
    ///
    /// Device memory can only back device frames, never kernel objects.
    #[inline]
    #[must_use]
    pub const fn backs_kernel_objects(&self) -> bool {
        !self.is_device
    }
}
