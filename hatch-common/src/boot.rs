//! Startup handoff protocol
//!
//! The environment hands every freshly started process a `BootInfo` block
//! describing what it owns:
//!
//! - Untyped memory grants, each held in a capability slot of the
//!   `untyped` region and described by the matching [`UntypedDesc`]
//! - The `empty` region of unused capability slots
//! - The `sched_control` region, one scheduling-control capability per
//!   execution node, and the node the process runs on
//!
//! The block is plain data. Interpreting it (first-fit search, slot
//! allocation) is the job of `hatch-boot`.

use crate::addr::PhysAddr;

/// Magic number for validation: "HATCHBI\0" as little-endian u64.
pub const BOOT_INFO_MAGIC: u64 = 0x00_49_42_48_43_54_41_48;

/// Version of the BootInfo structure.
pub const BOOT_INFO_VERSION: u32 = 1;

/// Maximum number of untyped memory grants in one handoff.
pub const MAX_UNTYPED_REGIONS: usize = 64;

/// A half-open range of capability slot indices (`start..end`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct SlotRegion {
    /// First slot in the region.
    pub start: u64,
    /// One past the last slot in the region.
    pub end: u64,
}

impl SlotRegion {
    /// Create a slot region.
    #[inline]
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of slots in the region.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Check if the region holds no slots.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Description of one untyped memory grant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct UntypedDesc {
    /// Physical base address of the region.
    pub phys_base: PhysAddr,
    /// Size of the region as log2 bytes.
    pub size_bits: u8,
    /// Whether the region is device memory (1) or normal RAM (0).
    pub is_device: u8,
    _pad: [u8; 6],
}

impl UntypedDesc {
    /// Describe an untyped region.
    #[inline]
    #[must_use]
    pub const fn new(phys_base: PhysAddr, size_bits: u8, is_device: bool) -> Self {
        Self {
            phys_base,
            size_bits,
            is_device: is_device as u8,
            _pad: [0; 6],
        }
    }

    /// Size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u64 {
        1u64 << self.size_bits
    }

    /// Check if the region is device memory.
    #[inline]
    #[must_use]
    pub const fn is_device(&self) -> bool {
        self.is_device != 0
    }
}

/// Startup handoff block.
#[repr(C)]
#[derive(Debug, Clone)]
pub struct BootInfo {
    /// Magic number for validation ([`BOOT_INFO_MAGIC`]).
    pub magic: u64,
    /// Version of this structure ([`BOOT_INFO_VERSION`]).
    pub version: u32,
    /// Execution node the receiving process runs on.
    pub node_id: u32,
    /// Number of execution nodes.
    pub num_nodes: u32,
    /// Number of slots in the root CNode (log2).
    pub cnode_radix: u32,
    /// Slots holding untyped capabilities, indexed in step with `untyped_list`.
    pub untyped: SlotRegion,
    /// Unused slots in the root CNode.
    pub empty: SlotRegion,
    /// Scheduling-control capabilities, one per node.
    pub sched_control: SlotRegion,
    /// Untyped descriptions; only the first `untyped.len()` entries are valid.
    pub untyped_list: [UntypedDesc; MAX_UNTYPED_REGIONS],
}

impl BootInfo {
    /// Create a handoff block with no untyped grants.
    ///
    /// Untyped capabilities will be numbered from `first_untyped`.
    #[must_use]
    pub const fn new(node_id: u32, num_nodes: u32, first_untyped: u64) -> Self {
        Self {
            magic: BOOT_INFO_MAGIC,
            version: BOOT_INFO_VERSION,
            node_id,
            num_nodes,
            cnode_radix: 12,
            untyped: SlotRegion::new(first_untyped, first_untyped),
            empty: SlotRegion::new(0, 0),
            sched_control: SlotRegion::new(0, 0),
            untyped_list: [UntypedDesc::new(PhysAddr::new(0), 0, false); MAX_UNTYPED_REGIONS],
        }
    }

    /// Check if the boot info is valid.
    ///
    /// Checks the header, the untyped count, the CNode radix, and that there
    /// is at most one scheduling control per node.
    #[inline]
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.magic == BOOT_INFO_MAGIC
            && self.version == BOOT_INFO_VERSION
            && self.untyped.len() as usize <= MAX_UNTYPED_REGIONS
            && self.cnode_radix < u64::BITS
            && self.sched_control.len() <= self.num_nodes as u64
    }

    /// Append an untyped grant, returning the slot that holds it.
    ///
    /// Returns `None` when the handoff is full.
    pub fn push_untyped(&mut self, desc: UntypedDesc) -> Option<u64> {
        let idx = self.untyped_count();
        if idx >= MAX_UNTYPED_REGIONS {
            return None;
        }
        self.untyped_list[idx] = desc;
        let slot = self.untyped.end;
        self.untyped.end += 1;
        Some(slot)
    }

    /// Number of untyped grants.
    #[inline]
    #[must_use]
    pub const fn untyped_count(&self) -> usize {
        self.untyped.len() as usize
    }

    /// Valid untyped descriptions, in slot order.
    #[inline]
    #[must_use]
    pub fn untyped_descs(&self) -> &[UntypedDesc] {
        &self.untyped_list[..self.untyped_count().min(MAX_UNTYPED_REGIONS)]
    }

    /// Get the slot index for a given untyped index.
    #[inline]
    #[must_use]
    pub const fn untyped_slot(&self, idx: usize) -> u64 {
        self.untyped.start + idx as u64
    }

    /// Get the number of slots in the root CNode.
    ///
    /// Zero if the radix does not fit a word.
    #[inline]
    #[must_use]
    pub const fn cnode_slots(&self) -> u64 {
        match 1u64.checked_shl(self.cnode_radix) {
            Some(slots) => slots,
            None => 0,
        }
    }
}
