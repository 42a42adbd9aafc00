//! Resource directory
//!
//! Read-only view over what the environment handed the process at start:
//! untyped memory grants (in ascending slot order), the range of empty
//! capability slots, and the per-node scheduling-control slots.
//!
//! The directory is built once, from the startup handoff or directly, and is
//! passed by reference to the components that need it. It has no mutation
//! API; retirement of grants and consumption of slots are tracked by the
//! object constructor and the slot allocator.

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;

use hatch_cap::objects::{Grant, NodeId};
use hatch_cap::root_slots::Slot;
use hatch_cap::{CPtr, SlotRange};
use hatch_common::boot::BootInfo;

use crate::error::{BootError, BootResult};

/// The resources handed to the process at start.
#[derive(Clone, Debug)]
pub struct ResourceDirectory {
    grants: Vec<Grant>,
    empty: SlotRange,
    sched_control: SlotRange,
    node_id: NodeId,
}

impl ResourceDirectory {
    /// Build a directory from its parts.
    ///
    /// Grants are sorted by ascending id.
    #[must_use]
    pub fn new(
        mut grants: Vec<Grant>,
        empty: SlotRange,
        sched_control: SlotRange,
        node_id: NodeId,
    ) -> Self {
        grants.sort_by_key(|g| g.id);
        Self {
            grants,
            empty,
            sched_control,
            node_id,
        }
    }

    /// Build a directory from the startup handoff block.
    ///
    /// # Errors
    ///
    /// `InvalidBootInfo` if the block fails its own validation, a grant is
    /// larger than [`Grant::MAX_SIZE_BITS`], or the empty range shares a slot
    /// with the root slots, the untyped range or the scheduling controls.
    pub fn from_boot_info(info: &BootInfo) -> BootResult<Self> {
        if !info.is_valid() {
            return Err(BootError::InvalidBootInfo);
        }
        if let Some(desc) = info
            .untyped_descs()
            .iter()
            .find(|d| d.size_bits > Grant::MAX_SIZE_BITS)
        {
            log::error!("Untyped at {} claims 2^{} bytes", desc.phys_base, desc.size_bits);
            return Err(BootError::InvalidBootInfo);
        }

        let empty = SlotRange::from(info.empty);
        let sched_control = SlotRange::from(info.sched_control);
        let reserved = SlotRange::new(Slot::Null.cptr(), Slot::RootVSpace.cptr().next());
        for taken in [reserved, SlotRange::from(info.untyped), sched_control] {
            if empty.overlaps(&taken) {
                log::error!("Empty slots {} overlap {}", empty, taken);
                return Err(BootError::InvalidBootInfo);
            }
        }

        let grants = info
            .untyped_descs()
            .iter()
            .enumerate()
            .map(|(idx, desc)| Grant::from_desc(CPtr::from_raw(info.untyped_slot(idx)), desc))
            .collect();

        Ok(Self::new(grants, empty, sched_control, info.node_id))
    }

    /// Grants in ascending id order.
    #[inline]
    #[must_use]
    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }

    /// Look up a grant by id.
    #[must_use]
    pub fn grant(&self, id: CPtr) -> Option<&Grant> {
        self.grants
            .binary_search_by_key(&id, |g| g.id)
            .ok()
            .map(|idx| &self.grants[idx])
    }

    /// The range of empty capability slots.
    #[inline]
    #[must_use]
    pub const fn empty(&self) -> SlotRange {
        self.empty
    }

    /// Node the process runs on.
    #[inline]
    #[must_use]
    pub const fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The scheduling-control slots, one per node.
    #[inline]
    #[must_use]
    pub const fn sched_control_range(&self) -> SlotRange {
        self.sched_control
    }

    /// Slot of the scheduling control for `node`, if the environment handed one over.
    #[must_use]
    pub const fn sched_control(&self, node: NodeId) -> Option<CPtr> {
        self.sched_control.nth(node as u64)
    }

    /// The process's own CSpace root.
    #[inline]
    #[must_use]
    pub const fn cspace_root(&self) -> CPtr {
        Slot::RootCNode.cptr()
    }

    /// The process's own VSpace root.
    #[inline]
    #[must_use]
    pub const fn vspace_root(&self) -> CPtr {
        Slot::RootVSpace.cptr()
    }

    /// The process's own thread.
    #[inline]
    #[must_use]
    pub const fn root_tcb(&self) -> CPtr {
        Slot::RootTcb.cptr()
    }

    /// Total bytes of untyped memory, device memory excluded.
    #[must_use]
    pub fn total_untyped_bytes(&self) -> u64 {
        self.grants
            .iter()
            .filter(|g| g.backs_kernel_objects())
            .map(Grant::size)
            .fold(0u64, u64::saturating_add)
    }

    /// Log the directory contents at debug level.
    pub fn log_summary(&self) {
        log::debug!(
            "node {}: {} grants ({} bytes usable), empty slots {}, sched control {}",
            self.node_id,
            self.grants.len(),
            self.total_untyped_bytes(),
            self.empty,
            self.sched_control
        );
        for grant in &self.grants {
            log::debug!(
                "  untyped {}: {} 2^{} bytes{}",
                grant.id,
                grant.phys_base,
                grant.size_bits,
                if grant.is_device { " (device)" } else { "" }
            );
        }
    }
}

impl fmt::Display for ResourceDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "node:          {}", self.node_id)?;
        writeln!(f, "empty:         {} ({} slots)", self.empty, self.empty.len())?;
        writeln!(f, "sched control: {}", self.sched_control)?;
        writeln!(f, "untyped:       {} grants", self.grants.len())?;
        for grant in &self.grants {
            writeln!(
                f,
                "  {:>5} | {} | 2^{:<2} | {}",
                grant.id,
                grant.phys_base,
                grant.size_bits,
                if grant.is_device { "device" } else { "ram" }
            )?;
        }
        Ok(())
    }
}

/// Directory used across this crate's tests.
///
/// Grants of 4 KB (slot 20) and 64 KB (slot 21) plus a 1 MB device grant
/// (slot 22); empty slots `[100, 110)`; one scheduling control at slot 30 for
/// node 0.
#[cfg(test)]
pub(crate) fn sample_directory() -> ResourceDirectory {
    use alloc::vec;
    use hatch_common::PhysAddr;

    ResourceDirectory::new(
        vec![
            Grant::new(CPtr::from_raw(20), PhysAddr::new(0x4000_0000), 12, false),
            Grant::new(CPtr::from_raw(21), PhysAddr::new(0x4001_0000), 16, false),
            Grant::new(CPtr::from_raw(22), PhysAddr::new(0x0900_0000), 20, true),
        ],
        SlotRange::new(CPtr::from_raw(100), CPtr::from_raw(110)),
        SlotRange::new(CPtr::from_raw(30), CPtr::from_raw(31)),
        0,
    )
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec;

    use hatch_common::PhysAddr;
    use hatch_common::boot::{SlotRegion, UntypedDesc};

    use super::*;

    #[test]
    fn test_from_boot_info() {
        let mut info = BootInfo::new(0, 1, 20);
        info.push_untyped(UntypedDesc::new(PhysAddr::new(0x4000_0000), 12, false));
        info.push_untyped(UntypedDesc::new(PhysAddr::new(0x4001_0000), 16, false));
        info.empty = SlotRegion::new(100, 110);
        info.sched_control = SlotRegion::new(30, 31);

        let dir = ResourceDirectory::from_boot_info(&info).unwrap();
        assert_eq!(dir.grants().len(), 2);
        assert_eq!(dir.grants()[0].id, CPtr::from_raw(20));
        assert_eq!(dir.grants()[1].size_bits, 16);
        assert_eq!(dir.empty().len(), 10);
        assert_eq!(dir.sched_control(0), Some(CPtr::from_raw(30)));
        assert_eq!(dir.sched_control(1), None);
    }

    #[test]
    fn test_invalid_boot_info() {
        let mut info = BootInfo::new(0, 1, 20);
        info.magic = 0;
        assert_eq!(
            ResourceDirectory::from_boot_info(&info).unwrap_err(),
            BootError::InvalidBootInfo
        );
    }

    #[test]
    fn test_oversized_grant_rejected() {
        let mut info = BootInfo::new(0, 1, 20);
        info.push_untyped(UntypedDesc::new(PhysAddr::new(0x4000_0000), 12, false));
        info.push_untyped(UntypedDesc::new(PhysAddr::new(0), 64, false));
        info.empty = SlotRegion::new(100, 110);
        assert_eq!(
            ResourceDirectory::from_boot_info(&info).unwrap_err(),
            BootError::InvalidBootInfo
        );

        info.untyped_list[1].size_bits = Grant::MAX_SIZE_BITS;
        let dir = ResourceDirectory::from_boot_info(&info).unwrap();
        assert_eq!(dir.total_untyped_bytes(), 4096 + (1 << Grant::MAX_SIZE_BITS));
    }

    #[test]
    fn test_bad_radix_or_controls_rejected() {
        let mut info = BootInfo::new(0, 1, 20);
        info.empty = SlotRegion::new(100, 110);
        info.cnode_radix = 70;
        assert!(ResourceDirectory::from_boot_info(&info).is_err());

        info.cnode_radix = 12;
        info.sched_control = SlotRegion::new(30, 32);
        assert_eq!(
            ResourceDirectory::from_boot_info(&info).unwrap_err(),
            BootError::InvalidBootInfo
        );
    }

    #[test]
    fn test_empty_overlap_rejected() {
        let mut info = BootInfo::new(0, 1, 20);
        info.push_untyped(UntypedDesc::new(PhysAddr::new(0x4000_0000), 12, false));
        info.push_untyped(UntypedDesc::new(PhysAddr::new(0x4001_0000), 16, false));
        info.sched_control = SlotRegion::new(30, 31);

        for empty in [
            SlotRegion::new(21, 30),
            SlotRegion::new(25, 35),
            SlotRegion::new(0, 10),
            SlotRegion::new(3, 4),
        ] {
            info.empty = empty;
            assert_eq!(
                ResourceDirectory::from_boot_info(&info).unwrap_err(),
                BootError::InvalidBootInfo
            );
        }

        info.empty = SlotRegion::new(4, 20);
        assert!(ResourceDirectory::from_boot_info(&info).is_ok());
    }

    #[test]
    fn test_grants_sorted() {
        let dir = ResourceDirectory::new(
            vec![
                Grant::new(CPtr::from_raw(9), PhysAddr::new(0), 12, false),
                Grant::new(CPtr::from_raw(4), PhysAddr::new(0), 14, false),
            ],
            SlotRange::new(CPtr::from_raw(100), CPtr::from_raw(101)),
            SlotRange::new(CPtr::NULL, CPtr::NULL),
            0,
        );
        assert_eq!(dir.grants()[0].id, CPtr::from_raw(4));
        assert_eq!(dir.grant(CPtr::from_raw(9)).map(|g| g.size_bits), Some(12));
        assert!(dir.grant(CPtr::from_raw(5)).is_none());
    }

    #[test]
    fn test_totals_and_roots() {
        let dir = sample_directory();
        assert_eq!(dir.total_untyped_bytes(), 4096 + 65536);
        assert_eq!(dir.cspace_root(), CPtr::from_raw(2));
        assert_eq!(dir.vspace_root(), CPtr::from_raw(3));
        assert_eq!(dir.root_tcb(), CPtr::from_raw(1));
    }

    #[test]
    fn test_display() {
        let text = sample_directory().to_string();
        assert!(text.contains("untyped:       3 grants"));
        assert!(text.contains("device"));
    }
}
