//! Kernel object table
//!
//! Models the kernel side of the process's capability space: which slot
//! holds a capability to which object, and the object's metadata. Handles
//! are plain slot numbers, so every use goes through a typed lookup that
//! checks the slot holds an object of the expected class.
//!
//! # Design
//!
//! - Slot 0 is never occupied (null capability)
//! - Objects are keyed by the slot holding their capability
//! - Inserting into an occupied slot is refused

extern crate alloc;

use alloc::collections::BTreeMap;

use hatch_cap::objects::{
    Grant, NodeId, RunState, SchedContextObject, SchedControlObject, TcbObject,
};
use hatch_cap::{CPtr, ObjectType};

use crate::directory::ResourceDirectory;
use crate::error::{BootError, BootResult};

/// Root CNode radix used when the table is seeded.
const ROOT_CNODE_RADIX: u8 = 12;

/// Metadata for one kernel object.
#[derive(Clone, Debug)]
pub enum KernelObject {
    /// Untyped memory grant.
    Untyped(Grant),
    /// Capability node.
    CNode {
        /// Number of slots (log2).
        radix: u8,
    },
    /// Virtual address space.
    VSpace,
    /// Thread control block.
    Tcb(TcbObject),
    /// Scheduling context.
    SchedContext(SchedContextObject),
    /// Scheduling control for one node.
    SchedControl(SchedControlObject),
}

impl KernelObject {
    /// Class tag of the object.
    #[must_use]
    pub const fn object_type(&self) -> ObjectType {
        match self {
            Self::Untyped(_) => ObjectType::Untyped,
            Self::CNode { .. } => ObjectType::CNode,
            Self::VSpace => ObjectType::VSpace,
            Self::Tcb(_) => ObjectType::TCB,
            Self::SchedContext(_) => ObjectType::SchedContext,
            Self::SchedControl(_) => ObjectType::SchedControl,
        }
    }
}

/// Slot-indexed store of kernel objects.
#[derive(Clone, Debug, Default)]
pub struct ObjectTable {
    objects: BTreeMap<CPtr, KernelObject>,
}

impl ObjectTable {
    /// Create an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
        }
    }

    /// Create a table holding the objects every process starts with.
    ///
    /// The root CNode, root VSpace, the process's own (running) thread, one
    /// untyped capability per grant, and one scheduling control per slot of
    /// the directory's control range. A grant or control whose slot is
    /// already taken is left out.
    #[must_use]
    pub fn seeded(directory: &ResourceDirectory) -> Self {
        let mut table = Self::new();

        table.objects.insert(
            directory.cspace_root(),
            KernelObject::CNode {
                radix: ROOT_CNODE_RADIX,
            },
        );
        table
            .objects
            .insert(directory.vspace_root(), KernelObject::VSpace);

        let mut root = TcbObject::new();
        root.bind(directory.cspace_root(), directory.vspace_root(), CPtr::NULL);
        root.state = RunState::Runnable;
        root.set_name(b"root");
        table.objects.insert(directory.root_tcb(), KernelObject::Tcb(root));

        for grant in directory.grants() {
            if let Err(e) = table.insert(grant.id, KernelObject::Untyped(*grant)) {
                log::warn!("Untyped {} not seeded: {}", grant.id, e);
            }
        }

        let controls = directory.sched_control_range();
        for node in 0..=NodeId::MAX {
            let Some(slot) = controls.nth(u64::from(node)) else {
                break;
            };
            let control = KernelObject::SchedControl(SchedControlObject::new(node));
            if let Err(e) = table.insert(slot, control) {
                log::warn!("Scheduling control for node {} not seeded: {}", node, e);
            }
        }

        log::debug!("Seeded object table with {} root objects", table.len());
        table
    }

    /// Number of occupied slots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if no slot is occupied.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Class of the object in `slot` (`Empty` if none).
    #[must_use]
    pub fn object_type(&self, slot: CPtr) -> ObjectType {
        self.objects
            .get(&slot)
            .map_or(ObjectType::Empty, KernelObject::object_type)
    }

    /// Fail unless `slot` is free to receive a new capability.
    pub fn ensure_free(&self, slot: CPtr) -> BootResult<()> {
        if slot.is_null() {
            return Err(BootError::SlotOccupied {
                slot,
                found: ObjectType::Empty,
            });
        }
        match self.objects.get(&slot) {
            Some(obj) => Err(BootError::SlotOccupied {
                slot,
                found: obj.object_type(),
            }),
            None => Ok(()),
        }
    }

    /// Place `object` in the free slot `slot`.
    pub fn insert(&mut self, slot: CPtr, object: KernelObject) -> BootResult<()> {
        self.ensure_free(slot)?;
        self.objects.insert(slot, object);
        Ok(())
    }

    /// Look up any object.
    #[must_use]
    pub fn get(&self, slot: CPtr) -> Option<&KernelObject> {
        self.objects.get(&slot)
    }

    fn mismatch(&self, slot: CPtr, expected: ObjectType) -> BootError {
        BootError::InvalidHandle {
            slot,
            expected,
            found: self.object_type(slot),
        }
    }

    /// Look up an untyped grant.
    pub fn untyped(&self, slot: CPtr) -> BootResult<&Grant> {
        match self.objects.get(&slot) {
            Some(KernelObject::Untyped(grant)) => Ok(grant),
            _ => Err(self.mismatch(slot, ObjectType::Untyped)),
        }
    }

    /// Check that `slot` holds a CNode.
    pub fn cnode(&self, slot: CPtr) -> BootResult<u8> {
        match self.objects.get(&slot) {
            Some(KernelObject::CNode { radix }) => Ok(*radix),
            _ => Err(self.mismatch(slot, ObjectType::CNode)),
        }
    }

    /// Check that `slot` holds a VSpace.
    pub fn vspace(&self, slot: CPtr) -> BootResult<()> {
        match self.objects.get(&slot) {
            Some(KernelObject::VSpace) => Ok(()),
            _ => Err(self.mismatch(slot, ObjectType::VSpace)),
        }
    }

    /// Look up a TCB.
    pub fn tcb(&self, slot: CPtr) -> BootResult<&TcbObject> {
        match self.objects.get(&slot) {
            Some(KernelObject::Tcb(tcb)) => Ok(tcb),
            _ => Err(self.mismatch(slot, ObjectType::TCB)),
        }
    }

    /// Look up a TCB for modification.
    pub fn tcb_mut(&mut self, slot: CPtr) -> BootResult<&mut TcbObject> {
        let found = self.object_type(slot);
        match self.objects.get_mut(&slot) {
            Some(KernelObject::Tcb(tcb)) => Ok(tcb),
            _ => Err(BootError::InvalidHandle {
                slot,
                expected: ObjectType::TCB,
                found,
            }),
        }
    }

    /// Look up a scheduling context.
    pub fn sched_context(&self, slot: CPtr) -> BootResult<&SchedContextObject> {
        match self.objects.get(&slot) {
            Some(KernelObject::SchedContext(sc)) => Ok(sc),
            _ => Err(self.mismatch(slot, ObjectType::SchedContext)),
        }
    }

    /// Look up a scheduling context for modification.
    pub fn sched_context_mut(&mut self, slot: CPtr) -> BootResult<&mut SchedContextObject> {
        let found = self.object_type(slot);
        match self.objects.get_mut(&slot) {
            Some(KernelObject::SchedContext(sc)) => Ok(sc),
            _ => Err(BootError::InvalidHandle {
                slot,
                expected: ObjectType::SchedContext,
                found,
            }),
        }
    }

    /// Look up a scheduling control.
    pub fn sched_control(&self, slot: CPtr) -> BootResult<&SchedControlObject> {
        match self.objects.get(&slot) {
            Some(KernelObject::SchedControl(ctrl)) => Ok(ctrl),
            _ => Err(self.mismatch(slot, ObjectType::SchedControl)),
        }
    }

    /// Look up a scheduling control for modification.
    pub fn sched_control_mut(&mut self, slot: CPtr) -> BootResult<&mut SchedControlObject> {
        let found = self.object_type(slot);
        match self.objects.get_mut(&slot) {
            Some(KernelObject::SchedControl(ctrl)) => Ok(ctrl),
            _ => Err(BootError::InvalidHandle {
                slot,
                expected: ObjectType::SchedControl,
                found,
            }),
        }
    }
}
