//! Object constructor (retype)
//!
//! Converts untyped grants into typed kernel objects. This mirrors the
//! kernel's retype operation, restricted to the one-shot use a bootstrapping
//! process makes of it:
//!
//! - Grants are scanned in ascending id order and the **first** grant whose
//!   size class is at least the requirement is chosen (first-fit, not
//!   best-fit)
//! - Device grants and retired grants are skipped
//! - The chosen grant is retired; it backs exactly one object
//!
//! A request smaller than the class's own minimum size is raised to it.
//!
//! # Validation order
//!
//! The destination slot and the chosen grant (which must still hold its
//! untyped capability) are checked before the grant is retired, so a failed
//! `construct` changes nothing.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;

use hatch_cap::objects::{
    CNodeObj, CapObjectType, Grant, SchedContext, SchedContextObject, TCB, TcbObject, VSpace,
};
use hatch_cap::{CPtr, Cap};

use crate::directory::ResourceDirectory;
use crate::error::{BootError, BootResult};
use crate::object_table::{KernelObject, ObjectTable};

/// Object classes that can be built from untyped memory.
pub trait Constructible: CapObjectType {
    /// Fresh object metadata for an object of size class `size_bits`.
    fn fresh(size_bits: u8) -> KernelObject;
}

impl Constructible for TCB {
    fn fresh(_size_bits: u8) -> KernelObject {
        KernelObject::Tcb(TcbObject::new())
    }
}

impl Constructible for SchedContext {
    fn fresh(size_bits: u8) -> KernelObject {
        KernelObject::SchedContext(SchedContextObject::new(size_bits))
    }
}

impl Constructible for CNodeObj {
    fn fresh(size_bits: u8) -> KernelObject {
        // 16-byte slots
        KernelObject::CNode {
            radix: size_bits.saturating_sub(4),
        }
    }
}

impl Constructible for VSpace {
    fn fresh(_size_bits: u8) -> KernelObject {
        KernelObject::VSpace
    }
}

/// Retypes grants from a resource directory.
#[derive(Debug)]
pub struct ObjectConstructor<'d> {
    directory: &'d ResourceDirectory,
    /// Parallel to `directory.grants()`.
    retired: Vec<bool>,
}

impl<'d> ObjectConstructor<'d> {
    /// Create a constructor with every grant of `directory` available.
    #[must_use]
    pub fn new(directory: &'d ResourceDirectory) -> Self {
        Self {
            directory,
            retired: vec![false; directory.grants().len()],
        }
    }

    /// The directory grants come from.
    #[inline]
    #[must_use]
    pub const fn directory(&self) -> &'d ResourceDirectory {
        self.directory
    }

    fn find_index(&self, size_bits: u8) -> Option<usize> {
        self.directory
            .grants()
            .iter()
            .zip(&self.retired)
            .position(|(grant, &retired)| {
                !retired && grant.backs_kernel_objects() && grant.fits(size_bits)
            })
    }

    /// The grant `construct` would pick for size class `size_bits`, without retiring it.
    #[must_use]
    pub fn find_grant(&self, size_bits: u8) -> Option<&'d Grant> {
        let grants = self.directory.grants();
        self.find_index(size_bits).map(|idx| &grants[idx])
    }

    /// Check whether the grant `id` has been converted.
    ///
    /// Unknown ids report `false`.
    #[must_use]
    pub fn is_retired(&self, id: CPtr) -> bool {
        self.directory
            .grants()
            .iter()
            .position(|g| g.id == id)
            .is_some_and(|idx| self.retired[idx])
    }

    /// Grants that may still back a kernel object, in scan order.
    pub fn available(&self) -> impl Iterator<Item = &'d Grant> + '_ {
        self.directory
            .grants()
            .iter()
            .zip(&self.retired)
            .filter(|(grant, retired)| !**retired && grant.backs_kernel_objects())
            .map(|(grant, _)| grant)
    }

    /// Convert the first grant of size class at least `size_bits` into a
    /// `T` whose capability lands in `slot`.
    pub fn construct<T: Constructible>(
        &mut self,
        objects: &mut ObjectTable,
        size_bits: u8,
        slot: CPtr,
    ) -> BootResult<Cap<T>> {
        let size_bits = size_bits.max(T::SIZE_BITS);

        objects.ensure_free(slot)?;
        let idx = self
            .find_index(size_bits)
            .ok_or(BootError::NoSuitableGrant {
                class: T::OBJECT_TYPE,
                size_bits,
            })?;
        let grant = &self.directory.grants()[idx];
        objects.untyped(grant.id)?;

        objects.insert(slot, T::fresh(size_bits))?;
        self.retired[idx] = true;

        log::debug!(
            "Retyped untyped {} (2^{} bytes) into {} at slot {}",
            grant.id,
            grant.size_bits,
            T::NAME,
            slot
        );

        Ok(Cap::from_cptr(slot))
    }
}

#[cfg(test)]
mod tests {
    use hatch_cap::objects::RunState;
    use hatch_cap::{ObjectType, SlotRange};
    use hatch_common::PhysAddr;

    use super::*;
    use crate::directory::sample_directory;

    fn slot(n: u64) -> CPtr {
        CPtr::from_raw(n)
    }

    #[test]
    fn test_first_fit_skips_retired() {
        let dir = sample_directory();
        let mut objects = ObjectTable::seeded(&dir);
        let mut ctor = ObjectConstructor::new(&dir);

        let tcb: Cap<TCB> = ctor.construct(&mut objects, 12, slot(100)).unwrap();
        assert_eq!(tcb.cptr(), slot(100));
        assert!(ctor.is_retired(slot(20)));
        assert!(!ctor.is_retired(slot(21)));
        assert_eq!(
            objects.tcb(slot(100)).map(|t| t.state),
            Ok(RunState::Unconfigured)
        );

        // 4 KB grant is gone; the 4 KB request now lands in the 64 KB grant
        let sc: Cap<SchedContext> = ctor.construct(&mut objects, 12, slot(101)).unwrap();
        assert!(ctor.is_retired(slot(21)));
        assert_eq!(objects.sched_context(sc.cptr()).map(|s| s.size_bits), Ok(12));

        // Only the device grant remains, which never backs kernel objects
        assert_eq!(ctor.available().count(), 0);
        assert_eq!(
            ctor.construct::<TCB>(&mut objects, 4, slot(102)),
            Err(BootError::NoSuitableGrant {
                class: ObjectType::TCB,
                size_bits: TcbObject::SIZE_BITS
            })
        );
    }

    #[test]
    fn test_first_fit_for_every_requirement() {
        let sizes = [12u8, 9, 16, 14, 20, 12];
        let grants = sizes
            .iter()
            .enumerate()
            .map(|(i, &bits)| Grant::new(slot(20 + i as u64), PhysAddr::new(0), bits, false))
            .collect();
        let dir = ResourceDirectory::new(
            grants,
            SlotRange::new(slot(100), slot(200)),
            SlotRange::new(slot(30), slot(31)),
            0,
        );

        for req in 0..=22u8 {
            let ctor = ObjectConstructor::new(&dir);
            let expected = dir.grants().iter().find(|g| g.size_bits >= req).map(|g| g.id);
            assert_eq!(ctor.find_grant(req).map(|g| g.id), expected, "req {req}");
        }

        // Drain by repeated construction: each pick is the first unretired fit
        let mut objects = ObjectTable::seeded(&dir);
        let mut ctor = ObjectConstructor::new(&dir);
        let mut next = 100;
        while let Some(expected) = ctor.find_grant(12).map(|g| g.id) {
            ctor.construct::<VSpace>(&mut objects, 12, slot(next)).unwrap();
            assert!(ctor.is_retired(expected));
            next += 1;
        }
        // 12, 16, 14, 20, 12 bits; the 9-bit grant is too small
        assert_eq!(next, 105);
        assert_eq!(ctor.available().map(|g| g.size_bits).collect::<Vec<_>>(), [9]);
    }

    #[test]
    fn test_occupied_slot_keeps_grant() {
        let dir = sample_directory();
        let mut objects = ObjectTable::seeded(&dir);
        let mut ctor = ObjectConstructor::new(&dir);

        assert_eq!(
            ctor.construct::<TCB>(&mut objects, 12, slot(2)),
            Err(BootError::SlotOccupied {
                slot: slot(2),
                found: ObjectType::CNode
            })
        );
        assert!(!ctor.is_retired(slot(20)));
        assert_eq!(ctor.available().count(), 2);

        // Grant slots hold their untyped capability
        assert_eq!(
            ctor.construct::<TCB>(&mut objects, 12, slot(21)),
            Err(BootError::SlotOccupied {
                slot: slot(21),
                found: ObjectType::Untyped
            })
        );
        assert!(!ctor.is_retired(slot(20)));
    }

    #[test]
    fn test_grant_without_untyped_cap() {
        // The grant's slot is the root CNode, so it was never seeded as untyped
        let dir = ResourceDirectory::new(
            alloc::vec![Grant::new(slot(2), PhysAddr::new(0x4000_0000), 12, false)],
            SlotRange::new(slot(100), slot(110)),
            SlotRange::new(slot(30), slot(31)),
            0,
        );
        let mut objects = ObjectTable::seeded(&dir);
        let mut ctor = ObjectConstructor::new(&dir);

        assert_eq!(
            ctor.construct::<TCB>(&mut objects, 12, slot(100)),
            Err(BootError::InvalidHandle {
                slot: slot(2),
                expected: ObjectType::Untyped,
                found: ObjectType::CNode
            })
        );
        assert!(!ctor.is_retired(slot(2)));
        assert_eq!(objects.object_type(slot(100)), ObjectType::Empty);
    }

    #[test]
    fn test_no_grant_keeps_slot_free() {
        let dir = sample_directory();
        let mut objects = ObjectTable::seeded(&dir);
        let mut ctor = ObjectConstructor::new(&dir);

        assert!(matches!(
            ctor.construct::<SchedContext>(&mut objects, 17, slot(100)),
            Err(BootError::NoSuitableGrant { size_bits: 17, .. })
        ));
        assert_eq!(objects.object_type(slot(100)), ObjectType::Empty);
    }

    #[test]
    fn test_request_raised_to_class_minimum() {
        let dir = sample_directory();
        let mut objects = ObjectTable::seeded(&dir);
        let mut ctor = ObjectConstructor::new(&dir);

        let sc: Cap<SchedContext> = ctor.construct(&mut objects, 0, slot(100)).unwrap();
        assert_eq!(
            objects.sched_context(sc.cptr()).map(|s| s.size_bits),
            Ok(SchedContextObject::MIN_SIZE_BITS)
        );
    }
}
