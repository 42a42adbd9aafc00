//! Capability object types
//!
//! This module defines the kernel object classes a bootstrapping process
//! deals with. It uses the sealed trait pattern to prevent external
//! implementations, ensuring only kernel-defined object types exist.
//!
//! # Object Categories
//!
//! ## Memory Objects
//! - [`Untyped`]: Raw memory grant (can be retyped into other objects)
//! - [`VSpace`]: Virtual address space root
//!
//! ## Execution Objects
//! - [`CNodeObj`]: Capability storage container
//! - [`TCB`]: Thread control block
//!
//! ## Scheduling Objects
//! - [`SchedContext`]: CPU time budget authority
//! - [`SchedControl`]: Per-node authority to configure scheduling contexts

pub mod sched;
pub mod tcb;
pub mod untyped;

pub use sched::{
    Microseconds, NodeId, PolicyFault, SchedContextObject, SchedControlObject, SchedPolicy,
};
pub use tcb::{MAX_PRIORITY, NUM_GPRS, Priority, RunState, TcbObject, UserContext};
pub use untyped::Grant;

use crate::ObjectType;

/// Marker trait for capability object types.
///
/// This trait is sealed to prevent external implementations, ensuring
/// only kernel-defined object types can be used with capabilities.
///
/// # Associated Constants
///
/// - `NAME`: Human-readable name for debugging and logging
/// - `OBJECT_TYPE`: Runtime class tag
/// - `SIZE_BITS`: Default size class (log2 bytes) when retyping
pub trait CapObjectType: private::Sealed + Copy + Clone + 'static {
    /// Human-readable name for debugging and logging.
    const NAME: &'static str;

    /// Runtime class tag.
    const OBJECT_TYPE: ObjectType;

    /// Default size class used when retyping untyped memory into this type.
    const SIZE_BITS: u8;
}

/// Sealed trait module to prevent external implementations.
mod private {
    pub trait Sealed {}
}

// -- Memory Objects

/// Untyped memory capability.
///
/// Represents a raw memory grant that can be retyped, once, into a typed
/// kernel object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Untyped;

impl private::Sealed for Untyped {}
impl CapObjectType for Untyped {
    const NAME: &'static str = "Untyped";
    const OBJECT_TYPE: ObjectType = ObjectType::Untyped;
    const SIZE_BITS: u8 = Grant::MIN_SIZE_BITS;
}

/// Virtual address space capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VSpace;

impl private::Sealed for VSpace {}
impl CapObjectType for VSpace {
    const NAME: &'static str = "VSpace";
    const OBJECT_TYPE: ObjectType = ObjectType::VSpace;
    const SIZE_BITS: u8 = 12;
}

// -- Execution Objects

/// CNode (capability node) capability.
///
/// A table of capability slots. The process's root CNode is its whole
/// capability space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CNodeObj;

impl private::Sealed for CNodeObj {}
impl CapObjectType for CNodeObj {
    const NAME: &'static str = "CNode";
    const OBJECT_TYPE: ObjectType = ObjectType::CNode;
    // 16-byte slots, radix 12
    const SIZE_BITS: u8 = 16;
}

/// Thread control block capability.
///
/// Represents a thread of execution. The TCB contains the register context,
/// scheduling binding, and references to the thread's CSpace and VSpace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TCB;

impl private::Sealed for TCB {}
impl CapObjectType for TCB {
    const NAME: &'static str = "TCB";
    const OBJECT_TYPE: ObjectType = ObjectType::TCB;
    const SIZE_BITS: u8 = TcbObject::SIZE_BITS;
}

// -- Scheduling Objects

/// Scheduling context capability.
///
/// A CPU time budget (period, budget, refills) that a single thread runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SchedContext;

impl private::Sealed for SchedContext {}
impl CapObjectType for SchedContext {
    const NAME: &'static str = "SchedContext";
    const OBJECT_TYPE: ObjectType = ObjectType::SchedContext;
    const SIZE_BITS: u8 = SchedContextObject::MIN_SIZE_BITS;
}

/// Scheduling control capability.
///
/// Authority to configure scheduling contexts for one execution node. Handed
/// to the process at startup, never retyped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SchedControl;

impl private::Sealed for SchedControl {}
impl CapObjectType for SchedControl {
    const NAME: &'static str = "SchedControl";
    const OBJECT_TYPE: ObjectType = ObjectType::SchedControl;
    const SIZE_BITS: u8 = 0;
}
