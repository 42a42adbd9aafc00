//! Hatch Capability Vocabulary
//!
//! This crate provides the capability primitives used while bootstrapping a
//! new thread of execution, following seL4's capability model.
//!
//! # Overview
//!
//! A **capability** is an unforgeable token naming a kernel object. A process
//! refers to its capabilities by slot index ([`CPtr`]) in its capability
//! space. Fresh kernel objects are made by *retyping* untyped memory: an
//! irreversible conversion that consumes the memory and places a capability
//! to the new object in a chosen empty slot.
//!
//! # Core Types
//!
//! - [`CPtr`]: Capability pointer (slot index in the root CNode)
//! - [`SlotRange`]: Half-open range of slots
//! - [`ObjectType`]: Runtime class tag of a kernel object
//! - [`Cap`]: Type-safe capability handle
//!
//! # Object Types
//!
//! | Category | Types |
//! |----------|-------|
//! | Memory | [`Untyped`], [`VSpace`] |
//! | Execution | [`CNodeObj`], [`TCB`] |
//! | Scheduling | [`SchedContext`], [`SchedControl`] |
//!
//! [`Untyped`]: objects::Untyped
//! [`VSpace`]: objects::VSpace
//! [`CNodeObj`]: objects::CNodeObj
//! [`TCB`]: objects::TCB
//! [`SchedContext`]: objects::SchedContext
//! [`SchedControl`]: objects::SchedControl
//!
//! Object metadata (what the kernel stores per object) lives next to the
//! marker types: [`objects::Grant`], [`objects::TcbObject`],
//! [`objects::SchedContextObject`], [`objects::SchedControlObject`].

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

mod cap;
mod cptr;
mod object_type;
pub mod objects;
pub mod root_slots;

pub use cap::Cap;
pub use cptr::{CPtr, SlotRange};
pub use object_type::ObjectType;
pub use objects::CapObjectType;
