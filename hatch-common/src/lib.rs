//! # hatch-common
//!
//! Shared types for the hatch capability bootstrap crates.
//!
//! This crate defines the ABI between the environment and a freshly started
//! process:
//! - [`BootInfo`](boot::BootInfo): startup handoff describing untyped memory,
//!   free capability slots and per-node scheduling control
//! - [`PhysAddr`] / [`VirtAddr`]: address newtypes used in that handoff and in
//!   initial register state
//!
//! All handoff types use `#[repr(C)]` for a stable layout.
//!
//! # no_std
//!
//! This crate is `#![no_std]` and has zero dependencies, making it suitable
//! as a foundation crate that all other hatch crates can depend on.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod addr;
pub mod boot;

pub use addr::{PhysAddr, VirtAddr};
