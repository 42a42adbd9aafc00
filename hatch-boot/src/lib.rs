//! Hatch Thread Bootstrap
//!
//! Turns the resources a process is handed at start into a second running
//! thread, the way a seL4-style root task does it by hand.
//!
//! # Components
//!
//! Leaf first:
//!
//! - [`ResourceDirectory`]: read-only view of the untyped grants, empty
//!   slots and scheduling controls handed over at start
//! - [`SlotAllocator`]: bump allocator over the empty slots
//! - [`ObjectConstructor`]: first-fit retype of a grant into a typed object
//! - [`SchedBinder`]: binds a period/budget policy to a scheduling context
//! - [`ThreadBootstrapper`]: configure, load registers, resume
//!
//! [`Bootstrap`] holds all of them plus the [`ObjectTable`] and runs the
//! full sequence in [`Bootstrap::spawn_thread`]:
//!
//! ```text
//! ResourceDirectory ──► SlotAllocator ──► ObjectConstructor
//!                                               │
//!                         TCB, SchedContext ◄───┘
//!                                │
//!              SchedBinder ◄─────┤
//!                                ▼
//!                       ThreadBootstrapper ──► Dispatcher
//! ```
//!
//! # Errors
//!
//! Every operation returns [`BootResult`]. Resources are one-shot, so no
//! error is retried; a failed operation leaves all state as it was.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

pub mod config;
pub mod construct;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod object_table;
pub mod sched;
pub mod slots;
pub mod spawn;
pub mod thread;

pub use config::SpawnConfig;
pub use construct::{Constructible, ObjectConstructor};
pub use directory::ResourceDirectory;
pub use dispatch::{Dispatched, Dispatcher, RunQueue};
pub use error::{BootError, BootResult};
pub use object_table::{KernelObject, ObjectTable};
pub use sched::SchedBinder;
pub use slots::SlotAllocator;
pub use spawn::{Bootstrap, SpawnedThread};
pub use thread::ThreadBootstrapper;
