//! Thread Control Block capability
//!
//! A TCB (Thread Control Block) represents a thread of execution.
//! It contains the thread's register context, scheduling binding,
//! and references to associated capabilities.
//!
//! # Lifecycle
//!
//! ```text
//! Unconfigured --configure--> Configured --resume--> Runnable
//!                              |      ^
//!                              +------+
//!                           load_registers
//! ```
//!
//! A freshly retyped TCB is `Unconfigured` with an all-zero register file.
//! Once `Runnable`, further lifecycle (suspension, destruction) belongs to
//! the scheduler.

use core::fmt;

use hatch_common::VirtAddr;

use crate::CPtr;

/// Thread run state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum RunState {
    /// Freshly created, no CSpace/VSpace/scheduling context yet.
    #[default]
    Unconfigured = 0,
    /// Wired to its resources, may receive registers, not yet running.
    Configured = 1,
    /// Handed to the scheduler.
    Runnable = 2,
}

impl RunState {
    /// Get a short name for the state.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Configured => "configured",
            Self::Runnable => "runnable",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Thread priority.
///
/// Higher values mean higher priority.
pub type Priority = u8;

/// Maximum priority value.
pub const MAX_PRIORITY: Priority = 255;

/// Number of general purpose registers in the saved context.
pub const NUM_GPRS: usize = 31;

/// Saved user register file.
///
/// Only `pc` and `sp` are written during bootstrap; everything else keeps the
/// all-zero value the TCB was created with.
#[derive(Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct UserContext {
    /// Instruction pointer.
    pub pc: u64,
    /// Stack pointer.
    pub sp: u64,
    /// Saved program status (zero selects user mode, interrupts unmasked).
    pub spsr: u64,
    /// Thread-local storage base.
    pub tls_base: u64,
    /// General purpose registers x0-x30.
    pub gpr: [u64; NUM_GPRS],
}

impl UserContext {
    /// An all-zero register file.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pc: 0,
            sp: 0,
            spsr: 0,
            tls_base: 0,
            gpr: [0; NUM_GPRS],
        }
    }

    /// Instruction pointer as an address.
    #[inline]
    #[must_use]
    pub const fn instruction_pointer(&self) -> VirtAddr {
        VirtAddr::new(self.pc)
    }

    /// Stack pointer as an address.
    #[inline]
    #[must_use]
    pub const fn stack_pointer(&self) -> VirtAddr {
        VirtAddr::new(self.sp)
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self::new()
    }
}

/// TCB object metadata.
///
/// Stored in the kernel's object table.
#[derive(Clone, Debug)]
pub struct TcbObject {
    /// Current run state.
    pub state: RunState,
    /// Thread priority.
    pub priority: Priority,
    /// CSpace root capability.
    pub cspace_root: CPtr,
    /// VSpace (address space) capability.
    pub vspace_root: CPtr,
    /// Scheduling context (CPU time budget).
    pub sched_context: CPtr,
    /// Whether the initial pc/sp have been written.
    pub registers_loaded: bool,
    /// Saved register file.
    pub context: UserContext,
    /// Thread name (for debugging).
    pub name: [u8; 16],
}

impl TcbObject {
    /// TCB size class: 1 KB, the register context dominates.
    pub const SIZE_BITS: u8 = 10;

    /// Create a new, unconfigured TCB object.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: RunState::Unconfigured,
            priority: 0,
            cspace_root: CPtr::NULL,
            vspace_root: CPtr::NULL,
            sched_context: CPtr::NULL,
            registers_loaded: false,
            context: UserContext::new(),
            name: [0; 16],
        }
    }

    /// Check if the thread has been handed to the scheduler.
    #[inline]
    #[must_use]
    pub const fn is_runnable(&self) -> bool {
        matches!(self.state, RunState::Runnable)
    }

    /// Wire the thread to its resources and move it to `Configured`.
    pub fn bind(&mut self, cspace_root: CPtr, vspace_root: CPtr, sched_context: CPtr) {
        self.cspace_root = cspace_root;
        self.vspace_root = vspace_root;
        self.sched_context = sched_context;
        self.state = RunState::Configured;
    }

    /// Write the instruction and stack pointer, leaving every other register alone.
    pub fn write_entry(&mut self, pc: VirtAddr, sp: VirtAddr) {
        self.context.pc = pc.as_u64();
        self.context.sp = sp.as_u64();
        self.registers_loaded = true;
    }

    /// Set the thread name.
    pub fn set_name(&mut self, name: &[u8]) {
        let len = name.len().min(self.name.len());
        self.name[..len].copy_from_slice(&name[..len]);
        if len < self.name.len() {
            self.name[len..].fill(0);
        }
    }

    /// The thread name up to the first NUL.
    #[must_use]
    pub fn name(&self) -> &str {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        core::str::from_utf8(&self.name[..len]).unwrap_or("<invalid>")
    }
}

impl Default for TcbObject {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcb_creation() {
        let tcb = TcbObject::new();
        assert_eq!(tcb.state, RunState::Unconfigured);
        assert!(tcb.cspace_root.is_null());
        assert!(!tcb.registers_loaded);
        assert_eq!(tcb.context, UserContext::new());
    }

    #[test]
    fn test_bind_and_write_entry() {
        let mut tcb = TcbObject::new();
        tcb.bind(CPtr::from_raw(2), CPtr::from_raw(3), CPtr::from_raw(101));
        assert_eq!(tcb.state, RunState::Configured);
        assert_eq!(tcb.vspace_root, CPtr::from_raw(3));

        tcb.write_entry(VirtAddr::new(0x40_1000), VirtAddr::new(0x7fff_0000));
        assert!(tcb.registers_loaded);
        assert_eq!(tcb.context.instruction_pointer(), VirtAddr::new(0x40_1000));
        assert_eq!(tcb.context.stack_pointer(), VirtAddr::new(0x7fff_0000));
        assert_eq!(tcb.context.spsr, 0);
        assert!(tcb.context.gpr.iter().all(|&r| r == 0));
    }

    #[test]
    fn test_thread_name() {
        let mut tcb = TcbObject::new();
        tcb.set_name(b"hello-2: thread_2");
        assert_eq!(tcb.name(), "hello-2: thread_");

        tcb.set_name(b"short");
        assert_eq!(tcb.name(), "short");
    }
}
