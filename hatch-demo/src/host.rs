//! Host-thread dispatcher
//!
//! Stands in for the kernel scheduler: a thread handed over by `resume` is
//! run on a host thread. The entry point is looked up by the instruction
//! pointer in the thread's registers, so only registered functions can run.

use std::thread::{self, JoinHandle};

use hatch_boot::Dispatcher;
use hatch_cap::CPtr;
use hatch_cap::objects::UserContext;
use hatch_common::VirtAddr;

/// A function a spawned thread may start in.
pub type Entry = fn();

/// Address a thread starts at when it runs `entry`.
pub fn entry_address(entry: Entry) -> VirtAddr {
    VirtAddr::new(entry as usize as u64)
}

/// Runs dispatched threads on host threads.
#[derive(Default)]
pub struct HostDispatcher {
    entries: Vec<(VirtAddr, Entry)>,
    running: Vec<(CPtr, JoinHandle<()>)>,
}

impl HostDispatcher {
    /// Create a dispatcher with no entry points.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow threads to start in `entry`; returns its address.
    pub fn register(&mut self, entry: Entry) -> VirtAddr {
        let addr = entry_address(entry);
        self.entries.push((addr, entry));
        addr
    }

    /// Wait for every dispatched thread to finish.
    pub fn join_all(self) {
        for (tcb, handle) in self.running {
            if handle.join().is_err() {
                log::error!("thread {} panicked", tcb);
            }
        }
    }
}

impl Dispatcher for HostDispatcher {
    fn dispatch(&mut self, tcb: CPtr, context: &UserContext) {
        let pc = context.instruction_pointer();
        let Some(&(_, entry)) = self.entries.iter().find(|(addr, _)| *addr == pc) else {
            log::error!("thread {} starts at unknown address {}, not run", tcb, pc);
            return;
        };

        match thread::Builder::new()
            .name(format!("tcb-{tcb}"))
            .spawn(entry)
        {
            Ok(handle) => self.running.push((tcb, handle)),
            Err(e) => log::error!("failed to start host thread for {}: {}", tcb, e),
        }
    }
}
