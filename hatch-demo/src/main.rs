//! Create and run a new thread
//!
//! Builds a startup handoff like the one a root task receives, then
//! retypes a TCB and a scheduling context out of untyped memory, binds a
//! 10 ms round-robin slice, points the thread at `thread_2` with its own
//! stack and resumes it.

mod console;
mod host;

use std::process::ExitCode;

use hatch_boot::{Bootstrap, ResourceDirectory, SpawnConfig};
use hatch_common::boot::{BootInfo, SlotRegion, UntypedDesc};
use hatch_common::{PhysAddr, VirtAddr};
use log::LevelFilter;

use crate::host::HostDispatcher;

/// Stack size of the new thread, in words
const THREAD_2_STACK_SIZE: usize = 512;

#[repr(C, align(16))]
#[allow(dead_code)]
struct Stack([u64; THREAD_2_STACK_SIZE]);

/// Stack for the new thread
static THREAD_2_STACK: Stack = Stack([0; THREAD_2_STACK_SIZE]);

/// Function run by the new thread.
fn thread_2() {
    println!("thread_2: hallo wereld");
}

/// The handoff the environment would give us.
fn boot_info() -> BootInfo {
    let mut info = BootInfo::new(0, 1, 20);
    // UART window; never used for kernel objects
    info.push_untyped(UntypedDesc::new(PhysAddr::new(0x0900_0000), 20, true));
    info.push_untyped(UntypedDesc::new(PhysAddr::new(0x4000_0000), 12, false));
    info.push_untyped(UntypedDesc::new(PhysAddr::new(0x4001_0000), 16, false));
    info.empty = SlotRegion::new(100, info.cnode_slots());
    info.sched_control = SlotRegion::new(30, 31);
    info
}

fn stack_top() -> VirtAddr {
    let base = &raw const THREAD_2_STACK;
    VirtAddr::new(base as usize as u64).offset(size_of::<Stack>() as u64)
}

fn main() -> ExitCode {
    hatch_boot::logging::init(&console::CONSOLE, LevelFilter::Debug);

    let info = boot_info();
    let directory = match ResourceDirectory::from_boot_info(&info) {
        Ok(directory) => directory,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    print!("{directory}");
    directory.log_summary();

    let mut dispatcher = HostDispatcher::new();
    let entry = dispatcher.register(thread_2);

    let mut boot = Bootstrap::new(&directory, dispatcher);
    let root = boot.root_tcb();
    if let Err(e) = boot.set_name(&root, "hello-2") {
        log::warn!("could not name root thread: {}", e);
    }

    let config = SpawnConfig::new("hello-2: thread_2");
    if boot.spawn_thread(&config, entry, stack_top()).is_err() {
        return ExitCode::FAILURE;
    }

    println!("main: hello world");
    boot.into_dispatcher().join_all();
    ExitCode::SUCCESS
}
