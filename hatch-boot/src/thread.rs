//! Execution context bootstrapper
//!
//! Drives a freshly constructed thread through its startup state machine:
//!
//! ```text
//! Unconfigured --configure--> Configured --resume--> Runnable
//!                              |      ^
//!                              +------+
//!                           load_registers
//! ```
//!
//! No transition may be skipped. `resume` hands the thread to the
//! [`Dispatcher`]; from then on its lifecycle belongs to the scheduler.
//!
//! Every operation checks all of its preconditions before touching the
//! object table, so a failed call leaves the thread exactly as it was.

use hatch_cap::Cap;
use hatch_cap::objects::{CNodeObj, Priority, RunState, SchedContext, TCB, VSpace};
use hatch_common::VirtAddr;

use crate::config::{MAX_THREAD_NAME, STACK_ALIGNMENT};
use crate::dispatch::Dispatcher;
use crate::error::{BootError, BootResult, ConfigureFault, ResumeFault, Transition};
use crate::object_table::ObjectTable;

/// Configures, loads and starts threads.
#[derive(Debug)]
pub struct ThreadBootstrapper<D> {
    dispatcher: D,
}

impl<D: Dispatcher> ThreadBootstrapper<D> {
    /// Create a bootstrapper that hands runnable threads to `dispatcher`.
    #[inline]
    #[must_use]
    pub const fn new(dispatcher: D) -> Self {
        Self { dispatcher }
    }

    /// The dispatcher runnable threads go to.
    #[inline]
    #[must_use]
    pub const fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Give back the dispatcher.
    #[inline]
    #[must_use]
    pub fn into_dispatcher(self) -> D {
        self.dispatcher
    }

    /// Current run state of `tcb`.
    pub fn state(&self, objects: &ObjectTable, tcb: &Cap<TCB>) -> BootResult<RunState> {
        objects.tcb(tcb.cptr()).map(|t| t.state)
    }

    /// Wire the thread to its CSpace, VSpace and scheduling context.
    ///
    /// Only allowed from `Unconfigured`. The scheduling context must not be
    /// in use by another thread.
    pub fn configure(
        &mut self,
        objects: &mut ObjectTable,
        tcb: &Cap<TCB>,
        cspace_root: &Cap<CNodeObj>,
        vspace_root: &Cap<VSpace>,
        sched_context: &Cap<SchedContext>,
    ) -> BootResult<()> {
        let from = objects.tcb(tcb.cptr())?.state;
        let fail = |fault: ConfigureFault| BootError::ConfigurationFailed {
            tcb: tcb.cptr(),
            from,
            fault,
        };

        if from != RunState::Unconfigured {
            return Err(fail(ConfigureFault::NotUnconfigured));
        }
        objects
            .cnode(cspace_root.cptr())
            .map_err(|_| fail(ConfigureFault::InvalidCSpace))?;
        objects
            .vspace(vspace_root.cptr())
            .map_err(|_| fail(ConfigureFault::InvalidVSpace))?;
        let sc = objects
            .sched_context(sched_context.cptr())
            .map_err(|_| fail(ConfigureFault::InvalidSchedContext))?;
        if sc.is_associated() {
            return Err(fail(ConfigureFault::SchedContextInUse {
                owner: sc.bound_tcb,
            }));
        }

        objects.sched_context_mut(sched_context.cptr())?.bound_tcb = tcb.cptr();
        objects.tcb_mut(tcb.cptr())?.bind(
            cspace_root.cptr(),
            vspace_root.cptr(),
            sched_context.cptr(),
        );

        log::debug!(
            "Configured thread {}: cspace {}, vspace {}, sched context {}",
            tcb.cptr(),
            cspace_root.cptr(),
            vspace_root.cptr(),
            sched_context.cptr()
        );
        Ok(())
    }

    /// Write the initial instruction and stack pointer.
    ///
    /// Only allowed while `Configured`; may be repeated until `resume`. All
    /// other registers keep their creation value.
    pub fn load_registers(
        &mut self,
        objects: &mut ObjectTable,
        tcb: &Cap<TCB>,
        instruction_pointer: VirtAddr,
        stack_pointer: VirtAddr,
    ) -> BootResult<()> {
        let thread = objects.tcb_mut(tcb.cptr())?;

        if thread.state != RunState::Configured {
            return Err(BootError::InvalidTransition {
                tcb: tcb.cptr(),
                transition: Transition::LoadRegisters,
                from: thread.state,
            });
        }
        if !stack_pointer.is_aligned(STACK_ALIGNMENT) {
            return Err(BootError::MisalignedStack {
                tcb: tcb.cptr(),
                stack_pointer,
                alignment: STACK_ALIGNMENT,
            });
        }

        thread.write_entry(instruction_pointer, stack_pointer);
        log::debug!(
            "Loaded thread {}: pc {}, sp {}",
            tcb.cptr(),
            instruction_pointer,
            stack_pointer
        );
        Ok(())
    }

    /// Make the thread runnable and hand it to the dispatcher.
    pub fn resume(&mut self, objects: &mut ObjectTable, tcb: &Cap<TCB>) -> BootResult<()> {
        let thread = objects.tcb_mut(tcb.cptr())?;
        let from = thread.state;

        let fault = match from {
            RunState::Runnable => return Err(BootError::AlreadyRunning { tcb: tcb.cptr() }),
            RunState::Unconfigured => Some(ResumeFault::NotConfigured),
            RunState::Configured if !thread.registers_loaded => {
                Some(ResumeFault::RegistersNotLoaded)
            }
            RunState::Configured => None,
        };
        if let Some(fault) = fault {
            return Err(BootError::ResumeFailed {
                tcb: tcb.cptr(),
                from,
                fault,
            });
        }

        thread.state = RunState::Runnable;
        self.dispatcher.dispatch(tcb.cptr(), &thread.context);
        log::debug!("Resumed thread {} ({})", tcb.cptr(), thread.name());
        Ok(())
    }

    /// Name the thread for diagnostics.
    ///
    /// Allowed in any state; names are cut to at most 16 bytes, never
    /// inside a character.
    pub fn set_name(
        &mut self,
        objects: &mut ObjectTable,
        tcb: &Cap<TCB>,
        name: &str,
    ) -> BootResult<()> {
        let mut len = name.len().min(MAX_THREAD_NAME);
        while !name.is_char_boundary(len) {
            len -= 1;
        }
        let thread = objects.tcb_mut(tcb.cptr())?;
        thread.set_name(&name.as_bytes()[..len]);
        Ok(())
    }

    /// Set the thread's priority before it runs.
    pub fn set_priority(
        &mut self,
        objects: &mut ObjectTable,
        tcb: &Cap<TCB>,
        priority: Priority,
    ) -> BootResult<()> {
        let thread = objects.tcb_mut(tcb.cptr())?;
        if thread.is_runnable() {
            return Err(BootError::InvalidTransition {
                tcb: tcb.cptr(),
                transition: Transition::SetPriority,
                from: thread.state,
            });
        }
        thread.priority = priority;
        Ok(())
    }
}
