//! Thread spawning
//!
//! [`Bootstrap`] owns every piece of bootstrap state (object table, slot
//! allocator, object constructor, scheduling binder, thread bootstrapper)
//! over one [`ResourceDirectory`], and runs the whole spawn sequence:
//!
//! 1. Allocate a slot and retype a TCB into it
//! 2. Allocate a slot and retype a scheduling context into it
//! 3. Bind the scheduling policy using the node's scheduling control
//! 4. Configure the TCB with the caller's CSpace and VSpace roots
//! 5. Name the thread and set its priority
//! 6. Load the entry point and stack pointer
//! 7. Resume
//!
//! Any failure aborts the sequence. Resources consumed by earlier steps stay
//! consumed; the new thread is never left runnable.

use hatch_cap::objects::{CNodeObj, NodeId, Priority, SchedContext, SchedPolicy, TCB, VSpace};
use hatch_cap::{CPtr, Cap};
use hatch_common::VirtAddr;

use crate::config::SpawnConfig;
use crate::construct::{Constructible, ObjectConstructor};
use crate::directory::ResourceDirectory;
use crate::dispatch::Dispatcher;
use crate::error::{BootError, BootResult};
use crate::object_table::ObjectTable;
use crate::sched::SchedBinder;
use crate::slots::SlotAllocator;
use crate::thread::ThreadBootstrapper;

/// Capabilities of a successfully spawned thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnedThread {
    /// The thread.
    pub tcb: Cap<TCB>,
    /// Its scheduling context.
    pub sched_context: Cap<SchedContext>,
}

/// Bootstrap state over one resource directory.
#[derive(Debug)]
pub struct Bootstrap<'d, D> {
    directory: &'d ResourceDirectory,
    objects: ObjectTable,
    slots: SlotAllocator,
    constructor: ObjectConstructor<'d>,
    binder: SchedBinder<'d>,
    threads: ThreadBootstrapper<D>,
}

impl<'d, D: Dispatcher> Bootstrap<'d, D> {
    /// Start bootstrapping from `directory`, handing runnable threads to `dispatcher`.
    #[must_use]
    pub fn new(directory: &'d ResourceDirectory, dispatcher: D) -> Self {
        Self {
            directory,
            objects: ObjectTable::seeded(directory),
            slots: SlotAllocator::new(directory.empty()),
            constructor: ObjectConstructor::new(directory),
            binder: SchedBinder::new(directory),
            threads: ThreadBootstrapper::new(dispatcher),
        }
    }

    // -- Accessors

    /// The directory resources come from.
    #[inline]
    #[must_use]
    pub const fn directory(&self) -> &'d ResourceDirectory {
        self.directory
    }

    /// The object table.
    #[inline]
    #[must_use]
    pub const fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    /// The slot allocator.
    #[inline]
    #[must_use]
    pub const fn slots(&self) -> &SlotAllocator {
        &self.slots
    }

    /// The object constructor.
    #[inline]
    #[must_use]
    pub const fn constructor(&self) -> &ObjectConstructor<'d> {
        &self.constructor
    }

    /// The dispatcher runnable threads went to.
    #[inline]
    #[must_use]
    pub const fn dispatcher(&self) -> &D {
        self.threads.dispatcher()
    }

    /// Finish bootstrapping and give back the dispatcher.
    #[must_use]
    pub fn into_dispatcher(self) -> D {
        self.threads.into_dispatcher()
    }

    /// The caller's own thread.
    #[inline]
    #[must_use]
    pub const fn root_tcb(&self) -> Cap<TCB> {
        Cap::from_cptr(self.directory.root_tcb())
    }

    /// The caller's own CSpace root.
    #[inline]
    #[must_use]
    pub const fn cspace_root(&self) -> Cap<CNodeObj> {
        Cap::from_cptr(self.directory.cspace_root())
    }

    /// The caller's own VSpace root.
    #[inline]
    #[must_use]
    pub const fn vspace_root(&self) -> Cap<VSpace> {
        Cap::from_cptr(self.directory.vspace_root())
    }

    // -- Component operations

    /// Take the next free capability slot.
    pub fn next_slot(&mut self) -> BootResult<CPtr> {
        self.slots.next_slot()
    }

    /// Retype the first fitting grant into a `T` at `slot`.
    pub fn construct<T: Constructible>(
        &mut self,
        size_bits: u8,
        slot: CPtr,
    ) -> BootResult<Cap<T>> {
        self.constructor.construct(&mut self.objects, size_bits, slot)
    }

    /// Allocate a slot and retype a `T` of size class `size_bits` into it.
    ///
    /// A slot is only consumed once a fitting grant is known to exist. Running
    /// out of slots reports the class and size class the slot was for.
    pub fn alloc_object<T: Constructible>(&mut self, size_bits: u8) -> BootResult<Cap<T>> {
        let size_bits = size_bits.max(T::SIZE_BITS);
        if self.constructor.find_grant(size_bits).is_none() {
            return Err(BootError::NoSuitableGrant {
                class: T::OBJECT_TYPE,
                size_bits,
            });
        }
        let slot = self
            .slots
            .next_slot()
            .map_err(|e| e.for_request(T::OBJECT_TYPE, size_bits))?;
        self.constructor.construct(&mut self.objects, size_bits, slot)
    }

    /// Bind `policy` to `sc` on `node`.
    pub fn bind_policy(
        &mut self,
        sc: &Cap<SchedContext>,
        node: NodeId,
        policy: SchedPolicy,
    ) -> BootResult<()> {
        self.binder.bind_policy(&mut self.objects, sc, node, policy)
    }

    /// Configure `tcb` with the caller's own CSpace and VSpace roots.
    pub fn configure(&mut self, tcb: &Cap<TCB>, sc: &Cap<SchedContext>) -> BootResult<()> {
        let cspace = self.cspace_root();
        let vspace = self.vspace_root();
        self.threads
            .configure(&mut self.objects, tcb, &cspace, &vspace, sc)
    }

    /// Write the entry point and stack pointer of `tcb`.
    pub fn load_registers(
        &mut self,
        tcb: &Cap<TCB>,
        instruction_pointer: VirtAddr,
        stack_pointer: VirtAddr,
    ) -> BootResult<()> {
        self.threads
            .load_registers(&mut self.objects, tcb, instruction_pointer, stack_pointer)
    }

    /// Start `tcb`.
    pub fn resume(&mut self, tcb: &Cap<TCB>) -> BootResult<()> {
        self.threads.resume(&mut self.objects, tcb)
    }

    /// Name `tcb` for diagnostics.
    pub fn set_name(&mut self, tcb: &Cap<TCB>, name: &str) -> BootResult<()> {
        self.threads.set_name(&mut self.objects, tcb, name)
    }

    /// Set the priority of a thread that is not yet running.
    pub fn set_priority(&mut self, tcb: &Cap<TCB>, priority: Priority) -> BootResult<()> {
        self.threads.set_priority(&mut self.objects, tcb, priority)
    }

    // -- Spawn sequence

    /// Create, configure and start a thread running `entry` on the stack ending at `stack_top`.
    pub fn spawn_thread(
        &mut self,
        config: &SpawnConfig<'_>,
        entry: VirtAddr,
        stack_top: VirtAddr,
    ) -> BootResult<SpawnedThread> {
        log::info!("Spawning thread '{}' at {}", config.name, entry);

        self.spawn_inner(config, entry, stack_top)
            .inspect(|spawned| {
                log::info!(
                    "Thread '{}' running: tcb {}, sched context {}",
                    config.name,
                    spawned.tcb.cptr(),
                    spawned.sched_context.cptr()
                );
            })
            .inspect_err(|e| log::error!("Failed to spawn thread '{}': {}", config.name, e))
    }

    fn spawn_inner(
        &mut self,
        config: &SpawnConfig<'_>,
        entry: VirtAddr,
        stack_top: VirtAddr,
    ) -> BootResult<SpawnedThread> {
        let tcb: Cap<TCB> = self.alloc_object(config.tcb_size_bits)?;
        let sched_context: Cap<SchedContext> =
            self.alloc_object(config.sched_context_size_bits)?;

        let node = config.node.unwrap_or(self.directory.node_id());
        self.bind_policy(&sched_context, node, config.policy)?;

        self.configure(&tcb, &sched_context)?;
        self.set_name(&tcb, config.name)?;
        self.set_priority(&tcb, config.priority)?;

        self.load_registers(&tcb, entry, stack_top)?;
        self.resume(&tcb)?;

        Ok(SpawnedThread { tcb, sched_context })
    }
}

#[cfg(test)]
mod tests {
    use hatch_cap::objects::{CapObjectType, Grant, RunState};
    use hatch_cap::{ObjectType, SlotRange};
    use hatch_common::PhysAddr;
    use hatch_common::boot::{BootInfo, SlotRegion, UntypedDesc};

    use super::*;
    use crate::config::US_IN_MS;
    use crate::directory::sample_directory;
    use crate::dispatch::RunQueue;

    const ENTRY: VirtAddr = VirtAddr::new(0x40_1000);
    const STACK_TOP: VirtAddr = VirtAddr::new(0x7fff_f000);

    /// Grants of 4 KB and 64 KB, empty slots `[100, 110)`, node 0.
    fn scenario_directory() -> ResourceDirectory {
        let mut info = BootInfo::new(0, 1, 20);
        info.push_untyped(UntypedDesc::new(PhysAddr::new(0x4000_0000), 12, false));
        info.push_untyped(UntypedDesc::new(PhysAddr::new(0x4001_0000), 16, false));
        info.empty = SlotRegion::new(100, 110);
        info.sched_control = SlotRegion::new(30, 31);
        ResourceDirectory::from_boot_info(&info).unwrap()
    }

    #[test]
    fn test_end_to_end_scenario() {
        let dir = scenario_directory();
        let mut boot = Bootstrap::new(&dir, RunQueue::new());

        let slot = boot.next_slot().unwrap();
        assert_eq!(slot, CPtr::from_raw(100));
        let tcb: Cap<TCB> = boot.construct(12, slot).unwrap();
        assert!(boot.constructor().is_retired(CPtr::from_raw(20)));
        assert!(!boot.constructor().is_retired(CPtr::from_raw(21)));

        let slot = boot.next_slot().unwrap();
        assert_eq!(slot, CPtr::from_raw(101));
        let sc: Cap<SchedContext> = boot.construct(16, slot).unwrap();
        assert!(boot.constructor().is_retired(CPtr::from_raw(21)));

        let policy = SchedPolicy::new(10 * US_IN_MS, 10 * US_IN_MS, 0);
        boot.bind_policy(&sc, 0, policy).unwrap();
        boot.configure(&tcb, &sc).unwrap();
        boot.load_registers(&tcb, ENTRY, STACK_TOP).unwrap();
        boot.resume(&tcb).unwrap();
        assert_eq!(
            boot.resume(&tcb),
            Err(BootError::AlreadyRunning { tcb: tcb.cptr() })
        );

        let thread = boot.objects().tcb(tcb.cptr()).unwrap();
        assert_eq!(thread.state, RunState::Runnable);
        assert_eq!(thread.cspace_root, CPtr::from_raw(2));
        assert_eq!(thread.vspace_root, CPtr::from_raw(3));
        assert_eq!(thread.sched_context, sc.cptr());
        assert_eq!(boot.dispatcher().len(), 1);
    }

    #[test]
    fn test_spawn_thread() {
        let dir = scenario_directory();
        let mut boot = Bootstrap::new(&dir, RunQueue::new());
        let config = SpawnConfig::new("thread_2").with_sched_context_size_bits(16);

        let spawned = boot.spawn_thread(&config, ENTRY, STACK_TOP).unwrap();
        assert_eq!(spawned.tcb.cptr(), CPtr::from_raw(100));
        assert_eq!(spawned.sched_context.cptr(), CPtr::from_raw(101));

        let thread = boot.objects().tcb(spawned.tcb.cptr()).unwrap();
        assert_eq!(thread.name(), "thread_2");
        assert_eq!(thread.priority, 255);
        assert_eq!(thread.context.pc, ENTRY.as_u64());

        let sc = boot.objects().sched_context(spawned.sched_context.cptr()).unwrap();
        assert_eq!(sc.policy, Some(SchedPolicy::round_robin(10_000)));
        assert_eq!(sc.node, Some(0));
        assert_eq!(sc.bound_tcb, spawned.tcb.cptr());

        let mut rq = boot.into_dispatcher();
        assert_eq!(rq.pop().map(|d| d.tcb), Some(spawned.tcb.cptr()));
    }

    #[test]
    fn test_alloc_object_keeps_slot_on_failure() {
        let dir = scenario_directory();
        let mut boot = Bootstrap::new(&dir, RunQueue::new());

        assert_eq!(
            boot.alloc_object::<SchedContext>(17),
            Err(BootError::NoSuitableGrant {
                class: ObjectType::SchedContext,
                size_bits: 17
            })
        );
        assert_eq!(boot.slots().remaining(), 10);

        let tcb: Cap<TCB> = boot.alloc_object(0).unwrap();
        assert_eq!(tcb.cptr(), CPtr::from_raw(100));
        assert_eq!(boot.slots().remaining(), 9);
    }

    #[test]
    fn test_alloc_object_exhausted_slots() {
        let mut info = BootInfo::new(0, 1, 20);
        info.push_untyped(UntypedDesc::new(PhysAddr::new(0x4000_0000), 12, false));
        info.empty = SlotRegion::new(100, 100);
        let dir = ResourceDirectory::from_boot_info(&info).unwrap();
        let mut boot = Bootstrap::new(&dir, RunQueue::new());

        assert_eq!(
            boot.alloc_object::<TCB>(4),
            Err(BootError::ExhaustedSlots {
                range: SlotRange::new(CPtr::from_raw(100), CPtr::from_raw(100)),
                request: Some((ObjectType::TCB, TCB::SIZE_BITS))
            })
        );
        assert_eq!(boot.constructor().available().count(), 1);
    }

    #[test]
    fn test_spawn_reports_which_allocation_ran_out() {
        let mut info = BootInfo::new(0, 1, 20);
        info.push_untyped(UntypedDesc::new(PhysAddr::new(0x4000_0000), 12, false));
        info.push_untyped(UntypedDesc::new(PhysAddr::new(0x4001_0000), 16, false));
        info.empty = SlotRegion::new(100, 101);
        info.sched_control = SlotRegion::new(30, 31);
        let dir = ResourceDirectory::from_boot_info(&info).unwrap();
        let mut boot = Bootstrap::new(&dir, RunQueue::new());
        let config = SpawnConfig::new("thread_2").with_sched_context_size_bits(16);

        assert!(matches!(
            boot.spawn_thread(&config, ENTRY, STACK_TOP),
            Err(BootError::ExhaustedSlots {
                request: Some((ObjectType::SchedContext, 16)),
                ..
            })
        ));
    }

    #[test]
    fn test_grant_slots_never_reused() {
        // Empty range handed over on top of the second grant
        let dir = ResourceDirectory::new(
            alloc::vec![
                Grant::new(CPtr::from_raw(20), PhysAddr::new(0x4000_0000), 12, false),
                Grant::new(CPtr::from_raw(21), PhysAddr::new(0x4001_0000), 16, false),
            ],
            SlotRange::new(CPtr::from_raw(21), CPtr::from_raw(30)),
            SlotRange::new(CPtr::from_raw(30), CPtr::from_raw(31)),
            0,
        );
        let mut boot = Bootstrap::new(&dir, RunQueue::new());

        assert_eq!(
            boot.alloc_object::<TCB>(12),
            Err(BootError::SlotOccupied {
                slot: CPtr::from_raw(21),
                found: ObjectType::Untyped
            })
        );
        assert_eq!(boot.objects().object_type(CPtr::from_raw(21)), ObjectType::Untyped);
        assert!(!boot.constructor().is_retired(CPtr::from_raw(20)));

        // The next slot is free and takes the object
        let tcb: Cap<TCB> = boot.alloc_object(12).unwrap();
        assert_eq!(tcb.cptr(), CPtr::from_raw(22));
    }

    #[test]
    fn test_spawn_misaligned_stack_not_runnable() {
        let dir = scenario_directory();
        let mut boot = Bootstrap::new(&dir, RunQueue::new());
        let config = SpawnConfig::new("thread_2").with_sched_context_size_bits(16);

        assert!(matches!(
            boot.spawn_thread(&config, ENTRY, VirtAddr::new(0x7fff_f008)),
            Err(BootError::MisalignedStack { alignment: 16, .. })
        ));
        let thread = boot.objects().tcb(CPtr::from_raw(100)).unwrap();
        assert_eq!(thread.state, RunState::Configured);
        assert!(boot.dispatcher().is_empty());
    }

    #[test]
    fn test_spawn_on_missing_node() {
        let dir = sample_directory();
        let mut boot = Bootstrap::new(&dir, RunQueue::new());
        let config = SpawnConfig::new("far").with_node(3);

        assert_eq!(
            boot.spawn_thread(&config, ENTRY, STACK_TOP),
            Err(BootError::NoSchedulingControl { node: 3 })
        );
        // The TCB and scheduling context were built before the policy failed
        assert_eq!(boot.slots().remaining(), 8);
        assert_eq!(
            boot.objects().tcb(CPtr::from_raw(100)).map(|t| t.state),
            Ok(RunState::Unconfigured)
        );
    }

    #[test]
    fn test_root_thread_rename() {
        let dir = sample_directory();
        let mut boot = Bootstrap::new(&dir, RunQueue::new());
        let root = boot.root_tcb();

        boot.set_name(&root, "hello-2").unwrap();
        assert_eq!(boot.objects().tcb(root.cptr()).unwrap().name(), "hello-2");
        // Already running, so its priority is out of reach
        assert!(boot.set_priority(&root, 1).is_err());
    }

    #[test]
    fn test_spawn_two_threads() {
        let dir = sample_directory();
        let mut boot = Bootstrap::new(&dir, RunQueue::new());

        // 4 KB for the first TCB, 64 KB for its scheduling context
        boot.spawn_thread(&SpawnConfig::new("one"), ENTRY, STACK_TOP).unwrap();
        // Only the device grant is left
        assert!(matches!(
            boot.spawn_thread(&SpawnConfig::new("two"), ENTRY, STACK_TOP),
            Err(BootError::NoSuitableGrant {
                class: ObjectType::TCB,
                ..
            })
        ));
        assert_eq!(boot.dispatcher().len(), 1);
    }
}
