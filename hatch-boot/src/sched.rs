//! Scheduling context binder
//!
//! Attaches a timing policy to a freshly constructed scheduling context,
//! using the scheduling-control authority of one execution node. This is the
//! bootstrap's counterpart to the kernel's `SchedControl_Configure`.
//!
//! A scheduling context takes a policy once; rebinding is refused.

use hatch_cap::Cap;
use hatch_cap::objects::{NodeId, SchedContext, SchedPolicy};

use crate::directory::ResourceDirectory;
use crate::error::{BootError, BootResult};
use crate::object_table::ObjectTable;

/// Binds scheduling policies using the controls from a resource directory.
#[derive(Clone, Copy, Debug)]
pub struct SchedBinder<'d> {
    directory: &'d ResourceDirectory,
}

impl<'d> SchedBinder<'d> {
    /// Create a binder over the directory's scheduling controls.
    #[inline]
    #[must_use]
    pub const fn new(directory: &'d ResourceDirectory) -> Self {
        Self { directory }
    }

    /// Bind `policy` to the scheduling context `sc` on `node`.
    ///
    /// # Errors
    ///
    /// - `NoSchedulingControl` if the directory has no control for `node`
    /// - `InvalidHandle` if `sc` does not name a scheduling context
    /// - `AlreadyBound` if the context already has a policy
    /// - `InvalidPolicy` if the policy is not a valid slice of its period, or
    ///   asks for more refills than the context can hold
    pub fn bind_policy(
        &self,
        objects: &mut ObjectTable,
        sc: &Cap<SchedContext>,
        node: NodeId,
        policy: SchedPolicy,
    ) -> BootResult<()> {
        let control = self
            .directory
            .sched_control(node)
            .filter(|&slot| objects.sched_control(slot).is_ok())
            .ok_or(BootError::NoSchedulingControl { node })?;

        let context = objects.sched_context(sc.cptr())?;
        if context.has_policy() {
            return Err(BootError::AlreadyBound {
                sched_context: sc.cptr(),
            });
        }
        policy
            .validate(context.size_bits)
            .map_err(|fault| BootError::InvalidPolicy { policy, fault })?;

        let context = objects.sched_context_mut(sc.cptr())?;
        context.policy = Some(policy);
        context.node = Some(node);
        objects.sched_control_mut(control)?.record_allocation(policy.budget);

        log::debug!(
            "Bound {} on node {} to scheduling context {}",
            policy,
            node,
            sc.cptr()
        );
        Ok(())
    }
}
