use std::collections::BTreeSet;

use signoff_config::{EngineConfig, RoleId, StepStatus};

use crate::workflow::WorkflowStep;

/// Decides which current steps a role set may act on.
///
/// A step is actionable by a user iff it is current and the user holds its
/// required role. Holders of the configured super role may act on every
/// current step.
#[derive(Debug, Clone, Default)]
pub struct ActorResolver {
  super_role: Option<RoleId>,
}

impl ActorResolver {
  pub fn new(super_role: Option<RoleId>) -> Self {
    Self { super_role }
  }

  pub fn from_config(config: &EngineConfig) -> Self {
    Self::new(config.super_role.clone())
  }

  pub fn super_role(&self) -> Option<&RoleId> {
    self.super_role.as_ref()
  }

  pub fn is_super(&self, roles: &BTreeSet<RoleId>) -> bool {
    self
      .super_role
      .as_ref()
      .is_some_and(|role| roles.contains(role))
  }

  pub fn can_act(&self, roles: &BTreeSet<RoleId>, step: &WorkflowStep) -> bool {
    step.status == StepStatus::Current && (self.is_super(roles) || roles.contains(&step.role_id))
  }

  /// All current steps the role set may act on, in step order.
  ///
  /// Several steps can be returned during escalation; callers present all of
  /// them, any one may be decided.
  pub fn resolvable_steps<'a>(
    &self,
    roles: &BTreeSet<RoleId>,
    steps: &'a [WorkflowStep],
  ) -> Vec<&'a WorkflowStep> {
    steps.iter().filter(|s| self.can_act(roles, s)).collect()
  }
}
