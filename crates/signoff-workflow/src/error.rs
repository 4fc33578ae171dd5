use signoff_config::{DecisionAction, RoleId, StepStatus};
use thiserror::Error;

use crate::workflow::HeaderStatus;

#[derive(Debug, Error, PartialEq)]
pub enum WorkflowError {
  #[error("workflow has no steps")]
  NoSteps,

  #[error("duplicate step id: {0}")]
  DuplicateStep(String),

  #[error("edge references unknown step: from={from}, to={to}")]
  InvalidEdge { from: String, to: String },

  #[error("step graph contains a cycle")]
  CycleDetected,

  #[error("no entry steps found (every step has an incoming edge)")]
  NoEntryPoints,

  #[error("step not found: {0}")]
  StepNotFound(String),

  #[error("a note is required to {action} step '{step_id}'")]
  EmptyNote {
    step_id: String,
    action: DecisionAction,
  },

  #[error("step '{step_id}' is {status:?}, not current")]
  StepNotCurrent { step_id: String, status: StepStatus },

  #[error("step '{step_id}' requires role '{required_role}'")]
  RoleMismatch {
    step_id: String,
    required_role: RoleId,
  },

  #[error("workflow '{header_id}' is {status} and accepts no further decisions")]
  Terminated {
    header_id: String,
    status: HeaderStatus,
  },
}

impl WorkflowError {
  /// Whether the error rejects a decision (as opposed to a malformed workflow).
  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      WorkflowError::StepNotFound(_)
        | WorkflowError::EmptyNote { .. }
        | WorkflowError::StepNotCurrent { .. }
        | WorkflowError::RoleMismatch { .. }
        | WorkflowError::Terminated { .. }
    )
  }
}
