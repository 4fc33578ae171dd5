//! Orchestrator errors.

use std::fmt;

use signoff_api::ApiError;
use signoff_config::DecisionAction;
use signoff_sla::SlaError;
use signoff_workflow::WorkflowError;

/// Broad class of a failure, for deciding how to present it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// The user's input or the workflow state forbids the action.
  Validation,
  /// The backend refused the action for a business reason.
  BusinessRule,
  /// A call failed in a way that may pass on retry.
  TransientIo,
  /// The session cannot continue.
  Fatal,
}

/// Business rule the backend enforced when refusing a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusinessRule {
  VendorInactive,
  Other { code: Option<String> },
}

impl fmt::Display for BusinessRule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BusinessRule::VendorInactive => f.write_str("vendor inactive"),
      BusinessRule::Other { code: Some(code) } => f.write_str(code),
      BusinessRule::Other { code: None } => f.write_str("refused"),
    }
  }
}

/// Errors that can occur in orchestrator operations.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
  #[error("workflow '{0}' not found")]
  WorkflowNotFound(String),

  /// The workflow or its reference data could not be loaded.
  #[error("failed to load workflow '{header_id}'")]
  Load {
    header_id: String,
    #[source]
    source: ApiError,
  },

  /// The stored workflow is malformed.
  #[error("workflow '{header_id}' is invalid")]
  InvalidWorkflow {
    header_id: String,
    #[source]
    source: WorkflowError,
  },

  #[error(transparent)]
  Validation(#[from] WorkflowError),

  #[error("decision on step '{step_id}' refused ({rule}): {message}")]
  BusinessRule {
    step_id: String,
    rule: BusinessRule,
    message: String,
  },

  /// Submitting may succeed if retried; a retry reuses the idempotency key.
  #[error("failed to {action} step '{step_id}', retry possible")]
  Transient {
    step_id: String,
    action: DecisionAction,
    #[source]
    source: ApiError,
  },

  #[error("failed to {action} step '{step_id}'")]
  Submit {
    step_id: String,
    action: DecisionAction,
    #[source]
    source: ApiError,
  },

  #[error("another decision is being submitted")]
  SubmissionInFlight,

  #[error("workflow '{0}' has no vendor")]
  NoVendor(String),

  #[error(transparent)]
  Sla(#[from] SlaError),

  #[error("lookup failed")]
  Lookup(#[source] ApiError),
}

impl OrchestratorError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      OrchestratorError::Validation(_)
      | OrchestratorError::SubmissionInFlight
      | OrchestratorError::NoVendor(_) => ErrorKind::Validation,
      OrchestratorError::BusinessRule { .. } => ErrorKind::BusinessRule,
      OrchestratorError::Transient { .. } => ErrorKind::TransientIo,
      OrchestratorError::Sla(e) => match e {
        SlaError::Commit { .. } if e.is_transient() => ErrorKind::TransientIo,
        SlaError::Commit { .. } | SlaError::NoRuntime => ErrorKind::Fatal,
        _ => ErrorKind::Validation,
      },
      OrchestratorError::Lookup(e) if e.is_transient() => ErrorKind::TransientIo,
      OrchestratorError::WorkflowNotFound(_)
      | OrchestratorError::Load { .. }
      | OrchestratorError::InvalidWorkflow { .. }
      | OrchestratorError::Submit { .. }
      | OrchestratorError::Lookup(_) => ErrorKind::Fatal,
    }
  }
}
