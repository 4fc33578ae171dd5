//! Signoff Orchestrator
//!
//! The façade a presentation layer talks to. An [`Orchestrator`] loads one
//! request from a [`signoff_api::Backend`], routes approve/reject decisions
//! through the workflow state machine and the backend, and owns the request's
//! SLA tracker and autosave.
//!
//! Failures come back as [`OrchestratorError`]s classified by
//! [`ErrorKind`]; what happened is reported as [`Notification`]s.

mod error;
mod events;
mod orchestrator;

pub use error::{BusinessRule, ErrorKind, OrchestratorError};
pub use events::{ChannelNotifier, NoopNotifier, Notification, Notifier};
pub use orchestrator::Orchestrator;
