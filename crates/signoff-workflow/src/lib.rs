//! Signoff Workflow
//!
//! This crate provides the approval state machine for a single request.
//! An [`ApprovalWorkflow`] is built from a [`signoff_config::HeaderRecord`]
//! and owns the steps and their statuses; every decision goes through it.
//!
//! Key pieces:
//! - [`StepGraph`]: the validated step DAG (declared edges, or derived from
//!   sequence numbers), including fan-out groups used for escalation
//! - [`ActorResolver`]: which current steps a role set may act on
//! - [`ApprovalWorkflow::approve`] / [`ApprovalWorkflow::reject`]: the only
//!   transitions, all-or-nothing

mod actor;
mod error;
mod graph;
mod resolver;
mod workflow;

pub use actor::Actor;
pub use error::WorkflowError;
pub use graph::StepGraph;
pub use resolver::ActorResolver;
pub use workflow::{
  ActorStamp, ApprovalWorkflow, HeaderStatus, Transition, WorkflowHeader, WorkflowStep,
};
