//! Signoff Config
//!
//! This crate contains the serializable types shared by every signoff crate:
//! the wire shape of an approval request as the backend returns it, and the
//! configuration the engine and the command-line client run with.
//!
//! Records can be loaded from:
//! - the approval backend (JSON over REST)
//! - JSON fixture files (tests, the CLI)
//!
//! The workflow crate takes a [`HeaderRecord`], validates its step graph and
//! turns it into a state machine ready to accept decisions.

mod client;
mod engine;
mod header;
mod role;

pub use client::{ActorConfig, ApiConfig, ClientConfig, ConfigError};
pub use engine::{AutosaveConfig, EngineConfig};
pub use header::{
  DecisionAction, EdgeDef, HeaderRecord, RequestKind, StepDef, StepStatus, Subject,
};
pub use role::RoleId;
