//! Signoff API
//!
//! This crate defines the collaborators the approval engine talks to and the
//! JSON shapes exchanged with them. The engine owns no storage or wire
//! protocol of its own; it is a client of a generic REST backend.
//!
//! The traits in [`backend`] cover:
//! - reading a request with its steps ([`WorkflowSource`])
//! - submitting approve/reject decisions ([`DecisionSink`])
//! - vendor, technician and agreed-SLA reference data ([`MasterData`])
//! - persisting SLA records ([`SlaCommitter`])
//! - checklist retrieval ([`ChecklistSource`])
//!
//! [`HttpBackend`] talks to the real backend; [`InMemoryBackend`] records
//! every call and is what tests run against.

mod backend;
mod error;
mod http;
mod memory;
mod types;

pub use backend::{
  Backend, ChecklistSource, DecisionSink, MasterData, SlaCommitter, WorkflowSource,
};
pub use error::ApiError;
pub use http::HttpBackend;
pub use memory::InMemoryBackend;
pub use types::{
  AgreedSla, ChecklistItem, DecisionRequest, DecisionResponse, SavedSlaRecords, SlaCommitRecord,
  SlaCommitRequest, Technician, VendorRecord,
};
