//! Signoff SLA
//!
//! SLA fulfillment records for a request's vendor, and their autosave.
//!
//! [`SlaTracker`] owns the records and knows which ones are complete and
//! modified. [`AutosaveScheduler`] turns the tracker's [`ReadyToPersist`]
//! signals into debounced background commits, one timer per
//! [`TriggerClass`].

mod error;
mod events;
mod record;
mod scheduler;
mod tracker;

pub use error::SlaError;
pub use events::{AutosaveEvent, AutosaveNotifier, ChannelNotifier, NoopNotifier};
pub use record::{Rating, SlaField, SlaRecord};
pub use scheduler::{AutosaveScheduler, SharedTracker, TriggerClass};
pub use tracker::{CollapseOutcome, CommitBatch, ReadyToPersist, SlaTracker};
