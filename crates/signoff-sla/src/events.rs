//! Autosave outcome events.
//!
//! The scheduler commits in the background, so its outcomes are reported
//! here rather than returned to whoever scheduled the commit.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AutosaveEvent {
  CommitStarted {
    header_id: String,
    sla_ids: Vec<String>,
  },

  Committed {
    header_id: String,
    sla_ids: Vec<String>,
  },

  /// The records stay modified; a later edit or flush sends them again.
  CommitFailed {
    header_id: String,
    sla_ids: Vec<String>,
    error: String,
  },
}

/// Receives autosave events.
pub trait AutosaveNotifier: Send + Sync {
  fn notify(&self, event: AutosaveEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl AutosaveNotifier for NoopNotifier {
  fn notify(&self, _event: AutosaveEvent) {}
}

/// Forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<AutosaveEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<AutosaveEvent>) -> Self {
    Self { sender }
  }
}

impl AutosaveNotifier for ChannelNotifier {
  fn notify(&self, event: AutosaveEvent) {
    // receiver may be gone
    let _ = self.sender.send(event);
  }
}
