//! Notifications for the presentation layer.
//!
//! The orchestrator reports what happened; how it is shown (toast, banner,
//! log line) is up to the consumer.

use std::sync::Arc;

use serde::Serialize;
use signoff_sla::{AutosaveEvent, AutosaveNotifier};
use signoff_workflow::{HeaderStatus, Transition};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
  Loaded {
    header_id: String,
    status: HeaderStatus,
  },

  /// A decision was accepted and applied.
  DecisionApplied {
    header_id: String,
    transition: Transition,
  },

  /// The backend refused a decision; nothing changed.
  DecisionRefused {
    header_id: String,
    step_id: String,
    message: String,
  },

  Autosave(AutosaveEvent),
}

/// Receives orchestrator notifications.
pub trait Notifier: Send + Sync + 'static {
  fn notify(&self, notification: Notification);
}

/// Discards all notifications.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
  fn notify(&self, _notification: Notification) {}
}

/// Forwards notifications to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<Notification>) -> Self {
    Self { sender }
  }
}

impl Notifier for ChannelNotifier {
  fn notify(&self, notification: Notification) {
    // receiver may have been dropped
    let _ = self.sender.send(notification);
  }
}

/// Routes autosave events into the orchestrator's notifier.
pub(crate) struct AutosaveBridge<N: Notifier>(pub(crate) Arc<N>);

impl<N: Notifier> AutosaveNotifier for AutosaveBridge<N> {
  fn notify(&self, event: AutosaveEvent) {
    self.0.notify(Notification::Autosave(event));
  }
}
