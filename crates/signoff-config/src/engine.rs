use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::role::RoleId;

/// Configuration for the approval engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
  /// Administrative role allowed to act on any current step.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub super_role: Option<RoleId>,

  #[serde(default)]
  pub autosave: AutosaveConfig,
}

/// Debounce windows for SLA autosave.
///
/// Field edits arrive in bursts and use a short window; rating edits are rare
/// and use a longer one so more records end up in the same commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutosaveConfig {
  #[serde(default = "default_field_debounce_ms")]
  pub field_debounce_ms: u64,
  #[serde(default = "default_rating_debounce_ms")]
  pub rating_debounce_ms: u64,
}

fn default_field_debounce_ms() -> u64 {
  50
}

fn default_rating_debounce_ms() -> u64 {
  500
}

impl AutosaveConfig {
  pub fn field_debounce(&self) -> Duration {
    Duration::from_millis(self.field_debounce_ms)
  }

  pub fn rating_debounce(&self) -> Duration {
    Duration::from_millis(self.rating_debounce_ms)
  }
}

impl Default for AutosaveConfig {
  fn default() -> Self {
    Self {
      field_debounce_ms: default_field_debounce_ms(),
      rating_debounce_ms: default_rating_debounce_ms(),
    }
  }
}
