use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::role::RoleId;

/// Kind of request an approval workflow is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
  Maintenance,
  Scrap,
}

/// What a request is about: one or more assets, or an asset group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Subject {
  Assets { asset_ids: Vec<String> },
  AssetGroup { group_id: String },
}

/// Status of a single approval step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  /// Not yet reachable.
  Pending,
  /// Actionable now.
  Current,
  Approved,
  Rejected,
  /// Left actionability without a decision: a sibling was approved, or the
  /// workflow completed without reaching it.
  Superseded,
  /// Terminated because the request was rejected.
  Cancelled,
}

impl StepStatus {
  /// Whether the status can no longer change.
  pub fn is_terminal(self) -> bool {
    !matches!(self, StepStatus::Pending | StepStatus::Current)
  }
}

/// Decision a user takes on a current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
  Approve,
  Reject,
}

impl std::fmt::Display for DecisionAction {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      DecisionAction::Approve => f.write_str("approve"),
      DecisionAction::Reject => f.write_str("reject"),
    }
  }
}

/// A step as stored by the approval backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDef {
  pub step_id: String,
  pub sequence: u32,
  pub role_id: RoleId,
  #[serde(default = "default_status")]
  pub status: StepStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub acted_by_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub acted_by_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub acted_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
}

fn default_status() -> StepStatus {
  StepStatus::Pending
}

/// An explicit edge in the step graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDef {
  pub from: String,
  pub to: String,
}

/// An approval request (maintenance or scrap) with its steps.
///
/// When `edges` is empty the step graph is derived from sequence numbers:
/// steps sharing a sequence number fan out, and each group leads to the
/// next higher one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderRecord {
  pub header_id: String,
  pub kind: RequestKind,
  pub subject: Subject,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub asset_type_id: Option<String>,
  /// `None` for in-house work.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub vendor_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub due_date: Option<NaiveDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cutoff_date: Option<NaiveDate>,
  pub steps: Vec<StepDef>,
  #[serde(default)]
  pub edges: Vec<EdgeDef>,
}
