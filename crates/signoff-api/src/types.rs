use serde::{Deserialize, Serialize};
use signoff_config::DecisionAction;

/// An approve or reject decision as submitted to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRequest {
  pub header_id: String,
  pub step_id: String,
  pub action: DecisionAction,
  pub actor_id: String,
  pub actor_name: String,
  /// Approval note or rejection reason.
  pub note: String,
  /// Identical for every attempt of the same decision, so the backend can
  /// drop a duplicate.
  pub idempotency_key: String,
}

/// The backend's answer to a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionResponse {
  pub success: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  /// Machine-readable reason when `success` is false.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
}

impl DecisionResponse {
  pub const VENDOR_INACTIVE: &'static str = "vendor_inactive";

  pub fn ok() -> Self {
    Self {
      success: true,
      message: None,
      code: None,
    }
  }

  pub fn refused(code: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      success: false,
      message: Some(message.into()),
      code: Some(code.into()),
    }
  }

  /// Whether the decision was refused because the request's vendor is
  /// inactive. Older backends only say so in the message.
  pub fn is_vendor_inactive(&self) -> bool {
    if self.success {
      return false;
    }
    if self.code.as_deref() == Some(Self::VENDOR_INACTIVE) {
      return true;
    }
    self.message.as_deref().is_some_and(|m| {
      let m = m.to_lowercase();
      m.contains("vendor") && m.contains("inactive")
    })
  }
}

/// An SLA agreed with a vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreedSla {
  pub sla_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub agreed_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorRecord {
  pub vendor_id: String,
  pub name: String,
  pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technician {
  pub technician_id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
  #[serde(default)]
  pub certified: bool,
}

/// One SLA record as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaCommitRecord {
  pub sla_id: String,
  pub value: String,
  pub technician_name: String,
  pub technician_phone: String,
  pub rating: Option<u8>,
}

/// Body of an SLA commit: an upsert keyed by `sla_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaCommitRequest {
  pub vendor_id: String,
  pub header_id: String,
  pub records: Vec<SlaCommitRecord>,
}

/// SLA records already persisted for a (request, vendor) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSlaRecords {
  #[serde(default)]
  pub records: Vec<SlaCommitRecord>,
}

impl SavedSlaRecords {
  /// The shared rating, taken from the first record that carries one.
  pub fn rating(&self) -> Option<u8> {
    self.records.iter().find_map(|r| r.rating)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
  pub item_id: String,
  pub label: String,
  #[serde(default)]
  pub required: bool,
}
