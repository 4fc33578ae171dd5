use async_trait::async_trait;
use signoff_config::HeaderRecord;

use crate::error::ApiError;
use crate::types::{
  AgreedSla, ChecklistItem, DecisionRequest, DecisionResponse, SavedSlaRecords, SlaCommitRequest,
  Technician, VendorRecord,
};

/// Reads approval requests.
#[async_trait]
pub trait WorkflowSource: Send + Sync {
  /// Fetch a request with its steps, statuses and audit fields.
  ///
  /// Returns [`ApiError::NotFound`] when the request does not exist.
  async fn fetch_header(&self, header_id: &str) -> Result<HeaderRecord, ApiError>;
}

/// Accepts approve/reject decisions.
#[async_trait]
pub trait DecisionSink: Send + Sync {
  /// Submit a decision.
  ///
  /// A business refusal (e.g. inactive vendor) is a successful call with
  /// `success: false`; only transport failures are errors.
  async fn submit_decision(&self, decision: &DecisionRequest)
  -> Result<DecisionResponse, ApiError>;
}

/// Read-only reference data.
#[async_trait]
pub trait MasterData: Send + Sync {
  /// SLAs agreed with a vendor.
  async fn agreed_slas(&self, vendor_id: &str) -> Result<Vec<AgreedSla>, ApiError>;

  /// Active vendors servicing an asset type.
  async fn active_vendors(&self, asset_type_id: &str) -> Result<Vec<VendorRecord>, ApiError>;

  /// Technicians of a vendor.
  async fn technicians(&self, vendor_id: &str) -> Result<Vec<Technician>, ApiError>;

  /// SLA records already persisted for a request and vendor.
  async fn saved_sla_records(
    &self,
    header_id: &str,
    vendor_id: &str,
  ) -> Result<SavedSlaRecords, ApiError>;
}

/// Persists SLA records.
#[async_trait]
pub trait SlaCommitter: Send + Sync {
  /// Upsert the given records, keyed by SLA id.
  async fn commit_sla(&self, request: &SlaCommitRequest) -> Result<(), ApiError>;
}

/// Reads checklists for display.
#[async_trait]
pub trait ChecklistSource: Send + Sync {
  async fn checklist(&self, asset_type_id: &str) -> Result<Vec<ChecklistItem>, ApiError>;
}

/// Everything the orchestrator needs from the backend.
pub trait Backend:
  WorkflowSource + DecisionSink + MasterData + SlaCommitter + ChecklistSource + 'static
{
}

impl<T> Backend for T where
  T: WorkflowSource + DecisionSink + MasterData + SlaCommitter + ChecklistSource + 'static
{
}
