use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use signoff_config::HeaderRecord;
use tracing::debug;

use crate::backend::{ChecklistSource, DecisionSink, MasterData, SlaCommitter, WorkflowSource};
use crate::error::ApiError;
use crate::types::{
  AgreedSla, ChecklistItem, DecisionRequest, DecisionResponse, SavedSlaRecords, SlaCommitRequest,
  Technician, VendorRecord,
};

/// Scripted outcome for the next decision submission.
#[derive(Debug, Clone)]
enum Scripted {
  Respond(DecisionResponse),
  Unavailable(String),
}

#[derive(Debug, Default)]
struct State {
  headers: HashMap<String, HeaderRecord>,
  agreed: HashMap<String, Vec<AgreedSla>>,
  vendors: HashMap<String, Vec<VendorRecord>>,
  technicians: HashMap<String, Vec<Technician>>,
  /// Keyed by (header_id, vendor_id).
  saved: HashMap<(String, String), SavedSlaRecords>,
  checklists: HashMap<String, Vec<ChecklistItem>>,
  decisions: Vec<DecisionRequest>,
  commits: Vec<SlaCommitRequest>,
  scripted: VecDeque<Scripted>,
  failing_commits: usize,
}

/// Backend held entirely in memory.
///
/// Every decision and commit is recorded, including failed ones, so tests
/// can assert on what was sent. Responses and failures can be scripted.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
  state: Mutex<State>,
}

impl InMemoryBackend {
  pub fn new() -> Self {
    Self::default()
  }

  fn state(&self) -> MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(|e| e.into_inner())
  }

  pub fn insert_header(&self, header: HeaderRecord) {
    self.state().headers.insert(header.header_id.clone(), header);
  }

  pub fn insert_agreed_slas(&self, vendor_id: &str, slas: Vec<AgreedSla>) {
    self.state().agreed.insert(vendor_id.to_string(), slas);
  }

  pub fn insert_vendors(&self, asset_type_id: &str, vendors: Vec<VendorRecord>) {
    self
      .state()
      .vendors
      .insert(asset_type_id.to_string(), vendors);
  }

  pub fn insert_technicians(&self, vendor_id: &str, technicians: Vec<Technician>) {
    self
      .state()
      .technicians
      .insert(vendor_id.to_string(), technicians);
  }

  pub fn insert_saved_sla_records(&self, header_id: &str, vendor_id: &str, saved: SavedSlaRecords) {
    self
      .state()
      .saved
      .insert((header_id.to_string(), vendor_id.to_string()), saved);
  }

  pub fn insert_checklist(&self, asset_type_id: &str, items: Vec<ChecklistItem>) {
    self
      .state()
      .checklists
      .insert(asset_type_id.to_string(), items);
  }

  /// Answer the next submission with `response` instead of accepting it.
  pub fn push_decision_response(&self, response: DecisionResponse) {
    self.state().scripted.push_back(Scripted::Respond(response));
  }

  /// Fail the next `n` submissions with [`ApiError::Unavailable`].
  pub fn fail_next_decisions(&self, n: usize) {
    let mut state = self.state();
    for _ in 0..n {
      state
        .scripted
        .push_back(Scripted::Unavailable("decision endpoint down".to_string()));
    }
  }

  /// Fail the next `n` commits with [`ApiError::Unavailable`].
  pub fn fail_next_commits(&self, n: usize) {
    self.state().failing_commits += n;
  }

  /// Every decision submitted so far, in order.
  pub fn decisions(&self) -> Vec<DecisionRequest> {
    self.state().decisions.clone()
  }

  /// Every commit attempted so far, in order.
  pub fn commits(&self) -> Vec<SlaCommitRequest> {
    self.state().commits.clone()
  }

  /// Records currently persisted for a request and vendor.
  pub fn saved(&self, header_id: &str, vendor_id: &str) -> SavedSlaRecords {
    self
      .state()
      .saved
      .get(&(header_id.to_string(), vendor_id.to_string()))
      .cloned()
      .unwrap_or_default()
  }
}

#[async_trait]
impl WorkflowSource for InMemoryBackend {
  async fn fetch_header(&self, header_id: &str) -> Result<HeaderRecord, ApiError> {
    self
      .state()
      .headers
      .get(header_id)
      .cloned()
      .ok_or_else(|| ApiError::NotFound(format!("workflow '{}'", header_id)))
  }
}

#[async_trait]
impl DecisionSink for InMemoryBackend {
  async fn submit_decision(
    &self,
    decision: &DecisionRequest,
  ) -> Result<DecisionResponse, ApiError> {
    let mut state = self.state();
    state.decisions.push(decision.clone());
    debug!(step_id = %decision.step_id, action = %decision.action, "recorded decision");

    match state.scripted.pop_front() {
      Some(Scripted::Respond(response)) => Ok(response),
      Some(Scripted::Unavailable(reason)) => Err(ApiError::Unavailable(reason)),
      None => Ok(DecisionResponse::ok()),
    }
  }
}

#[async_trait]
impl MasterData for InMemoryBackend {
  async fn agreed_slas(&self, vendor_id: &str) -> Result<Vec<AgreedSla>, ApiError> {
    Ok(self.state().agreed.get(vendor_id).cloned().unwrap_or_default())
  }

  async fn active_vendors(&self, asset_type_id: &str) -> Result<Vec<VendorRecord>, ApiError> {
    Ok(
      self
        .state()
        .vendors
        .get(asset_type_id)
        .map(|vendors| vendors.iter().filter(|v| v.active).cloned().collect())
        .unwrap_or_default(),
    )
  }

  async fn technicians(&self, vendor_id: &str) -> Result<Vec<Technician>, ApiError> {
    Ok(
      self
        .state()
        .technicians
        .get(vendor_id)
        .cloned()
        .unwrap_or_default(),
    )
  }

  async fn saved_sla_records(
    &self,
    header_id: &str,
    vendor_id: &str,
  ) -> Result<SavedSlaRecords, ApiError> {
    Ok(self.saved(header_id, vendor_id))
  }
}

#[async_trait]
impl SlaCommitter for InMemoryBackend {
  async fn commit_sla(&self, request: &SlaCommitRequest) -> Result<(), ApiError> {
    let mut state = self.state();
    state.commits.push(request.clone());

    if state.failing_commits > 0 {
      state.failing_commits -= 1;
      return Err(ApiError::Unavailable("sla endpoint down".to_string()));
    }

    let saved = state
      .saved
      .entry((request.header_id.clone(), request.vendor_id.clone()))
      .or_default();
    for record in &request.records {
      match saved.records.iter_mut().find(|r| r.sla_id == record.sla_id) {
        Some(existing) => *existing = record.clone(),
        None => saved.records.push(record.clone()),
      }
    }
    debug!(header_id = %request.header_id, records = request.records.len(), "stored sla records");
    Ok(())
  }
}

#[async_trait]
impl ChecklistSource for InMemoryBackend {
  async fn checklist(&self, asset_type_id: &str) -> Result<Vec<ChecklistItem>, ApiError> {
    Ok(
      self
        .state()
        .checklists
        .get(asset_type_id)
        .cloned()
        .unwrap_or_default(),
    )
  }
}
