use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use signoff_api::{
  AgreedSla, ApiError, Backend, ChecklistItem, ChecklistSource, DecisionRequest, DecisionResponse,
  DecisionSink, InMemoryBackend, MasterData, SavedSlaRecords, SlaCommitRecord, SlaCommitRequest,
  SlaCommitter, Technician, VendorRecord, WorkflowSource,
};
use signoff_config::{
  DecisionAction, EdgeDef, EngineConfig, HeaderRecord, RequestKind, RoleId, StepDef, StepStatus,
  Subject,
};
use signoff_orchestrator::{
  BusinessRule, ChannelNotifier, ErrorKind, Notification, Notifier, Orchestrator,
  OrchestratorError,
};
use signoff_sla::{AutosaveEvent, ReadyToPersist, SlaField};
use signoff_workflow::{Actor, HeaderStatus, WorkflowError};
use tokio::sync::{Notify, mpsc};

fn step(id: &str, sequence: u32, role: &str) -> StepDef {
  StepDef {
    step_id: id.to_string(),
    sequence,
    role_id: RoleId::new(role),
    status: StepStatus::Pending,
    acted_by_id: None,
    acted_by_name: None,
    acted_at: None,
    note: None,
  }
}

fn header(id: &str, vendor_id: Option<&str>, steps: Vec<StepDef>) -> HeaderRecord {
  HeaderRecord {
    header_id: id.to_string(),
    kind: RequestKind::Maintenance,
    subject: Subject::Assets {
      asset_ids: vec!["PUMP-7".to_string()],
    },
    asset_type_id: Some("PUMP".to_string()),
    vendor_id: vendor_id.map(str::to_string),
    due_date: None,
    cutoff_date: None,
    steps,
    edges: Vec::new(),
  }
}

/// [S1: R1, S2: R2], in-house.
fn linear() -> HeaderRecord {
  header("MR-1", None, vec![step("S1", 1, "R1"), step("S2", 2, "R2")])
}

fn actor(id: &str, roles: &[&str]) -> Actor {
  Actor::new(id, format!("User {}", id), roles.iter().copied())
}

fn status_of<B: Backend, N: Notifier>(orchestrator: &Orchestrator<B, N>, step_id: &str) -> StepStatus {
  orchestrator.snapshot().step(step_id).unwrap().status
}

async fn load(backend: &Arc<InMemoryBackend>, header_id: &str) -> Orchestrator<InMemoryBackend> {
  Orchestrator::load(backend.clone(), EngineConfig::default(), header_id)
    .await
    .unwrap()
}

#[tokio::test]
async fn test_approve_advances_to_next_step() {
  let backend = Arc::new(InMemoryBackend::new());
  backend.insert_header(linear());
  let orchestrator = load(&backend, "MR-1").await;

  let transition = orchestrator
    .approve("S1", &actor("u1", &["R1"]), "ok")
    .await
    .unwrap();

  assert_eq!(transition.activated, vec!["S2".to_string()]);
  assert_eq!(transition.status, HeaderStatus::InProgress);
  assert_eq!(status_of(&orchestrator, "S1"), StepStatus::Approved);
  assert_eq!(status_of(&orchestrator, "S2"), StepStatus::Current);
  assert_eq!(orchestrator.status(), HeaderStatus::InProgress);

  let snapshot = orchestrator.snapshot();
  let s1 = snapshot.step("S1").unwrap();
  assert_eq!(s1.acted_by.as_ref().unwrap().user_id, "u1");
  assert_eq!(s1.note.as_deref(), Some("ok"));
  assert!(s1.acted_at.is_some());

  let decisions = backend.decisions();
  assert_eq!(decisions.len(), 1);
  assert_eq!(decisions[0].action, DecisionAction::Approve);
  assert_eq!(decisions[0].step_id, "S1");
  assert_eq!(decisions[0].note, "ok");
  assert!(!decisions[0].idempotency_key.is_empty());
}

#[tokio::test]
async fn test_final_approval_completes_request() {
  let backend = Arc::new(InMemoryBackend::new());
  backend.insert_header(linear());
  let orchestrator = load(&backend, "MR-1").await;

  orchestrator
    .approve("S1", &actor("u1", &["R1"]), "ok")
    .await
    .unwrap();
  let transition = orchestrator
    .approve("S2", &actor("u2", &["R2"]), "fine")
    .await
    .unwrap();

  assert_eq!(transition.status, HeaderStatus::Completed);
  assert_eq!(orchestrator.status(), HeaderStatus::Completed);
  assert!(
    orchestrator
      .actionable_steps(&actor("u2", &["R1", "R2"]))
      .is_empty()
  );
}

#[tokio::test]
async fn test_empty_reason_is_refused_before_any_call() {
  let backend = Arc::new(InMemoryBackend::new());
  backend.insert_header(linear());
  let orchestrator = load(&backend, "MR-1").await;
  let before = orchestrator.snapshot();

  let err = orchestrator
    .reject("S1", &actor("u1", &["R1"]), "")
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    OrchestratorError::Validation(WorkflowError::EmptyNote { .. })
  ));
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert_eq!(orchestrator.snapshot(), before);
  assert!(backend.decisions().is_empty());
  assert!(!orchestrator.is_submitting());
}

#[tokio::test]
async fn test_decision_on_pending_step_is_refused() {
  let backend = Arc::new(InMemoryBackend::new());
  backend.insert_header(linear());
  let orchestrator = load(&backend, "MR-1").await;
  let before = orchestrator.snapshot();

  let err = orchestrator
    .approve("S2", &actor("u2", &["R2"]), "ok")
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    OrchestratorError::Validation(WorkflowError::StepNotCurrent { .. })
  ));
  assert_eq!(orchestrator.snapshot(), before);
  assert!(backend.decisions().is_empty());
}

#[tokio::test]
async fn test_role_mismatch_is_refused() {
  let backend = Arc::new(InMemoryBackend::new());
  backend.insert_header(linear());
  let orchestrator = load(&backend, "MR-1").await;

  let err = orchestrator
    .approve("S1", &actor("u2", &["R2"]), "ok")
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    OrchestratorError::Validation(WorkflowError::RoleMismatch { .. })
  ));
  assert!(backend.decisions().is_empty());
}

#[tokio::test]
async fn test_super_role_may_act_on_any_current_step() {
  let backend = Arc::new(InMemoryBackend::new());
  backend.insert_header(linear());
  let config = EngineConfig {
    super_role: Some(RoleId::new("admin")),
    ..EngineConfig::default()
  };
  let orchestrator = Orchestrator::load(backend.clone(), config, "MR-1")
    .await
    .unwrap();

  let admin = actor("root", &["admin"]);
  assert_eq!(orchestrator.actionable_steps(&admin).len(), 1);
  orchestrator.approve("S1", &admin, "ok").await.unwrap();
  assert_eq!(status_of(&orchestrator, "S2"), StepStatus::Current);
}

#[tokio::test]
async fn test_escalation_supersedes_sibling() {
  let backend = Arc::new(InMemoryBackend::new());
  backend.insert_header(header(
    "MR-2",
    None,
    vec![
      step("S1", 1, "R1"),
      step("A", 2, "RA"),
      step("B", 2, "RB"),
      step("C", 3, "RC"),
    ],
  ));
  let orchestrator = load(&backend, "MR-2").await;

  let transition = orchestrator
    .approve("S1", &actor("u1", &["R1"]), "ok")
    .await
    .unwrap();
  assert_eq!(transition.activated, vec!["A".to_string(), "B".to_string()]);

  let a_user = actor("ua", &["RA"]);
  let both = actor("uab", &["RA", "RB"]);
  let ids = |steps: Vec<signoff_workflow::WorkflowStep>| -> Vec<String> {
    steps.into_iter().map(|s| s.step_id).collect()
  };
  assert_eq!(ids(orchestrator.actionable_steps(&a_user)), vec!["A"]);
  assert_eq!(ids(orchestrator.actionable_steps(&both)), vec!["A", "B"]);

  let transition = orchestrator.approve("A", &a_user, "go").await.unwrap();
  assert_eq!(transition.superseded, vec!["B".to_string()]);
  assert_eq!(transition.activated, vec!["C".to_string()]);
  assert_eq!(status_of(&orchestrator, "A"), StepStatus::Approved);
  assert_eq!(status_of(&orchestrator, "B"), StepStatus::Superseded);
  assert_eq!(status_of(&orchestrator, "C"), StepStatus::Current);

  let err = orchestrator
    .approve("B", &actor("ub", &["RB"]), "late")
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_declared_edges_drive_activation() {
  let backend = Arc::new(InMemoryBackend::new());
  let mut record = header(
    "MR-3",
    None,
    vec![step("S1", 1, "R1"), step("S2", 2, "R2"), step("S3", 3, "R3")],
  );
  record.edges = vec![
    EdgeDef {
      from: "S1".to_string(),
      to: "S2".to_string(),
    },
    EdgeDef {
      from: "S1".to_string(),
      to: "S3".to_string(),
    },
  ];
  backend.insert_header(record);
  let orchestrator = load(&backend, "MR-3").await;

  let transition = orchestrator
    .approve("S1", &actor("u1", &["R1"]), "ok")
    .await
    .unwrap();
  assert_eq!(transition.activated, vec!["S2".to_string(), "S3".to_string()]);
}

#[tokio::test]
async fn test_reject_terminates_request() {
  let backend = Arc::new(InMemoryBackend::new());
  backend.insert_header(linear());
  let orchestrator = load(&backend, "MR-1").await;

  let transition = orchestrator
    .reject("S1", &actor("u1", &["R1"]), "wrong asset")
    .await
    .unwrap();
  assert_eq!(transition.cancelled, vec!["S2".to_string()]);
  assert_eq!(orchestrator.status(), HeaderStatus::Rejected);
  assert_eq!(status_of(&orchestrator, "S1"), StepStatus::Rejected);
  assert!(
    orchestrator
      .actionable_steps(&actor("u2", &["R2"]))
      .is_empty()
  );

  let err = orchestrator
    .approve("S2", &actor("u2", &["R2"]), "ok")
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    OrchestratorError::Validation(WorkflowError::Terminated { .. })
  ));
  assert_eq!(backend.decisions().len(), 1);
}

#[tokio::test]
async fn test_vendor_inactive_is_a_business_rule() {
  let backend = Arc::new(InMemoryBackend::new());
  backend.insert_header(linear());
  backend.push_decision_response(DecisionResponse::refused(
    DecisionResponse::VENDOR_INACTIVE,
    "Vendor is inactive",
  ));
  let (tx, mut rx) = mpsc::unbounded_channel();
  let orchestrator = Orchestrator::load_with_notifier(
    backend.clone(),
    EngineConfig::default(),
    "MR-1",
    ChannelNotifier::new(tx),
  )
  .await
  .unwrap();
  let before = orchestrator.snapshot();

  let err = orchestrator
    .approve("S1", &actor("u1", &["R1"]), "ok")
    .await
    .unwrap_err();
  match &err {
    OrchestratorError::BusinessRule { rule, message, .. } => {
      assert_eq!(rule, &BusinessRule::VendorInactive);
      assert_eq!(message, "Vendor is inactive");
    }
    other => panic!("unexpected error {:?}", other),
  }
  assert_eq!(err.kind(), ErrorKind::BusinessRule);
  assert_eq!(orchestrator.snapshot(), before);

  assert!(matches!(rx.recv().await, Some(Notification::Loaded { .. })));
  assert!(matches!(
    rx.recv().await,
    Some(Notification::DecisionRefused { .. })
  ));

  // a refusal is final, the next attempt is a new decision
  orchestrator
    .approve("S1", &actor("u1", &["R1"]), "ok")
    .await
    .unwrap();
  let decisions = backend.decisions();
  assert_ne!(decisions[0].idempotency_key, decisions[1].idempotency_key);
}

#[tokio::test]
async fn test_missing_workflow_is_fatal() {
  let backend = Arc::new(InMemoryBackend::new());
  let err = Orchestrator::load(backend, EngineConfig::default(), "MR-404")
    .await
    .err()
    .unwrap();

  assert!(matches!(err, OrchestratorError::WorkflowNotFound(ref id) if id == "MR-404"));
  assert_eq!(err.kind(), ErrorKind::Fatal);
}

#[tokio::test]
async fn test_malformed_workflow_is_fatal() {
  let backend = Arc::new(InMemoryBackend::new());
  backend.insert_header(header("MR-5", None, Vec::new()));
  let err = Orchestrator::load(backend, EngineConfig::default(), "MR-5")
    .await
    .err()
    .unwrap();

  assert!(matches!(
    err,
    OrchestratorError::InvalidWorkflow {
      source: WorkflowError::NoSteps,
      ..
    }
  ));
  assert_eq!(err.kind(), ErrorKind::Fatal);
}

#[tokio::test]
async fn test_transient_failure_keeps_state_and_key() {
  let backend = Arc::new(InMemoryBackend::new());
  backend.insert_header(linear());
  backend.fail_next_decisions(1);
  let orchestrator = load(&backend, "MR-1").await;
  let before = orchestrator.snapshot();

  let err = orchestrator
    .approve("S1", &actor("u1", &["R1"]), "ok")
    .await
    .unwrap_err();
  assert!(matches!(err, OrchestratorError::Transient { .. }));
  assert_eq!(err.kind(), ErrorKind::TransientIo);
  assert_eq!(orchestrator.snapshot(), before);

  orchestrator
    .approve("S1", &actor("u1", &["R1"]), "ok")
    .await
    .unwrap();

  let decisions = backend.decisions();
  assert_eq!(decisions.len(), 2);
  assert_eq!(decisions[0].idempotency_key, decisions[1].idempotency_key);
}

/// Holds decision submissions until released.
struct GatedBackend {
  inner: InMemoryBackend,
  gate: Notify,
}

#[async_trait]
impl WorkflowSource for GatedBackend {
  async fn fetch_header(&self, header_id: &str) -> Result<HeaderRecord, ApiError> {
    self.inner.fetch_header(header_id).await
  }
}

#[async_trait]
impl DecisionSink for GatedBackend {
  async fn submit_decision(
    &self,
    decision: &DecisionRequest,
  ) -> Result<DecisionResponse, ApiError> {
    self.gate.notified().await;
    self.inner.submit_decision(decision).await
  }
}

#[async_trait]
impl MasterData for GatedBackend {
  async fn agreed_slas(&self, vendor_id: &str) -> Result<Vec<AgreedSla>, ApiError> {
    self.inner.agreed_slas(vendor_id).await
  }

  async fn active_vendors(&self, asset_type_id: &str) -> Result<Vec<VendorRecord>, ApiError> {
    self.inner.active_vendors(asset_type_id).await
  }

  async fn technicians(&self, vendor_id: &str) -> Result<Vec<Technician>, ApiError> {
    self.inner.technicians(vendor_id).await
  }

  async fn saved_sla_records(
    &self,
    header_id: &str,
    vendor_id: &str,
  ) -> Result<SavedSlaRecords, ApiError> {
    self.inner.saved_sla_records(header_id, vendor_id).await
  }
}

#[async_trait]
impl SlaCommitter for GatedBackend {
  async fn commit_sla(&self, request: &SlaCommitRequest) -> Result<(), ApiError> {
    self.inner.commit_sla(request).await
  }
}

#[async_trait]
impl ChecklistSource for GatedBackend {
  async fn checklist(&self, asset_type_id: &str) -> Result<Vec<ChecklistItem>, ApiError> {
    self.inner.checklist(asset_type_id).await
  }
}

#[tokio::test]
async fn test_second_decision_while_one_is_in_flight() {
  let backend = Arc::new(GatedBackend {
    inner: InMemoryBackend::new(),
    gate: Notify::new(),
  });
  backend.inner.insert_header(header(
    "MR-2",
    None,
    vec![step("S1", 1, "R1"), step("S2", 1, "R2")],
  ));
  let orchestrator = Orchestrator::load(backend.clone(), EngineConfig::default(), "MR-2")
    .await
    .unwrap();

  let first_actor = actor("u1", &["R1"]);
  let first = orchestrator.approve("S1", &first_actor, "ok");
  let second = async {
    let result = orchestrator
      .approve("S2", &actor("u2", &["R2"]), "me too")
      .await;
    backend.gate.notify_one();
    result
  };
  let (first, second) = tokio::join!(first, second);

  assert!(first.is_ok());
  assert!(matches!(
    second,
    Err(OrchestratorError::SubmissionInFlight)
  ));
  assert_eq!(backend.inner.decisions().len(), 1);
  assert_eq!(status_of(&orchestrator, "S2"), StepStatus::Superseded);
  assert!(!orchestrator.is_submitting());
}

fn vendor_backend() -> Arc<InMemoryBackend> {
  let backend = Arc::new(InMemoryBackend::new());
  backend.insert_header(header(
    "MR-7",
    Some("V-1"),
    vec![step("S1", 1, "R1"), step("S2", 2, "R2")],
  ));
  backend.insert_agreed_slas(
    "V-1",
    vec![
      AgreedSla {
        sla_id: "SLA-1".to_string(),
        description: Some("Response time".to_string()),
        agreed_value: "4hr".to_string(),
      },
      AgreedSla {
        sla_id: "SLA-2".to_string(),
        description: None,
        agreed_value: "2d".to_string(),
      },
    ],
  );
  backend
}

async fn next_autosave(rx: &mut mpsc::UnboundedReceiver<Notification>) -> AutosaveEvent {
  loop {
    match rx.recv().await.expect("notifier dropped") {
      Notification::Autosave(AutosaveEvent::CommitStarted { .. }) => continue,
      Notification::Autosave(event) => return event,
      _ => continue,
    }
  }
}

#[tokio::test(start_paused = true)]
async fn test_sla_autosave_through_orchestrator() {
  let backend = vendor_backend();
  let (tx, mut rx) = mpsc::unbounded_channel();
  let orchestrator = Orchestrator::load_with_notifier(
    backend.clone(),
    EngineConfig::default(),
    "MR-7",
    ChannelNotifier::new(tx),
  )
  .await
  .unwrap();

  assert!(orchestrator.has_sla());
  assert_eq!(orchestrator.sla_records().unwrap().len(), 2);

  orchestrator
    .set_sla_field("SLA-1", SlaField::Value, "4hr")
    .unwrap();
  orchestrator
    .set_sla_field("SLA-1", SlaField::TechnicianName, "")
    .unwrap();
  let ready = orchestrator
    .set_sla_field("SLA-1", SlaField::TechnicianPhone, "555-1234")
    .unwrap();
  assert_eq!(ready, None);
  assert!(!orchestrator.is_sla_complete("SLA-1").unwrap());

  let ready = orchestrator
    .set_sla_field("SLA-1", SlaField::TechnicianName, "Alex")
    .unwrap();
  assert_eq!(ready, Some(ReadyToPersist::Record("SLA-1".to_string())));
  assert!(orchestrator.is_sla_modified("SLA-1").unwrap());

  assert!(matches!(
    next_autosave(&mut rx).await,
    AutosaveEvent::Committed { .. }
  ));
  assert!(!orchestrator.is_sla_modified("SLA-1").unwrap());

  let commits = backend.commits();
  assert_eq!(commits.len(), 1);
  assert_eq!(commits[0].vendor_id, "V-1");
  assert_eq!(commits[0].header_id, "MR-7");
  assert_eq!(
    commits[0].records,
    vec![SlaCommitRecord {
      sla_id: "SLA-1".to_string(),
      value: "4hr".to_string(),
      technician_name: "Alex".to_string(),
      technician_phone: "555-1234".to_string(),
      rating: None,
    }]
  );
}

#[tokio::test(start_paused = true)]
async fn test_saved_records_and_rating_change() {
  let backend = vendor_backend();
  backend.insert_saved_sla_records(
    "MR-7",
    "V-1",
    SavedSlaRecords {
      records: vec![SlaCommitRecord {
        sla_id: "SLA-1".to_string(),
        value: "3hr".to_string(),
        technician_name: "Alex".to_string(),
        technician_phone: "555-1234".to_string(),
        rating: Some(2),
      }],
    },
  );
  let orchestrator = Orchestrator::load(backend.clone(), EngineConfig::default(), "MR-7")
    .await
    .unwrap();

  assert!(orchestrator.is_sla_complete("SLA-1").unwrap());
  assert!(!orchestrator.is_sla_modified("SLA-1").unwrap());
  assert_eq!(orchestrator.sla_rating().unwrap().map(|r| r.get()), Some(2));

  let ready = orchestrator.set_rating(Some(4)).unwrap();
  assert_eq!(ready, Some(ReadyToPersist::RatingOnly));

  tokio::time::sleep(Duration::from_secs(1)).await;
  let commits = backend.commits();
  assert_eq!(commits.len(), 1);
  assert_eq!(commits[0].records.len(), 1);
  assert_eq!(commits[0].records[0].rating, Some(4));
  assert_eq!(backend.saved("MR-7", "V-1").rating(), Some(4));
}

#[tokio::test]
async fn test_invalid_rating() {
  let backend = vendor_backend();
  let orchestrator = load(&backend, "MR-7").await;

  let err = orchestrator.set_rating(Some(7)).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert_eq!(orchestrator.sla_rating().unwrap(), None);
}

#[tokio::test]
async fn test_flush_commits_immediately() {
  let backend = vendor_backend();
  let orchestrator = load(&backend, "MR-7").await;

  orchestrator
    .set_sla_field("SLA-2", SlaField::Value, "1d")
    .unwrap();
  orchestrator
    .set_sla_field("SLA-2", SlaField::TechnicianName, "Robin")
    .unwrap();
  orchestrator
    .set_sla_field("SLA-2", SlaField::TechnicianPhone, "555-0000")
    .unwrap();

  assert_eq!(orchestrator.flush().await.unwrap(), 1);
  assert_eq!(backend.saved("MR-7", "V-1").records[0].technician_name, "Robin");
  assert_eq!(orchestrator.flush().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_drops_pending_autosave() {
  let backend = vendor_backend();
  let orchestrator = load(&backend, "MR-7").await;

  orchestrator
    .set_sla_field("SLA-1", SlaField::Value, "4hr")
    .unwrap();
  orchestrator
    .set_sla_field("SLA-1", SlaField::TechnicianName, "Alex")
    .unwrap();
  orchestrator
    .set_sla_field("SLA-1", SlaField::TechnicianPhone, "555-1234")
    .unwrap();
  orchestrator.shutdown();

  tokio::time::sleep(Duration::from_secs(1)).await;
  assert!(backend.commits().is_empty());
  assert!(orchestrator.is_sla_modified("SLA-1").unwrap());
}

#[tokio::test]
async fn test_collapse_with_stale_snapshot() {
  let backend = vendor_backend();
  let orchestrator = load(&backend, "MR-7").await;
  orchestrator
    .set_sla_field("SLA-1", SlaField::Value, "4hr")
    .unwrap();

  let mut snapshot = orchestrator.sla_records().unwrap()[0].clone();
  snapshot.value = "5hr".to_string();
  let outcome = orchestrator.collapse_sla("SLA-1", Some(&snapshot)).unwrap();
  assert!(outcome.stale);
  assert_eq!(outcome.ready, None);
  assert_eq!(orchestrator.sla_records().unwrap()[0].value, "4hr");
}

#[tokio::test]
async fn test_in_house_request_has_no_sla() {
  let backend = Arc::new(InMemoryBackend::new());
  backend.insert_header(linear());
  let orchestrator = load(&backend, "MR-1").await;

  assert!(!orchestrator.has_sla());
  let err = orchestrator
    .set_sla_field("SLA-1", SlaField::Value, "4hr")
    .unwrap_err();
  assert!(matches!(err, OrchestratorError::NoVendor(_)));
  assert_eq!(orchestrator.flush().await.unwrap(), 0);
  assert!(matches!(
    orchestrator.technicians().await,
    Err(OrchestratorError::NoVendor(_))
  ));
}

#[tokio::test]
async fn test_lookups() {
  let backend = vendor_backend();
  backend.insert_checklist(
    "PUMP",
    vec![ChecklistItem {
      item_id: "C1".to_string(),
      label: "Isolate power".to_string(),
      required: true,
    }],
  );
  backend.insert_technicians(
    "V-1",
    vec![Technician {
      technician_id: "T1".to_string(),
      name: "Alex".to_string(),
      phone: Some("555-1234".to_string()),
      certified: true,
    }],
  );
  backend.insert_vendors(
    "PUMP",
    vec![VendorRecord {
      vendor_id: "V-1".to_string(),
      name: "Acme".to_string(),
      active: true,
    }],
  );
  let orchestrator = load(&backend, "MR-7").await;

  assert_eq!(orchestrator.checklist().await.unwrap()[0].item_id, "C1");
  assert_eq!(orchestrator.technicians().await.unwrap()[0].name, "Alex");
  assert_eq!(orchestrator.active_vendors().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_refresh_picks_up_backend_state() {
  let backend = Arc::new(InMemoryBackend::new());
  backend.insert_header(linear());
  let orchestrator = load(&backend, "MR-1").await;

  let mut record = linear();
  record.steps[0].status = StepStatus::Approved;
  record.steps[1].status = StepStatus::Current;
  backend.insert_header(record);

  assert_eq!(orchestrator.refresh().await.unwrap(), HeaderStatus::InProgress);
  assert_eq!(status_of(&orchestrator, "S1"), StepStatus::Approved);
  assert_eq!(status_of(&orchestrator, "S2"), StepStatus::Current);
}
