use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use signoff_api::{ApiError, Backend, ChecklistItem, DecisionRequest, SlaCommitter, Technician, VendorRecord};
use signoff_config::{DecisionAction, EngineConfig};
use signoff_sla::{
  AutosaveScheduler, CollapseOutcome, Rating, ReadyToPersist, SharedTracker, SlaField, SlaRecord,
  SlaTracker,
};
use signoff_workflow::{
  Actor, ActorResolver, ApprovalWorkflow, HeaderStatus, Transition, WorkflowStep,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{BusinessRule, OrchestratorError};
use crate::events::{AutosaveBridge, NoopNotifier, Notification, Notifier};

/// SLA tracking for a request with a vendor.
struct SlaSession {
  tracker: SharedTracker,
  scheduler: AutosaveScheduler,
}

/// Clears the in-flight flag when dropped.
struct SubmissionGuard<'a>(&'a AtomicBool);

impl<'a> SubmissionGuard<'a> {
  fn acquire(flag: &'a AtomicBool) -> Option<Self> {
    flag
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| Self(flag))
  }
}

impl Drop for SubmissionGuard<'_> {
  fn drop(&mut self) {
    self.0.store(false, Ordering::Release);
  }
}

/// One request's approval session.
///
/// Owns the workflow state and, when the request has a vendor, its SLA
/// records and autosave. Decisions are validated locally before anything is
/// sent, submitted once, and applied locally only after the backend accepts
/// them. Only one decision may be in flight at a time.
///
/// Generic over `N: Notifier`; [`load`](Orchestrator::load) discards
/// notifications, [`load_with_notifier`](Orchestrator::load_with_notifier)
/// delivers them.
pub struct Orchestrator<B: Backend, N: Notifier = NoopNotifier> {
  header_id: String,
  backend: Arc<B>,
  resolver: ActorResolver,
  workflow: Mutex<ApprovalWorkflow>,
  sla: Option<SlaSession>,
  submitting: AtomicBool,
  /// Idempotency keys of decisions whose outcome is unknown.
  pending_keys: Mutex<HashMap<(String, DecisionAction), String>>,
  notifier: Arc<N>,
}

impl<B: Backend> Orchestrator<B, NoopNotifier> {
  pub async fn load(
    backend: Arc<B>,
    config: EngineConfig,
    header_id: &str,
  ) -> Result<Self, OrchestratorError> {
    Self::load_with_notifier(backend, config, header_id, NoopNotifier).await
  }
}

impl<B: Backend, N: Notifier> Orchestrator<B, N> {
  /// Fetch a request and, if it has a vendor, its agreed and saved SLAs.
  ///
  /// A missing request is [`OrchestratorError::WorkflowNotFound`].
  #[instrument(name = "orchestrator_load", skip(backend, config, notifier))]
  pub async fn load_with_notifier(
    backend: Arc<B>,
    config: EngineConfig,
    header_id: &str,
    notifier: N,
  ) -> Result<Self, OrchestratorError> {
    let record = backend
      .fetch_header(header_id)
      .await
      .map_err(|source| match source {
        ApiError::NotFound(_) => OrchestratorError::WorkflowNotFound(header_id.to_string()),
        source => OrchestratorError::Load {
          header_id: header_id.to_string(),
          source,
        },
      })?;

    let workflow =
      ApprovalWorkflow::from_record(record).map_err(|source| OrchestratorError::InvalidWorkflow {
        header_id: header_id.to_string(),
        source,
      })?;

    let notifier = Arc::new(notifier);
    let sla = match workflow.header().vendor_id.clone() {
      Some(vendor_id) => Some(Self::open_sla(&backend, &config, header_id, &vendor_id, &notifier).await?),
      None => None,
    };

    let status = workflow.status();
    info!(
      header_id = %header_id,
      status = %status,
      steps = workflow.steps().len(),
      has_vendor = sla.is_some(),
      "workflow_loaded"
    );
    notifier.notify(Notification::Loaded {
      header_id: header_id.to_string(),
      status,
    });

    Ok(Self {
      header_id: header_id.to_string(),
      backend,
      resolver: ActorResolver::from_config(&config),
      workflow: Mutex::new(workflow),
      sla,
      submitting: AtomicBool::new(false),
      pending_keys: Mutex::new(HashMap::new()),
      notifier,
    })
  }

  async fn open_sla(
    backend: &Arc<B>,
    config: &EngineConfig,
    header_id: &str,
    vendor_id: &str,
    notifier: &Arc<N>,
  ) -> Result<SlaSession, OrchestratorError> {
    let (agreed, saved) = futures::try_join!(
      backend.agreed_slas(vendor_id),
      backend.saved_sla_records(header_id, vendor_id)
    )
    .map_err(|source| OrchestratorError::Load {
      header_id: header_id.to_string(),
      source,
    })?;

    let mut tracker = SlaTracker::new(header_id, vendor_id, &agreed);
    tracker.seed(&saved);
    let tracker = Arc::new(Mutex::new(tracker));

    let committer: Arc<dyn SlaCommitter> = backend.clone();
    let scheduler = AutosaveScheduler::new(
      tracker.clone(),
      committer,
      Arc::new(AutosaveBridge(notifier.clone())),
      config.autosave.clone(),
    );

    Ok(SlaSession { tracker, scheduler })
  }

  fn workflow(&self) -> MutexGuard<'_, ApprovalWorkflow> {
    self.workflow.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn pending_keys(&self) -> MutexGuard<'_, HashMap<(String, DecisionAction), String>> {
    self.pending_keys.lock().unwrap_or_else(|e| e.into_inner())
  }

  pub fn header_id(&self) -> &str {
    &self.header_id
  }

  pub fn status(&self) -> HeaderStatus {
    self.workflow().status()
  }

  /// A copy of the current workflow state.
  pub fn snapshot(&self) -> ApprovalWorkflow {
    self.workflow().clone()
  }

  /// Current steps `actor` may decide, in step order.
  pub fn actionable_steps(&self, actor: &Actor) -> Vec<WorkflowStep> {
    let workflow = self.workflow();
    self
      .resolver
      .resolvable_steps(&actor.roles, workflow.steps())
      .into_iter()
      .cloned()
      .collect()
  }

  pub fn is_submitting(&self) -> bool {
    self.submitting.load(Ordering::Acquire)
  }

  pub async fn approve(
    &self,
    step_id: &str,
    actor: &Actor,
    note: &str,
  ) -> Result<Transition, OrchestratorError> {
    self.decide(DecisionAction::Approve, step_id, actor, note).await
  }

  pub async fn reject(
    &self,
    step_id: &str,
    actor: &Actor,
    reason: &str,
  ) -> Result<Transition, OrchestratorError> {
    self.decide(DecisionAction::Reject, step_id, actor, reason).await
  }

  #[instrument(
    name = "orchestrator_decide",
    skip(self, actor, note),
    fields(header_id = %self.header_id, actor_id = %actor.user_id)
  )]
  async fn decide(
    &self,
    action: DecisionAction,
    step_id: &str,
    actor: &Actor,
    note: &str,
  ) -> Result<Transition, OrchestratorError> {
    let _guard =
      SubmissionGuard::acquire(&self.submitting).ok_or(OrchestratorError::SubmissionInFlight)?;

    self
      .workflow()
      .check_decision(action, step_id, actor, note, &self.resolver)
      .map(|_| ())?;

    let request = DecisionRequest {
      header_id: self.header_id.clone(),
      step_id: step_id.to_string(),
      action,
      actor_id: actor.user_id.clone(),
      actor_name: actor.name.clone(),
      note: note.trim().to_string(),
      idempotency_key: self.idempotency_key(step_id, action),
    };

    info!(idempotency_key = %request.idempotency_key, "decision_submitted");
    let response = match self.backend.submit_decision(&request).await {
      Ok(response) => response,
      Err(source) => {
        warn!(error = %source, transient = source.is_transient(), "decision_failed");
        let step_id = step_id.to_string();
        return Err(if source.is_transient() {
          OrchestratorError::Transient {
            step_id,
            action,
            source,
          }
        } else {
          OrchestratorError::Submit {
            step_id,
            action,
            source,
          }
        });
      }
    };

    self.pending_keys().remove(&(step_id.to_string(), action));

    if !response.success {
      let rule = if response.is_vendor_inactive() {
        BusinessRule::VendorInactive
      } else {
        BusinessRule::Other {
          code: response.code.clone(),
        }
      };
      let message = response
        .message
        .unwrap_or_else(|| "decision refused".to_string());
      warn!(rule = %rule, message = %message, "decision_refused");
      self.notifier.notify(Notification::DecisionRefused {
        header_id: self.header_id.clone(),
        step_id: step_id.to_string(),
        message: message.clone(),
      });
      return Err(OrchestratorError::BusinessRule {
        step_id: step_id.to_string(),
        rule,
        message,
      });
    }

    let transition = {
      let mut workflow = self.workflow();
      match action {
        DecisionAction::Approve => workflow.approve(step_id, actor, note, &self.resolver)?,
        DecisionAction::Reject => workflow.reject(step_id, actor, note, &self.resolver)?,
      }
    };

    info!(
      activated = ?transition.activated,
      superseded = ?transition.superseded,
      cancelled = ?transition.cancelled,
      status = %transition.status,
      "decision_applied"
    );
    self.notifier.notify(Notification::DecisionApplied {
      header_id: self.header_id.clone(),
      transition: transition.clone(),
    });

    Ok(transition)
  }

  /// Key for a decision, reused until its outcome is known.
  fn idempotency_key(&self, step_id: &str, action: DecisionAction) -> String {
    self
      .pending_keys()
      .entry((step_id.to_string(), action))
      .or_insert_with(|| uuid::Uuid::new_v4().to_string())
      .clone()
  }

  /// Re-read the workflow from the backend.
  ///
  /// Useful after a transient failure, when the backend may have applied
  /// the decision after all.
  #[instrument(name = "orchestrator_refresh", skip(self), fields(header_id = %self.header_id))]
  pub async fn refresh(&self) -> Result<HeaderStatus, OrchestratorError> {
    let _guard =
      SubmissionGuard::acquire(&self.submitting).ok_or(OrchestratorError::SubmissionInFlight)?;

    let record = self
      .backend
      .fetch_header(&self.header_id)
      .await
      .map_err(|source| match source {
        ApiError::NotFound(_) => OrchestratorError::WorkflowNotFound(self.header_id.clone()),
        source => OrchestratorError::Load {
          header_id: self.header_id.clone(),
          source,
        },
      })?;
    let workflow =
      ApprovalWorkflow::from_record(record).map_err(|source| OrchestratorError::InvalidWorkflow {
        header_id: self.header_id.clone(),
        source,
      })?;

    let status = workflow.status();
    *self.workflow() = workflow;
    debug!(status = %status, "workflow_refreshed");
    Ok(status)
  }

  fn session(&self) -> Result<&SlaSession, OrchestratorError> {
    self
      .sla
      .as_ref()
      .ok_or_else(|| OrchestratorError::NoVendor(self.header_id.clone()))
  }

  fn tracker(&self) -> Result<MutexGuard<'_, SlaTracker>, OrchestratorError> {
    Ok(
      self
        .session()?
        .tracker
        .lock()
        .unwrap_or_else(|e| e.into_inner()),
    )
  }

  pub fn has_sla(&self) -> bool {
    self.sla.is_some()
  }

  /// Edit one SLA record field; a record that becomes due is autosaved.
  ///
  /// Outside a tokio runtime the edit is kept but no autosave is scheduled;
  /// [`flush`](Orchestrator::flush) still sends it.
  pub fn set_sla_field(
    &self,
    sla_id: &str,
    field: SlaField,
    value: &str,
  ) -> Result<Option<ReadyToPersist>, OrchestratorError> {
    let ready = self.tracker()?.set_field(sla_id, field, value);
    self.schedule(ready.as_ref())?;
    Ok(ready)
  }

  /// Change the shared rating; `None` clears it.
  pub fn set_rating(&self, rating: Option<u8>) -> Result<Option<ReadyToPersist>, OrchestratorError> {
    let rating = rating.map(Rating::new).transpose()?;
    let ready = self.tracker()?.set_rating(rating);
    self.schedule(ready.as_ref())?;
    Ok(ready)
  }

  /// Close a record's editor, reconciling the caller's view of it.
  pub fn collapse_sla(
    &self,
    sla_id: &str,
    observed: Option<&SlaRecord>,
  ) -> Result<CollapseOutcome, OrchestratorError> {
    let outcome = self.tracker()?.collapse(sla_id, observed)?;
    self.schedule(outcome.ready.as_ref())?;
    Ok(outcome)
  }

  fn schedule(&self, ready: Option<&ReadyToPersist>) -> Result<(), OrchestratorError> {
    if let Some(ready) = ready {
      self.session()?.scheduler.on_ready(ready)?;
    }
    Ok(())
  }

  pub fn sla_records(&self) -> Result<Vec<SlaRecord>, OrchestratorError> {
    Ok(self.tracker()?.records().cloned().collect())
  }

  pub fn sla_rating(&self) -> Result<Option<Rating>, OrchestratorError> {
    Ok(self.tracker()?.rating())
  }

  pub fn is_sla_complete(&self, sla_id: &str) -> Result<bool, OrchestratorError> {
    Ok(self.tracker()?.is_complete(sla_id))
  }

  pub fn is_sla_modified(&self, sla_id: &str) -> Result<bool, OrchestratorError> {
    Ok(self.tracker()?.is_modified(sla_id))
  }

  /// Commit every due SLA record now. Requests without a vendor have
  /// nothing to flush.
  pub async fn flush(&self) -> Result<usize, OrchestratorError> {
    match &self.sla {
      Some(session) => Ok(session.scheduler.flush().await?),
      None => Ok(0),
    }
  }

  /// Cancel pending autosaves. Nothing is committed.
  pub fn shutdown(&self) {
    if let Some(session) = &self.sla {
      session.scheduler.shutdown();
    }
    debug!(header_id = %self.header_id, "orchestrator_shutdown");
  }

  /// Checklist for the request's asset type; empty without one.
  pub async fn checklist(&self) -> Result<Vec<ChecklistItem>, OrchestratorError> {
    let asset_type_id = self.workflow().header().asset_type_id.clone();
    match asset_type_id {
      Some(asset_type_id) => self
        .backend
        .checklist(&asset_type_id)
        .await
        .map_err(OrchestratorError::Lookup),
      None => Ok(Vec::new()),
    }
  }

  /// Active vendors for the request's asset type; empty without one.
  pub async fn active_vendors(&self) -> Result<Vec<VendorRecord>, OrchestratorError> {
    let asset_type_id = self.workflow().header().asset_type_id.clone();
    match asset_type_id {
      Some(asset_type_id) => self
        .backend
        .active_vendors(&asset_type_id)
        .await
        .map_err(OrchestratorError::Lookup),
      None => Ok(Vec::new()),
    }
  }

  /// Technicians of the request's vendor.
  pub async fn technicians(&self) -> Result<Vec<Technician>, OrchestratorError> {
    let vendor_id = self.workflow().header().vendor_id.clone();
    let vendor_id = vendor_id.ok_or_else(|| OrchestratorError::NoVendor(self.header_id.clone()))?;
    self
      .backend
      .technicians(&vendor_id)
      .await
      .map_err(OrchestratorError::Lookup)
  }
}
