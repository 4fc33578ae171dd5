use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use signoff_config::{
  DecisionAction, EdgeDef, HeaderRecord, RequestKind, RoleId, StepDef, StepStatus, Subject,
};

use crate::actor::Actor;
use crate::error::WorkflowError;
use crate::graph::StepGraph;
use crate::resolver::ActorResolver;

/// Overall status of a request, always derived from its steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderStatus {
  InProgress,
  Completed,
  Rejected,
}

impl fmt::Display for HeaderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HeaderStatus::InProgress => f.write_str("in progress"),
      HeaderStatus::Completed => f.write_str("completed"),
      HeaderStatus::Rejected => f.write_str("rejected"),
    }
  }
}

/// Who acted on a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorStamp {
  pub user_id: String,
  pub name: String,
}

/// One approval step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
  pub step_id: String,
  pub sequence: u32,
  pub role_id: RoleId,
  pub status: StepStatus,
  pub acted_by: Option<ActorStamp>,
  pub acted_at: Option<DateTime<Utc>>,
  pub note: Option<String>,
}

impl From<StepDef> for WorkflowStep {
  fn from(def: StepDef) -> Self {
    let acted_by = def.acted_by_id.map(|user_id| ActorStamp {
      name: def.acted_by_name.unwrap_or_default(),
      user_id,
    });
    Self {
      step_id: def.step_id,
      sequence: def.sequence,
      role_id: def.role_id,
      status: def.status,
      acted_by,
      acted_at: def.acted_at,
      note: def.note,
    }
  }
}

impl From<&WorkflowStep> for StepDef {
  fn from(step: &WorkflowStep) -> Self {
    Self {
      step_id: step.step_id.clone(),
      sequence: step.sequence,
      role_id: step.role_id.clone(),
      status: step.status,
      acted_by_id: step.acted_by.as_ref().map(|a| a.user_id.clone()),
      acted_by_name: step.acted_by.as_ref().map(|a| a.name.clone()),
      acted_at: step.acted_at,
      note: step.note.clone(),
    }
  }
}

/// Request-level attributes of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowHeader {
  pub header_id: String,
  pub kind: RequestKind,
  pub subject: Subject,
  pub asset_type_id: Option<String>,
  pub vendor_id: Option<String>,
  pub due_date: Option<NaiveDate>,
  pub cutoff_date: Option<NaiveDate>,
}

/// What a decision changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
  pub step_id: String,
  pub action: DecisionAction,
  /// Steps that became current.
  pub activated: Vec<String>,
  /// Steps that left the current set (or were bypassed) without a decision.
  pub superseded: Vec<String>,
  /// Steps terminated by a rejection.
  pub cancelled: Vec<String>,
  pub status: HeaderStatus,
}

/// The approval state machine for one request.
///
/// Steps are kept in sequence order. Only [`approve`](Self::approve) and
/// [`reject`](Self::reject) change them, and both validate completely
/// before touching anything.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalWorkflow {
  header: WorkflowHeader,
  steps: Vec<WorkflowStep>,
  graph: StepGraph,
}

impl ApprovalWorkflow {
  /// Build a workflow from its stored record.
  ///
  /// A record whose steps are all still pending is a fresh request: its entry
  /// steps become current.
  pub fn from_record(record: HeaderRecord) -> Result<Self, WorkflowError> {
    let mut steps: Vec<WorkflowStep> = record.steps.into_iter().map(WorkflowStep::from).collect();
    steps.sort_by(|a, b| {
      a.sequence
        .cmp(&b.sequence)
        .then_with(|| a.step_id.cmp(&b.step_id))
    });

    let edges: Vec<(String, String)> = record
      .edges
      .into_iter()
      .map(|e| (e.from, e.to))
      .collect();
    let graph = StepGraph::build(&steps, &edges)?;

    if steps.iter().all(|s| s.status == StepStatus::Pending) {
      for step in steps.iter_mut() {
        if graph.entry_points().contains(&step.step_id) {
          step.status = StepStatus::Current;
        }
      }
    }

    let header = WorkflowHeader {
      header_id: record.header_id,
      kind: record.kind,
      subject: record.subject,
      asset_type_id: record.asset_type_id,
      vendor_id: record.vendor_id,
      due_date: record.due_date,
      cutoff_date: record.cutoff_date,
    };

    Ok(Self {
      header,
      steps,
      graph,
    })
  }

  /// Convert back into the stored shape (edges are always written out).
  pub fn to_record(&self) -> HeaderRecord {
    HeaderRecord {
      header_id: self.header.header_id.clone(),
      kind: self.header.kind,
      subject: self.header.subject.clone(),
      asset_type_id: self.header.asset_type_id.clone(),
      vendor_id: self.header.vendor_id.clone(),
      due_date: self.header.due_date,
      cutoff_date: self.header.cutoff_date,
      steps: self.steps.iter().map(StepDef::from).collect(),
      edges: self
        .graph
        .edges()
        .iter()
        .map(|(from, to)| EdgeDef {
          from: from.clone(),
          to: to.clone(),
        })
        .collect(),
    }
  }

  pub fn header(&self) -> &WorkflowHeader {
    &self.header
  }

  pub fn header_id(&self) -> &str {
    &self.header.header_id
  }

  pub fn steps(&self) -> &[WorkflowStep] {
    &self.steps
  }

  pub fn step(&self, step_id: &str) -> Option<&WorkflowStep> {
    self.steps.iter().find(|s| s.step_id == step_id)
  }

  pub fn graph(&self) -> &StepGraph {
    &self.graph
  }

  /// The steps actionable now.
  pub fn current_steps(&self) -> Vec<&WorkflowStep> {
    self
      .steps
      .iter()
      .filter(|s| s.status == StepStatus::Current)
      .collect()
  }

  pub fn status(&self) -> HeaderStatus {
    if self.steps.iter().any(|s| s.status == StepStatus::Rejected) {
      return HeaderStatus::Rejected;
    }
    let open = self
      .steps
      .iter()
      .any(|s| matches!(s.status, StepStatus::Pending | StepStatus::Current));
    let approved = self.steps.iter().any(|s| s.status == StepStatus::Approved);
    if !open && approved {
      HeaderStatus::Completed
    } else {
      HeaderStatus::InProgress
    }
  }

  /// Validate a decision without applying it.
  pub fn check_decision(
    &self,
    action: DecisionAction,
    step_id: &str,
    actor: &Actor,
    note: &str,
    resolver: &ActorResolver,
  ) -> Result<&WorkflowStep, WorkflowError> {
    if note.trim().is_empty() {
      return Err(WorkflowError::EmptyNote {
        step_id: step_id.to_string(),
        action,
      });
    }

    let status = self.status();
    if status != HeaderStatus::InProgress {
      return Err(WorkflowError::Terminated {
        header_id: self.header.header_id.clone(),
        status,
      });
    }

    let step = self
      .step(step_id)
      .ok_or_else(|| WorkflowError::StepNotFound(step_id.to_string()))?;

    if step.status != StepStatus::Current {
      return Err(WorkflowError::StepNotCurrent {
        step_id: step_id.to_string(),
        status: step.status,
      });
    }

    if !resolver.can_act(&actor.roles, step) {
      return Err(WorkflowError::RoleMismatch {
        step_id: step_id.to_string(),
        required_role: step.role_id.clone(),
      });
    }

    Ok(step)
  }

  /// Approve a current step.
  ///
  /// Sibling current steps are superseded and the approved step's pending
  /// successors become current. When nothing is left current, steps never
  /// reached are superseded and the request is complete.
  pub fn approve(
    &mut self,
    step_id: &str,
    actor: &Actor,
    note: &str,
    resolver: &ActorResolver,
  ) -> Result<Transition, WorkflowError> {
    self.check_decision(DecisionAction::Approve, step_id, actor, note, resolver)?;
    self.stamp(step_id, StepStatus::Approved, actor, note);

    let mut superseded = Vec::new();
    for step in self.steps.iter_mut() {
      if step.status == StepStatus::Current && step.step_id != step_id {
        step.status = StepStatus::Superseded;
        superseded.push(step.step_id.clone());
      }
    }

    let downstream = self.graph.downstream(step_id);
    let mut activated = Vec::new();
    for step in self.steps.iter_mut() {
      if step.status == StepStatus::Pending && downstream.contains(&step.step_id) {
        step.status = StepStatus::Current;
        activated.push(step.step_id.clone());
      }
    }

    if activated.is_empty() && !self.steps.iter().any(|s| s.status == StepStatus::Current) {
      for step in self.steps.iter_mut() {
        if step.status == StepStatus::Pending {
          step.status = StepStatus::Superseded;
          superseded.push(step.step_id.clone());
        }
      }
    }

    Ok(Transition {
      step_id: step_id.to_string(),
      action: DecisionAction::Approve,
      activated,
      superseded,
      cancelled: Vec::new(),
      status: self.status(),
    })
  }

  /// Reject a current step, terminating the request.
  pub fn reject(
    &mut self,
    step_id: &str,
    actor: &Actor,
    reason: &str,
    resolver: &ActorResolver,
  ) -> Result<Transition, WorkflowError> {
    self.check_decision(DecisionAction::Reject, step_id, actor, reason, resolver)?;
    self.stamp(step_id, StepStatus::Rejected, actor, reason);

    let mut cancelled = Vec::new();
    for step in self.steps.iter_mut() {
      if matches!(step.status, StepStatus::Pending | StepStatus::Current) {
        step.status = StepStatus::Cancelled;
        cancelled.push(step.step_id.clone());
      }
    }

    Ok(Transition {
      step_id: step_id.to_string(),
      action: DecisionAction::Reject,
      activated: Vec::new(),
      superseded: Vec::new(),
      cancelled,
      status: self.status(),
    })
  }

  fn stamp(&mut self, step_id: &str, status: StepStatus, actor: &Actor, note: &str) {
    if let Some(step) = self.steps.iter_mut().find(|s| s.step_id == step_id) {
      step.status = status;
      step.acted_by = Some(ActorStamp {
        user_id: actor.user_id.clone(),
        name: actor.name.clone(),
      });
      step.acted_at = Some(Utc::now());
      step.note = Some(note.trim().to_string());
    }
  }
}
