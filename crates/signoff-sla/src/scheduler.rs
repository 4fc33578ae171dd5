use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use signoff_api::SlaCommitter;
use signoff_config::AutosaveConfig;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SlaError;
use crate::events::{AutosaveEvent, AutosaveNotifier};
use crate::tracker::{ReadyToPersist, SlaTracker};

/// Tracker handle shared between its owner and the scheduler.
pub type SharedTracker = Arc<Mutex<SlaTracker>>;

/// What caused a commit to be scheduled; each class has its own timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerClass {
  Field,
  Rating,
}

impl From<&ReadyToPersist> for TriggerClass {
  fn from(ready: &ReadyToPersist) -> Self {
    match ready {
      ReadyToPersist::Record(_) => TriggerClass::Field,
      ReadyToPersist::RatingOnly => TriggerClass::Rating,
    }
  }
}

#[derive(Debug)]
struct PendingTimer {
  cancel: CancellationToken,
  generation: u64,
}

struct Inner {
  tracker: SharedTracker,
  committer: Arc<dyn SlaCommitter>,
  notifier: Arc<dyn AutosaveNotifier>,
  config: AutosaveConfig,
  timers: Mutex<HashMap<TriggerClass, PendingTimer>>,
  generation: AtomicU64,
  /// Held for the duration of a commit.
  commit_lock: tokio::sync::Mutex<()>,
  shutdown: CancellationToken,
}

/// Debounced background persistence of SLA records.
///
/// Scheduling a class replaces that class's pending timer; when a timer
/// fires, every record due for persistence goes out in one commit. Failed
/// commits are not retried.
///
/// Commits run one at a time. A timer firing while a commit is under way
/// waits for it, then sends whatever is still due, so an edit made during a
/// commit goes out after it.
///
/// Dropping the scheduler cancels pending timers. A commit already under way
/// runs to completion.
pub struct AutosaveScheduler {
  inner: Arc<Inner>,
}

impl AutosaveScheduler {
  pub fn new(
    tracker: SharedTracker,
    committer: Arc<dyn SlaCommitter>,
    notifier: Arc<dyn AutosaveNotifier>,
    config: AutosaveConfig,
  ) -> Self {
    Self {
      inner: Arc::new(Inner {
        tracker,
        committer,
        notifier,
        config,
        timers: Mutex::new(HashMap::new()),
        generation: AtomicU64::new(0),
        commit_lock: tokio::sync::Mutex::new(()),
        shutdown: CancellationToken::new(),
      }),
    }
  }

  pub fn tracker(&self) -> &SharedTracker {
    &self.inner.tracker
  }

  fn delay(&self, class: TriggerClass) -> Duration {
    match class {
      TriggerClass::Field => self.inner.config.field_debounce(),
      TriggerClass::Rating => self.inner.config.rating_debounce(),
    }
  }

  /// Start or restart the timer of `class`.
  ///
  /// Fails with [`SlaError::NoRuntime`] outside a tokio runtime. Ignored
  /// after shutdown.
  pub fn schedule(&self, class: TriggerClass) -> Result<(), SlaError> {
    if self.inner.shutdown.is_cancelled() {
      debug!(?class, "autosave shut down, not scheduling");
      return Ok(());
    }
    let runtime = Handle::try_current().map_err(|_| SlaError::NoRuntime)?;

    let cancel = self.inner.shutdown.child_token();
    let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
    let delay = self.delay(class);

    let replaced = self.inner.timers().insert(
      class,
      PendingTimer {
        cancel: cancel.clone(),
        generation,
      },
    );
    if let Some(previous) = replaced {
      previous.cancel.cancel();
      debug!(?class, "pending autosave superseded");
    }

    let inner = Arc::clone(&self.inner);
    runtime.spawn(async move {
      tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(delay) => {}
      }
      inner.clear_timer(class, generation);

      let _serial = inner.commit_lock.lock().await;
      if cancel.is_cancelled() {
        return;
      }
      // outcome goes to the notifier
      let _ = inner.commit().await;
    });
    Ok(())
  }

  /// Schedule the timer matching a tracker signal.
  pub fn on_ready(&self, ready: &ReadyToPersist) -> Result<(), SlaError> {
    self.schedule(TriggerClass::from(ready))
  }

  pub fn is_scheduled(&self, class: TriggerClass) -> bool {
    self.inner.timers().contains_key(&class)
  }

  /// Cancel pending timers and commit now.
  ///
  /// Waits for a commit already under way before sending what is still due.
  /// Returns the number of records this call sent, zero when nothing was due.
  pub async fn flush(&self) -> Result<usize, SlaError> {
    self.inner.cancel_timers();
    let _serial = self.inner.commit_lock.lock().await;
    self.inner.commit().await
  }

  /// Cancel pending timers. Later `schedule` calls are ignored.
  pub fn shutdown(&self) {
    if !self.inner.shutdown.is_cancelled() {
      debug!("autosave shutting down");
    }
    self.inner.shutdown.cancel();
    self.inner.cancel_timers();
  }
}

impl Drop for AutosaveScheduler {
  fn drop(&mut self) {
    self.shutdown();
  }
}

impl Inner {
  fn timers(&self) -> MutexGuard<'_, HashMap<TriggerClass, PendingTimer>> {
    self.timers.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn tracker(&self) -> MutexGuard<'_, SlaTracker> {
    self.tracker.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn clear_timer(&self, class: TriggerClass, generation: u64) {
    let mut timers = self.timers();
    if timers.get(&class).is_some_and(|t| t.generation == generation) {
      timers.remove(&class);
    }
  }

  fn cancel_timers(&self) {
    for (_, timer) in self.timers().drain() {
      timer.cancel.cancel();
    }
  }

  /// Callers hold `commit_lock`.
  async fn commit(&self) -> Result<usize, SlaError> {
    let batch = self.tracker().begin_commit();
    let Some(batch) = batch else {
      debug!("nothing to autosave");
      return Ok(0);
    };

    let header_id = batch.header_id().to_string();
    let sla_ids = batch.sla_ids();
    self.notifier.notify(AutosaveEvent::CommitStarted {
      header_id: header_id.clone(),
      sla_ids: sla_ids.clone(),
    });

    let result = self.committer.commit_sla(&batch.to_request()).await;
    self.tracker().finish_commit(&batch, result.is_ok());

    match result {
      Ok(()) => {
        info!(header_id = %header_id, records = sla_ids.len(), "autosave committed");
        self.notifier.notify(AutosaveEvent::Committed {
          header_id,
          sla_ids: sla_ids.clone(),
        });
        Ok(sla_ids.len())
      }
      Err(e) => {
        warn!(header_id = %header_id, sla_ids = ?sla_ids, error = %e, "autosave failed");
        self.notifier.notify(AutosaveEvent::CommitFailed {
          header_id,
          sla_ids: sla_ids.clone(),
          error: e.to_string(),
        });
        Err(SlaError::Commit { sla_ids, source: e })
      }
    }
  }
}
