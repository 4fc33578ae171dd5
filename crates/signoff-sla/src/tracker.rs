use signoff_api::{AgreedSla, SavedSlaRecords, SlaCommitRecord, SlaCommitRequest};
use tracing::{debug, info, warn};

use crate::error::SlaError;
use crate::record::{Rating, SlaField, SlaRecord};

/// Signal that something is ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyToPersist {
  /// A record became complete and modified.
  Record(String),
  /// The rating changed; every complete record must be re-sent.
  RatingOnly,
}

/// Result of collapsing a record's editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapseOutcome {
  pub ready: Option<ReadyToPersist>,
  /// The caller's snapshot disagreed with the tracked record and was ignored.
  pub stale: bool,
}

#[derive(Debug, Clone)]
struct Entry {
  record: SlaRecord,
  /// Bumped on every field change.
  revision: u64,
  /// Revision last persisted successfully.
  persisted_revision: u64,
  /// Rating revision last persisted with this record.
  persisted_rating_revision: u64,
  /// Claimed by a commit that has not finished yet.
  in_flight: bool,
}

impl Entry {
  fn new(record: SlaRecord) -> Self {
    Self {
      record,
      revision: 0,
      persisted_revision: 0,
      persisted_rating_revision: 0,
      in_flight: false,
    }
  }

  fn is_modified(&self) -> bool {
    self.revision != self.persisted_revision
  }

  fn needs_persist(&self, rating_revision: u64) -> bool {
    self.record.is_complete()
      && (self.is_modified() || self.persisted_rating_revision != rating_revision)
  }
}

#[derive(Debug, Clone)]
struct BatchEntry {
  sla_id: String,
  revision: u64,
  record: SlaCommitRecord,
}

/// Records claimed by one commit.
///
/// Obtained from [`SlaTracker::begin_commit`] and handed back to
/// [`SlaTracker::finish_commit`] once the call returns.
#[derive(Debug, Clone)]
pub struct CommitBatch {
  header_id: String,
  vendor_id: String,
  rating: Option<Rating>,
  rating_revision: u64,
  entries: Vec<BatchEntry>,
}

impl CommitBatch {
  pub fn header_id(&self) -> &str {
    &self.header_id
  }

  pub fn rating(&self) -> Option<Rating> {
    self.rating
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn sla_ids(&self) -> Vec<String> {
    self.entries.iter().map(|e| e.sla_id.clone()).collect()
  }

  pub fn to_request(&self) -> SlaCommitRequest {
    SlaCommitRequest {
      vendor_id: self.vendor_id.clone(),
      header_id: self.header_id.clone(),
      records: self.entries.iter().map(|e| e.record.clone()).collect(),
    }
  }
}

/// SLA records of one (request, vendor) pair with their modification state.
///
/// A record is persisted only when complete. Edits bump a per-record
/// revision; a successful commit advances the persisted revision to what it
/// actually sent, so an edit landing during a commit stays modified.
///
/// At most one commit owns a record at a time. A record edited while its
/// commit is in flight is claimed again only after that commit finishes, so
/// upserts of one record never race each other.
#[derive(Debug, Clone)]
pub struct SlaTracker {
  header_id: String,
  vendor_id: String,
  /// In agreed-SLA order, upserted records appended.
  entries: Vec<Entry>,
  rating: Option<Rating>,
  rating_revision: u64,
}

impl SlaTracker {
  /// Empty records for every agreed SLA.
  pub fn new(header_id: impl Into<String>, vendor_id: impl Into<String>, agreed: &[AgreedSla]) -> Self {
    let entries = agreed
      .iter()
      .map(|sla| Entry::new(SlaRecord::new(&sla.sla_id, Some(sla.agreed_value.clone()))))
      .collect();

    Self {
      header_id: header_id.into(),
      vendor_id: vendor_id.into(),
      entries,
      rating: None,
      rating_revision: 0,
    }
  }

  /// Install previously persisted values as unmodified.
  pub fn seed(&mut self, saved: &SavedSlaRecords) {
    for saved_record in &saved.records {
      let index = self.upsert(&saved_record.sla_id);
      let entry = &mut self.entries[index];
      entry.record.value = saved_record.value.clone();
      entry.record.technician_name = saved_record.technician_name.clone();
      entry.record.technician_phone = saved_record.technician_phone.clone();
      entry.persisted_revision = entry.revision;
    }

    self.rating = match saved.rating().map(Rating::new).transpose() {
      Ok(rating) => rating,
      Err(e) => {
        warn!(header_id = %self.header_id, error = %e, "ignoring saved rating");
        None
      }
    };
    for entry in &mut self.entries {
      entry.persisted_rating_revision = self.rating_revision;
    }

    debug!(
      header_id = %self.header_id,
      records = saved.records.len(),
      "seeded sla records"
    );
  }

  pub fn header_id(&self) -> &str {
    &self.header_id
  }

  pub fn vendor_id(&self) -> &str {
    &self.vendor_id
  }

  pub fn rating(&self) -> Option<Rating> {
    self.rating
  }

  pub fn record(&self, sla_id: &str) -> Option<&SlaRecord> {
    self.entry(sla_id).map(|e| &e.record)
  }

  pub fn records(&self) -> impl Iterator<Item = &SlaRecord> {
    self.entries.iter().map(|e| &e.record)
  }

  /// Unknown SLA ids are never complete.
  pub fn is_complete(&self, sla_id: &str) -> bool {
    self.entry(sla_id).is_some_and(|e| e.record.is_complete())
  }

  /// Whether a field changed since the record was last persisted.
  pub fn is_modified(&self, sla_id: &str) -> bool {
    self.entry(sla_id).is_some_and(|e| e.is_modified())
  }

  /// Whether the record would be included in the next commit.
  pub fn needs_persist(&self, sla_id: &str) -> bool {
    self
      .entry(sla_id)
      .is_some_and(|e| e.needs_persist(self.rating_revision))
  }

  /// Whether any record would be included in the next commit.
  pub fn has_unsaved(&self) -> bool {
    self
      .entries
      .iter()
      .any(|e| e.needs_persist(self.rating_revision))
  }

  /// Set one field, creating the record if the SLA is not known yet.
  ///
  /// Setting a field to its current content changes nothing and returns
  /// `None`.
  pub fn set_field(&mut self, sla_id: &str, field: SlaField, value: &str) -> Option<ReadyToPersist> {
    let index = self.upsert(sla_id);
    let entry = &mut self.entries[index];
    if !entry.record.set(field, value) {
      return None;
    }
    entry.revision += 1;

    if entry.record.is_complete() {
      Some(ReadyToPersist::Record(sla_id.to_string()))
    } else {
      None
    }
  }

  /// Change the shared rating.
  ///
  /// Records are not marked modified, but every complete record becomes due
  /// for persistence with the new rating.
  pub fn set_rating(&mut self, rating: Option<Rating>) -> Option<ReadyToPersist> {
    if self.rating == rating {
      return None;
    }
    self.rating = rating;
    self.rating_revision += 1;

    if self.entries.iter().any(|e| e.record.is_complete()) {
      Some(ReadyToPersist::RatingOnly)
    } else {
      None
    }
  }

  /// Re-check a record when its editor is closed.
  ///
  /// `observed` is what the caller believes the record holds; a mismatch is
  /// reported and the tracked record wins.
  pub fn collapse(
    &self,
    sla_id: &str,
    observed: Option<&SlaRecord>,
  ) -> Result<CollapseOutcome, SlaError> {
    let entry = self
      .entry(sla_id)
      .ok_or_else(|| SlaError::UnknownSla(sla_id.to_string()))?;

    let stale = observed.is_some_and(|o| !o.same_fields(&entry.record));
    if stale {
      warn!(
        header_id = %self.header_id,
        sla_id = %sla_id,
        "stale sla snapshot ignored"
      );
    }

    let ready = (entry.record.is_complete() && entry.is_modified())
      .then(|| ReadyToPersist::Record(sla_id.to_string()));

    Ok(CollapseOutcome { ready, stale })
  }

  /// Claim every record needing persistence that no other commit owns.
  pub fn begin_commit(&mut self) -> Option<CommitBatch> {
    let rating_revision = self.rating_revision;
    let rating = self.rating.map(u8::from);

    let mut entries = Vec::new();
    for entry in &mut self.entries {
      if entry.in_flight || !entry.needs_persist(rating_revision) {
        continue;
      }
      entry.in_flight = true;
      entries.push(BatchEntry {
        sla_id: entry.record.sla_id.clone(),
        revision: entry.revision,
        record: SlaCommitRecord {
          sla_id: entry.record.sla_id.clone(),
          value: entry.record.value.trim().to_string(),
          technician_name: entry.record.technician_name.trim().to_string(),
          technician_phone: entry.record.technician_phone.trim().to_string(),
          rating,
        },
      });
    }

    if entries.is_empty() {
      return None;
    }

    Some(CommitBatch {
      header_id: self.header_id.clone(),
      vendor_id: self.vendor_id.clone(),
      rating: self.rating,
      rating_revision,
      entries,
    })
  }

  /// Release a batch. On success the sent revisions become persisted.
  pub fn finish_commit(&mut self, batch: &CommitBatch, succeeded: bool) {
    for sent in &batch.entries {
      let Some(entry) = self.entries.iter_mut().find(|e| e.record.sla_id == sent.sla_id) else {
        continue;
      };
      entry.in_flight = false;
      if succeeded {
        entry.persisted_revision = sent.revision;
        entry.persisted_rating_revision = batch.rating_revision;
      }
    }

    if succeeded {
      info!(
        header_id = %self.header_id,
        records = batch.entries.len(),
        "sla records persisted"
      );
    }
  }

  fn entry(&self, sla_id: &str) -> Option<&Entry> {
    self.entries.iter().find(|e| e.record.sla_id == sla_id)
  }

  fn upsert(&mut self, sla_id: &str) -> usize {
    match self.entries.iter().position(|e| e.record.sla_id == sla_id) {
      Some(index) => index,
      None => {
        self.entries.push(Entry::new(SlaRecord::new(sla_id, None)));
        self.entries.len() - 1
      }
    }
  }
}
