use signoff_api::ApiError;

/// Errors from SLA record tracking and persistence.
#[derive(Debug, thiserror::Error)]
pub enum SlaError {
  #[error("unknown SLA '{0}'")]
  UnknownSla(String),

  #[error("rating must be between 1 and 5, got {0}")]
  InvalidRating(u8),

  #[error("unknown SLA field '{0}'")]
  UnknownField(String),

  #[error("autosave must be scheduled from within a tokio runtime")]
  NoRuntime,

  /// A commit failed; the listed records stay flagged as modified.
  #[error("failed to commit SLA records {sla_ids:?}: {source}")]
  Commit {
    sla_ids: Vec<String>,
    #[source]
    source: ApiError,
  },
}

impl SlaError {
  /// Whether the failed operation may succeed if repeated.
  pub fn is_transient(&self) -> bool {
    match self {
      SlaError::Commit { source, .. } => source.is_transient(),
      _ => false,
    }
  }
}
