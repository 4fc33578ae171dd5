/// Errors talking to the approval backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  /// The requested record does not exist.
  #[error("not found: {0}")]
  NotFound(String),

  /// The request could not be sent or its response read.
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The backend answered with a non-success status.
  #[error("unexpected status {status}: {body}")]
  Status { status: u16, body: String },

  /// The response body did not have the expected shape.
  #[error("invalid response: {0}")]
  Decode(String),

  #[error("backend unavailable: {0}")]
  Unavailable(String),

  #[error("invalid base url: {0}")]
  InvalidUrl(String),
}

impl ApiError {
  /// Whether repeating the same call later may succeed.
  pub fn is_transient(&self) -> bool {
    match self {
      ApiError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
      ApiError::Status { status, .. } => *status >= 500 || *status == 429,
      ApiError::Unavailable(_) => true,
      ApiError::NotFound(_) | ApiError::Decode(_) | ApiError::InvalidUrl(_) => false,
    }
  }
}
