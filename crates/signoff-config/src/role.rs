use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a job role.
///
/// Steps are gated by role, never by a specific user; a user may act on a
/// step when their role set contains the step's role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(String);

impl RoleId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for RoleId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for RoleId {
  fn from(id: &str) -> Self {
    Self::new(id)
  }
}

impl From<String> for RoleId {
  fn from(id: String) -> Self {
    Self(id)
  }
}
