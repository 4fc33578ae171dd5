use std::collections::BTreeSet;

use signoff_config::{ActorConfig, RoleId};

/// A user taking decisions, identified by id and carrying a role set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
  pub user_id: String,
  pub name: String,
  pub roles: BTreeSet<RoleId>,
}

impl Actor {
  pub fn new<R: Into<RoleId>>(
    user_id: impl Into<String>,
    name: impl Into<String>,
    roles: impl IntoIterator<Item = R>,
  ) -> Self {
    Self {
      user_id: user_id.into(),
      name: name.into(),
      roles: roles.into_iter().map(Into::into).collect(),
    }
  }
}

impl From<ActorConfig> for Actor {
  fn from(config: ActorConfig) -> Self {
    Self {
      user_id: config.user_id,
      name: config.name,
      roles: config.roles,
    }
  }
}
