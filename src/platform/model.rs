//! Chat platform entities as seen by commands.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Platform-wide unique id.
pub type Snowflake = u64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mentionable: bool,
}

impl Role {
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
}

impl Channel {
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

/// An existing ban record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ban {
    pub user_id: Snowflake,
    pub reason: Option<String>,
}

/// An entity the platform resolved on the caller's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResolvedEntity {
    User(User),
    Role(Role),
    Channel(Channel),
}

impl ResolvedEntity {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Role(_) => "role",
            Self::Channel(_) => "channel",
        }
    }
}

/// Entities referenced by an invocation's options, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedEntities(HashMap<Snowflake, ResolvedEntity>);

impl ResolvedEntities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: Snowflake, entity: ResolvedEntity) {
        self.0.insert(id, entity);
    }

    pub fn with(mut self, id: Snowflake, entity: ResolvedEntity) -> Self {
        self.insert(id, entity);
        self
    }

    pub fn get(&self, id: Snowflake) -> Option<&ResolvedEntity> {
        self.0.get(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
