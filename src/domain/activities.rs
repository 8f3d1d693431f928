//! Activity registry and membership records.
//!
//! Memberships are stored inside the user document as a JSON array. Two shapes
//! have accumulated over time and both stay valid:
//!
//! - a bare activity name: `"Chess"`
//! - a structured record: `{ "name": "Chess", "limit": 5 }`
//!
//! [`MembershipRecord`] decodes either shape, and anything else lands in
//! [`MembershipRecord::Malformed`] so one bad element never poisons the user.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::error::DomainError;

/// Activities tracked when no registry is configured.
pub const DEFAULT_ACTIVITIES: [&str; 7] = [
    "Chess",
    "Football",
    "Dance",
    "Hockey",
    "Volleyball",
    "Hiking",
    "Travel",
];

/// A single entry of a user's `activities` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MembershipRecord {
    Name(String),
    Limited {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
    },
    Malformed(Value),
}

impl<'de> Deserialize<'de> for MembershipRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

impl MembershipRecord {
    /// Classify one raw array element. Never fails.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(name) => Self::Name(name),
            Value::Object(ref map) => match structured_parts(map) {
                Some((name, limit)) => Self::Limited { name, limit },
                None => Self::Malformed(value),
            },
            other => Self::Malformed(other),
        }
    }

    pub fn plain(name: &ActivityName) -> Self {
        Self::Name(name.as_str().to_string())
    }

    pub fn limited(name: &ActivityName, limit: u32) -> Self {
        Self::Limited {
            name: name.as_str().to_string(),
            limit: Some(limit),
        }
    }

    /// Activity name carried by the record, if it has a recognizable shape.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Name(name) | Self::Limited { name, .. } => Some(name.as_str()),
            Self::Malformed(_) => None,
        }
    }

    pub fn matches(&self, activity: &str) -> bool {
        self.name() == Some(activity)
    }

    /// Capacity limit recorded on a structured entry. Zero means "not set".
    pub fn limit(&self) -> Option<u32> {
        match self {
            Self::Limited { limit, .. } => limit.filter(|value| *value > 0),
            Self::Name(_) | Self::Malformed(_) => None,
        }
    }
}

/// `{ "name": <string>, "limit": <u32 | null | absent> }`
fn structured_parts(map: &Map<String, Value>) -> Option<(String, Option<u32>)> {
    let name = map.get("name")?.as_str()?.to_string();
    let limit = match map.get("limit") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(u32::try_from(raw.as_u64()?).ok()?),
    };
    Some((name, limit))
}

/// Name of an activity known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityName(String);

impl ActivityName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ActivityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Ordered list of tracked activities.
///
/// Order is significant: counts are reported and evictions evaluated in
/// registry order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRegistry {
    names: Vec<ActivityName>,
}

impl ActivityRegistry {
    pub fn new<I, S>(names: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut collected: Vec<ActivityName> = Vec::new();
        for raw in names {
            let raw = raw.into();
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(DomainError::validation("activity name must not be empty"));
            }
            if collected.iter().any(|existing| existing.as_str() == trimmed) {
                return Err(DomainError::validation(format!(
                    "activity `{trimmed}` is listed more than once"
                )));
            }
            collected.push(ActivityName(trimmed.to_string()));
        }

        if collected.is_empty() {
            return Err(DomainError::validation(
                "activity registry must list at least one activity",
            ));
        }

        Ok(Self { names: collected })
    }

    /// Resolve a raw name against the registry.
    pub fn resolve(&self, raw: &str) -> Option<&ActivityName> {
        let raw = raw.trim();
        self.names.iter().find(|name| name.as_str() == raw)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityName> {
        self.names.iter()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for ActivityRegistry {
    fn default() -> Self {
        Self {
            names: DEFAULT_ACTIVITIES
                .iter()
                .map(|name| ActivityName((*name).to_string()))
                .collect(),
        }
    }
}
