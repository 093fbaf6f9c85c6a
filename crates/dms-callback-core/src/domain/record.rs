//! Task record: the pending-callback state held in the token store.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::EventError;

/// Opaque callback token issued by the workflow engine.
///
/// Never empty: the only constructor rejects blank input, so every
/// `TaskRecord` carries a token that can be handed back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskToken(String);

impl TaskToken {
    pub fn new(token: impl Into<String>) -> Result<Self, EventError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(EventError::EmptyField("token"));
        }
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskToken {
    type Error = EventError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskToken> for String {
    fn from(token: TaskToken) -> Self {
        token.0
    }
}

impl fmt::Display for TaskToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attribute the task identifier is stored under: the same name the
/// registration event carries it in.
pub use super::signal::REPLICATION_TASK_ARN_KEY as DEFAULT_KEY_ATTRIBUTE;

/// Address of one record: table, key attribute and task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub table: String,
    pub attribute: String,
    pub task_id: String,
}

impl RecordKey {
    pub fn new(
        table: impl Into<String>,
        attribute: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            attribute: attribute.into(),
            task_id: task_id.into(),
        }
    }

    /// Key using the default `replicationTaskArn` attribute.
    pub fn for_task(table: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self::new(table, DEFAULT_KEY_ATTRIBUTE, task_id)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}={}]", self.table, self.attribute, self.task_id)
    }
}

/// A pending callback.
///
/// Design:
/// - Written once at registration, read once and deleted by the resolution cycle.
/// - No update-in-place: a second registration replaces the whole record.
/// - `expire_at` is enforced by the store, the resolver only computes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub token: TaskToken,

    #[serde(rename = "ignoreDmsTaskFailure", default)]
    pub ignore_failure: bool,

    /// ISO-8601 UTC, e.g. `2024-01-01T00:00:00Z`.
    #[serde(rename = "createdAt")]
    pub created_at: String,

    /// Epoch seconds UTC.
    #[serde(rename = "expireAt")]
    pub expire_at: i64,
}

impl TaskRecord {
    pub fn new(token: TaskToken, ignore_failure: bool, created_at: String, expire_at: i64) -> Self {
        Self {
            token,
            ignore_failure,
            created_at,
            expire_at,
        }
    }

    /// Whether the store should treat this record as gone at `now_epoch_secs`.
    pub fn is_expired_at(&self, now_epoch_secs: i64) -> bool {
        self.expire_at <= now_epoch_secs
    }
}
