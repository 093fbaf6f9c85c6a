//! Inbound signal: the three shapes a decoded trigger event can take.
//!
//! The event is an already-decoded JSON object. Its shape is decided by which
//! fields are present, not by a tag:
//!
//! - `token` present: a registration from the workflow step that started the task.
//! - `detail.eventType == REPLICATION_TASK_FAILED`: a platform failure report.
//! - anything else: a stoppage report carrying `detail.eventId`.
//!
//! ```json
//! { "token": "t", "replicationTaskArn": "arn", "ignoreDmsTaskFailure": false, "tokenExpiryDays": "5" }
//! { "resources": ["arn"], "detail": { "eventId": "DMS-EVENT-0079" } }
//! { "resources": ["arn"], "detail": { "eventType": "REPLICATION_TASK_FAILED", "detailMessage": "..." } }
//! ```

use serde_json::{Map, Value};

use super::errors::EventError;
use super::record::TaskToken;

pub const TASK_TOKEN_KEY: &str = "token";
pub const REPLICATION_TASK_ARN_KEY: &str = "replicationTaskArn";
pub const IGNORE_DMS_TASK_FAILURE_KEY: &str = "ignoreDmsTaskFailure";
pub const TOKEN_EXPIRY_DAYS_KEY: &str = "tokenExpiryDays";
pub const DEFAULT_TOKEN_EXPIRY_DAYS: u32 = 5;

pub const RESOURCES_KEY: &str = "resources";
pub const DETAIL_KEY: &str = "detail";
pub const EVENT_ID_KEY: &str = "eventId";
pub const EVENT_TYPE_KEY: &str = "eventType";
pub const DETAIL_MESSAGE_KEY: &str = "detailMessage";

pub const TASK_FAILURE_EVENT_TYPE: &str = "REPLICATION_TASK_FAILED";
pub const FAILURE_MESSAGE_PLACEHOLDER: &str = "N/A";

pub const STOPPAGE_ERROR_EVENT_ID: &str = "DMS-EVENT-0078";
pub const SUCCESS_EVENT_ID: &str = "DMS-EVENT-0079";

/// Classification of a stoppage event id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopEventKind {
    Success,
    StoppageError,
    /// Unrecognized ids are benign completions.
    Other,
}

impl StopEventKind {
    /// Case-insensitive match against the two known event ids.
    pub fn classify(event_id: &str) -> Self {
        if event_id.eq_ignore_ascii_case(STOPPAGE_ERROR_EVENT_ID) {
            StopEventKind::StoppageError
        } else if event_id.eq_ignore_ascii_case(SUCCESS_EVENT_ID) {
            StopEventKind::Success
        } else {
            StopEventKind::Other
        }
    }
}

/// A decoded trigger event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundSignal {
    Register {
        token: TaskToken,
        task_id: String,
        ignore_failure: bool,
        /// `None` means "use the configured default".
        expiry_days: Option<u32>,
    },
    Failure {
        task_id: String,
        message: String,
    },
    Stop {
        task_id: String,
        event_id: String,
    },
}

impl InboundSignal {
    pub fn task_id(&self) -> &str {
        match self {
            InboundSignal::Register { task_id, .. }
            | InboundSignal::Failure { task_id, .. }
            | InboundSignal::Stop { task_id, .. } => task_id,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundSignal::Register { .. } => "register",
            InboundSignal::Failure { .. } => "failure",
            InboundSignal::Stop { .. } => "stop",
        }
    }

    /// Decode a trigger event.
    ///
    /// The task identifier is resolved first for every shape, so an event with
    /// neither `replicationTaskArn` nor a usable `resources` list is rejected
    /// before anything else is looked at.
    pub fn from_event(event: &Value) -> Result<Self, EventError> {
        let event = event.as_object().ok_or(EventError::NotAnObject)?;
        let task_id = match optional_str(event, REPLICATION_TASK_ARN_KEY)? {
            Some(arn) => arn.to_string(),
            None => first_resource(event)?,
        };

        if let Some(token) = optional_str(event, TASK_TOKEN_KEY)? {
            return Ok(InboundSignal::Register {
                token: TaskToken::new(token)?,
                task_id,
                ignore_failure: optional_bool(event, IGNORE_DMS_TASK_FAILURE_KEY)?.unwrap_or(false),
                expiry_days: optional_days(event, TOKEN_EXPIRY_DAYS_KEY)?,
            });
        }

        let detail = required_object(event, DETAIL_KEY)?;
        let is_failure = optional_str(detail, EVENT_TYPE_KEY)?
            .is_some_and(|t| t.eq_ignore_ascii_case(TASK_FAILURE_EVENT_TYPE));

        if is_failure {
            let message = optional_str(detail, DETAIL_MESSAGE_KEY)?
                .unwrap_or(FAILURE_MESSAGE_PLACEHOLDER)
                .to_string();
            Ok(InboundSignal::Failure { task_id, message })
        } else {
            let event_id = optional_str(detail, EVENT_ID_KEY)?
                .ok_or(EventError::MissingField(EVENT_ID_KEY))?
                .to_string();
            Ok(InboundSignal::Stop { task_id, event_id })
        }
    }
}

fn first_resource(event: &Map<String, Value>) -> Result<String, EventError> {
    let resources = match event.get(RESOURCES_KEY) {
        None | Some(Value::Null) => return Err(EventError::MissingField(RESOURCES_KEY)),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(EventError::WrongType {
                field: RESOURCES_KEY,
                expected: "array of strings",
            });
        }
    };

    match resources.first() {
        None => Err(EventError::EmptyResources),
        Some(Value::String(arn)) if !arn.is_empty() => Ok(arn.clone()),
        Some(Value::String(_)) => Err(EventError::EmptyField(RESOURCES_KEY)),
        Some(_) => Err(EventError::WrongType {
            field: RESOURCES_KEY,
            expected: "array of strings",
        }),
    }
}

/// `null` is treated the same as an absent field.
fn optional_str<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<Option<&'a str>, EventError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(EventError::WrongType {
            field,
            expected: "string",
        }),
    }
}

fn optional_bool(obj: &Map<String, Value>, field: &'static str) -> Result<Option<bool>, EventError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
        Some(Value::String(s)) => Err(EventError::InvalidValue {
            field,
            value: s.clone(),
        }),
        Some(_) => Err(EventError::WrongType {
            field,
            expected: "boolean",
        }),
    }
}

/// Day counts arrive as integer strings (`"5"`), plain integers are accepted too.
fn optional_days(obj: &Map<String, Value>, field: &'static str) -> Result<Option<u32>, EventError> {
    let invalid = |value: String| EventError::InvalidValue { field, value };
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<u32>().map(Some).map_err(|_| invalid(s.clone())),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| invalid(n.to_string())),
        Some(_) => Err(EventError::WrongType {
            field,
            expected: "integer string",
        }),
    }
}

fn required_object<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Map<String, Value>, EventError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(EventError::MissingField(field)),
        Some(Value::Object(inner)) => Ok(inner),
        Some(_) => Err(EventError::WrongType {
            field,
            expected: "object",
        }),
    }
}
