//! Event handler: decode one trigger event and route it to the resolver.

use serde_json::Value;
use thiserror::Error;

use super::resolver::{NotificationResolver, Resolution, ResolveError};
use crate::domain::signal::DEFAULT_TOKEN_EXPIRY_DAYS;
use crate::domain::{DEFAULT_KEY_ATTRIBUTE, EventError, InboundSignal, RecordKey, TaskRecord};
use crate::ports::{Clock, TokenStore, WorkflowCallback};

pub const DEFAULT_TABLE: &str = "dpr-step-function-tokens";

/// Where records live and how long registrations last by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    pub table: String,
    pub key_attribute: String,
    /// Used when a registration event carries no `tokenExpiryDays`.
    pub default_expiry_days: u32,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            key_attribute: DEFAULT_KEY_ATTRIBUTE.to_string(),
            default_expiry_days: DEFAULT_TOKEN_EXPIRY_DAYS,
        }
    }
}

impl HandlerConfig {
    pub fn key_for(&self, task_id: &str) -> RecordKey {
        RecordKey::new(&self.table, &self.key_attribute, task_id)
    }
}

#[derive(Debug, Error)]
pub enum HandlerError {
    /// The event is missing a field or has one of the wrong shape.
    /// Raised before any store or workflow call.
    #[error("malformed event: {0}")]
    MalformedEvent(#[from] EventError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// What handling one event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    Registered(TaskRecord),
    Resolved(Resolution),
}

pub struct EventHandler<S, W, C> {
    resolver: NotificationResolver<S, W, C>,
    config: HandlerConfig,
}

impl<S, W, C> EventHandler<S, W, C>
where
    S: TokenStore,
    W: WorkflowCallback,
    C: Clock,
{
    pub fn new(resolver: NotificationResolver<S, W, C>, config: HandlerConfig) -> Self {
        Self { resolver, config }
    }

    pub fn resolver(&self) -> &NotificationResolver<S, W, C> {
        &self.resolver
    }

    /// Handle one decoded trigger event end to end.
    pub async fn handle(&self, event: &Value) -> Result<HandlerOutcome, HandlerError> {
        tracing::debug!(%event, "event received");
        let signal = InboundSignal::from_event(event)?;
        let outcome = self.dispatch(signal).await?;
        tracing::info!("done");
        Ok(outcome)
    }

    pub async fn dispatch(&self, signal: InboundSignal) -> Result<HandlerOutcome, HandlerError> {
        tracing::info!(kind = signal.kind(), task_id = signal.task_id(), "dispatching signal");
        match signal {
            InboundSignal::Register {
                token,
                task_id,
                ignore_failure,
                expiry_days,
            } => {
                let key = self.config.key_for(&task_id);
                let days = expiry_days.unwrap_or(self.config.default_expiry_days);
                let record = self
                    .resolver
                    .register_task_details(token, &key, ignore_failure, days)
                    .await?;
                Ok(HandlerOutcome::Registered(record))
            }
            InboundSignal::Failure { task_id, message } => {
                let key = self.config.key_for(&task_id);
                let resolution = self.resolver.process_failure_event(&key, &message).await?;
                Ok(HandlerOutcome::Resolved(resolution))
            }
            InboundSignal::Stop { task_id, event_id } => {
                let key = self.config.key_for(&task_id);
                let resolution = self.resolver.process_stop_event(&key, &event_id).await?;
                Ok(HandlerOutcome::Resolved(resolution))
            }
        }
    }
}
