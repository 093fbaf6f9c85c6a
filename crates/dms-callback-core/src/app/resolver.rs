//! Notification resolver: the token lifecycle (register -> consult -> delete).
//!
//! One inbound signal turns into at most one store write (registration), or
//! exactly one store read, one workflow notification and one store delete
//! (resolution). The stored `ignore_failure` policy decides success vs failure
//! for stoppage events; platform failure reports always fail.
//!
//! There is no retry loop and no locking here. Collaborator errors propagate
//! as-is and the caller owns retry policy. Two concurrent resolutions of the
//! same key can both read the record before either deletes it, which would
//! notify twice; the upstream platform is expected to deliver one terminal
//! event per task.

use chrono::{Duration, SecondsFormat};
use thiserror::Error;

use crate::domain::signal::{STOPPAGE_ERROR_EVENT_ID, StopEventKind};
use crate::domain::{RecordKey, TaskRecord, TaskToken};
use crate::ports::{CallbackError, Clock, StoreError, TokenStore, WorkflowCallback};

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Nothing registered (or already resolved) for this task. Not retryable:
    /// without the token the suspended workflow step cannot be resumed.
    #[error("no task details found in token store for {task_id}")]
    MissingToken { task_id: String },

    #[error("token expiry of {days} days is out of range")]
    ExpiryOutOfRange { days: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Callback(#[from] CallbackError),
}

/// Which notification a resolution cycle sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Succeeded,
    Failed { error: String },
}

impl Resolution {
    pub fn is_success(&self) -> bool {
        matches!(self, Resolution::Succeeded)
    }
}

/// Decide how a stoppage event resolves the callback.
///
/// Only the stoppage-error id counts as a failure, and only when the record's
/// policy does not ignore failures. Unknown ids are benign completions.
pub fn decide_stop(record: &TaskRecord, event_id: &str, task_id: &str) -> Resolution {
    match StopEventKind::classify(event_id) {
        StopEventKind::StoppageError if !record.ignore_failure => Resolution::Failed {
            error: format!(
                "Failing function due to stoppage error [{STOPPAGE_ERROR_EVENT_ID}] for DMS task [{task_id}]"
            ),
        },
        StopEventKind::StoppageError => {
            tracing::info!(
                task_id,
                event_id = STOPPAGE_ERROR_EVENT_ID,
                "ignoring failure for DMS task"
            );
            Resolution::Succeeded
        }
        StopEventKind::Success | StopEventKind::Other => Resolution::Succeeded,
    }
}

/// Decide how a platform failure report resolves the callback.
///
/// The ignore-failure policy is not consulted.
pub fn decide_failure(failure_message: &str, task_id: &str) -> Resolution {
    Resolution::Failed {
        error: format!(
            "Failing function due to failure [{failure_message}] for DMS task [{task_id}]"
        ),
    }
}

pub struct NotificationResolver<S, W, C> {
    store: S,
    callback: W,
    clock: C,
}

impl<S, W, C> NotificationResolver<S, W, C>
where
    S: TokenStore,
    W: WorkflowCallback,
    C: Clock,
{
    pub fn new(store: S, callback: W, clock: C) -> Self {
        Self {
            store,
            callback,
            clock,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn callback(&self) -> &W {
        &self.callback
    }

    /// Store a pending callback, replacing whatever was registered for `key`.
    pub async fn register_task_details(
        &self,
        token: TaskToken,
        key: &RecordKey,
        ignore_failure: bool,
        expiry_days: u32,
    ) -> Result<TaskRecord, ResolveError> {
        let now = self.clock.now();
        let expire_at = now
            .checked_add_signed(Duration::days(i64::from(expiry_days)))
            .ok_or(ResolveError::ExpiryOutOfRange { days: expiry_days })?
            .timestamp();
        let created_at = now.to_rfc3339_opts(SecondsFormat::Secs, true);

        tracing::info!(%key, ignore_failure, expire_at, "saving task token");
        tracing::debug!(token = %token, "task token");

        let record = TaskRecord::new(token, ignore_failure, created_at, expire_at);
        self.store.save(key, record.clone()).await?;
        Ok(record)
    }

    /// Resolve the callback for a task that reported it has stopped.
    pub async fn process_stop_event(
        &self,
        key: &RecordKey,
        event_id: &str,
    ) -> Result<Resolution, ResolveError> {
        tracing::info!(%key, event_id, "processing stop event");
        self.resolve(key, |record| decide_stop(record, event_id, &key.task_id))
            .await
    }

    /// Resolve the callback for a task the platform reported as failed.
    pub async fn process_failure_event(
        &self,
        key: &RecordKey,
        failure_message: &str,
    ) -> Result<Resolution, ResolveError> {
        tracing::info!(%key, failure_message, "processing failure event");
        self.resolve(key, |_| decide_failure(failure_message, &key.task_id))
            .await
    }

    async fn resolve<F>(&self, key: &RecordKey, decide: F) -> Result<Resolution, ResolveError>
    where
        F: FnOnce(&TaskRecord) -> Resolution,
    {
        let record = self
            .store
            .lookup(key)
            .await?
            .ok_or_else(|| ResolveError::MissingToken {
                task_id: key.task_id.clone(),
            })?;

        let resolution = decide(&record);
        let notified = match &resolution {
            Resolution::Succeeded => {
                tracing::info!(%key, "notifying workflow of success");
                self.callback.notify_success(&record.token).await
            }
            Resolution::Failed { error } => {
                tracing::error!(%key, error = %error, "notifying workflow of failure");
                self.callback.notify_failure(&record.token, error).await
            }
        };

        // The record is spent once a notification was attempted.
        tracing::info!(%key, "deleting task token");
        let deleted = self.store.delete(key).await;

        match (notified, deleted) {
            (Ok(()), Ok(())) => Ok(resolution),
            (Err(notify), Ok(())) => Err(notify.into()),
            (Ok(()), Err(delete)) => Err(delete.into()),
            (Err(notify), Err(delete)) => {
                tracing::error!(%key, error = %delete, "token delete failed after failed notification");
                Err(notify.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{CallLog, InMemoryTokenStore, Notification, RecordingCallback, StoreOps};
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    type TestResolver = NotificationResolver<InMemoryTokenStore, RecordingCallback, FixedClock>;

    const TABLE: &str = "dpr-step-function-tokens";

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn resolver() -> TestResolver {
        NotificationResolver::new(InMemoryTokenStore::new(), RecordingCallback::new(), clock())
    }

    fn token(value: &str) -> TaskToken {
        TaskToken::new(value).unwrap()
    }

    async fn registered(ignore_failure: bool) -> (TestResolver, RecordKey) {
        let resolver = resolver();
        let key = RecordKey::for_task(TABLE, "arn-1");
        resolver
            .register_task_details(token("T1"), &key, ignore_failure, 5)
            .await
            .unwrap();
        (resolver, key)
    }

    /// ストアとコールバックが同じ CallLog に書く resolver
    async fn logged(callback: RecordingCallback, ignore_failure: bool) -> (TestResolver, CallLog) {
        let log = CallLog::new();
        let resolver = NotificationResolver::new(
            InMemoryTokenStore::new().with_call_log(log.clone()),
            callback.with_call_log(log.clone()),
            clock(),
        );
        resolver
            .register_task_details(
                token("T1"),
                &RecordKey::for_task(TABLE, "arn-1"),
                ignore_failure,
                5,
            )
            .await
            .unwrap();
        (resolver, log)
    }

    #[tokio::test]
    async fn registration_stores_timestamps_from_the_clock() {
        let resolver = resolver();
        let key = RecordKey::for_task(TABLE, "arn-1");

        resolver
            .register_task_details(token("T1"), &key, false, 4)
            .await
            .unwrap();

        let stored = resolver.store().peek(&key).await.unwrap();
        let expected_expiry = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap().timestamp();
        assert_eq!(stored.token, token("T1"));
        assert!(!stored.ignore_failure);
        assert_eq!(stored.created_at, "2024-01-01T00:00:00Z");
        assert_eq!(stored.expire_at, expected_expiry);
        assert_eq!(stored.expire_at, 1_704_412_800);
        assert!(resolver.callback().notifications().await.is_empty());
    }

    #[tokio::test]
    async fn expiry_beyond_calendar_range_is_rejected() {
        let resolver = resolver();
        let key = RecordKey::for_task(TABLE, "arn-1");

        let err = resolver
            .register_task_details(token("T1"), &key, false, u32::MAX)
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::ExpiryOutOfRange { days: u32::MAX }));
        assert_eq!(resolver.store().ops().await, StoreOps::default());
        assert!(resolver.store().is_empty().await);
    }

    #[tokio::test]
    async fn zero_expiry_days_expires_at_registration_time() {
        let resolver = resolver();
        let key = RecordKey::for_task(TABLE, "arn-1");

        let record = resolver
            .register_task_details(token("T1"), &key, false, 0)
            .await
            .unwrap();

        assert_eq!(record.expire_at, clock().now().timestamp());
    }

    #[tokio::test]
    async fn registration_replaces_pending_record() {
        let resolver = resolver();
        let key = RecordKey::for_task(TABLE, "arn-1");

        resolver
            .register_task_details(token("first"), &key, true, 5)
            .await
            .unwrap();
        resolver
            .register_task_details(token("second"), &key, false, 5)
            .await
            .unwrap();

        let stored = resolver.store().peek(&key).await.unwrap();
        assert_eq!(stored.token, token("second"));
        assert!(!stored.ignore_failure);
        assert_eq!(resolver.store().ops().await.lookups, 0);
    }

    #[rstest]
    #[case::success_strict("DMS-EVENT-0079", false, true)]
    #[case::success_ignoring("DMS-EVENT-0079", true, true)]
    #[case::stoppage_error_ignored("DMS-EVENT-0078", true, true)]
    #[case::stoppage_error_strict("DMS-EVENT-0078", false, false)]
    #[case::stoppage_error_lowercase("dms-event-0078", false, false)]
    #[case::unknown_strict("DMS-EVENT-0123", false, true)]
    #[case::unknown_ignoring("something-else", true, true)]
    #[tokio::test]
    async fn stop_event_decision_table(
        #[case] event_id: &str,
        #[case] ignore_failure: bool,
        #[case] expect_success: bool,
    ) {
        let (resolver, key) = registered(ignore_failure).await;

        let resolution = resolver.process_stop_event(&key, event_id).await.unwrap();

        assert_eq!(resolution.is_success(), expect_success);
        let notifications = resolver.callback().notifications().await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].token(), "T1");
        assert_eq!(notifications[0].is_success(), expect_success);
        assert!(resolver.store().is_empty().await);
        assert_eq!(resolver.store().ops().await.deletes, 1);
    }

    #[tokio::test]
    async fn stoppage_error_message_names_event_and_task() {
        let (resolver, key) = registered(false).await;

        resolver
            .process_stop_event(&key, "DMS-EVENT-0078")
            .await
            .unwrap();

        match &resolver.callback().notifications().await[0] {
            Notification::Failure { token, error } => {
                assert_eq!(token, "T1");
                assert!(error.contains("DMS-EVENT-0078"));
                assert!(error.contains("arn-1"));
            }
            other => panic!("expected failure notification, got {other:?}"),
        }
    }

    #[rstest]
    #[case::strict(false)]
    #[case::ignoring(true)]
    #[tokio::test]
    async fn failure_event_always_notifies_failure(#[case] ignore_failure: bool) {
        let (resolver, key) = registered(ignore_failure).await;

        let resolution = resolver
            .process_failure_event(&key, "Last Error Task error")
            .await
            .unwrap();

        assert_eq!(
            resolution,
            Resolution::Failed {
                error: "Failing function due to failure [Last Error Task error] for DMS task [arn-1]"
                    .to_string()
            }
        );
        assert_eq!(
            resolver.callback().notifications().await,
            vec![Notification::Failure {
                token: "T1".to_string(),
                error: "Failing function due to failure [Last Error Task error] for DMS task [arn-1]"
                    .to_string(),
            }]
        );
        assert!(resolver.store().is_empty().await);
    }

    #[rstest]
    #[case::success("DMS-EVENT-0079", "notify_success")]
    #[case::stoppage_error("DMS-EVENT-0078", "notify_failure")]
    #[tokio::test]
    async fn stop_event_deletes_only_after_notifying(
        #[case] event_id: &str,
        #[case] notify: &'static str,
    ) {
        let (resolver, log) = logged(RecordingCallback::new(), false).await;

        resolver
            .process_stop_event(&RecordKey::for_task(TABLE, "arn-1"), event_id)
            .await
            .unwrap();

        assert_eq!(log.calls().await, vec!["save", "lookup", notify, "delete"]);
    }

    #[tokio::test]
    async fn failure_event_deletes_only_after_notifying() {
        let (resolver, log) = logged(RecordingCallback::new(), true).await;

        resolver
            .process_failure_event(&RecordKey::for_task(TABLE, "arn-1"), "N/A")
            .await
            .unwrap();

        assert_eq!(
            log.calls().await,
            vec!["save", "lookup", "notify_failure", "delete"]
        );
    }

    #[tokio::test]
    async fn rejected_notification_is_followed_by_delete() {
        let (resolver, log) = logged(RecordingCallback::rejecting("TaskTimedOut"), false).await;

        resolver
            .process_stop_event(&RecordKey::for_task(TABLE, "arn-1"), "DMS-EVENT-0079")
            .await
            .unwrap_err();

        assert_eq!(
            log.calls().await,
            vec!["save", "lookup", "notify_success", "delete"]
        );
    }

    #[tokio::test]
    async fn missing_record_stops_after_lookup() {
        let log = CallLog::new();
        let resolver = NotificationResolver::new(
            InMemoryTokenStore::new().with_call_log(log.clone()),
            RecordingCallback::new().with_call_log(log.clone()),
            clock(),
        );

        resolver
            .process_stop_event(&RecordKey::for_task(TABLE, "unknown-arn"), "DMS-EVENT-0079")
            .await
            .unwrap_err();

        assert_eq!(log.calls().await, vec!["lookup"]);
    }

    #[tokio::test]
    async fn missing_record_fails_without_side_effects() {
        let resolver = resolver();
        let key = RecordKey::for_task(TABLE, "unknown-arn");

        let stop = resolver
            .process_stop_event(&key, "DMS-EVENT-0079")
            .await
            .unwrap_err();
        let failure = resolver
            .process_failure_event(&key, "N/A")
            .await
            .unwrap_err();

        assert!(matches!(stop, ResolveError::MissingToken { ref task_id } if task_id == "unknown-arn"));
        assert!(matches!(failure, ResolveError::MissingToken { .. }));
        assert!(resolver.callback().notifications().await.is_empty());
        assert_eq!(
            resolver.store().ops().await,
            StoreOps {
                saves: 0,
                lookups: 2,
                deletes: 0
            }
        );
    }

    #[tokio::test]
    async fn second_resolution_hits_missing_token() {
        let (resolver, key) = registered(false).await;

        resolver
            .process_stop_event(&key, "DMS-EVENT-0079")
            .await
            .unwrap();
        let err = resolver
            .process_stop_event(&key, "DMS-EVENT-0079")
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::MissingToken { .. }));
        assert_eq!(resolver.callback().notifications().await.len(), 1);
    }

    #[tokio::test]
    async fn rejected_notification_still_deletes_record() {
        let resolver = NotificationResolver::new(
            InMemoryTokenStore::new(),
            RecordingCallback::rejecting("TaskTimedOut"),
            clock(),
        );
        let key = RecordKey::for_task(TABLE, "arn-1");
        resolver
            .register_task_details(token("T1"), &key, false, 5)
            .await
            .unwrap();

        let err = resolver
            .process_stop_event(&key, "DMS-EVENT-0079")
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::Callback(CallbackError::Rejected(_))));
        assert!(resolver.store().is_empty().await);
        assert_eq!(resolver.store().ops().await.deletes, 1);
    }

    #[tokio::test]
    async fn delete_failure_is_returned_after_notification() {
        let (resolver, key) = registered(false).await;
        resolver.store().fail_deletes("throttled").await;

        let err = resolver
            .process_stop_event(&key, "DMS-EVENT-0079")
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::Store(StoreError::Unavailable(_))));
        assert_eq!(resolver.callback().notifications().await.len(), 1);
    }

    #[tokio::test]
    async fn notification_error_wins_when_both_fail() {
        let resolver = NotificationResolver::new(
            InMemoryTokenStore::new(),
            RecordingCallback::rejecting("InvalidToken"),
            clock(),
        );
        let key = RecordKey::for_task(TABLE, "arn-1");
        resolver
            .register_task_details(token("T1"), &key, false, 5)
            .await
            .unwrap();
        resolver.store().fail_deletes("throttled").await;

        let err = resolver
            .process_failure_event(&key, "N/A")
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::Callback(_)));
    }

    #[tokio::test]
    async fn example_scenario_suppressed_failure() {
        let resolver = resolver();
        let key = RecordKey::for_task(TABLE, "arn-2");
        resolver
            .register_task_details(token("T2"), &key, true, 5)
            .await
            .unwrap();

        resolver
            .process_stop_event(&key, "DMS-EVENT-0078")
            .await
            .unwrap();

        assert_eq!(
            resolver.callback().notifications().await,
            vec![Notification::Success {
                token: "T2".to_string()
            }]
        );
        assert!(resolver.store().peek(&key).await.is_none());
    }

    #[test]
    fn decide_stop_is_pure() {
        let record = TaskRecord::new(token("T"), false, String::new(), 0);
        assert_eq!(
            decide_stop(&record, "DMS-EVENT-0078", "arn-9"),
            Resolution::Failed {
                error: "Failing function due to stoppage error [DMS-EVENT-0078] for DMS task [arn-9]"
                    .to_string()
            }
        );
        assert_eq!(decide_stop(&record, "DMS-EVENT-0079", "arn-9"), Resolution::Succeeded);
    }
}
