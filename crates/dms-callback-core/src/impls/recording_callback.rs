//! RecordingCallback - 通知を記録するだけの WorkflowCallback（テスト用）

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::call_log::CallLog;
use crate::domain::TaskToken;
use crate::ports::{CallbackError, WorkflowCallback};

/// 記録された通知 1 件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success { token: String },
    Failure { token: String, error: String },
}

impl Notification {
    pub fn token(&self) -> &str {
        match self {
            Notification::Success { token } | Notification::Failure { token, .. } => token,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Notification::Success { .. })
    }
}

/// RecordingCallback は受けた通知を順番に保持する
///
/// `rejecting` で作ると通知は記録したうえで毎回エラーを返す
/// （通知失敗時も delete されることの確認用）。
#[derive(Default)]
pub struct RecordingCallback {
    notifications: Mutex<Vec<Notification>>,
    reject_with: Option<String>,
    call_log: Option<CallLog>,
}

impl RecordingCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            notifications: Mutex::new(Vec::new()),
            reject_with: Some(reason.into()),
            call_log: None,
        }
    }

    /// 通知を `log` に "notify_success" / "notify_failure" として記録する
    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.call_log = Some(log);
        self
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().await.clone()
    }

    async fn log(&self, call: &'static str) {
        if let Some(log) = &self.call_log {
            log.record(call).await;
        }
    }

    fn outcome(&self) -> Result<(), CallbackError> {
        match &self.reject_with {
            Some(reason) => Err(CallbackError::Rejected(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl WorkflowCallback for RecordingCallback {
    async fn notify_success(&self, token: &TaskToken) -> Result<(), CallbackError> {
        self.log("notify_success").await;
        self.notifications.lock().await.push(Notification::Success {
            token: token.to_string(),
        });
        self.outcome()
    }

    async fn notify_failure(&self, token: &TaskToken, error: &str) -> Result<(), CallbackError> {
        self.log("notify_failure").await;
        self.notifications.lock().await.push(Notification::Failure {
            token: token.to_string(),
            error: error.to_string(),
        });
        self.outcome()
    }
}
