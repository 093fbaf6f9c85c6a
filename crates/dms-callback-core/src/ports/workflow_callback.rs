//! WorkflowCallback port - 待機中のワークフローステップを再開させる API
//!
//! 本番では Step Functions の SendTaskSuccess / SendTaskFailure に相当する。

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::TaskToken;

/// ワークフローエンジンへの通知の失敗
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("workflow engine rejected token: {0}")]
    Rejected(String),

    #[error("workflow callback transport failed: {0}")]
    Transport(String),

    #[error("workflow callback journal write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// WorkflowCallback は token を使って待機中のステップを成功 / 失敗で終わらせる
///
/// - token は保存されていた値をそのまま渡す
/// - タイムアウトやリトライは実装側の責務
#[async_trait]
pub trait WorkflowCallback: Send + Sync {
    async fn notify_success(&self, token: &TaskToken) -> Result<(), CallbackError>;

    async fn notify_failure(&self, token: &TaskToken, error: &str) -> Result<(), CallbackError>;
}
