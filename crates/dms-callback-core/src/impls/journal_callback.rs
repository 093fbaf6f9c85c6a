//! JournalCallback - 通知を JSON Lines で追記する WorkflowCallback（CLI 用）
//!
//! ワークフローエンジン側の取り込み処理がこのファイルを読む想定。
//! 1 行 1 通知：
//!
//! ```json
//! {"status":"SUCCESS","token":"T1","output":"{}"}
//! {"status":"FAILURE","token":"T2","error":"Failing function due to ..."}
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::TaskToken;
use crate::ports::{CallbackError, WorkflowCallback};

/// 成功通知に添える出力ドキュメント（空オブジェクト）
pub const SUCCESS_OUTPUT: &str = "{}";

/// ジャーナルの 1 行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JournalEntry {
    Success { token: String, output: String },
    Failure { token: String, error: String },
}

pub struct JournalCallback {
    path: PathBuf,
    /// 同一プロセス内で行が混ざらないように
    lock: Mutex<()>,
}

impl JournalCallback {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn append(&self, entry: &JournalEntry) -> Result<(), CallbackError> {
        let mut line = serde_json::to_string(entry)
            .map_err(|e| CallbackError::Transport(format!("journal encode: {e}")))?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl WorkflowCallback for JournalCallback {
    async fn notify_success(&self, token: &TaskToken) -> Result<(), CallbackError> {
        self.append(&JournalEntry::Success {
            token: token.to_string(),
            output: SUCCESS_OUTPUT.to_string(),
        })
        .await
    }

    async fn notify_failure(&self, token: &TaskToken, error: &str) -> Result<(), CallbackError> {
        self.append(&JournalEntry::Failure {
            token: token.to_string(),
            error: error.to_string(),
        })
        .await
    }
}

/// ジャーナルを全行読み込む（テスト・確認用）
pub async fn read_journal(path: &Path) -> Result<Vec<JournalEntry>, CallbackError> {
    let raw = tokio::fs::read_to_string(path).await?;
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line)
                .map_err(|e| CallbackError::Transport(format!("journal decode: {e}")))
        })
        .collect()
}
