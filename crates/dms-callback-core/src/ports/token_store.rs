//! TokenStore port - 保留中コールバックの保存先
//!
//! 本番ではキーバリューストア（DynamoDB など）がこの trait を実装する。
//! TTL（`expireAt`）の強制はストア側の責務。
//!
//! # 実装
//! - **InMemoryTokenStore**: テスト用
//! - **JsonFileTokenStore**: CLI 用（テーブルごとに JSON ファイル 1 つ）

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{RecordKey, TaskRecord};

/// ストアアクセスの失敗
///
/// resolver はこれを包まずにそのまま呼び出し元へ返す（リトライはしない）。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token store I/O failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("token store data is corrupt for {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("token store unavailable: {0}")]
    Unavailable(String),
}

/// TokenStore はタスク識別子ごとに TaskRecord を 1 件だけ保持する
///
/// # 契約
/// - `save` は無条件の上書き（last write wins、マージなし）
/// - `lookup` は期限切れ・未登録のどちらも `None`
/// - `delete` は存在しないキーに対しても成功する
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn save(&self, key: &RecordKey, record: TaskRecord) -> Result<(), StoreError>;

    async fn lookup(&self, key: &RecordKey) -> Result<Option<TaskRecord>, StoreError>;

    async fn delete(&self, key: &RecordKey) -> Result<(), StoreError>;
}
