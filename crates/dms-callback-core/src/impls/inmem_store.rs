//! InMemoryTokenStore - テスト・開発用の TokenStore
//!
//! # 学習ポイント
//! - tokio::sync::Mutex による排他制御（await をまたいでも安全）
//! - 呼び出し回数の記録（「delete が呼ばれていない」ことをテストで確認するため）
//! - Clock を渡すとストア側 TTL を再現する
//! - CallLog を渡すとコールバックとの呼び出し順も記録できる

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::call_log::CallLog;
use crate::domain::{RecordKey, TaskRecord};
use crate::ports::{Clock, StoreError, TokenStore};

/// 各操作の呼び出し回数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOps {
    pub saves: usize,
    pub lookups: usize,
    pub deletes: usize,
}

#[derive(Default)]
struct InMemoryState {
    records: HashMap<RecordKey, TaskRecord>,
    ops: StoreOps,
    delete_failure: Option<String>,
}

/// InMemoryTokenStore は HashMap に TaskRecord を保持する
///
/// # 使用例
/// ```ignore
/// let store = InMemoryTokenStore::new();
/// store.save(&key, record).await?;
/// assert!(store.lookup(&key).await?.is_some());
/// ```
#[derive(Default)]
pub struct InMemoryTokenStore {
    state: Mutex<InMemoryState>,
    /// Some のときだけ expireAt を見る
    expiry_clock: Option<Arc<dyn Clock>>,
    call_log: Option<CallLog>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 期限切れレコードを「存在しない」として扱うストア
    pub fn with_expiry(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(InMemoryState::default()),
            expiry_clock: Some(clock),
            call_log: None,
        }
    }

    /// save / lookup / delete を `log` に "save" / "lookup" / "delete" として記録する
    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.call_log = Some(log);
        self
    }

    /// 呼び出し回数に数えずに中身を覗く
    pub async fn peek(&self, key: &RecordKey) -> Option<TaskRecord> {
        self.state.lock().await.records.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn ops(&self) -> StoreOps {
        self.state.lock().await.ops
    }

    /// 以降の delete をすべて失敗させる（障害注入）
    pub async fn fail_deletes(&self, reason: impl Into<String>) {
        self.state.lock().await.delete_failure = Some(reason.into());
    }

    async fn log(&self, call: &'static str) {
        if let Some(log) = &self.call_log {
            log.record(call).await;
        }
    }

    fn is_live(&self, record: &TaskRecord) -> bool {
        match &self.expiry_clock {
            Some(clock) => !record.is_expired_at(clock.now().timestamp()),
            None => true,
        }
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn save(&self, key: &RecordKey, record: TaskRecord) -> Result<(), StoreError> {
        self.log("save").await;
        let mut state = self.state.lock().await;
        state.ops.saves += 1;
        state.records.insert(key.clone(), record);
        Ok(())
    }

    async fn lookup(&self, key: &RecordKey) -> Result<Option<TaskRecord>, StoreError> {
        self.log("lookup").await;
        let mut state = self.state.lock().await;
        state.ops.lookups += 1;
        let record = state.records.get(key).cloned();
        Ok(record.filter(|r| self.is_live(r)))
    }

    async fn delete(&self, key: &RecordKey) -> Result<(), StoreError> {
        self.log("delete").await;
        let mut state = self.state.lock().await;
        state.ops.deletes += 1;
        if let Some(reason) = &state.delete_failure {
            return Err(StoreError::Unavailable(reason.clone()));
        }
        state.records.remove(key);
        Ok(())
    }
}
