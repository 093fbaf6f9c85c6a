//! CallLog - テストダブル間で共有する呼び出し順の記録
//!
//! ストアとコールバックの両方に同じ CallLog を渡すと、
//! resolver がどの順で port を呼んだかを 1 本の列で確認できる。

use std::sync::Arc;

use tokio::sync::Mutex;

#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<&'static str>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, call: &'static str) {
        self.0.lock().await.push(call);
    }

    /// ここまでの呼び出し（古い順）
    pub async fn calls(&self) -> Vec<&'static str> {
        self.0.lock().await.clone()
    }
}
