//! JsonFileTokenStore - ファイルに永続化する TokenStore（CLI 用）
//!
//! テーブルごとに `<dir>/<table>.json` を 1 つ持ち、中身は
//! `"<attribute>#<task id>"` をキーにした TaskRecord のマップ。
//!
//! ```json
//! {
//!   "replicationTaskArn#arn-1": {
//!     "token": "T1",
//!     "ignoreDmsTaskFailure": false,
//!     "createdAt": "2024-01-01T00:00:00Z",
//!     "expireAt": 1704412800
//!   }
//! }
//! ```
//!
//! # 学習ポイント
//! - CLI の起動ごとに別プロセスになるので、排他はプロセス内 Mutex ではなく
//!   `<table>.lock` への advisory lock（fs4）で取る
//! - read-modify-write 全体をロック内で行う（blocking なので spawn_blocking）
//! - 書き込みは一意な一時ファイル -> fsync -> rename（persist）

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs4::fs_std::FileExt;
use tempfile::NamedTempFile;

use crate::domain::{RecordKey, TaskRecord};
use crate::ports::{Clock, StoreError, TokenStore};

type TableDocument = BTreeMap<String, TaskRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockMode {
    Shared,
    Exclusive,
}

pub struct JsonFileTokenStore<C> {
    dir: PathBuf,
    /// 期限切れ判定にだけ使う
    clock: C,
}

impl<C: Clock> JsonFileTokenStore<C> {
    pub fn new(dir: impl Into<PathBuf>, clock: C) -> Self {
        Self {
            dir: dir.into(),
            clock,
        }
    }

    fn item_key(key: &RecordKey) -> String {
        format!("{}#{}", key.attribute, key.task_id)
    }

    /// テーブルをロックした状態で `f` を実行する
    ///
    /// `f` は (戻り値, 書き戻しが必要か) を返す。書き戻しは Exclusive のときだけ。
    async fn with_table<T, F>(&self, table: &str, mode: LockMode, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut TableDocument) -> (T, bool) + Send + 'static,
    {
        let dir = self.dir.clone();
        let table = table.to_string();
        tokio::task::spawn_blocking(move || locked_update(&dir, &table, mode, f))
            .await
            .map_err(|e| StoreError::Unavailable(format!("token store task failed: {e}")))?
    }

    /// 期限切れレコードを物理削除し、削除件数を返す
    pub async fn purge_expired(&self, table: &str) -> Result<usize, StoreError> {
        let now = self.clock.now().timestamp();
        let purged = self
            .with_table(table, LockMode::Exclusive, move |doc| {
                let before = doc.len();
                doc.retain(|_, record| !record.is_expired_at(now));
                let purged = before - doc.len();
                (purged, purged > 0)
            })
            .await?;
        if purged > 0 {
            tracing::info!(table, purged, "purged expired task records");
        }
        Ok(purged)
    }
}

fn locked_update<T, F>(dir: &Path, table: &str, mode: LockMode, f: F) -> Result<T, StoreError>
where
    F: FnOnce(&mut TableDocument) -> (T, bool),
{
    let path = dir.join(format!("{table}.json"));
    let io_err = |source| StoreError::Io {
        key: path.display().to_string(),
        source,
    };

    fs::create_dir_all(dir).map_err(io_err)?;
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(dir.join(format!("{table}.lock")))
        .map_err(io_err)?;
    let locked = match mode {
        LockMode::Shared => FileExt::lock_shared(&lock_file),
        LockMode::Exclusive => FileExt::lock_exclusive(&lock_file),
    };
    locked.map_err(io_err)?;

    let mut doc = read_table(&path)?;
    let (out, dirty) = f(&mut doc);
    if dirty && mode == LockMode::Exclusive {
        write_table(dir, &path, &doc)?;
    }
    // lock_file の drop でロック解放
    Ok(out)
}

fn read_table(path: &Path) -> Result<TableDocument, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(TableDocument::new()),
        Err(source) => {
            return Err(StoreError::Io {
                key: path.display().to_string(),
                source,
            });
        }
    };
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
        key: path.display().to_string(),
        source,
    })
}

fn write_table(dir: &Path, path: &Path, doc: &TableDocument) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        key: path.display().to_string(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    serde_json::to_writer_pretty(&mut tmp, doc).map_err(|source| StoreError::Corrupt {
        key: path.display().to_string(),
        source,
    })?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[async_trait]
impl<C: Clock> TokenStore for JsonFileTokenStore<C> {
    async fn save(&self, key: &RecordKey, record: TaskRecord) -> Result<(), StoreError> {
        let item = Self::item_key(key);
        self.with_table(&key.table, LockMode::Exclusive, move |doc| {
            doc.insert(item, record);
            ((), true)
        })
        .await
    }

    async fn lookup(&self, key: &RecordKey) -> Result<Option<TaskRecord>, StoreError> {
        let item = Self::item_key(key);
        let now = self.clock.now().timestamp();
        self.with_table(&key.table, LockMode::Shared, move |doc| {
            let found = doc
                .remove(&item)
                .filter(|record| !record.is_expired_at(now));
            (found, false)
        })
        .await
    }

    async fn delete(&self, key: &RecordKey) -> Result<(), StoreError> {
        let item = Self::item_key(key);
        self.with_table(&key.table, LockMode::Exclusive, move |doc| {
            ((), doc.remove(&item).is_some())
        })
        .await
    }
}
