//! Impls - ports の実装（テスト用・CLI 用）
//!
//! # 含まれる実装
//! - **CallLog**: テスト用、ストアとコールバックの呼び出し順を共有記録する
//! - **InMemoryTokenStore**: テスト用の TokenStore（呼び出し回数・障害注入つき）
//! - **JsonFileTokenStore**: CLI 用、テーブルごとの JSON ファイル
//! - **RecordingCallback**: テスト用、通知を記録する
//! - **JournalCallback**: CLI 用、通知を JSON Lines で追記する
//!
//! # 本番用実装
//! キーバリューストアやワークフローエンジンの SDK を使う実装は
//! このクレートの外で ports を実装する。

pub mod call_log;
pub mod inmem_store;
pub mod journal_callback;
pub mod json_file_store;
pub mod recording_callback;

pub use self::call_log::CallLog;
pub use self::inmem_store::{InMemoryTokenStore, StoreOps};
pub use self::journal_callback::{JournalCallback, JournalEntry, read_journal};
pub use self::json_file_store::JsonFileTokenStore;
pub use self::recording_callback::{Notification, RecordingCallback};
