//! Ports - 抽象化レイヤー
//!
//! resolver が依存する外部システムへのインターフェース。
//! 実装（InMemory / ファイル / 本番サービス）は差し替え可能。
//!
//! # 構成
//! - TokenStore: 保留中コールバックの保存先（キーバリューストア）
//! - WorkflowCallback: ワークフローエンジンへの成功 / 失敗通知
//! - Clock: 時刻（登録時の createdAt / expireAt 計算用）

pub mod clock;
pub mod token_store;
pub mod workflow_callback;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::token_store::{StoreError, TokenStore};
pub use self::workflow_callback::{CallbackError, WorkflowCallback};
