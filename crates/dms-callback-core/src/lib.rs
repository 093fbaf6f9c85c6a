//! dms-callback-core
//!
//! Relays the outcome of a long-running DMS replication task to a workflow
//! step that is suspended on a callback token.
//!
//! # モジュール構成
//! - **domain**: TaskRecord / TaskToken / RecordKey、受信イベント（InboundSignal）
//! - **ports**: 抽象化レイヤー（TokenStore, WorkflowCallback, Clock）
//! - **app**: NotificationResolver（token のライフサイクル）と EventHandler
//! - **impls**: ports の実装（InMemory / JSON ファイル / ジャーナル）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{EventHandler, HandlerConfig, HandlerError, HandlerOutcome, NotificationResolver};
