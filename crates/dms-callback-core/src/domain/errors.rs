//! Errors - 受信イベントのデコードエラー
//!
//! イベントに必須フィールドが無い・型が違う場合はここで止める。
//! store / callback へのアクセスが始まる前に失敗するのが前提。

use thiserror::Error;

/// EventError は受信イベントが不正であることを表す（MalformedEvent）
///
/// # 分類
/// - 再試行しても結果は変わらない（恒久的エラー）
/// - 呼び出し元にそのまま返す
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("event is not a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("field `{field}` has the wrong type, expected {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field `{field}` has an invalid value `{value}`")]
    InvalidValue { field: &'static str, value: String },

    #[error("could not find DMS task ARN, list of resources is empty")]
    EmptyResources,
}
