//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! バリデーション失敗（NotFound / InvalidInput）は4xxとしてローカルに返し、
//! それ以外（Database / Internal）は例外レコーダーに到達する障害として扱う。

use axum::http::StatusCode;
use thiserror::Error;

/// filedepot error type
#[derive(Debug, Error)]
pub enum DepotError {
    /// Resource not found (customer, file record, log entry)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input (wrong bundle type, empty bundle, duplicate customer code)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error (I/O, archive expansion, unexpected fault)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DepotError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 未回復障害として例外レコーダーに渡すべきエラーか
    ///
    /// NotFound / InvalidInput はエンドポイントが正常レスポンスに変換する
    /// バリデーション失敗であり、障害伝播経路には乗せない。
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Internal(_))
    }
}

/// Result type alias
pub type DepotResult<T> = Result<T, DepotError>;
