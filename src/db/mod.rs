//! データベースアクセス層
//!
//! SQLiteベースのデータ永続化

use crate::common::error::{DepotError, DepotResult};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::str::FromStr;

/// 顧客ストア
pub mod customers;

/// ファイルレコードストア
pub mod files;

/// 監査ログストア
pub mod logs;

/// データベース接続プールを作成する
///
/// SQLiteファイルはディレクトリが存在しないと作成できないため、先に作成しておく。
pub async fn create_pool(database_url: &str) -> DepotResult<SqlitePool> {
    if let Some(path) = database_url.strip_prefix("sqlite:") {
        // `sqlite::memory:` のような特殊指定はスキップ
        if !path.starts_with(':') {
            let normalized = path.trim_start_matches("//");
            let path_without_params = normalized.split('?').next().unwrap_or(normalized);
            let db_path = std::path::Path::new(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        DepotError::Internal(format!(
                            "Failed to create database directory {}: {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| DepotError::Database(format!("Invalid database URL: {}", e)))?
        .create_if_missing(true);

    SqlitePool::connect_with(connect_options)
        .await
        .map_err(|e| DepotError::Database(format!("Failed to connect to database: {}", e)))
}
