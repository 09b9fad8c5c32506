//! 監査ログストレージ
//!
//! 追記専用の `log_entries` テーブルへのCRUD。ページネーション・種別
//! フィルタ・集計・期限切れ削除を提供する。並び順は常に
//! `timestamp DESC, id DESC`（同時刻は挿入順で安定化）。

use crate::audit::types::{LogCategory, LogEntry};
use crate::common::error::{DepotError, DepotResult};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// 種別フィルタ取得時の最大件数
pub const CATEGORY_QUERY_LIMIT: i64 = 100;

/// 統計に含める直近エラーの件数
const RECENT_ERROR_LIMIT: i64 = 5;

/// 監査ログのDB CRUD操作
#[derive(Clone)]
pub struct LogStore {
    pool: SqlitePool,
}

/// sqlx::FromRow用の行構造体
#[derive(Debug, sqlx::FromRow)]
struct LogRow {
    id: i64,
    timestamp: String,
    category: String,
    endpoint: String,
    http_method: String,
    client_ip: Option<String>,
    request_body: Option<String>,
    response_body: Option<String>,
    detail: Option<String>,
}

impl TryFrom<LogRow> for LogEntry {
    type Error = DepotError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        let timestamp = chrono::DateTime::parse_from_rfc3339(&row.timestamp)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| DepotError::Database(format!("Failed to parse timestamp: {}", e)))?;

        Ok(LogEntry {
            id: Some(row.id),
            timestamp,
            category: LogCategory::from_str(&row.category),
            endpoint: row.endpoint,
            http_method: row.http_method,
            client_ip: row.client_ip,
            request_body: row.request_body,
            response_body: row.response_body,
            detail: row.detail,
        })
    }
}

/// ページネーション結果
#[derive(Debug)]
pub struct LogPage {
    /// ページ内エントリ（timestamp降順）
    pub entries: Vec<LogEntry>,
    /// フィルタなし総件数
    pub total_count: i64,
}

/// 種別ごとの件数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCount {
    /// ログ種別
    pub category: String,
    /// 件数
    pub count: i64,
}

/// 直近エラーの要約（パス＋詳細のみ）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorSummary {
    /// エンドポイントパス
    pub endpoint: String,
    /// 障害詳細
    pub detail: Option<String>,
}

/// 監査ログ集計
#[derive(Debug)]
pub struct LogStats {
    /// 総エントリ数
    pub total_entries: i64,
    /// 種別ごとの件数
    pub by_category: Vec<CategoryCount>,
    /// 直近5件のエラー
    pub recent_errors: Vec<ErrorSummary>,
}

impl LogStore {
    /// 新しいLogStoreを作成
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// エントリを1件挿入し、採番されたIDを返す
    pub async fn insert(&self, entry: &LogEntry) -> DepotResult<i64> {
        let timestamp = entry.timestamp.to_rfc3339();
        let result = sqlx::query(
            r#"INSERT INTO log_entries (
                timestamp, category, endpoint, http_method,
                client_ip, request_body, response_body, detail
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&timestamp)
        .bind(entry.category.as_str())
        .bind(&entry.endpoint)
        .bind(&entry.http_method)
        .bind(&entry.client_ip)
        .bind(&entry.request_body)
        .bind(&entry.response_body)
        .bind(&entry.detail)
        .execute(&self.pool)
        .await
        .map_err(|e| DepotError::Database(format!("Failed to insert log entry: {}", e)))?;

        Ok(result.last_insert_rowid())
    }

    /// IDでエントリを取得
    pub async fn get(&self, id: i64) -> DepotResult<Option<LogEntry>> {
        let row = sqlx::query_as::<_, LogRow>("SELECT * FROM log_entries WHERE id = ? LIMIT 1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DepotError::Database(format!("Failed to load log entry: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row.try_into()?)),
            None => Ok(None),
        }
    }

    /// ページネーション付き一覧（timestamp降順）
    pub async fn paginate(&self, page: i64, page_size: i64) -> DepotResult<LogPage> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, 500);
        let offset = (page - 1) * page_size;

        let total_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM log_entries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DepotError::Database(format!("Failed to count log entries: {}", e)))?;

        let rows = sqlx::query_as::<_, LogRow>(
            "SELECT * FROM log_entries ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DepotError::Database(format!("Failed to query log entries: {}", e)))?;

        let entries = rows
            .into_iter()
            .map(LogEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LogPage {
            entries,
            total_count,
        })
    }

    /// 種別で絞り込んだ直近エントリ（最大100件）
    ///
    /// 種別は文字列そのままで照合する。既知の種別に一致しない名前は
    /// どの行にも一致せず、空の結果になる。
    pub async fn recent_by_category(&self, category: &str) -> DepotResult<Vec<LogEntry>> {
        let rows = sqlx::query_as::<_, LogRow>(
            "SELECT * FROM log_entries WHERE category = ? \
             ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(category)
        .bind(CATEGORY_QUERY_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DepotError::Database(format!("Failed to query log entries: {}", e)))?;

        rows.into_iter()
            .map(LogEntry::try_from)
            .collect::<Result<Vec<_>, _>>()
    }

    /// 集計統計を取得
    pub async fn stats(&self) -> DepotResult<LogStats> {
        let total_entries = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM log_entries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DepotError::Database(format!("Failed to count log entries: {}", e)))?;

        let by_category = sqlx::query_as::<_, (String, i64)>(
            "SELECT category, COUNT(*) FROM log_entries GROUP BY category ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DepotError::Database(format!("Failed to aggregate categories: {}", e)))?
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();

        let recent_errors = sqlx::query_as::<_, (String, Option<String>)>(
            "SELECT endpoint, detail FROM log_entries WHERE category = 'Error' \
             ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(RECENT_ERROR_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DepotError::Database(format!("Failed to load recent errors: {}", e)))?
        .into_iter()
        .map(|(endpoint, detail)| ErrorSummary { endpoint, detail })
        .collect();

        Ok(LogStats {
            total_entries,
            by_category,
            recent_errors,
        })
    }

    /// 指定日数より古いエントリを削除し、削除件数を返す
    pub async fn purge_older_than(&self, days: i64) -> DepotResult<u64> {
        let cutoff = (chrono::Utc::now() - chrono::Duration::days(days)).to_rfc3339();

        let result = sqlx::query("DELETE FROM log_entries WHERE timestamp < ?")
            .bind(&cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| DepotError::Database(format!("Failed to purge log entries: {}", e)))?;

        Ok(result.rows_affected())
    }
}
