//! ログ照会API
//!
//! - `GET /logs` ページネーション付き一覧（ボディはプレビューに短縮）
//! - `GET /logs/:id` エントリ詳細（ボディ全文）
//! - `GET /logs/category/:name` 種別絞り込み（直近100件）
//! - `GET /logs/errors` 直近エラー
//! - `GET /logs/stats` 集計
//! - `DELETE /logs/purge` 保持期間超過分の削除

use crate::api::error::ApiResult;
use crate::audit::types::{truncate_marked, LogCategory, LogEntry};
use crate::common::error::DepotError;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// 一覧表示でのボディプレビュー長（文字数）
const PREVIEW_LIMIT: usize = 100;

/// デフォルトページサイズ
const DEFAULT_PAGE_SIZE: i64 = 50;

/// ログエントリレスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntryDto {
    /// レコードID
    pub id: i64,
    /// タイムスタンプ
    pub timestamp: DateTime<Utc>,
    /// ログ種別
    pub category: String,
    /// リクエストパス
    pub endpoint: String,
    /// HTTPメソッド
    pub http_method: String,
    /// 呼び出し元IPアドレス
    pub client_ip: Option<String>,
    /// リクエストボディ
    pub request_body: Option<String>,
    /// レスポンスボディ
    pub response_body: Option<String>,
    /// 追加情報
    pub detail: Option<String>,
}

impl LogEntryDto {
    /// ボディ全文を保持したレスポンス
    fn full(entry: LogEntry) -> Self {
        Self {
            id: entry.id.unwrap_or(0),
            timestamp: entry.timestamp,
            category: entry.category.as_str().to_string(),
            endpoint: entry.endpoint,
            http_method: entry.http_method,
            client_ip: entry.client_ip,
            request_body: entry.request_body,
            response_body: entry.response_body,
            detail: entry.detail,
        }
    }

    /// 一覧用にボディをプレビュー長へ短縮したレスポンス
    fn preview(entry: LogEntry) -> Self {
        let mut dto = Self::full(entry);
        dto.request_body = dto
            .request_body
            .map(|b| truncate_marked(&b, PREVIEW_LIMIT));
        dto.response_body = dto
            .response_body
            .map(|b| truncate_marked(&b, PREVIEW_LIMIT));
        dto
    }
}

/// GET /logs のクエリパラメータ
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    /// ページ番号（1始まり）
    pub page: Option<i64>,
    /// 1ページあたりの件数
    pub page_size: Option<i64>,
}

/// GET /logs
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Value>> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 500);

    let result = state.logs.paginate(page, page_size).await?;
    let total_pages = (result.total_count + page_size - 1) / page_size;
    let entries: Vec<LogEntryDto> = result
        .entries
        .into_iter()
        .map(LogEntryDto::preview)
        .collect();

    Ok(Json(json!({
        "entries": entries,
        "totalCount": result.total_count,
        "page": page,
        "pageSize": page_size,
        "totalPages": total_pages,
    })))
}

/// GET /logs/:id
pub async fn get_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<LogEntryDto>> {
    let entry = state
        .logs
        .get(id)
        .await?
        .ok_or_else(|| DepotError::NotFound(format!("log entry {} does not exist", id)))?;
    Ok(Json(LogEntryDto::full(entry)))
}

/// GET /logs/category/:name
///
/// 種別名は文字列そのままで照合するため、未知の名前は空リストになる。
/// エントリはボディ全文を返す（プレビュー短縮はページネーション一覧のみ）。
pub async fn list_logs_by_category(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<LogEntryDto>>> {
    let entries = state.logs.recent_by_category(&name).await?;
    Ok(Json(entries.into_iter().map(LogEntryDto::full).collect()))
}

/// GET /logs/errors
pub async fn list_recent_errors(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<LogEntryDto>>> {
    let entries = state
        .logs
        .recent_by_category(LogCategory::Error.as_str())
        .await?;
    Ok(Json(entries.into_iter().map(LogEntryDto::full).collect()))
}

/// GET /logs/stats
pub async fn log_stats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let stats = state.logs.stats().await?;
    Ok(Json(json!({
        "totalEntries": stats.total_entries,
        "byCategory": stats.by_category,
        "recentErrors": stats.recent_errors,
    })))
}

/// DELETE /logs/purge のクエリパラメータ
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeQuery {
    /// この日数より古いエントリを削除する（デフォルト30日）
    pub older_than_days: Option<i64>,
}

/// DELETE /logs/purge
pub async fn purge_logs(
    State(state): State<AppState>,
    Query(query): Query<PurgeQuery>,
) -> ApiResult<Json<Value>> {
    let days = query.older_than_days.unwrap_or(30).max(0);
    let deleted = state.logs.purge_older_than(days).await?;
    Ok(Json(json!({
        "deleted": deleted,
        "olderThanDays": days,
    })))
}
