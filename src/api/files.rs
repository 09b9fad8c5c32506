//! ファイルAPI
//!
//! - `POST /files/upload-bundle` ZIPバンドル取り込み（multipart/form-data）
//! - `GET /files/by-customer/:code` 顧客別ファイル一覧
//! - `GET /files` 全ファイル一覧（顧客名付き）
//! - `DELETE /files/:id` ファイル削除（レコード＋実体）

use crate::api::error::{ApiResult, AppError};
use crate::common::error::DepotError;
use crate::db::files::{FileRecord, FileRecordWithCustomer};
use crate::ingest::IngestSummary;
use crate::AppState;
use axum::{
    extract::{Multipart, Path, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

/// ファイルレコードレスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDto {
    /// レコードID
    pub id: i64,
    /// 保存ファイル名
    pub file_name: String,
    /// 公開パス
    pub path: String,
    /// 登録日時
    pub uploaded_at: DateTime<Utc>,
}

impl From<FileRecord> for FileDto {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id.unwrap_or(0),
            file_name: record.file_name,
            path: record.storage_path,
            uploaded_at: record.uploaded_at,
        }
    }
}

/// 顧客名付きファイルレコードレスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileWithCustomerDto {
    /// レコードID
    pub id: i64,
    /// 顧客コード
    pub customer_code: String,
    /// 顧客名
    pub customer_name: String,
    /// 保存ファイル名
    pub file_name: String,
    /// 公開パス
    pub path: String,
    /// 登録日時
    pub uploaded_at: DateTime<Utc>,
}

impl From<FileRecordWithCustomer> for FileWithCustomerDto {
    fn from(row: FileRecordWithCustomer) -> Self {
        Self {
            id: row.record.id.unwrap_or(0),
            customer_code: row.record.customer_code,
            customer_name: row.customer_name,
            file_name: row.record.file_name,
            path: row.record.storage_path,
            uploaded_at: row.record.uploaded_at,
        }
    }
}

/// POST /files/upload-bundle
///
/// フィールド`customer_id`（顧客コード）と`bundle`（ZIPファイル）を受け取り、
/// 展開された各ファイルを顧客の永続領域へ登録する。
pub async fn upload_bundle(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<IngestSummary>> {
    let mut customer_code: Option<String> = None;
    let mut bundle: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DepotError::InvalidInput(format!("Invalid multipart form: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "customer_id" => {
                let value = field.text().await.map_err(|e| {
                    DepotError::InvalidInput(format!("Failed to read customer_id: {}", e))
                })?;
                customer_code = Some(value);
            }
            "bundle" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    DepotError::InvalidInput(format!("Failed to read bundle payload: {}", e))
                })?;
                bundle = Some((file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let customer_code = customer_code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| DepotError::InvalidInput("field 'customer_id' is required".to_string()))?;
    let (bundle_name, payload) = bundle
        .filter(|(_, bytes)| !bytes.is_empty())
        .ok_or_else(|| DepotError::InvalidInput("field 'bundle' is required".to_string()))?;

    let summary = state
        .ingestor
        .ingest(&customer_code, &bundle_name, &payload)
        .await?;
    Ok(Json(summary))
}

/// GET /files/by-customer/:code
pub async fn list_customer_files(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Vec<FileDto>>> {
    let records = state.files.list_by_customer(&code).await?;
    if records.is_empty() {
        return Err(AppError(DepotError::NotFound(format!(
            "no files registered for customer '{}'",
            code
        ))));
    }
    Ok(Json(records.into_iter().map(FileDto::from).collect()))
}

/// GET /files
pub async fn list_all_files(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let rows = state.files.list_all_with_customer().await?;
    let files: Vec<FileWithCustomerDto> =
        rows.into_iter().map(FileWithCustomerDto::from).collect();
    Ok(Json(json!({
        "count": files.len(),
        "files": files,
    })))
}

/// DELETE /files/:id
///
/// レコードを先に確認し、実体ファイルの削除はベストエフォートで行う
/// （実体が既に無くてもレコードは削除する）。
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let record = state
        .files
        .get(id)
        .await?
        .ok_or_else(|| DepotError::NotFound(format!("file record {} does not exist", id)))?;

    if let Some(physical) = state.storage.resolve_public_path(&record.storage_path) {
        match tokio::fs::remove_file(&physical).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!("Failed to remove stored file {}: {}", physical.display(), e);
            }
        }
    }

    state.files.delete(id).await?;
    Ok(Json(json!({
        "message": format!("file '{}' deleted", record.file_name),
    })))
}
