//! 監査ログミドルウェア
//!
//! 全HTTPリクエストについてリクエスト/レスポンスボディ・ステータス・
//! 呼び出し元を捕捉し、リクエスト1件につき必ず1件のログエントリを永続化する。
//! 公開ファイル配信（/uploads配下）は除外。
//!
//! リクエストボディは捕捉後に再構築してハンドラーへ渡す（破壊的に消費しない）。
//! レスポンスボディはバッファへ捕捉し、記録後に捕捉済みバイト列から
//! そのまま再構築して返す（全経路で本来のレスポンスが流れる）。

use crate::audit::types::{
    truncate_marked, FaultInfo, LogCategory, LogEntry, BODY_CAPTURE_LIMIT,
};
use crate::common::ip::client_ip;
use crate::AppState;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::warn;

/// 監査対象から除外すべきパスか判定する
///
/// 公開ストレージ配信は外部コラボレーター扱いで記録しない。
fn should_exclude(path: &str) -> bool {
    path.starts_with("/uploads/") || path == "/uploads"
}

/// 監査ログミドルウェア
pub async fn audit_interceptor(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if should_exclude(&path) {
        return next.run(request).await;
    }

    let method = request.method().to_string();
    let endpoint = match request.uri().query() {
        Some(query) => format!("{}?{}", path, query),
        None => path,
    };
    let client_ip = client_ip(&request);

    // リクエストボディを捕捉し、ハンドラーが再読できるよう再構築する
    let (parts, body) = request.into_parts();
    let request_bytes = match to_bytes(body, state.limits.max_upload_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => {
            let entry = LogEntry {
                id: None,
                timestamp: Utc::now(),
                category: LogCategory::Warning,
                endpoint,
                http_method: method,
                client_ip,
                request_body: None,
                response_body: None,
                detail: Some("request body exceeds the configured upload limit".to_string()),
            };
            persist(&state, &entry).await;
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "message": "request body too large" })),
            )
                .into_response();
        }
    };
    let request_body_text = String::from_utf8_lossy(&request_bytes).to_string();
    let request = Request::from_parts(parts, Body::from(request_bytes));

    // ハンドラーへ委譲し、レスポンスボディをバッファへ捕捉する
    let response = next.run(request).await;
    let (parts, body) = response.into_parts();
    let response_bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to buffer response body for audit: {}", e);
            Default::default()
        }
    };
    let response_body_text = String::from_utf8_lossy(&response_bytes).to_string();

    // 未回復障害が載っていればError、なければInfo
    let fault = parts.extensions.get::<FaultInfo>().cloned();
    let (category, detail) = match fault {
        Some(fault) => (LogCategory::Error, Some(fault.message)),
        None => (LogCategory::Info, None),
    };

    let entry = LogEntry {
        id: None,
        timestamp: Utc::now(),
        category,
        endpoint,
        http_method: method,
        client_ip,
        request_body: Some(truncate_marked(&request_body_text, BODY_CAPTURE_LIMIT)),
        response_body: Some(truncate_marked(&response_body_text, BODY_CAPTURE_LIMIT)),
        detail,
    };
    persist(&state, &entry).await;

    // 捕捉済みバイト列からレスポンスを復元して返す
    Response::from_parts(parts, Body::from(response_bytes))
}

/// エントリを永続化する
///
/// 監査の書き込み失敗はリクエスト自体を壊してはならないため、
/// 失敗は診断ログに残すだけで握りつぶす。
async fn persist(state: &AppState, entry: &LogEntry) {
    if let Err(e) = state.logs.insert(entry).await {
        warn!("Failed to persist audit log entry: {}", e);
    }
}
