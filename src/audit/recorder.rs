//! 例外記録ミドルウェア
//!
//! ハンドラー層を抜けた未回復障害（5xxエラーとパニック）を横取りし、
//! 独立したErrorカテゴリのログエントリを記録したうえで統一された
//! 500エラーレスポンスへ変換する。
//!
//! 監査ログミドルウェアより内側に配置される。障害検知用の
//! [`FaultInfo`]拡張はレスポンスへ残したまま返すため、外側の
//! 監査エントリもErrorカテゴリで記録される（同一障害が2件記録される
//! のは仕様どおり）。

use crate::audit::types::{FaultInfo, LogCategory, LogEntry};
use crate::common::ip::client_ip;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use futures::FutureExt;
use serde_json::json;
use std::any::Any;
use tracing::{error, warn};

/// パニックペイロードから人間可読なメッセージを取り出す
fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// 例外記録ミドルウェア
pub async fn exception_recorder(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let endpoint = request.uri().path().to_string();
    let method = request.method().to_string();
    let client_ip = client_ip(&request);

    let outcome = std::panic::AssertUnwindSafe(next.run(request))
        .catch_unwind()
        .await;

    let fault = match outcome {
        Ok(response) => {
            match response.extensions().get::<FaultInfo>().cloned() {
                Some(fault) => fault,
                // 障害なし。正常・4xx系レスポンスはそのまま通す
                None => return response,
            }
        }
        Err(payload) => FaultInfo {
            message: panic_message(payload),
            trace: None,
        },
    };

    error!(
        "Unhandled failure on {} {}: {}",
        method, endpoint, fault.message
    );

    let detail = match &fault.trace {
        Some(trace) => format!("{}\n\norigin:\n{}", fault.message, trace),
        None => fault.message.clone(),
    };
    let entry = LogEntry {
        id: None,
        timestamp: Utc::now(),
        category: LogCategory::Error,
        endpoint,
        http_method: method,
        client_ip,
        request_body: None,
        response_body: None,
        detail: Some(detail),
    };
    if let Err(e) = state.logs.insert(&entry).await {
        warn!("Failed to persist exception log entry: {}", e);
    }

    // 統一500レスポンス。FaultInfoを載せ直して外側の監査分類に使わせる
    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal server error",
            "message": fault.message,
            "timestamp": Utc::now(),
        })),
    )
        .into_response();
    response.extensions_mut().insert(fault);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::AppError;
    use crate::common::error::DepotError;
    use crate::db::test_utils::test_db_pool;
    use crate::AppState;
    use axum::body::{to_bytes, Body};
    use axum::{middleware as axum_middleware, routing::get, Router};
    use tower::ServiceExt;

    // クロージャだと戻り値型がnever型フォールバック頼みになるため、
    // 具体的な戻り値型を持つ関数にしてある
    async fn panicking_handler() -> String {
        panic!("index out of bounds in handler")
    }

    fn build_app(state: AppState) -> Router {
        Router::new()
            .route("/ok", get(|| async { "fine" }))
            .route(
                "/missing",
                get(|| async {
                    Err::<String, AppError>(AppError(DepotError::NotFound(
                        "customer not found".to_string(),
                    )))
                }),
            )
            .route(
                "/boom",
                get(|| async {
                    Err::<String, AppError>(AppError(DepotError::Database(
                        "disk I/O error".to_string(),
                    )))
                }),
            )
            .route("/panic", get(panicking_handler))
            .layer(axum_middleware::from_fn_with_state(
                state.clone(),
                exception_recorder,
            ))
            .with_state(state)
    }

    async fn get_response(state: &AppState, path: &str) -> Response {
        build_app(state.clone())
            .oneshot(
                axum::http::Request::builder()
                    .uri(path)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_success_passes_through_unlogged() {
        let state = AppState::for_tests(test_db_pool().await);
        let res = get_response(&state, "/ok").await;
        assert_eq!(res.status(), StatusCode::OK);
        let page = state.logs.paginate(1, 10).await.unwrap();
        assert_eq!(page.total_count, 0);
    }

    #[tokio::test]
    async fn test_client_error_passes_through_unlogged() {
        let state = AppState::for_tests(test_db_pool().await);
        let res = get_response(&state, "/missing").await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let page = state.logs.paginate(1, 10).await.unwrap();
        assert_eq!(page.total_count, 0);
    }

    #[tokio::test]
    async fn test_fault_converted_to_uniform_500() {
        let state = AppState::for_tests(test_db_pool().await);
        let res = get_response(&state, "/boom").await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.extensions().get::<FaultInfo>().is_some());

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "internal server error");
        assert!(json["message"].as_str().unwrap().contains("disk I/O error"));
        assert!(json["timestamp"].is_string());

        let page = state.logs.paginate(1, 10).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.entries[0].category, LogCategory::Error);
        assert!(page.entries[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("disk I/O error"));
    }

    #[tokio::test]
    async fn test_panic_caught_and_recorded() {
        let state = AppState::for_tests(test_db_pool().await);
        let res = get_response(&state, "/panic").await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let page = state.logs.paginate(1, 10).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.entries[0].category, LogCategory::Error);
        assert!(page.entries[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("index out of bounds in handler"));
    }

    #[test]
    fn test_panic_message_extraction() {
        assert_eq!(panic_message(Box::new("static str")), "static str");
        assert_eq!(
            panic_message(Box::new("owned".to_string())),
            "owned"
        );
        assert_eq!(panic_message(Box::new(42u32)), "unknown panic");
    }
}
