//! HTTP APIルーター
//!
//! エンドポイント定義とミドルウェア構成。監査ログミドルウェアを最外周、
//! 例外レコーダーをその内側に重ねる（障害時は両方がエントリを記録する）。

/// 顧客API
pub mod customers;

/// エラーレスポンス変換
pub mod error;

/// ファイルAPI
pub mod files;

/// ログ照会API
pub mod logs;

use crate::audit::{middleware::audit_interceptor, recorder::exception_recorder};
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// ヘルスチェック
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// アプリケーションルーターを構築する
pub fn create_app(state: AppState) -> Router {
    let uploads = ServeDir::new(state.storage.root.clone());

    Router::new()
        .route("/health", get(health))
        .route(
            "/customers",
            post(customers::register_customer).get(customers::list_customers),
        )
        .route("/customers/:code", get(customers::get_customer))
        .route("/files/upload-bundle", post(files::upload_bundle))
        .route("/files", get(files::list_all_files))
        .route("/files/by-customer/:code", get(files::list_customer_files))
        .route("/files/:id", delete(files::delete_file))
        .route("/logs", get(logs::list_logs))
        .route("/logs/stats", get(logs::log_stats))
        .route("/logs/errors", get(logs::list_recent_errors))
        .route("/logs/category/:name", get(logs::list_logs_by_category))
        .route("/logs/purge", delete(logs::purge_logs))
        .route("/logs/:id", get(logs::get_log))
        .nest_service("/uploads", uploads)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            exception_recorder,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            audit_interceptor,
        ))
        .layer(DefaultBodyLimit::max(state.limits.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
