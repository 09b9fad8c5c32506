//! APIエラーレスポンス変換

use crate::audit::types::FaultInfo;
use crate::common::error::DepotError;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// ハンドラーから返すエラー型
///
/// [`DepotError`]をHTTPレスポンスへ変換する。サーバー都合の障害
/// （Database / Internal）は[`FaultInfo`]拡張をレスポンスへ付与し、
/// 例外記録ミドルウェアに統一500レスポンスへ差し替えさせる。
/// クライアント起因のエラーは `{"message": ...}` のJSONで返す。
#[derive(Debug)]
pub struct AppError(pub DepotError);

impl From<DepotError> for AppError {
    fn from(e: DepotError) -> Self {
        AppError(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let message = self.0.to_string();
        let mut response =
            (status, Json(json!({ "message": message }))).into_response();
        if self.0.is_fault() {
            response.extensions_mut().insert(FaultInfo {
                message,
                trace: Some(format!("{:?}", self.0)),
            });
        }
        response
    }
}

/// APIハンドラーの結果型
pub type ApiResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_not_found_maps_to_404_with_message() {
        let res =
            AppError(DepotError::NotFound("customer 42 not found".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(res.extensions().get::<FaultInfo>().is_none());

        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Not found: customer 42 not found");
    }

    #[test]
    fn test_invalid_input_maps_to_400() {
        let res = AppError(DepotError::InvalidInput("bad".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(res.extensions().get::<FaultInfo>().is_none());
    }

    #[test]
    fn test_fault_errors_carry_fault_info() {
        let res = AppError(DepotError::Database("locked".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let fault = res.extensions().get::<FaultInfo>().unwrap();
        assert!(fault.message.contains("locked"));
        assert!(fault.trace.is_some());
    }
}
