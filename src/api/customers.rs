//! 顧客API
//!
//! - `POST /customers` 顧客登録（multipart/form-data、写真3枚まで）
//! - `GET /customers/:code` 顧客照会
//! - `GET /customers` 顧客一覧

use crate::api::error::{ApiResult, AppError};
use crate::common::error::DepotError;
use crate::db::customers::{CustomerSummary, NewCustomer};
use crate::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

/// 顧客レスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDto {
    /// 顧客コード
    pub code: String,
    /// 氏名
    pub name: String,
    /// 住所
    pub address: String,
    /// 電話番号
    pub phone: String,
    /// 写真スロット1〜3の登録有無
    pub has_photos: [bool; 3],
}

impl From<CustomerSummary> for CustomerDto {
    fn from(summary: CustomerSummary) -> Self {
        Self {
            code: summary.code,
            name: summary.name,
            address: summary.address,
            phone: summary.phone,
            has_photos: summary.has_photos,
        }
    }
}

/// multipartフォームから登録内容を組み立てる
///
/// テキスト4項目は必須、写真スロットは任意。未知のフィールドは無視する。
async fn parse_registration(mut multipart: Multipart) -> Result<NewCustomer, DepotError> {
    let mut code = None;
    let mut name = None;
    let mut address = None;
    let mut phone = None;
    let mut photos: [Option<Vec<u8>>; 3] = [None, None, None];

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DepotError::InvalidInput(format!("Invalid multipart form: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "code" | "name" | "address" | "phone" => {
                let value = field.text().await.map_err(|e| {
                    DepotError::InvalidInput(format!(
                        "Failed to read field '{}': {}",
                        field_name, e
                    ))
                })?;
                match field_name.as_str() {
                    "code" => code = Some(value),
                    "name" => name = Some(value),
                    "address" => address = Some(value),
                    _ => phone = Some(value),
                }
            }
            "photo1" | "photo2" | "photo3" => {
                let bytes = field.bytes().await.map_err(|e| {
                    DepotError::InvalidInput(format!(
                        "Failed to read field '{}': {}",
                        field_name, e
                    ))
                })?;
                let slot = match field_name.as_str() {
                    "photo1" => 0,
                    "photo2" => 1,
                    _ => 2,
                };
                if !bytes.is_empty() {
                    photos[slot] = Some(bytes.to_vec());
                }
            }
            _ => {}
        }
    }

    let require = |value: Option<String>, label: &str| {
        value
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| DepotError::InvalidInput(format!("field '{}' is required", label)))
    };

    Ok(NewCustomer {
        code: require(code, "code")?,
        name: require(name, "name")?,
        address: require(address, "address")?,
        phone: require(phone, "phone")?,
        photos,
    })
}

/// POST /customers
pub async fn register_customer(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let customer = parse_registration(multipart).await?;
    state.customers.insert(&customer).await?;

    let summary = state
        .customers
        .get(&customer.code)
        .await?
        .ok_or_else(|| DepotError::Internal("customer vanished after insert".to_string()))?;
    Ok((StatusCode::CREATED, Json(CustomerDto::from(summary))))
}

/// GET /customers/:code
pub async fn get_customer(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<CustomerDto>> {
    let summary = state.customers.get(&code).await?.ok_or_else(|| {
        AppError(DepotError::NotFound(format!(
            "customer '{}' does not exist",
            code
        )))
    })?;
    Ok(Json(CustomerDto::from(summary)))
}

/// GET /customers
pub async fn list_customers(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CustomerDto>>> {
    let customers = state.customers.list().await?;
    Ok(Json(customers.into_iter().map(CustomerDto::from).collect()))
}
