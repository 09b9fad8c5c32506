//! 顧客ストレージ
//!
//! 顧客は識別コードをキーとし、作成後は不変。写真は最大3枚のBLOB。

use crate::common::error::{DepotError, DepotResult};
use sqlx::SqlitePool;

/// 新規登録する顧客
#[derive(Debug, Clone)]
pub struct NewCustomer {
    /// 識別コード（一意、不変）
    pub code: String,
    /// 表示名
    pub name: String,
    /// 住所
    pub address: String,
    /// 電話番号
    pub phone: String,
    /// 写真（最大3枚）
    pub photos: [Option<Vec<u8>>; 3],
}

/// 顧客の要約（写真はバイト列ではなく有無のみ）
#[derive(Debug, Clone)]
pub struct CustomerSummary {
    /// 識別コード
    pub code: String,
    /// 表示名
    pub name: String,
    /// 住所
    pub address: String,
    /// 電話番号
    pub phone: String,
    /// 写真の有無
    pub has_photos: [bool; 3],
}

/// sqlx::FromRow用の行構造体
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    code: String,
    name: String,
    address: String,
    phone: String,
    has_photo1: i64,
    has_photo2: i64,
    has_photo3: i64,
}

impl From<CustomerRow> for CustomerSummary {
    fn from(row: CustomerRow) -> Self {
        CustomerSummary {
            code: row.code,
            name: row.name,
            address: row.address,
            phone: row.phone,
            has_photos: [
                row.has_photo1 != 0,
                row.has_photo2 != 0,
                row.has_photo3 != 0,
            ],
        }
    }
}

const SUMMARY_SELECT: &str = "SELECT code, name, address, phone, \
     photo1 IS NOT NULL AS has_photo1, \
     photo2 IS NOT NULL AS has_photo2, \
     photo3 IS NOT NULL AS has_photo3 \
     FROM customers";

/// 顧客のDB CRUD操作
#[derive(Clone)]
pub struct CustomerStore {
    pool: SqlitePool,
}

impl CustomerStore {
    /// 新しいCustomerStoreを作成
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 識別コードが登録済みか
    pub async fn exists(&self, code: &str) -> DepotResult<bool> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customers WHERE code = ?")
                .bind(code)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DepotError::Database(format!("Failed to check customer: {}", e)))?;
        Ok(count > 0)
    }

    /// 顧客を登録する
    ///
    /// 識別コードが登録済みの場合はInvalidInput。
    pub async fn insert(&self, customer: &NewCustomer) -> DepotResult<()> {
        if self.exists(&customer.code).await? {
            return Err(DepotError::InvalidInput(format!(
                "customer code '{}' is already registered",
                customer.code
            )));
        }

        sqlx::query(
            r#"INSERT INTO customers (code, name, address, phone, photo1, photo2, photo3)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&customer.code)
        .bind(&customer.name)
        .bind(&customer.address)
        .bind(&customer.phone)
        .bind(&customer.photos[0])
        .bind(&customer.photos[1])
        .bind(&customer.photos[2])
        .execute(&self.pool)
        .await
        .map_err(|e| DepotError::Database(format!("Failed to insert customer: {}", e)))?;

        Ok(())
    }

    /// 識別コードで顧客要約を取得
    pub async fn get(&self, code: &str) -> DepotResult<Option<CustomerSummary>> {
        let sql = format!("{} WHERE code = ? LIMIT 1", SUMMARY_SELECT);
        let row = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DepotError::Database(format!("Failed to load customer: {}", e)))?;

        Ok(row.map(CustomerSummary::from))
    }

    /// 全顧客の要約を取得
    pub async fn list(&self) -> DepotResult<Vec<CustomerSummary>> {
        let sql = format!("{} ORDER BY code", SUMMARY_SELECT);
        let rows = sqlx::query_as::<_, CustomerRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DepotError::Database(format!("Failed to list customers: {}", e)))?;

        Ok(rows.into_iter().map(CustomerSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db_pool;

    pub(crate) fn sample_customer(code: &str) -> NewCustomer {
        NewCustomer {
            code: code.to_string(),
            name: "Maria Lopez".to_string(),
            address: "Av. Central 123".to_string(),
            phone: "0991234567".to_string(),
            photos: [Some(vec![0xFF, 0xD8]), None, None],
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = CustomerStore::new(test_db_pool().await);
        store.insert(&sample_customer("1712345678")).await.unwrap();

        let summary = store.get("1712345678").await.unwrap().unwrap();
        assert_eq!(summary.name, "Maria Lopez");
        assert_eq!(summary.has_photos, [true, false, false]);

        assert!(store.exists("1712345678").await.unwrap());
        assert!(!store.exists("0000000000").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let store = CustomerStore::new(test_db_pool().await);
        store.insert(&sample_customer("1712345678")).await.unwrap();

        let err = store
            .insert(&sample_customer("1712345678"))
            .await
            .unwrap_err();
        assert!(matches!(err, DepotError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_list_ordered_by_code() {
        let store = CustomerStore::new(test_db_pool().await);
        store.insert(&sample_customer("222")).await.unwrap();
        store.insert(&sample_customer("111")).await.unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].code, "111");
        assert_eq!(all[1].code, "222");
    }

    #[tokio::test]
    async fn test_get_unknown_returns_none() {
        let store = CustomerStore::new(test_db_pool().await);
        assert!(store.get("missing").await.unwrap().is_none());
    }
}
