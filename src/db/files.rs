//! ファイルレコードストレージ
//!
//! バンドルから取り込んだファイル1件につき1レコード。更新はなく、
//! 作成と個別削除のみ。

use crate::common::error::{DepotError, DepotResult};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// ファイルレコード
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// レコードID（DB挿入後に設定）
    pub id: Option<i64>,
    /// 所有顧客の識別コード
    pub customer_code: String,
    /// 元のファイル名
    pub file_name: String,
    /// 公開パス（`/uploads/{code}/{storedName}`）
    pub storage_path: String,
    /// アップロード時刻
    pub uploaded_at: DateTime<Utc>,
}

/// 顧客名を結合したファイルレコード
#[derive(Debug, Clone)]
pub struct FileRecordWithCustomer {
    /// ファイルレコード
    pub record: FileRecord,
    /// 顧客の表示名
    pub customer_name: String,
}

/// sqlx::FromRow用の行構造体
#[derive(Debug, sqlx::FromRow)]
struct FileRecordRow {
    id: i64,
    customer_code: String,
    file_name: String,
    storage_path: String,
    uploaded_at: String,
}

impl TryFrom<FileRecordRow> for FileRecord {
    type Error = DepotError;

    fn try_from(row: FileRecordRow) -> Result<Self, Self::Error> {
        let uploaded_at = chrono::DateTime::parse_from_rfc3339(&row.uploaded_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| DepotError::Database(format!("Failed to parse uploaded_at: {}", e)))?;

        Ok(FileRecord {
            id: Some(row.id),
            customer_code: row.customer_code,
            file_name: row.file_name,
            storage_path: row.storage_path,
            uploaded_at,
        })
    }
}

/// ファイルレコードのDB CRUD操作
#[derive(Clone)]
pub struct FileRecordStore {
    pool: SqlitePool,
}

impl FileRecordStore {
    /// 新しいFileRecordStoreを作成
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// レコードを保存し、採番されたIDを返す
    pub async fn insert(&self, record: &FileRecord) -> DepotResult<i64> {
        let uploaded_at = record.uploaded_at.to_rfc3339();
        let result = sqlx::query(
            r#"INSERT INTO file_records (customer_code, file_name, storage_path, uploaded_at)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(&record.customer_code)
        .bind(&record.file_name)
        .bind(&record.storage_path)
        .bind(&uploaded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DepotError::Database(format!("Failed to insert file record: {}", e)))?;

        Ok(result.last_insert_rowid())
    }

    /// IDでレコードを取得
    pub async fn get(&self, id: i64) -> DepotResult<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRecordRow>(
            "SELECT * FROM file_records WHERE id = ? LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DepotError::Database(format!("Failed to load file record: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row.try_into()?)),
            None => Ok(None),
        }
    }

    /// 顧客の全レコードを取得（アップロード順）
    pub async fn list_by_customer(&self, customer_code: &str) -> DepotResult<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRecordRow>(
            "SELECT * FROM file_records WHERE customer_code = ? ORDER BY id",
        )
        .bind(customer_code)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DepotError::Database(format!("Failed to list file records: {}", e)))?;

        rows.into_iter().map(FileRecord::try_from).collect()
    }

    /// 全レコードを顧客名と結合して取得
    pub async fn list_all_with_customer(&self) -> DepotResult<Vec<FileRecordWithCustomer>> {
        let rows = sqlx::query_as::<_, (i64, String, String, String, String, String)>(
            "SELECT f.id, f.customer_code, c.name, f.file_name, f.storage_path, f.uploaded_at \
             FROM file_records f JOIN customers c ON c.code = f.customer_code \
             ORDER BY f.id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DepotError::Database(format!("Failed to list file records: {}", e)))?;

        rows.into_iter()
            .map(|(id, customer_code, customer_name, file_name, storage_path, uploaded_at)| {
                let uploaded_at = chrono::DateTime::parse_from_rfc3339(&uploaded_at)
                    .map(|dt| dt.with_timezone(&chrono::Utc))
                    .map_err(|e| {
                        DepotError::Database(format!("Failed to parse uploaded_at: {}", e))
                    })?;
                Ok(FileRecordWithCustomer {
                    record: FileRecord {
                        id: Some(id),
                        customer_code,
                        file_name,
                        storage_path,
                        uploaded_at,
                    },
                    customer_name,
                })
            })
            .collect()
    }

    /// レコードを削除する（存在しなければfalse）
    pub async fn delete(&self, id: i64) -> DepotResult<bool> {
        let result = sqlx::query("DELETE FROM file_records WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DepotError::Database(format!("Failed to delete file record: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}
