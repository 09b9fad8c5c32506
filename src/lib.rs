//! filedepot - 顧客ファイル保管サービス
//!
//! 顧客登録、ZIPバンドルによるファイル一括取り込み、公開配信、
//! 全リクエストの監査ログ記録を提供するHTTPサービス。

#![warn(missing_docs)]

/// HTTP API
pub mod api;

/// 監査ログサブシステム
pub mod audit;

/// 共通ユーティリティ（エラー型・IPアドレス処理）
pub mod common;

/// 設定管理
pub mod config;

/// データベースアクセス層
pub mod db;

/// バンドル取り込みパイプライン
pub mod ingest;

/// ログ初期化
pub mod logging;

/// HTTPサーバー起動
pub mod server;

use crate::config::{LimitsConfig, StorageConfig};
use crate::db::customers::CustomerStore;
use crate::db::files::FileRecordStore;
use crate::db::logs::LogStore;
use crate::ingest::BundleIngestor;
use sqlx::SqlitePool;
use std::sync::Arc;

/// アプリケーション共有状態
#[derive(Clone)]
pub struct AppState {
    /// データベース接続プール
    pub db_pool: SqlitePool,
    /// 顧客ストア
    pub customers: CustomerStore,
    /// ファイルレコードストア
    pub files: FileRecordStore,
    /// 監査ログストア
    pub logs: Arc<LogStore>,
    /// バンドル取り込みパイプライン
    pub ingestor: BundleIngestor,
    /// ストレージ設定
    pub storage: StorageConfig,
    /// リクエストサイズ制限
    pub limits: LimitsConfig,
}

impl AppState {
    /// 共有状態を構築する
    pub fn new(db_pool: SqlitePool, storage: StorageConfig, limits: LimitsConfig) -> Self {
        let customers = CustomerStore::new(db_pool.clone());
        let files = FileRecordStore::new(db_pool.clone());
        let logs = Arc::new(LogStore::new(db_pool.clone()));
        let ingestor = BundleIngestor::new(customers.clone(), files.clone(), storage.clone());

        Self {
            db_pool,
            customers,
            files,
            logs,
            ingestor,
            storage,
            limits,
        }
    }

    /// テスト用の共有状態（一時ディレクトリをストレージに使う）
    #[cfg(test)]
    pub(crate) fn for_tests(db_pool: SqlitePool) -> Self {
        let base = std::env::temp_dir().join(format!("filedepot-test-{}", uuid::Uuid::new_v4()));
        let storage = StorageConfig {
            root: base.join("uploads"),
            temp_root: base.join("tmp"),
            public_prefix: "/uploads".to_string(),
            extract_timeout: std::time::Duration::from_secs(10),
        };
        std::fs::create_dir_all(&storage.root).expect("Failed to create test storage root");
        std::fs::create_dir_all(&storage.temp_root).expect("Failed to create test temp root");

        Self::new(
            db_pool,
            storage,
            LimitsConfig {
                max_upload_bytes: 16 * 1024 * 1024,
            },
        )
    }
}
