//! バンドル取り込みパイプライン
//!
//! 顧客識別コードに紐づくzipバンドルを受け取り、一時ワークスペースで
//! 展開・検証し、各ファイルを顧客別の永続領域へ衝突しない名前で保存、
//! 1ファイルにつき1件のファイルレコードを登録する。
//!
//! 一時ワークスペースは成功・空バンドル・障害のいずれの経路でも削除する。
//! 途中失敗時に保存済みファイル/レコードのロールバックは行わない
//! （部分成功を許容）。

use crate::common::error::{DepotError, DepotResult};
use crate::config::StorageConfig;
use crate::db::customers::CustomerStore;
use crate::db::files::{FileRecord, FileRecordStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::task;
use tracing::{debug, warn};
use uuid::Uuid;

/// バンドルとして受け付ける拡張子
const BUNDLE_EXTENSION: &str = ".zip";

/// 保存ファイル名のタイムスタンプ書式（秒解像度）
const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// 保存済みファイル1件の要約
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    /// ファイルレコードID
    pub id: i64,
    /// 元のファイル名
    pub name: String,
    /// 公開パス
    pub path: String,
    /// アップロード時刻
    pub uploaded_at: DateTime<Utc>,
}

/// 取り込み結果
#[derive(Debug, Serialize)]
pub struct IngestSummary {
    /// 保存したファイル数
    pub count: usize,
    /// ファイルごとの要約
    pub files: Vec<StoredFile>,
}

/// バンドル取り込みパイプライン
#[derive(Clone)]
pub struct BundleIngestor {
    customers: CustomerStore,
    files: FileRecordStore,
    storage: StorageConfig,
}

impl BundleIngestor {
    /// 新しいBundleIngestorを作成
    pub fn new(customers: CustomerStore, files: FileRecordStore, storage: StorageConfig) -> Self {
        Self {
            customers,
            files,
            storage,
        }
    }

    /// バンドルを取り込む
    ///
    /// 1. 顧客が存在しなければNotFound
    /// 2. 拡張子が`.zip`でなければInvalidInput（マジックバイト検証はしない）
    /// 3. 一意な一時ワークスペースを確保してペイロードを書き込み・展開
    /// 4. `.zip`で終わるメンバーを除外した全ファイルを候補とする
    /// 5. 候補ゼロならInvalidInput（空バンドル）
    /// 6. 候補ごとに永続領域へコピーしレコードを登録
    pub async fn ingest(
        &self,
        customer_code: &str,
        bundle_name: &str,
        payload: &[u8],
    ) -> DepotResult<IngestSummary> {
        if !self.customers.exists(customer_code).await? {
            return Err(DepotError::NotFound(format!(
                "customer '{}' does not exist",
                customer_code
            )));
        }

        if !bundle_name.to_ascii_lowercase().ends_with(BUNDLE_EXTENSION) {
            return Err(DepotError::InvalidInput(
                "bundle must be a zip archive".to_string(),
            ));
        }

        let workspace = self.storage.temp_root.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&workspace)
            .await
            .map_err(|e| DepotError::Internal(format!("Failed to create workspace: {}", e)))?;

        let result = self
            .run_pipeline(customer_code, bundle_name, payload, &workspace)
            .await;

        // 成功・空バンドル・障害のすべての経路でワークスペースを削除
        if let Err(e) = tokio::fs::remove_dir_all(&workspace).await {
            warn!(
                "Failed to remove transient workspace {}: {}",
                workspace.display(),
                e
            );
        }

        result
    }

    async fn run_pipeline(
        &self,
        customer_code: &str,
        bundle_name: &str,
        payload: &[u8],
        workspace: &Path,
    ) -> DepotResult<IngestSummary> {
        // パストラバーサル防止のためファイル名成分のみを使う
        let bundle_file = Path::new(bundle_name)
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| DepotError::InvalidInput("invalid bundle file name".to_string()))?;
        let bundle_path = workspace.join(bundle_file);

        tokio::fs::write(&bundle_path, payload)
            .await
            .map_err(|e| DepotError::Internal(format!("Failed to write bundle: {}", e)))?;

        let candidates = self.extract_candidates(&bundle_path, workspace).await?;

        if candidates.is_empty() {
            return Err(DepotError::InvalidInput("empty bundle".to_string()));
        }

        let customer_dir = self.storage.root.join(customer_code);
        tokio::fs::create_dir_all(&customer_dir).await.map_err(|e| {
            DepotError::Internal(format!("Failed to create customer storage area: {}", e))
        })?;

        let mut stored = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            stored.push(
                self.store_candidate(customer_code, &customer_dir, candidate)
                    .await?,
            );
        }

        debug!(
            customer = customer_code,
            count = stored.len(),
            "bundle ingested"
        );

        Ok(IngestSummary {
            count: stored.len(),
            files: stored,
        })
    }

    /// バンドルをワークスペースへ展開し、候補ファイルを列挙する
    ///
    /// 展開と走査はブロッキング処理のためspawn_blockingで実行し、
    /// タイムアウトで打ち切る。`.zip`メンバー（保存したバンドル自身を含む）
    /// は候補から除外する。
    async fn extract_candidates(
        &self,
        bundle_path: &Path,
        workspace: &Path,
    ) -> DepotResult<Vec<PathBuf>> {
        let bundle_path = bundle_path.to_path_buf();
        let workspace = workspace.to_path_buf();

        let extraction = task::spawn_blocking(move || -> DepotResult<Vec<PathBuf>> {
            let file = std::fs::File::open(&bundle_path)
                .map_err(|e| DepotError::Internal(format!("Failed to open bundle: {}", e)))?;
            let mut archive = zip::ZipArchive::new(file)
                .map_err(|e| DepotError::Internal(format!("Failed to read bundle: {}", e)))?;
            archive
                .extract(&workspace)
                .map_err(|e| DepotError::Internal(format!("Failed to extract bundle: {}", e)))?;

            let mut candidates = Vec::new();
            collect_files(&workspace, &mut candidates)
                .map_err(|e| DepotError::Internal(format!("Failed to scan workspace: {}", e)))?;
            candidates.retain(|p| {
                !p.to_string_lossy()
                    .to_ascii_lowercase()
                    .ends_with(BUNDLE_EXTENSION)
            });
            Ok(candidates)
        });

        match tokio::time::timeout(self.storage.extract_timeout, extraction).await {
            Ok(joined) => joined
                .map_err(|e| DepotError::Internal(format!("Extraction task failed: {}", e)))?,
            Err(_) => Err(DepotError::Internal(
                "bundle extraction timed out".to_string(),
            )),
        }
    }

    /// 候補ファイル1件を永続領域へコピーし、レコードを登録する
    ///
    /// 保存名は `{元の名前}_{YYYYMMDDHHMMSS}{拡張子}`。同一秒内の同名
    /// ファイルは後勝ちで上書きされるが、レコードは両方残る。
    async fn store_candidate(
        &self,
        customer_code: &str,
        customer_dir: &Path,
        candidate: &Path,
    ) -> DepotResult<StoredFile> {
        let original_name = candidate
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| DepotError::Internal("candidate has no file name".to_string()))?;
        let stem = candidate
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| original_name.clone());
        let extension = candidate
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let now = Utc::now();
        let stored_name = format!("{}_{}{}", stem, now.format(STAMP_FORMAT), extension);
        let destination = customer_dir.join(&stored_name);

        tokio::fs::copy(candidate, &destination)
            .await
            .map_err(|e| DepotError::Internal(format!("Failed to store file: {}", e)))?;

        let public_path = self.storage.public_path(customer_code, &stored_name);

        let record = FileRecord {
            id: None,
            customer_code: customer_code.to_string(),
            file_name: original_name.clone(),
            storage_path: public_path.clone(),
            uploaded_at: now,
        };
        let id = self.files.insert(&record).await?;

        Ok(StoredFile {
            id,
            name: original_name,
            path: public_path,
            uploaded_at: now,
        })
    }
}

/// ディレクトリ配下の通常ファイルを再帰的に列挙する
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}
