//! Configuration management via environment variables
//!
//! Provides helper functions for reading environment variables and the
//! typed configuration structs built from them at startup.

use std::path::PathBuf;
use std::time::Duration;

/// Get an environment variable, if set
pub fn get_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Get an environment variable with a default value
pub fn get_env_or(name: &str, default: &str) -> String {
    get_env(name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable, parsing to a specific type
///
/// Returns the default if the variable is unset or fails to parse.
pub fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    get_env(name).and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// File storage configuration (durable uploads area + transient workspaces)
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Durable storage root; served publicly under `public_prefix`
    pub root: PathBuf,
    /// Transient workspace root for bundle expansion
    pub temp_root: PathBuf,
    /// URL prefix the storage root is served from
    pub public_prefix: String,
    /// Upper bound on archive expansion time
    pub extract_timeout: Duration,
}

impl StorageConfig {
    /// Load storage configuration from environment variables.
    pub fn from_env() -> Self {
        let root = PathBuf::from(get_env_or("FILEDEPOT_UPLOADS_DIR", "data/uploads"));
        let temp_root = PathBuf::from(get_env_or("FILEDEPOT_TEMP_DIR", "data/tmp"));
        let timeout_secs = get_env_parse("FILEDEPOT_EXTRACT_TIMEOUT_SECS", 60u64);

        Self {
            root,
            temp_root,
            public_prefix: "/uploads".to_string(),
            extract_timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 保存ファイルの公開パスを構築する
    ///
    /// `/{prefix}/{customerCode}/{storedName}` 形式。
    pub fn public_path(&self, customer_code: &str, stored_name: &str) -> String {
        format!("{}/{}/{}", self.public_prefix, customer_code, stored_name)
    }

    /// 公開パスを物理パスに解決する
    ///
    /// プレフィックスに一致しないパスはNone。
    pub fn resolve_public_path(&self, public_path: &str) -> Option<PathBuf> {
        let prefix = format!("{}/", self.public_prefix);
        let rest = public_path.strip_prefix(&prefix)?;
        if rest.is_empty() {
            return None;
        }
        Some(self.root.join(rest))
    }
}

/// Request size limits
#[derive(Debug, Clone, Copy)]
pub struct LimitsConfig {
    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,
}

impl LimitsConfig {
    /// Load limits from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_upload_bytes: get_env_parse("FILEDEPOT_MAX_UPLOAD_BYTES", 104_857_600usize),
        }
    }
}

/// Top-level service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address (`host:port`)
    pub bind_addr: String,
    /// SQLite database URL
    pub database_url: String,
    /// File storage configuration
    pub storage: StorageConfig,
    /// Request size limits
    pub limits: LimitsConfig,
}

impl Config {
    /// Load the full configuration from environment variables.
    pub fn from_env() -> Self {
        let host = get_env_or("FILEDEPOT_HOST", "0.0.0.0");
        let port = get_env_or("FILEDEPOT_PORT", "8080");

        Self {
            bind_addr: format!("{}:{}", host, port),
            database_url: get_env_or("FILEDEPOT_DATABASE_URL", "sqlite://data/filedepot.db"),
            storage: StorageConfig::from_env(),
            limits: LimitsConfig::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_storage() -> StorageConfig {
        StorageConfig {
            root: PathBuf::from("data/uploads"),
            temp_root: PathBuf::from("data/tmp"),
            public_prefix: "/uploads".to_string(),
            extract_timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_public_path_format() {
        let storage = test_storage();
        assert_eq!(
            storage.public_path("1234567890", "report_20250101120000.pdf"),
            "/uploads/1234567890/report_20250101120000.pdf"
        );
    }

    #[test]
    fn test_resolve_public_path() {
        let storage = test_storage();
        assert_eq!(
            storage.resolve_public_path("/uploads/1234567890/a.pdf"),
            Some(PathBuf::from("data/uploads/1234567890/a.pdf"))
        );
        assert_eq!(storage.resolve_public_path("/elsewhere/a.pdf"), None);
        assert_eq!(storage.resolve_public_path("/uploads/"), None);
    }

    #[test]
    fn test_get_env_parse_default_on_garbage() {
        // 未設定の変数はデフォルトにフォールバック
        assert_eq!(
            get_env_parse("FILEDEPOT_TEST_UNSET_VARIABLE", 42u64),
            42u64
        );
    }
}
