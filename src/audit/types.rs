//! 監査ログの型定義

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 保存時のボディ文字数上限（超過分は切り詰めて `...` を付与）
pub const BODY_CAPTURE_LIMIT: usize = 4000;

/// ログ種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum LogCategory {
    /// 正常に処理されたリクエスト
    Info,
    /// 警告
    Warning,
    /// 障害（ハンドラー例外・内部エラー）
    Error,
}

impl LogCategory {
    /// 保存済みの種別文字列からLogCategoryに変換
    ///
    /// 行の読み戻し専用。未知の値はInfo扱いにする。外部入力による
    /// 種別の絞り込みは文字列そのままで照合する（`LogStore`参照）。
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s {
            "Error" => Self::Error,
            "Warning" => Self::Warning,
            _ => Self::Info,
        }
    }

    /// LogCategoryを文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
        }
    }
}

impl std::fmt::Display for LogCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 監査ログエントリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// レコードID（DB挿入後に設定）
    pub id: Option<i64>,
    /// タイムスタンプ
    pub timestamp: DateTime<Utc>,
    /// ログ種別
    pub category: LogCategory,
    /// リクエストパス＋クエリ文字列
    pub endpoint: String,
    /// HTTPメソッド
    pub http_method: String,
    /// 呼び出し元IPアドレス
    pub client_ip: Option<String>,
    /// リクエストボディ（4000文字で切り詰め）
    pub request_body: Option<String>,
    /// レスポンスボディ（4000文字で切り詰め）
    pub response_body: Option<String>,
    /// 追加情報（障害メッセージ・発生元トレース）
    pub detail: Option<String>,
}

/// 未回復障害の情報
///
/// `AppError` が5xxレスポンスのextensionsに設定し、例外レコーダーと
/// 監査ミドルウェアがそれぞれ独立に参照する。ハンドラーがパニックした
/// 場合はレコーダー自身が構築する。
#[derive(Debug, Clone)]
pub struct FaultInfo {
    /// 障害メッセージ
    pub message: String,
    /// 発生元トレース
    pub trace: Option<String>,
}

/// テキストを最大長で切り詰める
///
/// 上限超過時は省略記号 `...` を付与する。文字境界で切る。
pub fn truncate_marked(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}...", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip() {
        assert_eq!(LogCategory::from_str("Info"), LogCategory::Info);
        assert_eq!(LogCategory::from_str("Warning"), LogCategory::Warning);
        assert_eq!(LogCategory::from_str("Error"), LogCategory::Error);
        assert_eq!(LogCategory::Error.as_str(), "Error");
        // 未知の値はInfoにフォールバック
        assert_eq!(LogCategory::from_str("nonsense"), LogCategory::Info);
    }

    #[test]
    fn test_truncate_under_limit_unchanged() {
        assert_eq!(truncate_marked("hello", 10), "hello");
        assert_eq!(truncate_marked("", 10), "");
    }

    #[test]
    fn test_truncate_over_limit_marked() {
        let long = "a".repeat(5000);
        let out = truncate_marked(&long, BODY_CAPTURE_LIMIT);
        assert_eq!(out.len(), BODY_CAPTURE_LIMIT + 3);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "日本語テキスト";
        let out = truncate_marked(text, 3);
        assert_eq!(out, "日本語...");
    }
}
