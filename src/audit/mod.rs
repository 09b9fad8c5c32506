//! 監査ログサブシステム
//!
//! 全リクエストの記録（インターセプター）と未回復障害の記録（レコーダー）。

/// 監査ログの型定義
pub mod types;

/// 監査ミドルウェア（リクエスト/レスポンスボディ捕捉）
pub mod middleware;

/// 例外レコーダー（未回復障害の境界ハンドラー）
pub mod recorder;
