//! ログ初期化
//!
//! `RUST_LOG`環境変数でフィルタを上書きできる。

use tracing_subscriber::EnvFilter;

/// tracingサブスクライバーを初期化する
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
