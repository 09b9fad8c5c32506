//! 共通型定義

/// エラー型定義
pub mod error;

/// IPアドレスユーティリティ
pub mod ip;
