//! クライアントIPアドレスユーティリティ
//!
//! プロキシヘッダーからの呼び出し元IP抽出と、
//! IPv4-mapped IPv6アドレスのIPv4正規化。

use axum::extract::{ConnectInfo, Request};
use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// IPアドレスを正規化する
///
/// IPv4-mapped IPv6（::ffff:x.x.x.x）をIPv4に変換。
/// それ以外はそのまま返す。
pub fn normalize_ip(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                IpAddr::V4(v4)
            } else {
                IpAddr::V6(v6)
            }
        }
        v4 => v4,
    }
}

/// リクエストヘッダーから呼び出し元IPを抽出する（プロキシ対応）
///
/// `x-forwarded-for`（先頭エントリ）→ `x-real-ip` の順に参照する。
/// どちらも無ければNone。
pub fn client_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
}

/// リクエストから呼び出し元IPを特定する
///
/// プロキシヘッダーを優先し、無ければ接続元ソケットアドレスを使う。
pub fn client_ip(request: &Request) -> Option<String> {
    if let Some(ip) = client_ip_from_headers(request.headers()) {
        return Some(ip);
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| normalize_ip(info.0.ip()).to_string())
}
