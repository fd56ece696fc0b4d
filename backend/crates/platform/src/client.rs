//! Client identification
//!
//! Derives the rate-limit key for a request from proxy headers and the
//! direct connection address.

use axum::http::HeaderMap;
use std::net::IpAddr;

/// Key used when no source identifies the client
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derive a client key.
///
/// Sources are checked in order, first non-empty wins:
/// 1. first entry of `X-Forwarded-For`
/// 2. `CF-Connecting-IP`
/// 3. `X-Real-IP`
/// 4. the direct connection address
///
/// Header values are taken as-is (trimmed), not parsed as IP addresses.
/// Forwarded headers are trusted unconditionally, so this is only sound
/// behind a proxy that overwrites them.
pub fn client_key(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> String {
    if let Some(first) = header_str(headers, "x-forwarded-for")
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return first.to_string();
    }

    for name in ["cf-connecting-ip", "x-real-ip"] {
        if let Some(value) = header_str(headers, name)
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return value.to_string();
        }
    }

    direct_ip
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
