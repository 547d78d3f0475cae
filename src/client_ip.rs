use axum::http::HeaderMap;

/// Identifier used when no forwarding header is present (local development).
pub const LOOPBACK_IDENTIFIER: &str = "127.0.0.1";

/// Derive the rate limit identifier for a request.
///
/// Prefers the first hop of `X-Forwarded-For`, then `X-Real-IP`, then the
/// loopback default.
pub fn client_identifier(headers: &HeaderMap) -> String {
    if let Some(first_hop) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first_hop.to_string();
    }

    if let Some(real_ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return real_ip.to_string();
    }

    LOOPBACK_IDENTIFIER.to_string()
}
