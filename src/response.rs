use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::rate_limit_config::{Bucket, RateLimitPolicy};
use crate::rate_limiter::RateLimitStatus;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub tracked_identifiers: usize,
}

impl HealthResponse {
    pub fn healthy(tracked_identifiers: usize) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            tracked_identifiers,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub code: String,
    pub status: String,
}

impl LookupResponse {
    pub fn accepted(code: String) -> Self {
        Self {
            code,
            status: "accepted".to_string(),
        }
    }
}

/// Diagnostic view of one identifier within a bucket.
#[derive(Debug, Serialize)]
pub struct RateLimitStatusResponse {
    pub bucket: Bucket,
    pub identifier: String,
    pub policy: RateLimitPolicy,
    #[serde(flatten)]
    pub status: RateLimitStatus,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub status: String,
    pub message: String,
    pub identifier: String,
}

impl ResetResponse {
    pub fn removed(identifier: String) -> Self {
        Self {
            status: "success".to_string(),
            message: "Rate limit entry removed".to_string(),
            identifier,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminAreaResponse {
    pub area: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_health_response_serialization() {
        let json = serde_json::to_value(HealthResponse::healthy(3)).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["tracked_identifiers"], 3);
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_status_response_flattens_status() {
        let response = RateLimitStatusResponse {
            bucket: Bucket::Lookup,
            identifier: "203.0.113.5".to_string(),
            policy: RateLimitPolicy::per_minute(10).unwrap(),
            status: RateLimitStatus {
                limit: 10,
                count: 4,
                remaining: 6,
                reset_after: Duration::from_secs(12),
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["bucket"], "lookup");
        assert_eq!(json["remaining"], 6);
        assert_eq!(json["reset_after"], "12s");
        assert_eq!(json["policy"]["window"], "1m");
    }
}
