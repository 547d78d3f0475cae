use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{GateError, Result};

/// Longest window a policy accepts.
pub const MAX_WINDOW: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// Quota applied at a single call site: at most `max_requests` per fixed
/// window of length `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPolicy", into = "RawPolicy")]
pub struct RateLimitPolicy {
    max_requests: u32,
    window: Duration,
}

#[derive(Serialize, Deserialize)]
struct RawPolicy {
    max_requests: u32,
    #[serde(with = "humantime_serde")]
    window: Duration,
}

impl RateLimitPolicy {
    /// Build a policy, rejecting a zero quota, a zero-length window or a
    /// window longer than [`MAX_WINDOW`].
    pub fn new(max_requests: u32, window: Duration) -> Result<Self> {
        if max_requests == 0 {
            return Err(GateError::Configuration(
                "max_requests must be greater than 0".to_string(),
            ));
        }
        if window.is_zero() {
            return Err(GateError::Configuration(
                "window must be greater than 0".to_string(),
            ));
        }
        if window > MAX_WINDOW {
            return Err(GateError::Configuration(format!(
                "window of {}s exceeds the maximum of {}s",
                window.as_secs(),
                MAX_WINDOW.as_secs()
            )));
        }
        Ok(Self {
            max_requests,
            window,
        })
    }

    pub fn per_minute(max_requests: u32) -> Result<Self> {
        Self::new(max_requests, Duration::from_secs(60))
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Named limiter bucket. Buckets share one store but never share counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Lookup,
    Login,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Lookup => "lookup",
            Bucket::Login => "login",
        }
    }

    /// Store key for `client` within this bucket.
    pub fn key(&self, client: &str) -> String {
        format!("{}:{}", self.as_str(), client.trim())
    }
}

impl TryFrom<RawPolicy> for RateLimitPolicy {
    type Error = GateError;

    fn try_from(raw: RawPolicy) -> Result<Self> {
        Self::new(raw.max_requests, raw.window)
    }
}

impl From<RateLimitPolicy> for RawPolicy {
    fn from(policy: RateLimitPolicy) -> Self {
        Self {
            max_requests: policy.max_requests,
            window: policy.window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_quota() {
        let err = RateLimitPolicy::new(0, Duration::from_secs(60)).unwrap_err();
        assert!(matches!(err, GateError::Configuration(_)));
    }

    #[test]
    fn test_rejects_zero_window() {
        let err = RateLimitPolicy::new(10, Duration::ZERO).unwrap_err();
        assert!(matches!(err, GateError::Configuration(_)));
    }

    #[test]
    fn test_rejects_window_beyond_maximum() {
        assert!(RateLimitPolicy::new(10, MAX_WINDOW).is_ok());

        let err = RateLimitPolicy::new(10, MAX_WINDOW + Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, GateError::Configuration(_)));

        let err = RateLimitPolicy::new(10, Duration::from_secs(u64::MAX)).unwrap_err();
        assert!(matches!(err, GateError::Configuration(_)));
    }

    #[test]
    fn test_window_serializes_as_humantime() {
        let policy = RateLimitPolicy::per_minute(10).unwrap();
        let json = serde_json::to_value(policy).unwrap();
        assert_eq!(json["max_requests"], 10);
        assert_eq!(json["window"], "1m");
    }

    #[test]
    fn test_bucket_keys_are_namespaced() {
        assert_eq!(Bucket::Lookup.key("203.0.113.5"), "lookup:203.0.113.5");
        assert_eq!(Bucket::Login.key(" 203.0.113.5 "), "login:203.0.113.5");
        assert_ne!(Bucket::Lookup.key("a"), Bucket::Login.key("a"));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: RateLimitPolicy =
            serde_json::from_str(r#"{"max_requests": 5, "window": "30s"}"#).unwrap();
        assert_eq!(ok.max_requests(), 5);
        assert_eq!(ok.window(), Duration::from_secs(30));

        let bad = serde_json::from_str::<RateLimitPolicy>(r#"{"max_requests": 0, "window": "30s"}"#);
        assert!(bad.is_err());
    }
}
