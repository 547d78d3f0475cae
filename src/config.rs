use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{GateError, Result};
use crate::rate_limit_config::{RateLimitPolicy, MAX_WINDOW};
use crate::session::SessionGate;

/// Login attempts allowed per client within one window.
pub const LOGIN_MAX_ATTEMPTS: u32 = 5;
pub const LOGIN_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Parser)]
#[command(name = "gatekeeper", version, about = "Admission limiting and admin session gate")]
pub struct Config {
    /// Server bind address
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
    pub bind_addr: SocketAddr,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Seconds between sweeps of expired rate limit entries
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 60)]
    pub sweep_interval_secs: u64,

    /// Requests allowed per client on public lookup endpoints per window
    #[arg(long, env = "LOOKUP_MAX_REQUESTS", default_value_t = 10)]
    pub lookup_max_requests: u32,

    /// Lookup window length in seconds
    #[arg(long, env = "LOOKUP_WINDOW_SECS", default_value_t = 60)]
    pub lookup_window_secs: u64,

    #[arg(long, env = "ADMIN_PREFIX", default_value = "/admin")]
    pub admin_prefix: String,

    #[arg(long, env = "LOGIN_PATH", default_value = "/admin/login")]
    pub login_path: String,

    /// Where authenticated users land after login
    #[arg(long, env = "LANDING_PATH", default_value = "/admin/vendas")]
    pub landing_path: String,

    #[arg(long, env = "ADMIN_USERNAME", default_value = "admin")]
    pub admin_username: String,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: String,

    /// Mark the session cookie Secure (enable in production)
    #[arg(long, env = "SECURE_COOKIES", default_value_t = false)]
    pub secure_cookies: bool,
}

impl Config {
    /// Parse configuration from command-line arguments and the environment.
    pub fn from_env() -> std::result::Result<Self, clap::Error> {
        Config::try_parse()
    }

    pub fn lookup_policy(&self) -> Result<RateLimitPolicy> {
        RateLimitPolicy::new(
            self.lookup_max_requests,
            Duration::from_secs(self.lookup_window_secs),
        )
    }

    pub fn login_policy(&self) -> Result<RateLimitPolicy> {
        RateLimitPolicy::new(LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW)
    }

    pub fn sweep_interval(&self) -> Result<Duration> {
        if self.sweep_interval_secs == 0 {
            return Err(GateError::Configuration(
                "sweep interval must be greater than 0".to_string(),
            ));
        }
        let interval = Duration::from_secs(self.sweep_interval_secs);
        if interval > MAX_WINDOW {
            return Err(GateError::Configuration(format!(
                "sweep interval cannot exceed {}s",
                MAX_WINDOW.as_secs()
            )));
        }
        Ok(interval)
    }

    pub fn session_gate(&self) -> Result<SessionGate> {
        SessionGate::new(&self.admin_prefix, &self.login_path, &self.landing_path)
    }

    /// Check every derived component so misconfiguration fails at startup.
    pub fn validate(&self) -> Result<()> {
        self.lookup_policy()?;
        self.sweep_interval()?;
        self.session_gate()?;
        if self.admin_password.is_empty() {
            return Err(GateError::Configuration(
                "ADMIN_PASSWORD cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
