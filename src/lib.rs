pub mod client_ip;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod rate_limit_config;
pub mod rate_limiter;
pub mod response;
pub mod server;
pub mod session;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{GateError, Result};
pub use rate_limit_config::{Bucket, RateLimitPolicy};
pub use rate_limiter::{RateLimitStatus, RateLimiter};
pub use server::{create_app, Server};
pub use session::{GateDecision, RouteClass, SessionGate};
