use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::credentials::StaticCredentials;
use crate::error::{GateError, Result};
use crate::handlers::{
    admin_home, admin_landing, delete_rate_limit, get_rate_limit, health_check, login,
    login_page, logout, lookup, not_found, AppState,
};
use crate::middleware::{limit_lookups, logging_middleware, require_session};
use crate::rate_limiter::RateLimiter;
use crate::sweeper::{spawn_sweeper, SweepHandle};
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Compose the router: the session gate fronts every request, including
/// unmatched ones, and forwards anything outside the admin prefix. The
/// lookup limiter fronts the public lookup endpoint.
pub fn create_app<C: Clock>(state: AppState<C>) -> Router {
    let gate = state.gate.clone();
    let login_path = gate.login_path().to_string();
    let prefix = gate.admin_prefix().to_string();

    let mut admin = Router::new()
        .route(&login_path, get(login_page).post(login::<C>))
        .route(&format!("{prefix}/logout"), post(logout::<C>))
        .route(gate.landing_path(), get(admin_landing))
        .route(
            &format!("{prefix}/rate-limit/:bucket/:identifier"),
            get(get_rate_limit::<C>).delete(delete_rate_limit::<C>),
        );
    if gate.landing_path() != prefix {
        admin = admin.route(&prefix, get(admin_home::<C>));
    }

    let public = Router::new()
        .route("/api/lookup/:code", get(lookup))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            limit_lookups::<C>,
        ))
        .route("/health", get(health_check::<C>));

    Router::new()
        .merge(admin)
        .merge(public)
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn_with_state(gate, require_session))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(logging_middleware)),
        )
}

pub struct Server {
    app: Router,
    bind_addr: SocketAddr,
    limiter: Arc<RateLimiter<SystemClock>>,
    sweep_interval: Duration,
}

impl Server {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let limiter = Arc::new(RateLimiter::new());
        let state = AppState {
            limiter: Arc::clone(&limiter),
            lookup_policy: config.lookup_policy()?,
            login_policy: config.login_policy()?,
            gate: config.session_gate()?,
            credentials: Arc::new(StaticCredentials::new(
                config.admin_username.clone(),
                config.admin_password.clone(),
            )),
            secure_cookies: config.secure_cookies,
        };

        Ok(Self {
            app: create_app(state),
            bind_addr: config.bind_addr,
            limiter,
            sweep_interval: config.sweep_interval()?,
        })
    }

    pub async fn run(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr)
            .await
            .map_err(|e| GateError::Internal(format!("failed to bind {}: {}", self.bind_addr, e)))?;

        let sweeper: SweepHandle = spawn_sweeper(self.limiter, self.sweep_interval);

        tracing::info!("Gatekeeper listening on {}", self.bind_addr);
        tracing::info!("Health check available at /health");

        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        sweeper.shutdown().await;

        served.map_err(|e| GateError::Internal(format!("server error: {}", e)))
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
