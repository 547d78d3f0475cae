use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, Uri},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::client_ip::client_identifier;
use crate::clock::{Clock, SystemClock};
use crate::credentials::CredentialValidator;
use crate::error::{GateError, Result};
use crate::rate_limit_config::{Bucket, RateLimitPolicy};
use crate::rate_limiter::RateLimiter;
use crate::response::{
    AdminAreaResponse, HealthResponse, LookupResponse, RateLimitStatusResponse, ResetResponse,
};
use crate::session::{expired_session_cookie, session_cookie, SessionGate};

/// Shared application state handed to every handler and middleware.
pub struct AppState<C: Clock = SystemClock> {
    pub limiter: Arc<RateLimiter<C>>,
    pub lookup_policy: RateLimitPolicy,
    pub login_policy: RateLimitPolicy,
    pub gate: SessionGate,
    pub credentials: Arc<dyn CredentialValidator>,
    pub secure_cookies: bool,
}

impl<C: Clock> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
            lookup_policy: self.lookup_policy,
            login_policy: self.login_policy,
            gate: self.gate.clone(),
            credentials: Arc::clone(&self.credentials),
            secure_cookies: self.secure_cookies,
        }
    }
}

impl<C: Clock> AppState<C> {
    pub fn policy(&self, bucket: Bucket) -> RateLimitPolicy {
        match bucket {
            Bucket::Lookup => self.lookup_policy,
            Bucket::Login => self.login_policy,
        }
    }

    /// Count one request from `client` in `bucket`, failing when over quota.
    pub fn admit(&self, bucket: Bucket, client: &str) -> Result<()> {
        let policy = self.policy(bucket);
        let key = bucket.key(client);

        if self.limiter.check_and_consume(&key, &policy) {
            return Ok(());
        }

        let retry_after = self.limiter.retry_after(&key).unwrap_or(policy.window());
        warn!(
            bucket = bucket.as_str(),
            identifier = %client,
            limit = policy.max_requests(),
            "Rate limit exceeded"
        );
        Err(GateError::RateLimitExceeded {
            limit: policy.max_requests(),
            retry_after_secs: retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, max = 128))]
    pub username: String,
    #[validate(length(min = 1, max = 256))]
    pub password: String,
}

/// Health check endpoint
pub async fn health_check<C: Clock>(State(state): State<AppState<C>>) -> impl IntoResponse {
    Json(HealthResponse::healthy(state.limiter.len()))
}

/// Public ticket lookup. Order storage lives outside this service, so the
/// handler only acknowledges a well-formed code.
pub async fn lookup(Path(code): Path<String>) -> Result<Json<LookupResponse>> {
    let code = code.trim();
    if code.is_empty()
        || code.len() > 64
        || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(GateError::InvalidRequest(
            "lookup code must be 1-64 alphanumeric characters or hyphens".to_string(),
        ));
    }

    Ok(Json(LookupResponse::accepted(code.to_ascii_uppercase())))
}

pub async fn login_page() -> impl IntoResponse {
    "Admin login"
}

pub async fn login<C: Clock>(
    State(state): State<AppState<C>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let client = client_identifier(&headers);
    state.admit(Bucket::Login, &client)?;
    form.validate()?;

    if !state.credentials.validate(&form.username, &form.password) {
        warn!(identifier = %client, username = %form.username, "Admin login rejected");
        return Ok(Redirect::to(state.gate.login_path()).into_response());
    }

    let token = Uuid::new_v4().simple().to_string();
    info!(identifier = %client, username = %form.username, "Admin login succeeded");

    Ok((
        [(
            header::SET_COOKIE,
            session_cookie(&token, state.secure_cookies).to_string(),
        )],
        Redirect::to(state.gate.landing_path()),
    )
        .into_response())
}

pub async fn logout<C: Clock>(State(state): State<AppState<C>>) -> impl IntoResponse {
    (
        [(
            header::SET_COOKIE,
            expired_session_cookie(state.secure_cookies).to_string(),
        )],
        Redirect::to(state.gate.login_path()),
    )
}

pub async fn admin_home<C: Clock>(State(state): State<AppState<C>>) -> Redirect {
    Redirect::to(state.gate.landing_path())
}

pub async fn admin_landing() -> Json<AdminAreaResponse> {
    Json(AdminAreaResponse {
        area: "vendas".to_string(),
        message: "Authenticated admin area".to_string(),
    })
}

/// Inspect the limiter entry for an identifier without counting a request.
pub async fn get_rate_limit<C: Clock>(
    State(state): State<AppState<C>>,
    Path((bucket, identifier)): Path<(Bucket, String)>,
) -> Result<Json<RateLimitStatusResponse>> {
    let policy = state.policy(bucket);
    let status = state
        .limiter
        .peek(&bucket.key(&identifier), &policy)
        .ok_or_else(|| {
            GateError::NotFound(format!("no live {} entry for {}", bucket.as_str(), identifier))
        })?;

    Ok(Json(RateLimitStatusResponse {
        bucket,
        identifier,
        policy,
        status,
    }))
}

/// Remove the limiter entry for an identifier.
pub async fn delete_rate_limit<C: Clock>(
    State(state): State<AppState<C>>,
    Path((bucket, identifier)): Path<(Bucket, String)>,
) -> Result<Json<ResetResponse>> {
    if !state.limiter.reset(&bucket.key(&identifier)) {
        return Err(GateError::NotFound(format!(
            "no {} entry for {}",
            bucket.as_str(),
            identifier
        )));
    }

    info!(bucket = bucket.as_str(), identifier = %identifier, "Rate limit entry reset");
    Ok(Json(ResetResponse::removed(identifier)))
}

/// Fallback for unmatched paths. Admin paths only get here after the
/// session gate has forwarded them.
pub async fn not_found(uri: Uri) -> GateError {
    GateError::NotFound(format!("no route for {}", uri.path()))
}
