use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, info};

use crate::client_ip::client_identifier;
use crate::clock::Clock;
use crate::handlers::AppState;
use crate::rate_limit_config::Bucket;
use crate::session::{GateDecision, SessionGate};

/// Logging middleware for request/response tracking
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let client = client_identifier(request.headers());

    info!(
        target: "gatekeeper::middleware",
        method = %method,
        uri = %uri,
        client = %client,
        "Incoming request"
    );

    let response = next.run(request).await;

    info!(
        target: "gatekeeper::middleware",
        method = %method,
        uri = %uri,
        status = %response.status(),
        "Request completed"
    );

    response
}

/// Forward or redirect admin requests based on the session cookie.
pub async fn require_session(
    State(gate): State<SessionGate>,
    request: Request,
    next: Next,
) -> Response {
    match gate.decide(request.uri().path(), request.headers()) {
        GateDecision::Forward => next.run(request).await,
        GateDecision::Redirect(location) => {
            debug!(path = %request.uri().path(), location = %location, "Session gate redirect");
            Redirect::to(&location).into_response()
        }
    }
}

/// Admit public lookup requests through the per-client fixed window.
pub async fn limit_lookups<C: Clock>(
    State(state): State<AppState<C>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_identifier(request.headers());

    if let Err(err) = state.admit(Bucket::Lookup, &client) {
        return err.into_response();
    }

    let mut response = next.run(request).await;

    let policy = state.lookup_policy;
    if let Some(status) = state.limiter.peek(&Bucket::Lookup.key(&client), &policy) {
        let headers = response.headers_mut();
        headers.insert("X-RateLimit-Limit", HeaderValue::from(status.limit));
        headers.insert("X-RateLimit-Remaining", HeaderValue::from(status.remaining));
    }

    response
}
