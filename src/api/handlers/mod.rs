//! Route handlers and the extractors they share.
//!
//! Every failure is rendered as `{"success": false, "message": ...}`.
//! Internal errors are logged here with full detail and reach the client
//! only as "Internal server error".

pub mod health;
pub mod login;
pub mod register;
pub mod stats;
pub mod users;

use axum::{
    Json,
    extract::{ConnectInfo, FromRequestParts, rejection::JsonRejection},
    http::{
        HeaderMap, StatusCode,
        header::{AUTHORIZATION, USER_AGENT},
        request::Parts,
    },
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::{
    convert::Infallible,
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use subtle::ConstantTimeEq;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::{accounts::AuthError, store::ClientInfo};

pub const MSG_UNAUTHORIZED: &str = "Unauthorized";
pub const MSG_INVALID_BODY: &str = "Invalid request body";
pub const MSG_INTERNAL: &str = "Internal server error";

#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorBody {
    success: bool,
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, MSG_UNAUTHORIZED)
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let status = match &err {
            AuthError::Validation(_) | AuthError::DuplicateAccount => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::Internal(cause) => {
                error!("request failed: {cause:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("rejected request body: {}", rejection.body_text());
        Self::new(StatusCode::BAD_REQUEST, MSG_INVALID_BODY)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Registration metadata derived from the request: source `web`, client IP
/// and `User-Agent`.
#[derive(Debug, Clone)]
pub struct ClientContext(pub ClientInfo);

impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let ip_address = extract_client_ip(&parts.headers, peer);
        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(Self(ClientInfo::web(ip_address, user_agent)))
    }
}

/// First `X-Forwarded-For` hop, else the peer address. Values that are not an
/// IP address are dropped so they never reach the `INET` column.
#[must_use]
pub fn extract_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|hop| hop.trim().parse::<IpAddr>().ok());

    forwarded
        .or_else(|| peer.map(|addr| addr.ip()))
        .map(|ip| ip.to_canonical().to_string())
}

/// Bearer token guarding the listing endpoints; `None` leaves them open.
#[derive(Clone, Default)]
pub struct AdminGate {
    token: Option<Arc<SecretString>>,
}

impl std::fmt::Debug for AdminGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminGate")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl AdminGate {
    #[must_use]
    pub fn new(token: Option<SecretString>) -> Self {
        Self {
            token: token.map(Arc::new),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Constant-time comparison of the presented `Authorization` value.
    #[must_use]
    pub fn allows(&self, authorization: Option<&str>) -> bool {
        let Some(expected) = &self.token else {
            return true;
        };
        let Some(presented) = authorization.and_then(|value| value.strip_prefix("Bearer ")) else {
            return false;
        };
        bool::from(
            presented
                .trim()
                .as_bytes()
                .ct_eq(expected.expose_secret().as_bytes()),
        )
    }
}

/// Proof that the request passed the [`AdminGate`].
#[derive(Debug, Clone, Copy)]
pub struct AdminAccess;

impl<S> FromRequestParts<S> for AdminAccess
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(gate) = parts.extensions.get::<AdminGate>() else {
            error!("AdminGate extension missing from router");
            return Err(ApiError::internal());
        };

        let authorization = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        if gate.allows(authorization) {
            Ok(Self)
        } else {
            debug!("admin request rejected");
            Err(ApiError::unauthorized())
        }
    }
}
