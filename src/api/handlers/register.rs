use crate::{
    accounts::{AccountService, Registration},
    api::handlers::{ApiError, ClientContext, ErrorBody},
};
use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

pub const MSG_REGISTERED: &str = "User registered successfully!";

/// Missing fields deserialize to `None` so they are reported as a validation
/// error rather than a malformed body.
#[derive(ToSchema, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    full_name: Option<String>,
    email: Option<String>,
    username: Option<String>,
    password: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    /// `YYYY-MM-DD`
    date_of_birth: Option<String>,
}

impl From<RegisterRequest> for Registration {
    fn from(request: RegisterRequest) -> Self {
        Self {
            full_name: request.full_name.unwrap_or_default(),
            email: request.email.unwrap_or_default(),
            username: request.username.unwrap_or_default(),
            password: SecretString::from(request.password.unwrap_or_default()),
            phone: request.phone,
            address: request.address,
            date_of_birth: request.date_of_birth,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user: RegisteredUser,
}

#[utoipa::path(
    post,
    path= "/api/register",
    request_body = RegisterRequest,
    responses (
        (status = 201, description = "Registration successful", body = RegisterResponse, content_type = "application/json"),
        (status = 400, description = "Missing fields, short password, malformed body, or email/username already taken", body = ErrorBody),
        (status = 500, description = "Registration could not be stored", body = ErrorBody),
    ),
    tag= "accounts"
)]
#[instrument(skip(service, client, payload))]
pub async fn register(
    service: Extension<AccountService>,
    client: ClientContext,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(request) = payload?;

    let created = service.register(request.into(), client.0).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: MSG_REGISTERED.to_string(),
            user: RegisteredUser {
                id: created.id,
                full_name: created.full_name,
                email: created.email,
                username: created.username,
                created_at: created.created_at,
            },
        }),
    ))
}
