use crate::{
    accounts::AccountService,
    api::handlers::{ApiError, ErrorBody},
};
use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

pub const MSG_LOGGED_IN: &str = "Login successful!";

#[derive(ToSchema, Deserialize, Default)]
pub struct LoginRequest {
    /// Username or email.
    username: Option<String>,
    password: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoggedInUser {
    pub id: i32,
    pub full_name: String,
    pub email: String,
    pub username: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub user: LoggedInUser,
}

#[utoipa::path(
    post,
    path= "/api/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Credentials accepted", body = LoginResponse, content_type = "application/json"),
        (status = 400, description = "Missing username or password", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
    ),
    tag= "accounts"
)]
#[instrument(skip(service, payload))]
pub async fn login(
    service: Extension<AccountService>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;

    let identifier = request.username.unwrap_or_default();
    let secret = SecretString::from(request.password.unwrap_or_default());

    let profile = service.login(&identifier, secret).await?;

    Ok(Json(LoginResponse {
        success: true,
        message: MSG_LOGGED_IN.to_string(),
        user: LoggedInUser {
            id: profile.id,
            full_name: profile.full_name,
            email: profile.email,
            username: profile.username,
        },
    }))
}
