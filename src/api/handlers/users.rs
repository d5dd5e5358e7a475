use crate::{
    accounts::AccountService,
    api::handlers::{AdminAccess, ApiError, ErrorBody},
    store::AccountSummary,
};
use axum::{
    Json,
    extract::{Extension, Query},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

#[derive(ToSchema, Serialize, Debug)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<AccountSummary>,
}

#[derive(Deserialize, IntoParams, Debug)]
pub struct SearchParams {
    /// Matched case-insensitively against full name, email and username.
    q: Option<String>,
}

#[utoipa::path(
    get,
    path= "/api/users",
    responses (
        (status = 200, description = "All accounts, newest first", body = UsersResponse),
        (status = 401, description = "Missing or wrong admin token", body = ErrorBody),
    ),
    security(("admin_token" = [])),
    tag= "admin"
)]
#[instrument(skip(service, _admin))]
pub async fn list_users(
    _admin: AdminAccess,
    service: Extension<AccountService>,
) -> Result<Json<UsersResponse>, ApiError> {
    let users = service.list_users().await?;

    Ok(Json(UsersResponse {
        success: true,
        users,
    }))
}

#[utoipa::path(
    get,
    path= "/api/users/search",
    params(SearchParams),
    responses (
        (status = 200, description = "Matching accounts, newest first", body = UsersResponse),
        (status = 400, description = "Search query is required", body = ErrorBody),
        (status = 401, description = "Missing or wrong admin token", body = ErrorBody),
    ),
    security(("admin_token" = [])),
    tag= "admin"
)]
#[instrument(skip(service, _admin))]
pub async fn search_users(
    _admin: AdminAccess,
    service: Extension<AccountService>,
    params: Query<SearchParams>,
) -> Result<Json<UsersResponse>, ApiError> {
    let Query(params) = params;
    let term = params.q.unwrap_or_default();
    let users = service.search_users(&term).await?;

    Ok(Json(UsersResponse {
        success: true,
        users,
    }))
}
