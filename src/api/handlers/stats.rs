use crate::{
    accounts::AccountService,
    api::handlers::{AdminAccess, ApiError, ErrorBody},
    store::RegistrationStats,
};
use axum::{Json, extract::Extension};
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Debug)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: RegistrationStats,
}

#[utoipa::path(
    get,
    path= "/api/stats",
    responses (
        (status = 200, description = "Registration counters", body = StatsResponse),
        (status = 401, description = "Missing or wrong admin token", body = ErrorBody),
    ),
    security(("admin_token" = [])),
    tag= "admin"
)]
#[instrument(skip(service, _admin))]
pub async fn stats(
    _admin: AdminAccess,
    service: Extension<AccountService>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = service.stats().await?;

    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}
