use crate::{
    api::error::ErrorBody,
    auth::{Identity, TokenValidator},
};
use axum::{
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Profile {
    pub message: String,
    pub user: Identity,
}

#[utoipa::path(
    get,
    path= "/auth/profile",
    responses (
        (status = 200, description = "Profile retrieved successfully.", body = Profile, content_type = "application/json"),
        (status = 401, description = "Unauthorized.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag= "Authentication"
)]
// axum handler for profile
#[instrument(skip_all)]
pub async fn profile(tokens: Extension<Arc<TokenValidator>>, headers: HeaderMap) -> Response {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match tokens.validate(authorization).await {
        Ok(user) => (
            StatusCode::OK,
            Json(Profile {
                message: format!("Welcome to the application, {}", user.email),
                user,
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
