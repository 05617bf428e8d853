use super::valid_email;
use crate::{
    api::error::{error_response, ErrorBody},
    auth::{AuthError, CredentialService},
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct SignIn {
    #[schema(example = "user@example.com")]
    email: String,
    #[schema(example = "Password123!")]
    password: String,
}

impl std::fmt::Debug for SignIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignIn")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Token {
    pub token: String,
}

#[utoipa::path(
    post,
    path= "/auth/signin",
    request_body = SignIn,
    responses (
        (status = 200, description = "Authentication successful.", body = Token, content_type = "application/json"),
        (status = 400, description = "Bad request.", body = ErrorBody),
        (status = 401, description = "Unauthorized.", body = ErrorBody),
        (status = 503, description = "Signing secret not available.", body = ErrorBody),
    ),
    tag= "Authentication"
)]
// axum handler for signin
#[instrument(skip(credentials))]
pub async fn signin(
    credentials: Extension<Arc<CredentialService>>,
    payload: Option<Json<SignIn>>,
) -> Response {
    let Some(Json(user)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing payload");
    };

    if !valid_email(&user.email) {
        return AuthError::Validation("email must be an email".to_string()).into_response();
    }

    match credentials.sign_in(&user.email, &user.password).await {
        Ok(token) => (StatusCode::OK, Json(Token { token })).into_response(),
        Err(e) => e.into_response(),
    }
}
