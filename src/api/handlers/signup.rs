use super::{password_policy, valid_email};
use crate::{
    api::error::{error_response, ErrorBody},
    auth::{AuthError, CredentialService},
    directory::Credential,
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
pub struct SignUp {
    #[schema(example = "user@example.com")]
    email: String,
    #[schema(example = "John Doe")]
    name: String,
    #[schema(example = "Password123!")]
    password: String,
}

impl std::fmt::Debug for SignUp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUp")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &"***")
            .finish()
    }
}

/// Created record as returned to callers; never includes the password hash.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub active: bool,
}

impl From<Credential> for User {
    fn from(credential: Credential) -> Self {
        Self {
            id: credential.id.to_string(),
            email: credential.email,
            name: credential.name,
            active: credential.active,
        }
    }
}

#[utoipa::path(
    post,
    path= "/auth/signup",
    request_body = SignUp,
    responses (
        (status = 201, description = "User created successfully.", body = User, content_type = "application/json"),
        (status = 400, description = "Bad request.", body = ErrorBody),
    ),
    tag= "Authentication"
)]
// axum handler for signup
#[instrument(skip(credentials))]
pub async fn signup(
    credentials: Extension<Arc<CredentialService>>,
    payload: Option<Json<SignUp>>,
) -> Response {
    let Some(Json(user)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Missing payload");
    };

    if !valid_email(&user.email) {
        return AuthError::Validation("email must be an email".to_string()).into_response();
    }

    if user.name.trim().is_empty() {
        return AuthError::Validation("name must not be empty".to_string()).into_response();
    }

    if let Err(rule) = password_policy(&user.password) {
        return AuthError::Validation(rule.to_string()).into_response();
    }

    match credentials
        .sign_up(&user.email, &user.name, &user.password)
        .await
    {
        Ok(created) => (StatusCode::CREATED, Json(User::from(created))).into_response(),
        Err(e) => e.into_response(),
    }
}
