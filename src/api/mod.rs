#![allow(clippy::needless_for_each)]

pub mod error;
pub(crate) mod handlers;
pub mod middleware;

use crate::{
    api::handlers::{
        health, health::__path_health, profile, profile::__path_profile, signin,
        signin::__path_signin, signup, signup::__path_signup,
    },
    auth::{CredentialService, Identity, TokenValidator},
    context::TRANSACTION_HEADER,
    secrets::SecretProvider,
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::mpsc};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, Span};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(title = "Backend API", description = "API documentation for the authentication module"),
    paths(health, signup, signin, profile),
    components(schemas(
        health::Health,
        signup::SignUp,
        signup::User,
        signin::SignIn,
        signin::Token,
        profile::Profile,
        Identity,
        error::ErrorBody
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "Authentication", description = "Sign up, sign in and bearer token identity")
    )
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Shared services handed to the handlers.
#[derive(Debug, Clone)]
pub struct Services {
    pub credentials: Arc<CredentialService>,
    pub tokens: Arc<TokenValidator>,
    pub secrets: Arc<SecretProvider>,
}

/// Build the application router.
///
/// `cors_origin` is the single browser origin allowed to call the API with
/// credentials; without it cross-origin requests get no CORS headers.
///
/// # Errors
/// Returns an error if `cors_origin` is not a valid header value.
pub fn router(services: Services, cors_origin: Option<&str>) -> Result<Router> {
    let mut cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .expose_headers([HeaderName::from_static(TRANSACTION_HEADER)]);

    if let Some(origin) = cors_origin {
        let origin = HeaderValue::from_str(origin)
            .with_context(|| format!("invalid CORS origin: {origin}"))?;
        cors = cors.allow_origin(origin).allow_credentials(true);
    }

    let app = Router::new()
        .route("/auth/signup", post(handlers::signup))
        .route("/auth/signin", post(handlers::signin))
        .route("/auth/profile", get(handlers::profile))
        .route("/health", get(handlers::health).options(handlers::health))
        .merge(SwaggerUi::new("/api").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::correlate))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(services.credentials))
                .layer(Extension(services.tokens))
                .layer(Extension(services.secrets)),
        );

    Ok(app)
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    app: Router,
    mut shutdown: mpsc::UnboundedReceiver<()>,
) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown.recv().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let transaction_uuid = request
        .headers()
        .get(TRANSACTION_HEADER)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        transaction_uuid
    )
}
