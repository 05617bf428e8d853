use crate::context::{self, TRANSACTION_HEADER};
use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::info;

/// Establish the correlation id for one request.
///
/// Reuses the inbound `transaction-uuid` header when usable, otherwise
/// generates one, writes it back on the request (so inner layers and spans see
/// it) and on the response, and runs the rest of the stack inside its scope.
pub async fn correlate(mut request: Request, next: Next) -> Response {
    let inbound = request
        .headers()
        .get(TRANSACTION_HEADER)
        .and_then(|value| value.to_str().ok());
    let id = context::begin(inbound);
    let header = HeaderName::from_static(TRANSACTION_HEADER);
    let value = HeaderValue::from_str(id.as_str()).ok();

    if let Some(value) = &value {
        request.headers_mut().insert(header.clone(), value.clone());
    }

    // method and path only: headers and bodies may carry credentials
    info!(
        "Transaction UUID: {} | Receiving new request: {} {}",
        id,
        request.method(),
        request.uri().path()
    );

    let mut response = id.scope(next.run(request)).await;

    if let Some(value) = value {
        response.headers_mut().insert(header, value);
    }

    response
}
