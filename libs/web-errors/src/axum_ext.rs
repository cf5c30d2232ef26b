//! Axum glue: failure responses, the decorating middleware and JSON extraction.
//!
//! Handlers return `Result<_, Failure>` (or `WebError`). The failure is parked
//! in the response extensions and `decorate_failures` turns it into a problem
//! document once the handler is done, using the origin of the request it
//! captured before the handler ran.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRequest, FromRequestParts, Request, State, rejection::JsonRejection},
    http::{Method, StatusCode, Uri, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::context::RequestContext;
use crate::decorator::Decorator;
use crate::error::{Failure, InvalidFormat, WebError};

/// Failure waiting for `decorate_failures`.
#[derive(Debug, Clone)]
struct UndecoratedFailure(Failure);

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let mut resp = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        resp.extensions_mut().insert(UndecoratedFailure(self));
        resp
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        Failure::Declared(self).into_response()
    }
}

/// Middleware that decorates failures returned by inner handlers.
///
/// ```ignore
/// let app = Router::new()
///     .route("/users/{id}", get(get_user))
///     .fallback(not_found_fallback)
///     .layer(middleware::from_fn_with_state(decorator, decorate_failures));
/// ```
pub async fn decorate_failures(
    State(decorator): State<Arc<Decorator>>,
    request: Request,
    next: Next,
) -> Response {
    let ctx = RequestContext::from_request_head(request.uri(), request.headers());

    let mut response = next.run(request).await;

    match response.extensions_mut().remove::<UndecoratedFailure>() {
        Some(UndecoratedFailure(failure)) => decorator.decorate(failure, &ctx).into_response(),
        None => response,
    }
}

/// Router fallback for unrouted paths.
pub async fn not_found_fallback(uri: Uri) -> Failure {
    Failure::NotFound(format!("No static resource {}.", uri.path().trim_start_matches('/')))
}

/// Router fallback for routed paths hit with an unsupported method.
pub async fn method_not_allowed_fallback(method: Method) -> Failure {
    Failure::MethodNotAllowed {
        method: method.to_string(),
    }
}

impl From<JsonRejection> for Failure {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(r) => Failure::ErrorResponse {
                type_name: "HttpMediaTypeNotSupportedException".to_owned(),
                status: r.status(),
                detail: Some(r.body_text()),
            },
            JsonRejection::JsonDataError(r) => {
                let message = r.body_text();
                let cause = InvalidFormat::from_data_error(&message);
                Failure::unreadable(message, cause)
            }
            other => Failure::unreadable(other.body_text(), None),
        }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestContext::from_parts(parts))
    }
}

/// `Json<T>` whose rejections flow through the decorator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProblemJson<T>(pub T);

impl<T, S> FromRequest<S> for ProblemJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Failure;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}
