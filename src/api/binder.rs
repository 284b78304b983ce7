use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{header::CONTENT_TYPE, Method},
    Form, Json,
};
use serde::de::DeserializeOwned;
use tracing::warn;

use super::envelope::{codes, Envelope};

/// Binds request fields into `T` according to the request's content type.
///
/// JSON bodies are read as JSON, `GET`/`DELETE` requests from the query
/// string, and everything else as a url-encoded form. When binding fails the
/// handler is never called and the client receives a `400` envelope carrying
/// the binder's message.
#[derive(Debug, Clone)]
pub struct Bind<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Bind<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Envelope;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let bound = if *req.method() == Method::GET || *req.method() == Method::DELETE {
            let (mut parts, _body) = req.into_parts();
            Query::<T>::from_request_parts(&mut parts, state)
                .await
                .map(|Query(value)| value)
                .map_err(|e| e.body_text())
        } else if content_type.starts_with("application/json") {
            Json::<T>::from_request(req, state)
                .await
                .map(|Json(value)| value)
                .map_err(|e| e.body_text())
        } else {
            Form::<T>::from_request(req, state)
                .await
                .map(|Form(value)| value)
                .map_err(|e| e.body_text())
        };

        bound.map(Bind).map_err(|message| {
            warn!(error = %message, "param validate err");
            Envelope::failure(codes::BAD_REQUEST, message)
        })
    }
}
