use axum::{
    extract::{Request, State},
    http::{header::SET_COOKIE, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{instrument, warn};

use super::service::SessionService;
use crate::shared::{AppError, AppState};

/// Session middleware - resolves the session cookie and exposes a `Session` to handlers.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), session::session_layer))
/// Handlers can then extract Extension(session): Extension<Session>.
///
/// Sessions a handler modified are written back once it returns, and the
/// response carries the refreshed cookie.
#[instrument(skip(state, req, next))]
pub async fn session_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let service = SessionService::from_state(&state);

    let session = service.load(req.headers()).await;
    req.extensions_mut().insert(session.clone());

    let mut response = next.run(req).await;

    if let Some(set_cookie) = service.persist(&session).await? {
        match HeaderValue::from_str(&set_cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => {
                warn!(error = %e, "Session cookie is not a valid header value");
                return Err(AppError::Internal);
            }
        }
    }

    Ok(response)
}
