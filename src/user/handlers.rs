use axum::{extract::State, Extension};
use serde_json::json;
use tracing::{info, instrument};

use super::types::{LoginRequest, SESSION_USER_KEY};
use crate::api::{codes, Bind, Envelope, LOGIN_FAIL};
use crate::session::Session;
use crate::shared::AppState;

/// HTTP handler for logging in
///
/// POST /user/login
/// Sets the `user_name` session value when the credentials are accepted
#[instrument(name = "login", skip_all)]
pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Bind(request): Bind<LoginRequest>,
) -> Envelope {
    info!(name = %request.name, "Login attempt");

    // TODO: swap StaticCredentialVerifier for a lookup against the users collection
    if !state
        .credential_verifier
        .verify(&request.name, &request.password)
        .await
    {
        info!(name = %request.name, "Login rejected");
        return Envelope::failure(codes::LOGIN_FAIL, LOGIN_FAIL);
    }

    session.set(SESSION_USER_KEY, request.name.clone());
    info!(name = %request.name, "Login succeeded");

    Envelope::success(json!({ "data": "success" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{repository::InMemorySessionRepository, session_layer};
    use crate::shared::test_utils::AppStateBuilder;
    use crate::user::StaticCredentialVerifier;
    use axum::{
        body::Body,
        http::{header::SET_COOKIE, Request, StatusCode},
        middleware,
        Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/user/login", axum::routing::post(login))
            .layer(middleware::from_fn_with_state(state.clone(), session_layer))
            .with_state(state)
    }

    fn login_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/user/login")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_envelope(response: axum::response::Response) -> Envelope {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_login_handler_success() {
        let sessions = Arc::new(InMemorySessionRepository::new());
        let state = AppStateBuilder::new()
            .with_session_repository(sessions.clone())
            .build();

        let response = app(state)
            .oneshot(login_request(r#"{"name": "admin", "password": "admin"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_some());

        let envelope = body_envelope(response).await;
        assert_eq!(envelope.code, 0);
        assert_eq!(envelope.data, Some(json!({ "data": "success" })));
        assert_eq!(sessions.session_count(), 1);
    }

    #[tokio::test]
    async fn test_login_handler_rejects_wrong_password() {
        let sessions = Arc::new(InMemorySessionRepository::new());
        let state = AppStateBuilder::new()
            .with_session_repository(sessions.clone())
            .build();

        let response = app(state)
            .oneshot(login_request(r#"{"name": "admin", "password": "nope"}"#))
            .await
            .unwrap();

        assert!(response.headers().get(SET_COOKIE).is_none());
        let envelope = body_envelope(response).await;
        assert_eq!(envelope.code, 401);
        assert_eq!(envelope.message.as_deref(), Some("LOGIN_FAIL"));
        assert_eq!(envelope.data, None);
        assert_eq!(sessions.session_count(), 0);
    }

    #[tokio::test]
    async fn test_login_handler_uses_injected_verifier() {
        let state = AppStateBuilder::new()
            .with_credential_verifier(Arc::new(StaticCredentialVerifier::new("ops", "pw")))
            .build();

        let response = app(state.clone())
            .oneshot(login_request(r#"{"name": "ops", "password": "pw"}"#))
            .await
            .unwrap();
        assert_eq!(body_envelope(response).await.code, 0);

        let response = app(state)
            .oneshot(login_request(r#"{"name": "admin", "password": "admin"}"#))
            .await
            .unwrap();
        assert_eq!(body_envelope(response).await.code, 401);
    }

    #[tokio::test]
    async fn test_login_handler_missing_field() {
        let sessions = Arc::new(InMemorySessionRepository::new());
        let state = AppStateBuilder::new()
            .with_session_repository(sessions.clone())
            .build();

        let response = app(state)
            .oneshot(login_request(r#"{"name": "admin"}"#))
            .await
            .unwrap();

        assert!(response.headers().get(SET_COOKIE).is_none());
        let envelope = body_envelope(response).await;
        assert_eq!(envelope.code, 400);
        assert_eq!(sessions.session_count(), 0);
    }
}
