use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::api::Envelope;
use crate::session;
use crate::shared::AppState;
use crate::user;

/// Builds the application router with the session and trace layers applied
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/user/login", post(user::login))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::session_layer,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Envelope {
    Envelope::success(json!("ok"))
}
