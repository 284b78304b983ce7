use axum::{
    body::Body,
    http::{header::SET_COOKIE, Request},
    response::Response,
};
use tower::ServiceExt; // for `oneshot`

use app_start::{document::DocumentStore, Envelope};
use mongodb::bson::doc;

use super::setup::TestSetup;

// ============================================================================
// Action Helpers
// ============================================================================

/// Result of a single request against the app
pub struct Reply {
    pub envelope: Envelope,
    /// `name=value` pair from the Set-Cookie header, if one was sent
    pub cookie: Option<String>,
}

impl TestSetup {
    /// Send a request through the full router
    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.app.clone().oneshot(request).await.unwrap();
        Reply::from_response(response).await
    }

    /// POST /user/login with a JSON body
    pub async fn login_json(&self, body: &str, cookie: Option<&str>) -> Reply {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/user/login")
            .header("content-type", "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// POST /user/login with a url-encoded form body
    pub async fn login_form(&self, body: &str) -> Reply {
        let request = Request::builder()
            .method("POST")
            .uri("/user/login")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Number of stored sessions, wherever the setup keeps them
    pub fn stored_sessions(&self) -> usize {
        match &self.memory_sessions {
            Some(repo) => repo.session_count(),
            None => self
                .document_store
                .document_count(super::setup::TEST_DATABASE, "sessions"),
        }
    }
}

impl TestSetup {
    /// `user_name` of every session record kept in the document store
    pub async fn stored_user_names(&self) -> Vec<Option<String>> {
        assert!(
            self.memory_sessions.is_none(),
            "build the setup with_document_sessions() to inspect records"
        );
        self.document_store
            .find_all(super::setup::TEST_DATABASE, "sessions", doc! {}, doc! {})
            .await
            .unwrap()
            .iter()
            .map(|record| {
                record
                    .get_document("values")
                    .ok()
                    .and_then(|values| values.get_str("user_name").ok())
                    .map(str::to_string)
            })
            .collect()
    }
}

impl Reply {
    async fn from_response(response: Response) -> Self {
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(str::to_string);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let envelope = serde_json::from_slice(&body).unwrap();

        Self { envelope, cookie }
    }
}
