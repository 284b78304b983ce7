use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::api::Envelope;
use crate::document::StoreError;
use crate::session::{repository::SessionRepository, TokenConfig};
use crate::user::CredentialVerifier;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub session_repository: Arc<dyn SessionRepository + Send + Sync>,
    pub credential_verifier: Arc<dyn CredentialVerifier>,
    pub token_config: TokenConfig,
    pub cookie_name: String,
}

impl AppState {
    pub fn new(
        session_repository: Arc<dyn SessionRepository + Send + Sync>,
        credential_verifier: Arc<dyn CredentialVerifier>,
        token_config: TokenConfig,
        cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            session_repository,
            credential_verifier,
            token_config,
            cookie_name: cookie_name.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AppError::NotFound("Document not found".to_string()),
            other => AppError::DatabaseError(other.to_string()),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::JwtError(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(_) | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "Request failed");
        }

        Envelope::failure(i32::from(status.as_u16()), self.to_string()).into_response()
    }
}
