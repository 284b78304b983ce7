use axum::http::{header::COOKIE, HeaderMap};
use cookie::{Cookie, SameSite};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{handle::Session, repository::SessionRepository, token::TokenConfig};
use crate::shared::{AppError, AppState};

/// Service for loading and persisting cookie-backed sessions
pub struct SessionService {
    repository: Arc<dyn SessionRepository + Send + Sync>,
    token_config: TokenConfig,
    cookie_name: String,
}

impl SessionService {
    pub fn new(
        repository: Arc<dyn SessionRepository + Send + Sync>,
        token_config: TokenConfig,
        cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            token_config,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            Arc::clone(&state.session_repository),
            state.token_config.clone(),
            state.cookie_name.clone(),
        )
    }

    /// Resolves the request's session.
    ///
    /// A missing, forged or expired cookie, or one pointing at a record that
    /// no longer exists, yields a fresh unsaved session rather than an error.
    #[instrument(skip(self, headers))]
    pub async fn load(&self, headers: &HeaderMap) -> Session {
        let Some(token) = self.cookie_value(headers) else {
            debug!("No session cookie on request");
            return self.fresh();
        };

        let claims = match self.token_config.validate_token(&token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Ignoring invalid session cookie");
                return self.fresh();
            }
        };

        match self.repository.get_session(&claims.session_id).await {
            Ok(Some(model)) if !model.is_expired() => {
                debug!(session_id = %model.id, "Session loaded");
                Session::loaded(model)
            }
            Ok(Some(model)) => {
                info!(session_id = %model.id, "Session expired, starting a new one");
                if let Err(e) = self.repository.delete_session(&model.id).await {
                    warn!(error = %e, session_id = %model.id, "Failed to delete expired session");
                }
                self.fresh()
            }
            Ok(None) => {
                debug!(session_id = %claims.session_id, "Session record not found");
                self.fresh()
            }
            Err(e) => {
                warn!(error = %e, "Failed to load session, starting a new one");
                self.fresh()
            }
        }
    }

    /// Writes a modified session back and returns the `Set-Cookie` value for
    /// it. Unmodified sessions are left alone and produce no cookie.
    #[instrument(skip(self, session))]
    pub async fn persist(&self, session: &Session) -> Result<Option<String>, AppError> {
        if !session.is_modified() {
            return Ok(None);
        }

        // The record lives as long as the cookie about to be issued
        let mut model = session.snapshot();
        model.extend_expiration(self.token_config.expiration_days);
        if session.is_new() {
            self.repository.create_session(&model).await?;
        } else {
            self.repository.update_session(&model).await?;
        }
        session.mark_saved();

        let token = self.token_config.create_token(model.id.clone())?;
        info!(session_id = %model.id, "Session saved");

        Ok(Some(self.build_cookie(token)))
    }

    fn fresh(&self) -> Session {
        Session::fresh(self.token_config.expiration_days)
    }

    fn cookie_value(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == self.cookie_name)
            .map(|cookie| cookie.value().to_string())
    }

    fn build_cookie(&self, token: String) -> String {
        Cookie::build((self.cookie_name.clone(), token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build()
            .to_string()
    }
}
