use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, instrument};

use super::types::SessionClaims;
use crate::shared::AppError;

/// Signs and validates the session cookie value
#[derive(Clone)]
pub struct TokenConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    pub expiration_days: i64,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, expiration_days: i64) -> Self {
        let secret = secret.into();
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_days,
        }
    }

    /// Cookie value for `session_id`, valid for `expiration_days`
    #[instrument(skip(self, session_id))]
    pub fn create_token(&self, session_id: String) -> Result<String, AppError> {
        let issued = Utc::now();
        let claims = SessionClaims {
            session_id,
            exp: (issued + Duration::days(self.expiration_days)).timestamp() as usize,
            iat: issued.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(jwt_error)
    }

    #[instrument(skip(self, token))]
    pub fn validate_token(&self, token: &str) -> Result<SessionClaims, AppError> {
        let claims = decode::<SessionClaims>(token, &self.decoding_key, &Validation::default())
            .map_err(jwt_error)?
            .claims;

        debug!(session_id = %claims.session_id, exp = claims.exp, "Session token accepted");
        Ok(claims)
    }
}

fn jwt_error(e: jsonwebtoken::errors::Error) -> AppError {
    debug!(error = %e, "Session token rejected");
    AppError::JwtError(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_carries_session_id() {
        let config = TokenConfig::new("secret", 7);

        let token = config.create_token("session-1".to_string()).unwrap();
        let claims = config.validate_token(&token).unwrap();

        assert_eq!(claims.session_id, "session-1");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let config = TokenConfig::new("secret", 7);
        let result = config.validate_token("invalid.token.here");
        assert!(matches!(result, Err(AppError::JwtError(_))));
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let ours = TokenConfig::new("secret-a", 7);
        let theirs = TokenConfig::new("secret-b", 7);

        let token = theirs.create_token("session".to_string()).unwrap();

        assert!(matches!(
            ours.validate_token(&token),
            Err(AppError::JwtError(_))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Past the default 60s leeway
        let config = TokenConfig::new("secret", -1);
        let token = config.create_token("session".to_string()).unwrap();
        assert!(config.validate_token(&token).is_err());
    }
}
