use serde::Deserialize;

/// Login form, bound from JSON or url-encoded bodies
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
}

/// Session key holding the logged-in user's name
pub const SESSION_USER_KEY: &str = "user_name";
