use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Where session records are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Mongo,
    Memory,
}

impl FromStr for SessionBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(SessionBackend::Mongo),
            "memory" => Ok(SessionBackend::Memory),
            other => Err(format!("unknown session backend: {other}")),
        }
    }
}

/// Accepted session lifetimes in days; anything outside falls back to the default
const SESSION_EXPIRATION_RANGE: RangeInclusive<i64> = 1..=3650;

/// Process configuration, read once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mongo_url: String,
    pub mongo_database: String,
    pub bind_addr: String,
    pub session_cookie_name: String,
    pub jwt_secret: String,
    pub session_expiration_days: i64,
    pub session_backend: SessionBackend,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mongo_url: "mongodb://localhost:27017".to_string(),
            mongo_database: "app_start".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            session_cookie_name: "app_session".to_string(),
            jwt_secret: "your-secret-key-change-in-production".to_string(),
            session_expiration_days: 7,
            session_backend: SessionBackend::Mongo,
        }
    }
}

impl AppConfig {
    /// Reads configuration from the environment, loading `.env` first if
    /// present. Missing or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            mongo_url: lookup("MONGO_URL").unwrap_or(defaults.mongo_url),
            mongo_database: lookup("MONGO_DATABASE").unwrap_or(defaults.mongo_database),
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            session_cookie_name: lookup("SESSION_COOKIE_NAME")
                .unwrap_or(defaults.session_cookie_name),
            jwt_secret: lookup("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            session_expiration_days: lookup("SESSION_EXPIRATION_DAYS")
                .and_then(|s| s.parse().ok())
                .filter(|days| SESSION_EXPIRATION_RANGE.contains(days))
                .unwrap_or(defaults.session_expiration_days),
            session_backend: lookup("SESSION_BACKEND")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.session_backend),
        }
    }
}
