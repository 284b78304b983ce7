// Public API - what other modules can use
pub use credentials::{CredentialVerifier, StaticCredentialVerifier};
pub use handlers::login;
pub use types::{LoginRequest, SESSION_USER_KEY};

// Internal modules
mod credentials;
mod handlers;
mod types;
