// Public API - what other modules can use
pub use cleanup_task::{start_cleanup_task, CleanupConfig};
pub use handle::Session;
pub use middleware::session_layer;
pub use service::SessionService;
pub use token::TokenConfig;
pub use types::SessionClaims;

// Internal modules
mod cleanup_task;
mod handle;
mod middleware;
pub mod models;
pub mod repository;
mod service;
mod token;
mod types;
