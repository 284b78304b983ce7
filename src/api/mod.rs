// Public API - what other modules can use
pub use binder::Bind;
pub use envelope::{codes, Envelope, LOGIN_FAIL};

// Internal modules
mod binder;
mod envelope;
