use async_trait::async_trait;

/// Decides whether a name/password pair may log in
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, name: &str, password: &str) -> bool;
}

/// Accepts exactly one fixed name/password pair.
///
/// Stands in until users are looked up from the document store.
pub struct StaticCredentialVerifier {
    name: String,
    password: String,
}

impl StaticCredentialVerifier {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
        }
    }
}

impl Default for StaticCredentialVerifier {
    fn default() -> Self {
        Self::new("admin", "admin")
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentialVerifier {
    async fn verify(&self, name: &str, password: &str) -> bool {
        name == self.name && password == self.password
    }
}
