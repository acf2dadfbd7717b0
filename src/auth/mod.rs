//! Authentication capability consumed by the handler pipeline.
//!
//! The pipeline only ever *queries* an [`AuthProvider`]; it never mutates
//! one. Credentials are an explicit [`Option`] — a provider with
//! authentication disabled simply has none, rather than handing out empty
//! strings.

use std::sync::RwLock;

/// A username/password pair required to access protected routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Capability supplying the enabled/disabled state and credentials for
/// authentication checks.
///
/// Implementations must be shareable across connections; the pipeline holds
/// one behind an `Arc` and queries it on every protected request.
pub trait AuthProvider: Send + Sync {
    /// Returns `true` if requests must currently be authenticated.
    fn is_authentication_enabled(&self) -> bool;

    /// Returns the configured credentials, or `None` when authentication is
    /// disabled.
    fn credentials(&self) -> Option<Credentials>;
}

/// An [`AuthProvider`] holding a single username/password pair.
///
/// Uses interior mutability so authentication can be enabled or disabled at
/// runtime, after routes referencing the provider have been registered.
///
/// # Examples
///
/// ```
/// use microroute::auth::{AuthProvider, SimpleAuthProvider};
///
/// let provider = SimpleAuthProvider::new();
/// assert!(!provider.is_authentication_enabled());
///
/// provider.require_authentication("admin", "secret");
/// assert!(provider.is_authentication_enabled());
///
/// provider.disable_authentication();
/// assert!(provider.credentials().is_none());
/// ```
#[derive(Debug, Default)]
pub struct SimpleAuthProvider {
    credentials: RwLock<Option<Credentials>>,
}

impl SimpleAuthProvider {
    /// Creates a provider with authentication disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the given username and password and enables authentication.
    pub fn require_authentication(&self, username: impl Into<String>, password: impl Into<String>) {
        let mut slot = self
            .credentials
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(Credentials::new(username, password));
    }

    /// Clears the stored credentials and disables authentication.
    pub fn disable_authentication(&self) {
        let mut slot = self
            .credentials
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
    }
}

impl AuthProvider for SimpleAuthProvider {
    fn is_authentication_enabled(&self) -> bool {
        self.credentials
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    fn credentials(&self) -> Option<Credentials> {
        self.credentials
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
