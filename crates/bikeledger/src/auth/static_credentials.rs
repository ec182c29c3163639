//! Username/password login against configured credentials.

use async_trait::async_trait;
use tracing::debug;

use super::{derive_owner_id, AuthMethod, Authenticator, Credentials, Session};
use crate::error::{Error, Result};

/// Checks a username and password against the configured pair.
///
/// Only digests are kept and compared. Without a configured password every
/// attempt fails.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    username: String,
    password_digest: Option<blake3::Hash>,
}

impl StaticCredentials {
    /// Create the strategy from the configured username and password.
    #[must_use]
    pub fn new(username: impl Into<String>, password: Option<&str>) -> Self {
        Self {
            username: username.into(),
            password_digest: password.map(|p| blake3::hash(p.as_bytes())),
        }
    }
}

#[async_trait]
impl Authenticator for StaticCredentials {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Session> {
        let Credentials::Password { username, password } = credentials else {
            return Err(Error::AuthUnsupported {
                strategy: self.name(),
                operation: "phone login",
            });
        };

        let Some(expected) = self.password_digest else {
            debug!("No password configured; rejecting login");
            return Err(Error::auth_failed("no password is configured"));
        };

        // blake3::Hash equality is constant-time
        let user_ok = blake3::hash(username.trim().as_bytes()) == blake3::hash(self.username.as_bytes());
        let pass_ok = blake3::hash(password.as_bytes()) == expected;
        if !(user_ok && pass_ok) {
            return Err(Error::auth_failed("invalid username or password"));
        }

        Ok(Session::new(
            derive_owner_id("static", &self.username),
            self.username.clone(),
            AuthMethod::Static,
        ))
    }
}
