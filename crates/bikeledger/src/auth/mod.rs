//! The auth gate: who is operating the ledger.
//!
//! Credentials are checked by an [`Authenticator`] chosen from configuration.
//! A successful check produces a [`Session`], which the gate persists through
//! a [`SessionFlag`] so that later commands run as the same operator.

mod delegated;
mod local_otp;
pub mod phone;
mod static_credentials;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{AuthStrategyKind, Config};
use crate::error::{Error, Result};
use crate::notify::Notifier;

pub use delegated::DelegatedOtp;
pub use local_otp::LocalOtp;
pub use static_credentials::StaticCredentials;

/// How a session was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Configured username and password.
    Static,
    /// Phone plus a locally generated code.
    LocalOtp,
    /// Phone plus a code verified by an identity provider.
    DelegatedOtp,
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::LocalOtp => write!(f, "local_otp"),
            Self::DelegatedOtp => write!(f, "delegated_otp"),
        }
    }
}

/// An authenticated operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Stable identity that scopes record visibility.
    pub owner_id: String,
    /// Username or normalised phone number.
    pub principal: String,
    /// Strategy that established the session.
    pub method: AuthMethod,
    /// Provider token, for delegated sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// When the session began.
    pub started_at: DateTime<Utc>,
}

impl Session {
    /// Start a session now.
    #[must_use]
    pub fn new(owner_id: impl Into<String>, principal: impl Into<String>, method: AuthMethod) -> Self {
        Self {
            owner_id: owner_id.into(),
            principal: principal.into(),
            method,
            access_token: None,
            started_at: Utc::now(),
        }
    }
}

/// Derive a stable owner id for a principal.
///
/// The same principal always maps to the same id, so records stay visible
/// across restarts.
#[must_use]
pub fn derive_owner_id(namespace: &str, principal: &str) -> String {
    blake3::hash(format!("{namespace}:{principal}").as_bytes())
        .to_hex()
        .to_string()
}

/// What the operator presents to log in.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Username and password.
    Password {
        /// Login name.
        username: String,
        /// Secret.
        password: String,
    },
    /// Phone number and the one-time code sent to it.
    PhoneCode {
        /// Phone number as typed.
        phone: String,
        /// The code received.
        code: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::PhoneCode { phone, .. } => f
                .debug_struct("PhoneCode")
                .field("phone", phone)
                .field("code", &"<redacted>")
                .finish(),
        }
    }
}

/// A credential strategy.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Strategy name (for logging and error messages).
    fn name(&self) -> &'static str;

    /// Send a one-time code to `phone`.
    ///
    /// # Errors
    ///
    /// Strategies without codes return [`Error::AuthUnsupported`].
    async fn request_code(&self, _phone: &str) -> Result<()> {
        Err(Error::AuthUnsupported {
            strategy: self.name(),
            operation: "one-time codes",
        })
    }

    /// Check credentials and establish a session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthFailed`] when the credentials are rejected.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session>;
}

/// Where the active session is remembered between commands.
pub trait SessionFlag: Send + Sync {
    /// The stored session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or holds an undecodable session.
    fn load(&self) -> Result<Option<Session>>;

    /// Remember `session`, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn save(&self, session: &Session) -> Result<()>;

    /// Forget the stored session.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn clear(&self) -> Result<()>;
}

/// Builds the authenticator selected by `auth.strategy`.
///
/// # Errors
///
/// Returns an error if the delegated strategy is selected without a provider
/// URL or its HTTP client cannot be built.
pub fn authenticator_from_config(
    config: &Config,
    notifier: Arc<dyn Notifier>,
) -> Result<Box<dyn Authenticator>> {
    let auth = &config.auth;
    let authenticator: Box<dyn Authenticator> = match auth.strategy {
        AuthStrategyKind::Static => Box::new(StaticCredentials::new(
            auth.username.clone(),
            auth.password.as_deref(),
        )),
        AuthStrategyKind::LocalOtp => Box::new(LocalOtp::new(
            notifier,
            auth.country_code.clone(),
            config.code_ttl(),
        )),
        AuthStrategyKind::DelegatedOtp => {
            let url = auth.provider_url.as_deref().ok_or_else(|| Error::ConfigValidation {
                message: "provider_url is required for the delegated_otp strategy".to_string(),
            })?;
            Box::new(DelegatedOtp::new(
                url,
                auth.provider_api_key.clone(),
                auth.country_code.clone(),
                config.provider_timeout(),
            )?)
        }
    };
    Ok(authenticator)
}

/// Gate in front of every flow that needs an operator.
pub struct AuthGate {
    authenticator: Box<dyn Authenticator>,
    flag: Arc<dyn SessionFlag>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("strategy", &self.authenticator.name())
            .finish_non_exhaustive()
    }
}

impl AuthGate {
    /// Create a gate over the given strategy and session store.
    #[must_use]
    pub fn new(authenticator: Box<dyn Authenticator>, flag: Arc<dyn SessionFlag>) -> Self {
        Self {
            authenticator,
            flag,
        }
    }

    /// Name of the active strategy.
    #[must_use]
    pub fn strategy(&self) -> &'static str {
        self.authenticator.name()
    }

    /// Ask the strategy to send a one-time code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthUnsupported`] for strategies without codes, or the
    /// strategy's own failure.
    pub async fn request_code(&self, phone: &str) -> Result<()> {
        self.authenticator.request_code(phone).await
    }

    /// Check credentials and persist the resulting session.
    ///
    /// # Errors
    ///
    /// Returns the strategy's failure, or a store error if the session cannot
    /// be persisted.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Session> {
        let session = match self.authenticator.authenticate(credentials).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Login via {} failed: {e}", self.strategy());
                return Err(e);
            }
        };

        self.flag.save(&session)?;
        info!(
            "Logged in as {} via {}",
            session.principal, session.method
        );
        Ok(session)
    }

    /// The persisted session, if there is a usable one.
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        match self.flag.load() {
            Ok(session) => session,
            Err(e) => {
                warn!("Ignoring unreadable stored session: {e}");
                None
            }
        }
    }

    /// Forget the persisted session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be written.
    pub fn end_session(&self) -> Result<()> {
        self.flag.clear()?;
        info!("Session ended");
        Ok(())
    }
}
