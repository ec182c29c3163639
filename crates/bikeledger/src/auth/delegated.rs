//! Phone login delegated to an external identity provider.
//!
//! The provider generates, delivers and expires the code. We only forward
//! the request and the verification and keep the user id it returns.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::phone::normalize;
use super::{AuthMethod, Authenticator, Credentials, Session};
use crate::error::{Error, Result};

#[derive(Debug, Serialize)]
struct OtpRequest<'a> {
    phone: &'a str,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    phone: &'a str,
    token: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    access_token: String,
    user: ProviderUser,
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
}

/// Error body shapes providers use; the first present field wins.
#[derive(Debug, Default, Deserialize)]
struct ProviderError {
    msg: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ProviderError {
    fn into_reason(self) -> Option<String> {
        self.msg
            .or(self.error_description)
            .or(self.message)
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
    }
}

/// Client for a provider exposing `/auth/v1/otp` and `/auth/v1/verify`.
#[derive(Debug, Clone)]
pub struct DelegatedOtp {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    country_code: String,
}

impl DelegatedOtp {
    /// Create a provider client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        country_code: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            country_code: country_code.into(),
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let request = self.client.post(url);
        match &self.api_key {
            Some(key) => request.header("apikey", key),
            None => request,
        }
    }
}

/// Turn a non-2xx provider response into an auth failure carrying its message.
async fn rejection(response: Response, fallback: &str) -> Error {
    let status = response.status();
    let reason = response
        .json::<ProviderError>()
        .await
        .ok()
        .and_then(ProviderError::into_reason)
        .unwrap_or_else(|| fallback.to_string());
    debug!("Identity provider answered {status}: {reason}");
    Error::auth_failed(reason)
}

#[async_trait]
impl Authenticator for DelegatedOtp {
    fn name(&self) -> &'static str {
        "delegated_otp"
    }

    async fn request_code(&self, phone: &str) -> Result<()> {
        let phone = normalize(phone, &self.country_code)?;

        let response = self
            .post("/auth/v1/otp")
            .json(&OtpRequest { phone: &phone })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(rejection(response, "failed to send one-time code").await);
        }

        info!("Identity provider sent a code to {phone}");
        Ok(())
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Session> {
        let Credentials::PhoneCode { phone, code } = credentials else {
            return Err(Error::AuthUnsupported {
                strategy: self.name(),
                operation: "password login",
            });
        };
        let phone = normalize(phone, &self.country_code)?;

        let response = self
            .post("/auth/v1/verify")
            .json(&VerifyRequest {
                phone: &phone,
                token: code.trim(),
                kind: "sms",
            })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(rejection(response, "invalid code").await);
        }

        let verified: VerifyResponse = response.json().await?;
        let mut session = Session::new(verified.user.id, phone, AuthMethod::DelegatedOtp);
        session.access_token = Some(verified.access_token);
        Ok(session)
    }
}
