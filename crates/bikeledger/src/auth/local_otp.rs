//! Phone login with a locally generated one-time code.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, info, warn};

use super::phone::normalize;
use super::{derive_owner_id, AuthMethod, Authenticator, Credentials, Session};
use crate::error::{Error, Result};
use crate::notify::{Notification, Notifier};

/// The one outstanding code.
#[derive(Debug, Clone)]
struct PendingCode {
    phone: String,
    code: String,
    issued_at: Instant,
}

/// Sends a 6-digit code through the notifier and checks it on login.
///
/// Only one code is outstanding at a time; requesting another replaces it.
/// A code is consumed by a successful login and rejected once older than the
/// configured lifetime.
pub struct LocalOtp {
    notifier: Arc<dyn Notifier>,
    country_code: String,
    ttl: Duration,
    pending: Mutex<Option<PendingCode>>,
}

impl std::fmt::Debug for LocalOtp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalOtp")
            .field("country_code", &self.country_code)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl LocalOtp {
    /// Create the strategy.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, country_code: impl Into<String>, ttl: Duration) -> Self {
        Self {
            notifier,
            country_code: country_code.into(),
            ttl,
            pending: Mutex::new(None),
        }
    }

    fn pending(&self) -> Result<std::sync::MutexGuard<'_, Option<PendingCode>>> {
        self.pending
            .lock()
            .map_err(|_| Error::internal("pending code lock poisoned"))
    }
}

fn generate_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000))
}

#[async_trait]
impl Authenticator for LocalOtp {
    fn name(&self) -> &'static str {
        "local_otp"
    }

    async fn request_code(&self, phone: &str) -> Result<()> {
        let phone = normalize(phone, &self.country_code)?;
        let code = generate_code();

        *self.pending()? = Some(PendingCode {
            phone: phone.clone(),
            code: code.clone(),
            issued_at: Instant::now(),
        });
        debug!("Issued a one-time code for {phone}");

        let delivered = self
            .notifier
            .send(&Notification::OneTimeCode {
                phone: phone.clone(),
                code,
            })
            .await;
        if !delivered {
            self.pending()?.take();
            warn!("Could not deliver one-time code to {phone}");
            return Err(Error::auth_failed("the one-time code could not be delivered"));
        }

        info!("Sent one-time code to {phone}");
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

        let mut pending = self.pending()?;
        let Some(issued) = pending.as_ref() else {
            return Err(Error::auth_failed("no code has been requested"));
        };

        let expired = issued.issued_at.elapsed() >= self.ttl;
        let matches = issued.phone == phone && issued.code == code.trim();

        if expired {
            pending.take();
            return Err(Error::auth_failed("invalid or expired code"));
        }
        if !matches {
            return Err(Error::auth_failed("invalid or expired code"));
        }

        pending.take();
        Ok(Session::new(
            derive_owner_id("phone", &phone),
            phone,
            AuthMethod::LocalOtp,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
        refuse: bool,
    }

    impl RecordingNotifier {
        fn last_code(&self) -> String {
            match self.sent.lock().unwrap().last() {
                Some(Notification::OneTimeCode { code, .. }) => code.clone(),
                other => panic!("expected a code, got {other:?}"),
            }
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, notification: &Notification) -> bool {
            self.sent.lock().unwrap().push(notification.clone());
            !self.refuse
        }
    }

    fn otp(ttl: Duration) -> (LocalOtp, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        (LocalOtp::new(notifier.clone(), "+91", ttl), notifier)
    }

    fn phone_code(phone: &str, code: &str) -> Credentials {
        Credentials::PhoneCode {
            phone: phone.to_string(),
            code: code.to_string(),
        }
    }

    #[test]
    fn test_generate_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_code_sent_to_normalized_phone() {
        let (auth, notifier) = otp(Duration::from_secs(300));
        auth.request_code("98765 43210").await.unwrap();

        let sent = notifier.sent.lock().unwrap();
        assert!(matches!(
            &sent[0],
            Notification::OneTimeCode { phone, .. } if phone == "+919876543210"
        ));
    }

    #[tokio::test]
    async fn test_wrong_then_right_then_reused() {
        let (auth, notifier) = otp(Duration::from_secs(300));
        auth.request_code("9876543210").await.unwrap();
        let code = notifier.last_code();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        let err = auth
            .authenticate(&phone_code("9876543210", wrong))
            .await
            .unwrap_err();
        assert!(err.is_auth());

        let session = auth
            .authenticate(&phone_code("+91 98765 43210", &code))
            .await
            .unwrap();
        assert_eq!(session.principal, "+919876543210");
        assert_eq!(session.method, AuthMethod::LocalOtp);
        assert_eq!(session.owner_id, derive_owner_id("phone", "+919876543210"));

        let err = auth
            .authenticate(&phone_code("9876543210", &code))
            .await
            .unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn test_code_for_other_phone_rejected() {
        let (auth, notifier) = otp(Duration::from_secs(300));
        auth.request_code("9876543210").await.unwrap();
        let code = notifier.last_code();

        assert!(auth
            .authenticate(&phone_code("9123456780", &code))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_expired_code_looks_like_wrong_code() {
        let (auth, notifier) = otp(Duration::ZERO);
        auth.request_code("9876543210").await.unwrap();
        let code = notifier.last_code();

        let err = auth
            .authenticate(&phone_code("9876543210", &code))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "authentication failed: invalid or expired code");
    }

    #[tokio::test]
    async fn test_new_request_replaces_code() {
        let (auth, notifier) = otp(Duration::from_secs(300));
        auth.request_code("9876543210").await.unwrap();
        let first = notifier.last_code();
        auth.request_code("9876543210").await.unwrap();
        let second = notifier.last_code();

        if first != second {
            assert!(auth
                .authenticate(&phone_code("9876543210", &first))
                .await
                .is_err());
        }
        assert!(auth
            .authenticate(&phone_code("9876543210", &second))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_verify_without_request() {
        let (auth, _notifier) = otp(Duration::from_secs(300));
        let err = auth
            .authenticate(&phone_code("9876543210", "123456"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no code"));
    }

    #[tokio::test]
    async fn test_undeliverable_code_is_discarded() {
        let notifier = Arc::new(RecordingNotifier {
            refuse: true,
            ..Default::default()
        });
        let auth = LocalOtp::new(notifier.clone(), "+91", Duration::from_secs(300));

        assert!(auth.request_code("9876543210").await.is_err());
        let code = notifier.last_code();
        assert!(auth
            .authenticate(&phone_code("9876543210", &code))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_invalid_phone_is_validation_error() {
        let (auth, notifier) = otp(Duration::from_secs(300));
        let err = auth.request_code("12").await.unwrap_err();
        assert!(err.is_validation());
        assert!(notifier.sent.lock().unwrap().is_empty());
    }
}
