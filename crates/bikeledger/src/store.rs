//! Session-scoped access to delivery records.
//!
//! [`RecordStore`] is the only way flows reach persisted records. It checks the
//! draft and the session before the backend is ever contacted, so a bad form
//! or a logged-out operator never produces a partial write.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::auth::Session;
use crate::error::{Error, Result};
use crate::record::{DeliveryRecord, RecordDraft};

/// A persistence backend for delivery records.
///
/// Implementations assign the record id and creation time.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Persist a draft on behalf of `owner_id`.
    async fn insert(&self, owner_id: &str, draft: &RecordDraft) -> Result<DeliveryRecord>;

    /// Every record belonging to `owner_id`, newest first.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<DeliveryRecord>>;
}

#[async_trait]
impl<B: RecordBackend + ?Sized> RecordBackend for Arc<B> {
    async fn insert(&self, owner_id: &str, draft: &RecordDraft) -> Result<DeliveryRecord> {
        (**self).insert(owner_id, draft).await
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<DeliveryRecord>> {
        (**self).list_by_owner(owner_id).await
    }
}

/// Creates and lists records for the current session.
#[derive(Debug)]
pub struct RecordStore<B> {
    backend: B,
}

impl<B: RecordBackend> RecordStore<B> {
    /// Wrap a backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Save a new record for the session's owner.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an incomplete draft and
    /// [`Error::NotAuthenticated`] without a session; neither reaches the
    /// backend. Backend failures are reported as store errors.
    pub async fn create(
        &self,
        session: Option<&Session>,
        draft: &RecordDraft,
    ) -> Result<DeliveryRecord> {
        draft.validate()?;
        let session = session.ok_or(Error::NotAuthenticated)?;

        let record = self
            .backend
            .insert(&session.owner_id, draft)
            .await
            .map_err(into_store_error)?;

        info!(
            "Saved delivery of {} to {} ({})",
            record.details.bike_number,
            record.details.buyer_name,
            record.short_id()
        );
        Ok(record)
    }

    /// The session owner's records, newest first.
    ///
    /// Without a session this is empty rather than an error.
    ///
    /// # Errors
    ///
    /// Returns a store error if the backend cannot be read.
    pub async fn list_for_session(&self, session: Option<&Session>) -> Result<Vec<DeliveryRecord>> {
        let Some(session) = session else {
            debug!("No session; listing nothing");
            return Ok(Vec::new());
        };

        let records = self
            .backend
            .list_by_owner(&session.owner_id)
            .await
            .map_err(into_store_error)?;
        debug!("Loaded {} records", records.len());
        Ok(records)
    }
}

/// Report any backend failure as a store error, keeping its message.
fn into_store_error(err: Error) -> Error {
    if err.is_store() {
        err
    } else {
        warn!("Record backend failed: {err}");
        Error::store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;

    use super::*;
    use crate::auth::AuthMethod;
    use crate::storage::Storage;

    /// Counts calls and optionally fails them.
    #[derive(Debug, Default)]
    struct CountingBackend {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl RecordBackend for CountingBackend {
        async fn insert(&self, owner_id: &str, draft: &RecordDraft) -> Result<DeliveryRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::internal("disk full"));
            }
            Ok(DeliveryRecord {
                id: "rec-1".to_string(),
                owner_id: owner_id.to_string(),
                created_at: Utc::now(),
                details: draft.clone(),
            })
        }

        async fn list_by_owner(&self, _owner_id: &str) -> Result<Vec<DeliveryRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::internal("disk unreadable"));
            }
            Ok(Vec::new())
        }
    }

    fn session(owner: &str) -> Session {
        Session {
            owner_id: owner.to_string(),
            principal: owner.to_string(),
            method: AuthMethod::Static,
            access_token: None,
            started_at: Utc::now(),
        }
    }

    fn sqlite_store() -> RecordStore<Storage> {
        RecordStore::new(Storage::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_create_rejects_incomplete_drafts_before_backend() {
        let store = RecordStore::new(CountingBackend::default());
        let s = session("a");

        let drafts = [
            RecordDraft::new("", "Asha", 85_000.0),
            RecordDraft::new("KA05MN7777", " ", 85_000.0),
            RecordDraft::new("KA05MN7777", "Asha", 0.0),
        ];
        for draft in &drafts {
            let err = store.create(Some(&s), draft).await.unwrap_err();
            assert!(err.is_validation(), "{err}");
        }

        assert_eq!(store.backend().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_without_session() {
        let store = RecordStore::new(CountingBackend::default());
        let draft = RecordDraft::new("KA05MN7777", "Asha", 85_000.0);

        let err = store.create(None, &draft).await.unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));
        assert_eq!(err.to_string(), "user not authenticated");
        assert_eq!(store.backend().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_backend_failure_is_store_error() {
        let store = RecordStore::new(CountingBackend {
            fail: true,
            ..Default::default()
        });
        let draft = RecordDraft::new("KA05MN7777", "Asha", 85_000.0);

        let err = store.create(Some(&session("a")), &draft).await.unwrap_err();
        assert!(err.is_store());
        assert!(err.to_string().contains("disk full"));
        assert_eq!(store.backend().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_list_without_session_is_empty() {
        let store = RecordStore::new(CountingBackend::default());
        assert!(store.list_for_session(None).await.unwrap().is_empty());
        assert_eq!(store.backend().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_list_failure_is_store_error() {
        let store = RecordStore::new(CountingBackend {
            fail: true,
            ..Default::default()
        });
        let err = store
            .list_for_session(Some(&session("a")))
            .await
            .unwrap_err();
        assert!(err.is_store());
    }

    #[tokio::test]
    async fn test_create_then_list_round_trip() {
        let store = sqlite_store();
        let s = session("a");
        let mut draft = RecordDraft::new("KA05MN7777", "Asha", 85_000.0);
        draft.bike_model = "Bajaj Pulsar 150".to_string();

        let record = store.create(Some(&s), &draft).await.unwrap();
        assert!(!record.id.is_empty());
        assert_eq!(record.owner_id, "a");

        let listed = store.list_for_session(Some(&s)).await.unwrap();
        assert_eq!(listed, vec![record]);
    }

    #[tokio::test]
    async fn test_list_never_returns_other_sessions_records() {
        let store = sqlite_store();
        let draft = RecordDraft::new("KA05MN7777", "Asha", 85_000.0);
        store.create(Some(&session("a")), &draft).await.unwrap();

        let other = store.list_for_session(Some(&session("b"))).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_shared_backend_through_arc() {
        let storage = Arc::new(Storage::open_in_memory().unwrap());
        let store = RecordStore::new(Arc::clone(&storage));
        let draft = RecordDraft::new("KA05MN7777", "Asha", 85_000.0);

        store.create(Some(&session("a")), &draft).await.unwrap();
        assert_eq!(storage.count().unwrap(), 1);
    }
}
