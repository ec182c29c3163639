//! Capturing a delivery.
//!
//! A [`DeliveryForm`] gathers the fields an operator enters, loads photos and
//! scans from disk, and submits the result through the record store. The form
//! is only borrowed by [`DeliveryForm::submit`], so a failed save can be
//! retried without re-entering anything.

use std::path::Path;

use chrono::NaiveDate;
use tracing::warn;

use crate::attachment::Attachment;
use crate::auth::Session;
use crate::error::{Error, Result};
use crate::record::{DeliveryRecord, DocumentKind, RecordDraft};
use crate::store::{RecordBackend, RecordStore};

/// A delivery being entered.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryForm {
    draft: RecordDraft,
}

impl Default for DeliveryForm {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryForm {
    /// An empty form with the sale date set to today.
    #[must_use]
    pub fn new() -> Self {
        Self {
            draft: RecordDraft::new("", "", 0.0),
        }
    }

    /// Registration plate.
    #[must_use]
    pub fn bike_number(mut self, value: impl Into<String>) -> Self {
        self.draft.bike_number = value.into().trim().to_string();
        self
    }

    /// Chassis number.
    #[must_use]
    pub fn chassis_number(mut self, value: impl Into<String>) -> Self {
        self.draft.chassis_number = value.into();
        self
    }

    /// Make and model.
    #[must_use]
    pub fn bike_model(mut self, value: impl Into<String>) -> Self {
        self.draft.bike_model = value.into();
        self
    }

    /// Condition notes.
    #[must_use]
    pub fn bike_details(mut self, value: impl Into<String>) -> Self {
        self.draft.bike_details = value.into();
        self
    }

    /// First registration date.
    #[must_use]
    pub fn registration_date(mut self, value: Option<NaiveDate>) -> Self {
        self.draft.registration_date = value;
        self
    }

    /// Buyer's name.
    #[must_use]
    pub fn buyer_name(mut self, value: impl Into<String>) -> Self {
        self.draft.buyer_name = value.into().trim().to_string();
        self
    }

    /// Buyer's mobile number.
    #[must_use]
    pub fn buyer_mobile(mut self, value: impl Into<String>) -> Self {
        self.draft.buyer_mobile = value.into();
        self
    }

    /// Buyer's address.
    #[must_use]
    pub fn buyer_address(mut self, value: impl Into<String>) -> Self {
        self.draft.buyer_address = value.into();
        self
    }

    /// Sale price in rupees.
    #[must_use]
    pub fn sell_amount(mut self, value: f64) -> Self {
        self.draft.sell_amount = value;
        self
    }

    /// Date of sale, if not today.
    #[must_use]
    pub fn sale_date(mut self, value: NaiveDate) -> Self {
        self.draft.sale_date = value;
        self
    }

    /// Load the buyer's photo from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not an accepted type.
    pub fn buyer_photo_from(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.draft.buyer_photo = Some(Attachment::from_path(path)?);
        Ok(self)
    }

    /// Load the buyer's signature from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not an accepted type.
    pub fn signature_from(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.draft.signature = Some(Attachment::from_path(path)?);
        Ok(self)
    }

    /// Attach a document of the given kind from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not an accepted type.
    pub fn document_from(mut self, kind: DocumentKind, path: impl AsRef<Path>) -> Result<Self> {
        let attachment = Attachment::from_path(path)?;
        self.draft.attach(kind, attachment);
        Ok(self)
    }

    /// Attach a document given as `KIND=PATH`, e.g. `aadhar=scans/aadhar.pdf`.
    ///
    /// # Errors
    ///
    /// Returns an error if the argument is malformed, the kind unknown, or the
    /// file unreadable.
    pub fn document_spec(self, spec: &str) -> Result<Self> {
        let (kind, path) = parse_document_spec(spec)?;
        self.document_from(kind, path)
    }

    /// Required documents not yet attached.
    #[must_use]
    pub fn missing_documents(&self) -> Vec<DocumentKind> {
        self.draft.missing_documents()
    }

    /// The entered fields.
    #[must_use]
    pub fn draft(&self) -> &RecordDraft {
        &self.draft
    }

    /// Save the delivery for the session's operator.
    ///
    /// A saved delivery that lacks required documents is reported once, at
    /// warn level.
    ///
    /// # Errors
    ///
    /// Returns the store's validation, session or persistence error; the form
    /// is left unchanged.
    pub async fn submit<B: RecordBackend>(
        &self,
        store: &RecordStore<B>,
        session: Option<&Session>,
    ) -> Result<DeliveryRecord> {
        let record = store.create(session, &self.draft).await?;

        let missing = self.missing_documents();
        if !missing.is_empty() {
            let labels: Vec<&str> = missing.iter().map(|k| k.label()).collect();
            warn!(
                "Delivery of {} saved without: {}",
                record.details.bike_number,
                labels.join(", ")
            );
        }
        Ok(record)
    }
}

/// Split `KIND=PATH` into a document kind and a path.
///
/// # Errors
///
/// Returns [`Error::InvalidField`] if there is no `=` or the kind is unknown.
pub fn parse_document_spec(spec: &str) -> Result<(DocumentKind, &Path)> {
    let (kind, path) = spec
        .split_once('=')
        .ok_or_else(|| Error::invalid("document", format!("expected KIND=PATH, got {spec:?}")))?;
    let path = path.trim();
    if path.is_empty() {
        return Err(Error::invalid("document", format!("missing path in {spec:?}")));
    }
    Ok((kind.trim().parse()?, Path::new(path)))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::auth::AuthMethod;
    use crate::storage::Storage;

    fn session() -> Session {
        Session::new("owner-a", "admin", AuthMethod::Static)
    }

    fn store() -> RecordStore<Storage> {
        RecordStore::new(Storage::open_in_memory().unwrap())
    }

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_new_form_defaults_to_today() {
        let form = DeliveryForm::new();
        assert_eq!(form.draft().sale_date, Utc::now().date_naive());
        assert_eq!(form.missing_documents().len(), 4);
    }

    #[test]
    fn test_parse_document_spec() {
        let (kind, path) = parse_document_spec("aadhar=scans/aadhar.pdf").unwrap();
        assert_eq!(kind, DocumentKind::Aadhar);
        assert_eq!(path, Path::new("scans/aadhar.pdf"));

        assert!(parse_document_spec("aadhar").is_err());
        assert!(parse_document_spec("aadhar=").is_err());
        assert!(parse_document_spec("passport=p.pdf").is_err());
    }

    #[test]
    fn test_attachments_loaded_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let photo = write_file(dir.path(), "buyer.jpg", b"jpeg");
        let sig = write_file(dir.path(), "sig.png", b"png");
        let ins = write_file(dir.path(), "insurance.pdf", b"%PDF");

        let form = DeliveryForm::new()
            .buyer_photo_from(&photo)
            .unwrap()
            .signature_from(&sig)
            .unwrap()
            .document_spec(&format!("insurance={}", ins.display()))
            .unwrap();

        let draft = form.draft();
        assert_eq!(draft.buyer_photo.as_ref().unwrap().mime(), "image/jpeg");
        assert_eq!(draft.signature.as_ref().unwrap().mime(), "image/png");
        assert!(draft.has_document(DocumentKind::Insurance));
        assert_eq!(form.missing_documents().len(), 3);
    }

    #[tokio::test]
    async fn test_submit_saves_record() {
        let store = store();
        let form = DeliveryForm::new()
            .bike_number(" KA05MN7777 ")
            .buyer_name("Asha")
            .bike_model("Honda Activa")
            .sell_amount(85_000.0);

        let record = form.submit(&store, Some(&session())).await.unwrap();
        assert_eq!(record.details.bike_number, "KA05MN7777");
        assert_eq!(record.details.bike_model, "Honda Activa");
        assert_eq!(&record.details, form.draft());
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_form() {
        let store = store();
        let form = DeliveryForm::new()
            .bike_number("KA05MN7777")
            .buyer_name("Asha")
            .sell_amount(85_000.0);
        let before = form.clone();

        let err = form.submit(&store, None).await.unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));
        assert_eq!(form, before);

        let record = form.submit(&store, Some(&session())).await.unwrap();
        assert_eq!(record.details.buyer_name, "Asha");
    }

    #[derive(Clone, Default)]
    struct WarnCounter(std::sync::Arc<std::sync::atomic::AtomicUsize>);

    impl WarnCounter {
        fn count(&self) -> usize {
            self.0.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }
    }

    /// Submit on a current-thread runtime, counting warnings raised meanwhile.
    fn submit_counting_warnings(
        form: &DeliveryForm,
        store: &RecordStore<Storage>,
        session: Option<&Session>,
    ) -> (Result<DeliveryRecord>, usize) {
        use tracing_subscriber::prelude::*;

        let counter = WarnCounter::default();
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let result = tracing::subscriber::with_default(subscriber, || {
            runtime.block_on(form.submit(store, session))
        });
        (result, counter.count())
    }

    #[test]
    fn test_missing_documents_warned_once_after_save() {
        let store = store();
        let form = DeliveryForm::new()
            .bike_number("KA05MN7777")
            .buyer_name("Asha")
            .sell_amount(85_000.0);

        let (result, warnings) = submit_counting_warnings(&form, &store, None);
        assert!(matches!(result, Err(Error::NotAuthenticated)));
        assert_eq!(warnings, 0);

        let (result, warnings) = submit_counting_warnings(&form, &store, Some(&session()));
        assert!(result.is_ok());
        assert_eq!(warnings, 1);
    }

    #[tokio::test]
    async fn test_submit_incomplete_form() {
        let form = DeliveryForm::new().bike_number("KA05MN7777");
        let err = form.submit(&store(), Some(&session())).await.unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "buyer_name" }));
    }
}
