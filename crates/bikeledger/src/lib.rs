//! `bikeledger` - Delivery records for a bike resale garage
//!
//! This library provides the pieces behind the `bikeledger` binary: an auth
//! gate with pluggable login strategies, a per-operator record store backed by
//! `SQLite`, delivery capture, search over stored records, and a printable
//! HTML invoice for each delivery.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod attachment;
pub mod auth;
pub mod cli;
pub mod config;
pub mod delivery;
pub mod error;
pub mod invoice;
pub mod logging;
pub mod notify;
pub mod record;
pub mod search;
pub mod storage;
pub mod store;

pub use attachment::Attachment;
pub use auth::{AuthGate, Authenticator, Credentials, Session};
pub use config::Config;
pub use delivery::DeliveryForm;
pub use error::{Error, Result};
pub use invoice::{Document, InvoiceOptions};
pub use logging::init_logging;
pub use notify::{Notification, Notifier};
pub use record::{DeliveryRecord, DocumentKind, RecordDraft};
pub use storage::{Storage, StorageStats};
pub use store::{RecordBackend, RecordStore};
