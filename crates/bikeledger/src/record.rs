//! Core record types for bikeledger.
//!
//! This module defines the delivery record, the draft it is created from,
//! and the fixed set of document categories a delivery collects.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;
use crate::error::{Error, Result};

/// A category of supporting document collected at delivery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentKind {
    /// Vehicle insurance certificate.
    Insurance,
    /// RTO transfer forms 29 and 30.
    Form29And30,
    /// Buyer's Aadhaar card.
    Aadhar,
    /// Photo of the buyer's bank passbook.
    BankPassbook,
    /// Any other government-issued ID.
    OtherId,
}

impl DocumentKind {
    /// Every known kind, in display order.
    pub const ALL: [Self; 5] = [
        Self::Insurance,
        Self::Form29And30,
        Self::Aadhar,
        Self::BankPassbook,
        Self::OtherId,
    ];

    /// The kinds listed on the invoice checklist.
    pub const PRIMARY: [Self; 4] = [
        Self::Insurance,
        Self::Form29And30,
        Self::Aadhar,
        Self::BankPassbook,
    ];

    /// Storage key for this kind.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Insurance => "insurance",
            Self::Form29And30 => "form29_30",
            Self::Aadhar => "aadhar",
            Self::BankPassbook => "bank_passbook",
            Self::OtherId => "other_id",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Insurance => "Insurance",
            Self::Form29And30 => "Form 29/30",
            Self::Aadhar => "Aadhar Card",
            Self::BankPassbook => "Bank Passbook Photo",
            Self::OtherId => "Other Govt ID",
        }
    }

    /// Whether the capture form asks for this document.
    /// Not enforced when a record is stored.
    #[must_use]
    pub fn is_required(self) -> bool {
        !matches!(self, Self::OtherId)
    }

    /// Look up a kind by its storage key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DocumentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_key(s).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|k| k.key()).collect();
            Error::invalid(
                "document",
                format!("unknown document type {s:?} (expected one of {})", known.join(", ")),
            )
        })
    }
}

/// Attachments keyed by document kind.
///
/// Keys are kept as strings so records carrying keys outside [`DocumentKind`]
/// still load; such entries are simply not shown on the invoice.
pub type Documents = BTreeMap<String, Attachment>;

/// The fields of a delivery as entered by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDraft {
    /// Registration plate; the primary search key.
    pub bike_number: String,
    /// Chassis (frame) number.
    #[serde(default)]
    pub chassis_number: String,
    /// Make and model.
    #[serde(default)]
    pub bike_model: String,
    /// Free-text condition notes.
    #[serde(default)]
    pub bike_details: String,
    /// First registration date, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<NaiveDate>,
    /// Buyer's full name.
    pub buyer_name: String,
    /// Buyer's mobile number.
    #[serde(default)]
    pub buyer_mobile: String,
    /// Buyer's postal address.
    #[serde(default)]
    pub buyer_address: String,
    /// Sale price in rupees.
    pub sell_amount: f64,
    /// Date of sale.
    pub sale_date: NaiveDate,
    /// Photo of the buyer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_photo: Option<Attachment>,
    /// Buyer's signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Attachment>,
    /// Supporting documents.
    #[serde(default)]
    pub documents: Documents,
}

impl RecordDraft {
    /// Create a draft with the required fields, dated today.
    #[must_use]
    pub fn new(bike_number: impl Into<String>, buyer_name: impl Into<String>, sell_amount: f64) -> Self {
        Self {
            bike_number: bike_number.into(),
            chassis_number: String::new(),
            bike_model: String::new(),
            bike_details: String::new(),
            registration_date: None,
            buyer_name: buyer_name.into(),
            buyer_mobile: String::new(),
            buyer_address: String::new(),
            sell_amount,
            sale_date: Utc::now().date_naive(),
            buyer_photo: None,
            signature: None,
            documents: Documents::new(),
        }
    }

    /// Check the fields a record cannot be stored without.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] for a blank bike number or buyer name or a
    /// zero amount, and [`Error::InvalidField`] for a negative or non-finite amount.
    pub fn validate(&self) -> Result<()> {
        if self.bike_number.trim().is_empty() {
            return Err(Error::MissingField {
                field: "bike_number",
            });
        }
        if self.buyer_name.trim().is_empty() {
            return Err(Error::MissingField {
                field: "buyer_name",
            });
        }
        if !self.sell_amount.is_finite() {
            return Err(Error::invalid("sell_amount", "must be a number"));
        }
        if self.sell_amount == 0.0 {
            return Err(Error::MissingField {
                field: "sell_amount",
            });
        }
        if self.sell_amount < 0.0 {
            return Err(Error::invalid("sell_amount", "cannot be negative"));
        }
        Ok(())
    }

    /// Attach a document under the given kind, replacing any earlier one.
    pub fn attach(&mut self, kind: DocumentKind, attachment: Attachment) {
        self.documents.insert(kind.key().to_string(), attachment);
    }

    /// Whether a document of the given kind is attached.
    #[must_use]
    pub fn has_document(&self, kind: DocumentKind) -> bool {
        self.documents.contains_key(kind.key())
    }

    /// Required document kinds that have not been attached.
    #[must_use]
    pub fn missing_documents(&self) -> Vec<DocumentKind> {
        DocumentKind::ALL
            .into_iter()
            .filter(|kind| kind.is_required() && !self.has_document(*kind))
            .collect()
    }
}

/// A stored delivery record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    /// Store-assigned identifier.
    pub id: String,
    /// Identity of the session that created the record.
    pub owner_id: String,
    /// Store-assigned creation time.
    pub created_at: DateTime<Utc>,
    /// The delivery itself.
    #[serde(flatten)]
    pub details: RecordDraft,
}

impl DeliveryRecord {
    /// Sale date formatted as `YYYY-MM-DD`.
    #[must_use]
    pub fn sale_date_string(&self) -> String {
        self.details.sale_date.format("%Y-%m-%d").to_string()
    }

    /// First eight characters of the id, for file names and tables.
    #[must_use]
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}
