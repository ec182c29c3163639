//! Printable delivery invoices.
//!
//! [`render`] turns a stored record into a self-contained HTML page: inline
//! styles, embedded photo and signature, and Print/Close buttons that hide
//! themselves when printed. All record text is HTML-escaped by the template.

use std::path::{Path, PathBuf};

use askama::Template;
use chrono::{DateTime, Local, Utc};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::record::{DeliveryRecord, DocumentKind};
use crate::search::days_since_sale;

const NOT_SPECIFIED: &str = "Not specified";

/// Settings that are not part of the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceOptions {
    /// Name printed in the header and signature box.
    pub business_name: String,
    /// Generation time; also the reference for "days since sale".
    pub generated_at: DateTime<Utc>,
}

impl InvoiceOptions {
    /// Options for an invoice generated now.
    #[must_use]
    pub fn new(business_name: impl Into<String>) -> Self {
        Self {
            business_name: business_name.into(),
            generated_at: Utc::now(),
        }
    }

    /// Options from the `[invoice]` config section.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.invoice.business_name.clone())
    }
}

/// A rendered invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Page title.
    pub title: String,
    /// File name to save under.
    pub file_name: String,
    /// Complete HTML page.
    pub html: String,
}

impl Document {
    /// Write the page into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file written.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.html)?;
        info!("Wrote invoice to {}", path.display());
        Ok(path)
    }
}

struct ChecklistItem {
    label: &'static str,
    present: bool,
}

#[derive(Template)]
#[template(path = "invoice.html")]
struct InvoiceTemplate<'a> {
    title: &'a str,
    business_name: &'a str,
    invoice_number: &'a str,
    generated_on: String,
    generated_at: String,
    bike_number: &'a str,
    bike_model: &'a str,
    chassis_number: &'a str,
    registration_date: String,
    has_bike_details: bool,
    bike_details: &'a str,
    sale_date: String,
    amount: String,
    days_since_sale: i64,
    buyer_name: &'a str,
    buyer_mobile: &'a str,
    buyer_address: &'a str,
    has_photo: bool,
    photo_src: &'a str,
    checklist: Vec<ChecklistItem>,
    has_signature: bool,
    signature_src: &'a str,
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

/// Render the invoice for `record`.
///
/// # Errors
///
/// Returns [`Error::RenderPrecondition`] when no record is given, or a
/// template error if rendering fails.
pub fn render(record: Option<&DeliveryRecord>, options: &InvoiceOptions) -> Result<Document> {
    let record = record.ok_or(Error::RenderPrecondition)?;
    let details = &record.details;

    let title = format!(
        "{} - Delivery Invoice {}",
        options.business_name, details.bike_number
    );
    let local_time = options.generated_at.with_timezone(&Local);

    let checklist = DocumentKind::PRIMARY
        .into_iter()
        .map(|kind| ChecklistItem {
            label: kind.label(),
            present: details.has_document(kind),
        })
        .collect();

    let photo = details.buyer_photo.as_ref().filter(|a| a.is_image());
    let signature = details.signature.as_ref().filter(|a| a.is_image());

    let page = InvoiceTemplate {
        title: &title,
        business_name: &options.business_name,
        invoice_number: record.short_id(),
        generated_on: local_time.format("%d/%m/%Y").to_string(),
        generated_at: local_time.format("%d/%m/%Y %H:%M:%S").to_string(),
        bike_number: &details.bike_number,
        bike_model: or_placeholder(&details.bike_model, NOT_SPECIFIED),
        chassis_number: or_placeholder(&details.chassis_number, NOT_SPECIFIED),
        registration_date: details
            .registration_date
            .map_or_else(|| NOT_SPECIFIED.to_string(), |d| d.format("%d/%m/%Y").to_string()),
        has_bike_details: !details.bike_details.trim().is_empty(),
        bike_details: details.bike_details.trim(),
        sale_date: details.sale_date.format("%d/%m/%Y").to_string(),
        amount: format_rupees(details.sell_amount),
        days_since_sale: days_since_sale(record, options.generated_at.date_naive()),
        buyer_name: &details.buyer_name,
        buyer_mobile: or_placeholder(&details.buyer_mobile, "Not provided"),
        buyer_address: or_placeholder(&details.buyer_address, "Not provided"),
        has_photo: photo.is_some(),
        photo_src: photo.map_or("", |a| a.as_str()),
        checklist,
        has_signature: signature.is_some(),
        signature_src: signature.map_or("", |a| a.as_str()),
    };

    let html = page.render()?;
    debug!("Rendered invoice for {} ({} bytes)", details.bike_number, html.len());

    Ok(Document {
        file_name: format!(
            "invoice-{}-{}.html",
            file_safe(&details.bike_number),
            record.short_id()
        ),
        title,
        html,
    })
}

fn file_safe(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Format an amount in rupees with Indian digit grouping.
///
/// `85000` becomes `₹85,000` and `1234567.5` becomes `₹12,34,567.50`. Paise
/// are shown only when non-zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_rupees(amount: f64) -> String {
    let total_paise = (amount.abs() * 100.0).round() as u64;
    let rupees = (total_paise / 100).to_string();
    let paise = total_paise % 100;

    let grouped = if rupees.len() <= 3 {
        rupees
    } else {
        let (mut head, tail) = rupees.split_at(rupees.len() - 3);
        let mut groups = Vec::new();
        while head.len() > 2 {
            let (rest, pair) = head.split_at(head.len() - 2);
            groups.push(pair);
            head = rest;
        }
        groups.push(head);
        groups.reverse();
        format!("{},{tail}", groups.join(","))
    };

    let sign = if amount < 0.0 { "-" } else { "" };
    if paise == 0 {
        format!("{sign}₹{grouped}")
    } else {
        format!("{sign}₹{grouped}.{paise:02}")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::attachment::Attachment;
    use crate::record::RecordDraft;

    fn record() -> DeliveryRecord {
        let mut details = RecordDraft::new("KA05MN7777", "Asha", 85_000.0);
        details.sale_date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        DeliveryRecord {
            id: "0f8c2a9e-1111-2222-3333-444455556666".to_string(),
            owner_id: "owner".to_string(),
            created_at: Utc::now(),
            details,
        }
    }

    fn options() -> InvoiceOptions {
        InvoiceOptions {
            business_name: "Taj Autogarage".to_string(),
            generated_at: NaiveDate::from_ymd_opt(2024, 5, 11)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
                .and_utc(),
        }
    }

    #[test]
    fn test_format_rupees() {
        assert_eq!(format_rupees(0.0), "₹0");
        assert_eq!(format_rupees(999.0), "₹999");
        assert_eq!(format_rupees(1_000.0), "₹1,000");
        assert_eq!(format_rupees(85_000.0), "₹85,000");
        assert_eq!(format_rupees(100_000.0), "₹1,00,000");
        assert_eq!(format_rupees(1_234_567.0), "₹12,34,567");
        assert_eq!(format_rupees(12_345_678.0), "₹1,23,45,678");
        assert_eq!(format_rupees(85_000.5), "₹85,000.50");
        assert_eq!(format_rupees(-1_500.0), "-₹1,500");
    }

    #[test]
    fn test_render_requires_record() {
        let err = render(None, &options()).unwrap_err();
        assert!(matches!(err, Error::RenderPrecondition));
        assert!(err.is_render());
    }

    #[test]
    fn test_render_contains_record_fields() {
        let doc = render(Some(&record()), &options()).unwrap();

        assert!(doc.html.contains("KA05MN7777"));
        assert!(doc.html.contains("₹85,000"));
        assert!(doc.html.contains("Asha"));
        assert!(doc.html.contains("01/05/2024"));
        assert!(doc.html.contains("10 days"));
        assert!(doc.html.contains("0f8c2a9e"));
        assert!(doc.html.contains("Not specified"));
        assert_eq!(doc.title, "Taj Autogarage - Delivery Invoice KA05MN7777");
        assert_eq!(doc.file_name, "invoice-KA05MN7777-0f8c2a9e.html");
    }

    #[test]
    fn test_render_checklist_marks_documents() {
        let mut r = record();
        r.details.attach(
            DocumentKind::Insurance,
            Attachment::from_bytes("application/pdf", b"%PDF").unwrap(),
        );
        r.details.attach(
            DocumentKind::BankPassbook,
            Attachment::from_bytes("image/jpeg", b"passbook").unwrap(),
        );

        let html = render(Some(&r), &options()).unwrap().html;
        assert!(html.contains("<strong>Insurance:</strong> ✓ Uploaded"));
        assert!(html.contains("<strong>Bank Passbook Photo:</strong> ✓ Uploaded"));
        assert!(html.contains("<strong>Form 29/30:</strong> ✗ Missing"));
        assert!(html.contains("<strong>Aadhar Card:</strong> ✗ Missing"));
        assert!(!html.contains("Other Govt ID"));
    }

    #[test]
    fn test_render_embeds_images() {
        let mut r = record();
        let photo = Attachment::from_bytes("image/png", b"photo").unwrap();
        let signature = Attachment::from_bytes("image/png", b"sig").unwrap();
        r.details.buyer_photo = Some(photo.clone());
        r.details.signature = Some(signature.clone());

        let html = render(Some(&r), &options()).unwrap().html;
        assert!(html.contains(&format!("src=\"{}\"", photo.as_str())));
        assert!(html.contains(&format!("src=\"{}\"", signature.as_str())));
    }

    #[test]
    fn test_render_without_images_has_no_img_tags() {
        let html = render(Some(&record()), &options()).unwrap().html;
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_render_escapes_text() {
        let mut r = record();
        r.details.buyer_name = "<script>alert(1)</script>".to_string();
        r.details.bike_details = "Scratch on \"tank\" & mirror".to_string();

        let html = render(Some(&r), &options()).unwrap().html;
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp; mirror"));
    }

    #[test]
    fn test_render_has_print_controls() {
        let html = render(Some(&record()), &options()).unwrap().html;
        assert!(html.contains("window.print()"));
        assert!(html.contains("window.close()"));
        assert!(html.contains(".no-print { display: none; }"));
    }

    #[test]
    fn test_days_since_sale_negative_for_future_sale() {
        let mut r = record();
        r.details.sale_date = options().generated_at.date_naive() + Duration::days(3);
        let html = render(Some(&r), &options()).unwrap().html;
        assert!(html.contains("-3 days"));
    }

    #[test]
    fn test_file_name_is_filesystem_safe() {
        let mut r = record();
        r.details.bike_number = "KA 05/MN 7777".to_string();
        let doc = render(Some(&r), &options()).unwrap();
        assert_eq!(doc.file_name, "invoice-KA_05_MN_7777-0f8c2a9e.html");
    }

    #[test]
    fn test_write_to_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let doc = render(Some(&record()), &options()).unwrap();

        let path = doc.write_to(dir.path().join("invoices")).unwrap();
        assert_eq!(path.file_name().unwrap(), doc.file_name.as_str());
        assert_eq!(std::fs::read_to_string(path).unwrap(), doc.html);
    }
}
