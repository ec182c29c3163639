//! Terminal rendering of records and summaries.

use chrono::NaiveDate;
use serde::Serialize;

use super::commands::OutputFormat;
use crate::invoice::format_rupees;
use crate::record::{DeliveryRecord, DocumentKind};
use crate::search::{days_since_sale, DashboardSummary};

/// A record without its embedded images, for listings and JSON output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary<'a> {
    /// Record id.
    pub id: &'a str,
    /// Registration plate.
    pub bike_number: &'a str,
    /// Make and model.
    pub bike_model: &'a str,
    /// Buyer's name.
    pub buyer_name: &'a str,
    /// Buyer's mobile number.
    pub buyer_mobile: &'a str,
    /// Sale price in rupees.
    pub sell_amount: f64,
    /// Sale date, `YYYY-MM-DD`.
    pub sale_date: String,
    /// Attached document kinds.
    pub documents: Vec<&'a str>,
    /// Required documents not attached.
    pub missing: Vec<&'static str>,
}

impl<'a> From<&'a DeliveryRecord> for RecordSummary<'a> {
    fn from(record: &'a DeliveryRecord) -> Self {
        let details = &record.details;
        Self {
            id: &record.id,
            bike_number: &details.bike_number,
            bike_model: &details.bike_model,
            buyer_name: &details.buyer_name,
            buyer_mobile: &details.buyer_mobile,
            sell_amount: details.sell_amount,
            sale_date: record.sale_date_string(),
            documents: details.documents.keys().map(String::as_str).collect(),
            missing: details
                .missing_documents()
                .into_iter()
                .map(DocumentKind::key)
                .collect(),
        }
    }
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let kept: String = value.chars().take(width.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// Format a list of records.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_records(records: &[&DeliveryRecord], format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => {
            let summaries: Vec<RecordSummary<'_>> =
                records.iter().map(|r| RecordSummary::from(*r)).collect();
            serde_json::to_string_pretty(&summaries)
        }
        OutputFormat::Table => {
            let mut out = format!(
                "{:<10}  {:<12}  {:<20}  {:<20}  {:>12}  {:<10}\n",
                "ID", "BIKE", "MODEL", "BUYER", "AMOUNT", "SOLD"
            );
            for record in records {
                let details = &record.details;
                out.push_str(&format!(
                    "{:<10}  {:<12}  {:<20}  {:<20}  {:>12}  {:<10}\n",
                    record.short_id(),
                    truncate(&details.bike_number, 12),
                    truncate(or_dash(&details.bike_model), 20),
                    truncate(&details.buyer_name, 20),
                    format_rupees(details.sell_amount),
                    record.sale_date_string(),
                ));
            }
            Ok(out)
        }
        OutputFormat::Plain => Ok(records
            .iter()
            .map(|record| {
                format!(
                    "{}  {}  {}  {}\n",
                    record.sale_date_string(),
                    record.details.bike_number,
                    record.details.buyer_name,
                    format_rupees(record.details.sell_amount),
                )
            })
            .collect()),
    }
}

/// Format a single record in detail, with days since sale counted up to `today`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_record(
    record: &DeliveryRecord,
    format: OutputFormat,
    today: NaiveDate,
) -> serde_json::Result<String> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(&RecordSummary::from(record));
    }

    let details = &record.details;
    let registration = details
        .registration_date
        .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string());
    let mut out = String::new();
    out.push_str(&format!("Bike number:    {}\n", details.bike_number));
    out.push_str(&format!("Model:          {}\n", or_dash(&details.bike_model)));
    out.push_str(&format!("Chassis:        {}\n", or_dash(&details.chassis_number)));
    out.push_str(&format!("Registered:     {registration}\n"));
    out.push_str(&format!("Buyer:          {}\n", details.buyer_name));
    out.push_str(&format!("Mobile:         {}\n", or_dash(&details.buyer_mobile)));
    out.push_str(&format!("Address:        {}\n", or_dash(&details.buyer_address)));
    out.push_str(&format!("Amount:         {}\n", format_rupees(details.sell_amount)));
    out.push_str(&format!("Sale date:      {}\n", record.sale_date_string()));
    out.push_str(&format!(
        "Since sale:     {} days\n",
        days_since_sale(record, today)
    ));
    out.push_str(&format!("Record id:      {}\n", record.id));
    out.push_str("Documents:\n");
    for kind in DocumentKind::ALL {
        let mark = if details.has_document(kind) { "✓" } else { "✗" };
        out.push_str(&format!("  {mark} {}\n", kind.label()));
    }
    Ok(out)
}

/// Format dashboard totals.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_summary(summary: &DashboardSummary, date_prefix: &str, json: bool) -> serde_json::Result<String> {
    if json {
        return serde_json::to_string_pretty(summary);
    }

    let filter = if date_prefix.trim().is_empty() {
        "all dates"
    } else {
        date_prefix.trim()
    };
    Ok(format!(
        "Total records:    {}\nSold today:       {}\nMatching ({filter}): {}\nTotal sales:      {}\n",
        summary.total_records,
        summary.today_records,
        summary.filtered_records,
        format_rupees(summary.total_sales),
    ))
}
