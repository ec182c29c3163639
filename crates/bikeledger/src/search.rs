//! Filtering and lookups over a listed set of records.
//!
//! Everything here is a pure function over records already loaded through
//! the store; nothing touches the backend.

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::record::DeliveryRecord;

/// Records whose sale date (`YYYY-MM-DD`) starts with `date_prefix`.
///
/// The prefix may be a full date, a month (`2024-05`) or a year. An empty
/// prefix matches everything.
#[must_use]
pub fn filter_by_date<'a>(records: &'a [DeliveryRecord], date_prefix: &str) -> Vec<&'a DeliveryRecord> {
    let prefix = date_prefix.trim();
    records
        .iter()
        .filter(|r| r.sale_date_string().starts_with(prefix))
        .collect()
}

/// The first record whose bike number equals `bike_number`, ignoring case.
#[must_use]
pub fn find_by_bike_number<'a>(
    records: &'a [DeliveryRecord],
    bike_number: &str,
) -> Option<&'a DeliveryRecord> {
    let query = bike_number.trim();
    if query.is_empty() {
        return None;
    }
    records
        .iter()
        .find(|r| r.details.bike_number.trim().eq_ignore_ascii_case(query))
}

/// Whole days between the sale date and `today`; negative for future sales.
#[must_use]
pub fn days_since_sale(record: &DeliveryRecord, today: NaiveDate) -> i64 {
    (today - record.details.sale_date).num_days()
}

/// Records sold on `today`.
#[must_use]
pub fn todays_records(records: &[DeliveryRecord], today: NaiveDate) -> Vec<&DeliveryRecord> {
    filter_by_date(records, &today.format("%Y-%m-%d").to_string())
}

/// Today's date in UTC.
#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Counts shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// All records for the session.
    pub total_records: usize,
    /// Records sold today.
    pub today_records: usize,
    /// Records matching the date filter.
    pub filtered_records: usize,
    /// Sum of sale amounts over the filtered records.
    pub total_sales: f64,
}

impl DashboardSummary {
    /// Summarise `records` under the given date filter.
    #[must_use]
    pub fn compute(records: &[DeliveryRecord], date_prefix: &str, today: NaiveDate) -> Self {
        let filtered = filter_by_date(records, date_prefix);
        Self {
            total_records: records.len(),
            today_records: todays_records(records, today).len(),
            filtered_records: filtered.len(),
            total_sales: filtered.iter().map(|r| r.details.sell_amount).sum(),
        }
    }
}
