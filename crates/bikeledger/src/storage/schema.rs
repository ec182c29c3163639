//! `SQLite` schema definitions for bikeledger.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the delivery records table.
pub const CREATE_RECORDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS delivery_records (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    bike_number TEXT NOT NULL,
    chassis_number TEXT NOT NULL DEFAULT '',
    bike_model TEXT NOT NULL DEFAULT '',
    bike_details TEXT NOT NULL DEFAULT '',
    registration_date TEXT,
    buyer_name TEXT NOT NULL,
    buyer_mobile TEXT NOT NULL DEFAULT '',
    buyer_address TEXT NOT NULL DEFAULT '',
    sell_amount REAL NOT NULL CHECK (sell_amount > 0),
    sale_date TEXT NOT NULL,
    buyer_photo TEXT,
    signature TEXT,
    documents TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
)
";

/// SQL statement to create an index for per-owner, newest-first listing.
pub const CREATE_OWNER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_records_owner_created
    ON delivery_records(owner_id, created_at DESC)
";

/// SQL statement to create an index on `bike_number` for lookups.
pub const CREATE_BIKE_NUMBER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_records_bike_number
    ON delivery_records(bike_number COLLATE NOCASE)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_RECORDS_TABLE,
    CREATE_OWNER_INDEX,
    CREATE_BIKE_NUMBER_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_records_table_contains_required_columns() {
        assert!(CREATE_RECORDS_TABLE.contains("id TEXT PRIMARY KEY"));
        assert!(CREATE_RECORDS_TABLE.contains("owner_id TEXT NOT NULL"));
        assert!(CREATE_RECORDS_TABLE.contains("bike_number TEXT NOT NULL"));
        assert!(CREATE_RECORDS_TABLE.contains("buyer_name TEXT NOT NULL"));
        assert!(CREATE_RECORDS_TABLE.contains("sell_amount REAL NOT NULL"));
        assert!(CREATE_RECORDS_TABLE.contains("created_at TEXT NOT NULL"));
    }

    #[test]
    fn test_create_metadata_table_structure() {
        assert!(CREATE_METADATA_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_METADATA_TABLE.contains("value TEXT NOT NULL"));
    }
}
