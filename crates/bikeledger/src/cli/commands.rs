//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

/// Login command arguments.
///
/// Which flags are needed depends on `auth.strategy`: a password for
/// `static`, a phone number for the code strategies. Anything missing is
/// prompted for.
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Username (static strategy)
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password (static strategy)
    #[arg(short, long)]
    pub password: Option<String>,

    /// Phone number (one-time-code strategies)
    #[arg(long)]
    pub phone: Option<String>,

    /// Code already received from the identity provider (delegated_otp only)
    #[arg(long)]
    pub code: Option<String>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Deliver command arguments.
#[derive(Debug, Args)]
pub struct DeliverCommand {
    /// Registration plate, e.g. KA05MN7777
    #[arg(short, long)]
    pub bike_number: String,

    /// Buyer's full name
    #[arg(long)]
    pub buyer_name: String,

    /// Sale amount in rupees
    #[arg(short, long)]
    pub amount: f64,

    /// Chassis number
    #[arg(long, default_value = "")]
    pub chassis_number: String,

    /// Make and model
    #[arg(long, default_value = "")]
    pub bike_model: String,

    /// Condition notes
    #[arg(long, default_value = "")]
    pub bike_details: String,

    /// First registration date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub registration_date: Option<NaiveDate>,

    /// Buyer's mobile number
    #[arg(long, default_value = "")]
    pub buyer_mobile: String,

    /// Buyer's address
    #[arg(long, default_value = "")]
    pub buyer_address: String,

    /// Sale date (YYYY-MM-DD), defaults to today
    #[arg(long, value_name = "DATE")]
    pub sale_date: Option<NaiveDate>,

    /// Buyer photo (jpg, png, gif or webp)
    #[arg(long, value_name = "PATH")]
    pub photo: Option<PathBuf>,

    /// Buyer signature image
    #[arg(long, value_name = "PATH")]
    pub signature: Option<PathBuf>,

    /// Supporting document as KIND=PATH; KIND is one of insurance, form29_30,
    /// aadhar, bank_passbook, other_id (repeatable)
    #[arg(short, long = "document", value_name = "KIND=PATH")]
    pub documents: Vec<String>,

    /// Don't write an invoice after saving
    #[arg(long)]
    pub no_invoice: bool,

    /// Open the invoice after writing it
    #[arg(long, conflicts_with = "no_invoice")]
    pub open: bool,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Only records whose sale date starts with this (e.g. 2024-05 or 2024-05-01)
    #[arg(short, long, value_name = "PREFIX")]
    pub date: Option<String>,

    /// Maximum number of results
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Search command arguments.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Bike number to look up (case-insensitive)
    pub bike_number: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Invoice command arguments.
#[derive(Debug, Args)]
pub struct InvoiceCommand {
    /// Bike number of the delivery
    pub bike_number: String,

    /// Directory to write the invoice to
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Open the invoice after writing it
    #[arg(long)]
    pub open: bool,
}

/// Dashboard command arguments.
#[derive(Debug, Args)]
pub struct DashboardCommand {
    /// Date prefix for the filtered totals
    #[arg(short, long, value_name = "PREFIX")]
    pub date: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Notify command arguments.
#[derive(Debug, Args)]
pub struct NotifyCommand {
    /// Buyer's phone number
    #[arg(long)]
    pub phone: String,

    /// Bike whose RC card is ready
    #[arg(short, long)]
    pub bike_number: String,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
