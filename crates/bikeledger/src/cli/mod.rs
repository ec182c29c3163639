//! Command-line interface for bikeledger.
//!
//! This module provides the CLI structure and output helpers for the
//! `bikeledger` binary.

mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DashboardCommand, DeliverCommand, InvoiceCommand, ListCommand, LoginCommand,
    NotifyCommand, OutputFormat, SearchCommand, StatusCommand,
};

/// bikeledger - Delivery records for a bike resale garage
///
/// Captures each bike handed over to a buyer, with photos and paperwork,
/// and prints a delivery invoice for it.
#[derive(Debug, Parser)]
#[command(name = "bikeledger")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and remember the session
    Login(LoginCommand),

    /// End the remembered session
    Logout,

    /// Show session and database status
    Status(StatusCommand),

    /// Record a bike delivery
    Deliver(Box<DeliverCommand>),

    /// List your delivery records
    List(ListCommand),

    /// Find a delivery by bike number
    Search(SearchCommand),

    /// Write the invoice for a delivery
    Invoice(InvoiceCommand),

    /// Show delivery totals
    Dashboard(DashboardCommand),

    /// Tell a buyer their RC card is ready
    Notify(NotifyCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Debug,
            }
        }
    }
}
