//! macOS-specific implementation for bikeledger.
//!
//! This crate provides macOS-specific functionality for the bikeledger project,
//! currently handing rendered invoices to Launch Services for display and printing.

#![cfg(target_os = "macos")]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

/// Launch Services front end used to show documents.
const OPENER: &str = "/usr/bin/open";

/// Initialize macOS-specific components.
///
/// # Errors
///
/// Returns an error if initialization fails.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Initializing macOS platform components");
    Ok(())
}

/// Get the platform name.
#[must_use]
pub fn platform_name() -> &'static str {
    "macOS"
}

/// Open a rendered document in the default application for its type.
///
/// HTML invoices land in the default browser, where the operator prints them.
///
/// # Errors
///
/// Returns an error if the path does not exist or `open` exits unsuccessfully.
pub fn open_document(path: &Path) -> io::Result<()> {
    if !path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such document: {}", path.display()),
        ));
    }

    tracing::debug!("Opening {} with {}", path.display(), OPENER);
    let status = Command::new(OPENER)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;

    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("{OPENER} exited with {status}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        assert!(init().is_ok());
    }

    #[test]
    fn test_platform_name() {
        assert_eq!(platform_name(), "macOS");
    }

    #[test]
    fn test_open_missing_document() {
        let err = open_document(Path::new("/nonexistent/invoice.html")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
