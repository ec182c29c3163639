//! Linux-specific implementation for bikeledger
//!
//! This crate hands rendered invoices to the desktop's default viewer.

#![cfg(target_os = "linux")]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

/// Desktop opener used to show documents.
const OPENER: &str = "xdg-open";

/// Initialize Linux-specific components
///
/// # Errors
///
/// Returns an error if initialization fails
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    Ok(())
}

/// Get platform name
#[must_use]
pub fn platform_name() -> &'static str {
    "Linux"
}

/// Open a rendered document with the desktop's default handler.
///
/// The opener is spawned detached; the call returns once it has started.
///
/// # Errors
///
/// Returns an error if the path does not exist or `xdg-open` cannot be spawned.
pub fn open_document(path: &Path) -> io::Result<()> {
    if !path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such document: {}", path.display()),
        ));
    }

    tracing::debug!("Opening {} with {}", path.display(), OPENER);
    Command::new(OPENER)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(())
}
