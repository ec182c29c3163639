//! Embedded attachments.
//!
//! Photos, signatures and scanned documents travel with a record as RFC 2397
//! `data:` URLs so that a record (and the invoice rendered from it) is
//! self-contained.

use std::path::Path;
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn data_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^data:([A-Za-z0-9.+-]+/[A-Za-z0-9.+-]+);base64,([A-Za-z0-9+/]+={0,2})$")
            .expect("data URL pattern is valid")
    })
}

/// An attachment embedded as a base64 `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Attachment(String);

impl Attachment {
    /// Parse an existing `data:` URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] if the string is not a base64 data URL.
    pub fn parse(data_url: impl Into<String>) -> Result<Self> {
        let data_url = data_url.into();
        if data_url_pattern().is_match(&data_url) {
            Ok(Self(data_url))
        } else {
            Err(Error::invalid("attachment", "expected a base64 data: URL"))
        }
    }

    /// Embed raw bytes under the given MIME type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] if `bytes` is empty or the MIME type is malformed.
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::invalid("attachment", "file is empty"));
        }
        Self::parse(format!("data:{mime};base64,{}", BASE64.encode(bytes)))
    }

    /// Read a file and embed it, inferring the MIME type from its extension.
    ///
    /// Accepted formats are JPEG, PNG, GIF, WebP and PDF.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is empty, or has an
    /// unsupported extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mime = mime_for_path(path).ok_or_else(|| {
            Error::invalid(
                "attachment",
                format!(
                    "unsupported file type for {} (expected jpg, png, gif, webp or pdf)",
                    path.display()
                ),
            )
        })?;
        let bytes = std::fs::read(path)?;
        Self::from_bytes(mime, &bytes)
    }

    /// The MIME type declared in the URL.
    #[must_use]
    pub fn mime(&self) -> &str {
        self.0
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(';'))
            .map_or("", |(mime, _)| mime)
    }

    /// Whether the attachment is an image that can be shown inline.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime().starts_with("image/")
    }

    /// Decode the embedded payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>> {
        let payload = self
            .0
            .split_once(',')
            .map_or("", |(_, payload)| payload);
        BASE64
            .decode(payload)
            .map_err(|e| Error::invalid("attachment", e.to_string()))
    }

    /// The full `data:` URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Attachment {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Attachment> for String {
    fn from(attachment: Attachment) -> Self {
        attachment.0
    }
}

impl std::fmt::Display for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}
