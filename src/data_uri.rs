//! `data:` URIs carrying base64 image payloads.

use base64::Engine;
use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DataUriError {
    #[error("not a data URI")]
    MissingScheme,
    #[error("data URI has no ',' separator")]
    MissingSeparator,
    #[error("only base64 data URIs are supported")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    Payload(#[from] base64::DecodeError),
}

/// A `data:<media-type>;base64,<payload>` string.
#[derive(Clone, PartialEq, Eq)]
pub struct DataUri {
    text: String,
    // byte offset of the payload within `text`
    payload_at: usize,
}

impl DataUri {
    pub fn encode(media_type: &str, bytes: &[u8]) -> Self {
        let mut text = format!("data:{media_type};base64,");
        let payload_at = text.len();
        base64::engine::general_purpose::STANDARD.encode_string(bytes, &mut text);
        Self { text, payload_at }
    }

    pub fn parse(text: &str) -> Result<Self, DataUriError> {
        let rest = text.strip_prefix("data:").ok_or(DataUriError::MissingScheme)?;
        let comma = rest.find(',').ok_or(DataUriError::MissingSeparator)?;
        if !rest[..comma].ends_with(";base64") {
            return Err(DataUriError::NotBase64);
        }
        Ok(Self {
            text: text.to_owned(),
            payload_at: "data:".len() + comma + 1,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn media_type(&self) -> &str {
        let header = &self.text["data:".len()..self.payload_at - 1];
        header.strip_suffix(";base64").unwrap_or(header)
    }

    pub fn decode(&self) -> Result<Vec<u8>, DataUriError> {
        Ok(base64::engine::general_purpose::STANDARD.decode(&self.text[self.payload_at..])?)
    }
}

// Payloads run to megabytes; keep debug output readable.
impl fmt::Debug for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataUri")
            .field("media_type", &self.media_type())
            .field("len", &self.text.len())
            .finish()
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Guesses a media type from a file name's extension.
pub fn media_type_for_name(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    let media_type = match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => return None,
    };
    Some(media_type)
}
