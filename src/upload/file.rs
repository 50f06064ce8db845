use std::path::PathBuf;
use std::sync::Arc;

use crate::data_uri::{self, DataUri};

use super::UploadError;

/// Where a picked file's bytes live.
#[derive(Clone)]
pub enum FileSource {
    /// Already in memory (browser drops and picks).
    Bytes(Arc<[u8]>),
    /// On disk, read lazily (native drops).
    Path(PathBuf),
}

/// A file handed to the widget by a drop or the picker.
#[derive(Clone)]
pub struct PickedFile {
    pub name: String,
    /// Declared media type. Falls back to the extension when the host gave none.
    pub media_type: String,
    pub size: Option<u64>,
    pub source: FileSource,
}

/// The part of a [`PickedFile`] the widget keeps for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub name: String,
    pub media_type: String,
    pub size: Option<u64>,
}

impl PickedFile {
    pub fn from_bytes(name: impl Into<String>, declared_type: &str, bytes: impl Into<Arc<[u8]>>) -> Self {
        let name = name.into();
        let bytes = bytes.into();
        Self {
            media_type: declared_or_inferred(&name, declared_type),
            size: Some(bytes.len() as u64),
            name,
            source: FileSource::Bytes(bytes),
        }
    }

    pub fn from_path(path: PathBuf, declared_type: &str) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            media_type: declared_or_inferred(&name, declared_type),
            size: std::fs::metadata(&path).ok().map(|m| m.len()),
            name,
            source: FileSource::Path(path),
        }
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    pub fn meta(&self) -> FileMeta {
        FileMeta {
            name: self.name.clone(),
            media_type: self.media_type.clone(),
            size: self.size,
        }
    }

    /// Reads the file and encodes it as a data URI.
    pub async fn encode(self) -> Result<DataUri, UploadError> {
        let bytes: Arc<[u8]> = match self.source {
            FileSource::Bytes(bytes) => bytes,
            FileSource::Path(path) => std::fs::read(&path)
                .map_err(|e| UploadError::Read { name: self.name.clone(), reason: e.to_string() })?
                .into(),
        };
        Ok(DataUri::encode(&self.media_type, &bytes))
    }
}

impl std::fmt::Debug for PickedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match &self.source {
            FileSource::Bytes(b) => format!("{} bytes in memory", b.len()),
            FileSource::Path(p) => p.display().to_string(),
        };
        f.debug_struct("PickedFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("source", &source)
            .finish()
    }
}

fn declared_or_inferred(name: &str, declared: &str) -> String {
    if declared.is_empty() {
        data_uri::media_type_for_name(name).unwrap_or_default().to_owned()
    } else {
        declared.to_owned()
    }
}
