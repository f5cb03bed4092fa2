use std::path::{Path, PathBuf};

use crate::data_url;
use crate::preview::{self, PreviewCategory};

/// Where the bytes of a picked file come from.
#[derive(Debug, Clone)]
pub enum ContentSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// A file as handed over by a picker: declared metadata plus its content.
#[derive(Debug, Clone)]
pub struct FileSelection {
    pub name: String,
    pub media_type: String,
    pub byte_size: u64,
    pub source: ContentSource,
}

impl FileSelection {
    /// Builds a selection from a path on disk, guessing the media type from
    /// the extension. Unknown extensions get an empty media type.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let meta = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();
        Ok(Self { name, media_type, byte_size: meta.len(), source: ContentSource::Path(path.to_path_buf()) })
    }

    pub fn from_bytes(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            byte_size: bytes.len() as u64,
            source: ContentSource::Bytes(bytes),
        }
    }

    pub fn category(&self) -> PreviewCategory {
        preview::classify(&self.media_type, &self.name)
    }
}

/// Reads the content the way it will be previewed and forwarded: decoded
/// UTF-8 for text files, a base64 data URL for everything else.
pub async fn read_content(file: &FileSelection, category: PreviewCategory) -> std::io::Result<String> {
    let bytes = match &file.source {
        ContentSource::Path(path) => tokio::fs::read(path).await?,
        ContentSource::Bytes(bytes) => bytes.clone(),
    };
    match category {
        PreviewCategory::Text => String::from_utf8(bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        _ => Ok(data_url::encode(&file.media_type, &bytes)),
    }
}
