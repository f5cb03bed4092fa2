use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("File exceeds {} limit: {name}", format_limit(.limit))]
    TooLarge { name: String, size: u64, limit: u64 },
    #[error("Failed to read file: {file_name}. Please try again or select a different file.")]
    ReadFailed { file_name: String },
}

const MIB: u64 = 1024 * 1024;

/// Whole mebibytes as `5MB`, fractional ones as `1.50MB`, anything smaller in bytes.
fn format_limit(limit: &u64) -> String {
    match *limit {
        l if l >= MIB && l % MIB == 0 => format!("{}MB", l / MIB),
        l if l >= MIB => format!("{:.2}MB", l as f64 / MIB as f64),
        l => format!("{} bytes", l),
    }
}

/// A data URL that does not carry a `;base64` payload after its first comma.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("could not parse base64 content from data url")]
pub struct NotDecodable;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("nothing to send: message is empty and no file is attached")]
    Empty,
    #[error("a request is already in flight")]
    Busy,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectError {
    #[error("unknown model: {0}")]
    UnknownModel(String),
}
