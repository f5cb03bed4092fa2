use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::NotDecodable;

const GENERIC_MEDIA_TYPE: &str = "application/octet-stream";

/// Returns the payload of a `data:<type>;base64,<payload>` URL verbatim.
///
/// The URL must contain exactly one comma and the header before it must mark
/// base64 encoding. The payload alphabet is not validated.
pub fn decode_base64_payload(data_url: &str) -> Result<&str, NotDecodable> {
    let mut parts = data_url.split(',');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), None) if header.contains(";base64") => Ok(payload),
        _ => {
            let head: String = data_url.chars().take(100).collect();
            tracing::warn!(data_url = %head, "could not parse base64 content from data url");
            Err(NotDecodable)
        }
    }
}

pub fn encode(media_type: &str, bytes: &[u8]) -> String {
    let media_type = if media_type.is_empty() { GENERIC_MEDIA_TYPE } else { media_type };
    format!("data:{};base64,{}", media_type, STANDARD.encode(bytes))
}
