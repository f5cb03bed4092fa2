use serde::{Deserialize, Serialize};

use crate::session::PendingAttachment;

pub const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];
pub const SUPPORTED_TEXT_TYPES: &[&str] = &["text/plain", "text/csv", "application/json"];

const PICKER_EXTENSIONS: &[&str] = &["txt", "csv", "pdf", "doc", "docx", "xls", "xlsx"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PreviewCategory {
    Image,
    Text,
    Pdf,
    Unsupported,
}

/// Decides how a file is read and previewed. First match wins; unknown
/// combinations resolve to `Unsupported`.
pub fn classify(media_type: &str, file_name: &str) -> PreviewCategory {
    if SUPPORTED_IMAGE_TYPES.contains(&media_type) {
        return PreviewCategory::Image;
    }
    if SUPPORTED_TEXT_TYPES.contains(&media_type) {
        return PreviewCategory::Text;
    }
    if media_type == "application/pdf" {
        return PreviewCategory::Pdf;
    }

    if media_type.is_empty() || media_type == "application/octet-stream" {
        let canonical = match extension(file_name).as_str() {
            "txt" => Some("text/plain"),
            "csv" => Some("text/csv"),
            "json" => Some("application/json"),
            _ => None,
        };
        if canonical.is_some_and(|mime| SUPPORTED_TEXT_TYPES.contains(&mime)) {
            return PreviewCategory::Text;
        }
    }

    tracing::debug!(media_type, file_name, "no preview available, classified as unsupported");
    PreviewCategory::Unsupported
}

/// Mirrors the picker filter `image/*,.txt,.csv,.pdf,.doc,.docx,.xls,.xlsx`.
pub fn accepts(file_name: &str, media_type: &str) -> bool {
    if media_type.starts_with("image/") {
        return true;
    }
    file_name.contains('.') && PICKER_EXTENSIONS.contains(&extension(file_name).as_str())
}

fn extension(file_name: &str) -> String {
    file_name.rsplit('.').next().unwrap_or_default().to_lowercase()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PreviewBody {
    Image { data_url: String },
    Text { content: String },
    Notice { message: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PreviewView {
    pub name: String,
    pub media_type: String,
    pub size_kb: String,
    pub body: PreviewBody,
}

pub const EMPTY_PREVIEW: &str = "No file selected for preview.";

impl PreviewView {
    pub fn of(file: &PendingAttachment) -> Self {
        let body = match file.preview_category {
            PreviewCategory::Image => PreviewBody::Image { data_url: file.payload.clone() },
            PreviewCategory::Text => PreviewBody::Text { content: file.payload.clone() },
            PreviewCategory::Pdf => PreviewBody::Notice {
                message: "PDF preview is not available for this file.".into(),
            },
            PreviewCategory::Unsupported => PreviewBody::Notice {
                message: "Preview for this file type is not supported.".into(),
            },
        };
        Self {
            name: file.name.clone(),
            media_type: file.media_type.clone(),
            size_kb: format!("{:.2}", file.byte_size as f64 / 1024.0),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn classifies_by_media_type_first() {
        assert_eq!(classify("image/png", "x.png"), PreviewCategory::Image);
        assert_eq!(classify("text/csv", "a.csv"), PreviewCategory::Text);
        assert_eq!(classify("application/json", "data.bin"), PreviewCategory::Text);
        assert_eq!(classify("application/pdf", "a.pdf"), PreviewCategory::Pdf);
        // media type wins over a misleading extension
        assert_eq!(classify("image/jpeg", "notes.txt"), PreviewCategory::Image);
    }

    #[test]
    fn generic_media_type_falls_back_to_extension() {
        assert_eq!(classify("application/octet-stream", "a.csv"), PreviewCategory::Text);
        assert_eq!(classify("", "README.TXT"), PreviewCategory::Text);
        assert_eq!(classify("", "data.json"), PreviewCategory::Text);
        assert_eq!(classify("", "photo.png"), PreviewCategory::Unsupported);
    }

    #[test]
    fn specific_unknown_media_type_is_unsupported() {
        assert_eq!(classify("application/zip", "a.zip"), PreviewCategory::Unsupported);
        assert_eq!(classify("application/zip", "a.csv"), PreviewCategory::Unsupported);
        assert_eq!(classify("image/bmp", "a.bmp"), PreviewCategory::Unsupported);
        assert_eq!(classify("", ""), PreviewCategory::Unsupported);
    }

    #[test]
    fn picker_filter() {
        assert!(accepts("cat.bmp", "image/bmp"));
        assert!(accepts("report.XLSX", ""));
        assert!(accepts("a.pdf", "application/pdf"));
        assert!(!accepts("a.zip", "application/zip"));
        assert!(!accepts("data.json", "application/json"));
        assert!(!accepts("pdf", ""));
    }

    #[test]
    fn preview_view_formats_size_and_body() {
        let file = PendingAttachment {
            name: "a.pdf".into(),
            media_type: "application/pdf".into(),
            byte_size: 1536,
            payload: "data:application/pdf;base64,AAAA".into(),
            preview_category: PreviewCategory::Pdf,
        };
        let view = PreviewView::of(&file);
        assert_eq!(view.size_kb, "1.50");
        assert_eq!(
            view.body,
            PreviewBody::Notice { message: "PDF preview is not available for this file.".into() }
        );
    }

    fn media_type_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("application/octet-stream".to_string()),
            prop::sample::select(SUPPORTED_IMAGE_TYPES.to_vec()).prop_map(String::from),
            prop::sample::select(SUPPORTED_TEXT_TYPES.to_vec()).prop_map(String::from),
            "\\PC*",
        ]
    }

    fn file_name_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            "\\.{1,4}",
            "[a-zé日本]{0,8}\\.(txt|CSV|json|png|)",
            "\\PC*",
        ]
    }

    proptest! {
        #[test]
        fn classify_is_total_and_deterministic(
            media_type in media_type_strategy(),
            file_name in file_name_strategy(),
        ) {
            let first = classify(&media_type, &file_name);
            prop_assert_eq!(first, classify(&media_type, &file_name));
            prop_assert_eq!(accepts(&file_name, &media_type), accepts(&file_name, &media_type));
        }
    }
}
