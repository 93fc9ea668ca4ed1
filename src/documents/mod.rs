//! Document rendering
//!
//! Turns provider output into a downloadable file: lesson plans become PDF,
//! presentations become PPTX.

pub mod markdown;
pub mod pdf;
pub mod pptx;

use crate::error::Result;
use crate::generation::ContentType;
use chrono::{DateTime, Utc};

/// MIME type of rendered lesson plans
pub const PDF_MIME: &str = "application/pdf";

/// MIME type of rendered presentations
pub const PPTX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// A rendered file ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// File contents
    pub bytes: Vec<u8>,
    /// Object name, unique per generation
    pub file_name: String,
    /// MIME type sent as the upload `Content-Type`
    pub mime: &'static str,
}

/// File extension for a content type
pub fn extension(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Lesson => "pdf",
        ContentType::Presentation => "pptx",
    }
}

/// MIME type for a content type
pub fn mime_type(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Lesson => PDF_MIME,
        ContentType::Presentation => PPTX_MIME,
    }
}

/// Length of the random suffix that keeps object names unique
const NAME_SUFFIX_LEN: usize = 12;

/// Storage object name for a generation
///
/// User ids are reduced to ASCII alphanumerics, `-` and `_` so that the
/// name is always a single safe path segment. `suffix` must be unique per
/// generation; two generations in the same second never share a name.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use lesson_forge::documents::file_name;
/// use lesson_forge::generation::ContentType;
///
/// let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
/// assert_eq!(
///     file_name(ContentType::Presentation, "a1b2-c3", at, "9f86d081884c"),
///     "1700000000_presentation_a1b2-c3_9f86d081884c.pptx"
/// );
/// ```
pub fn file_name(
    content_type: ContentType,
    user_id: &str,
    at: DateTime<Utc>,
    suffix: &str,
) -> String {
    let safe_user: String = user_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let safe_user = if safe_user.is_empty() {
        "anonymous".to_string()
    } else {
        safe_user
    };
    format!(
        "{}_{}_{}_{}.{}",
        at.timestamp(),
        content_type.as_str(),
        safe_user,
        suffix,
        extension(content_type)
    )
}

/// Random object name suffix
fn unique_suffix() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(NAME_SUFFIX_LEN);
    id
}

/// Render provider output for a user
///
/// # Arguments
///
/// * `content_type` - Which document to produce
/// * `text` - Provider output
/// * `user_id` - Owner, used in the object name
///
/// # Errors
///
/// Returns `ForgeError::Document` if the text yields an empty document
pub fn render(content_type: ContentType, text: &str, user_id: &str) -> Result<RenderedDocument> {
    let bytes = match content_type {
        ContentType::Lesson => pdf::render_lesson(&markdown::parse_lesson(text))?,
        ContentType::Presentation => pptx::render_presentation(&markdown::parse_slides(text))?,
    };

    Ok(RenderedDocument {
        bytes,
        file_name: file_name(content_type, user_id, Utc::now(), &unique_suffix()),
        mime: mime_type(content_type),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_name_sanitizes_user() {
        let at = Utc.timestamp_opt(42, 0).unwrap();
        assert_eq!(
            file_name(ContentType::Lesson, "../etc/passwd", at, "abc"),
            "42_lesson_etcpasswd_abc.pdf"
        );
        assert_eq!(
            file_name(ContentType::Lesson, "///", at, "abc"),
            "42_lesson_anonymous_abc.pdf"
        );
    }

    #[test]
    fn test_render_twice_gives_distinct_names() {
        let first = render(ContentType::Lesson, "# Mock Content\nGenerated for: one", "u1").unwrap();
        let second = render(ContentType::Lesson, "# Mock Content\nGenerated for: two", "u1").unwrap();
        assert_ne!(first.file_name, second.file_name);
        assert!(first.file_name.contains("_lesson_u1_"));
    }

    #[test]
    fn test_render_lesson_is_pdf() {
        let doc = render(ContentType::Lesson, "# Mock Content\nGenerated for: x", "u1").unwrap();
        assert_eq!(doc.mime, PDF_MIME);
        assert!(doc.bytes.starts_with(b"%PDF"));
        assert!(doc.file_name.contains("_lesson_u1_"));
        assert!(doc.file_name.ends_with(".pdf"));
    }

    #[test]
    fn test_render_presentation_is_zip() {
        let doc = render(ContentType::Presentation, "Slide\n- point", "u1").unwrap();
        assert_eq!(doc.mime, PPTX_MIME);
        assert!(doc.bytes.starts_with(b"PK"));
        assert!(doc.file_name.ends_with(".pptx"));
    }

    #[test]
    fn test_render_rejects_content_without_slides() {
        assert!(render(ContentType::Presentation, "---\n---", "u1").is_err());
    }
}
