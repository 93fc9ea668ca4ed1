//! Generation request and content type
//!
//! A [`GenerationRequest`] is created when the prompt form is submitted and
//! consumed by the generation service. The wire format accepts both the
//! current field names and the legacy `mode: "pdf" | "ppt"` shape.

use crate::error::{ForgeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of document a generation produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Lesson plan rendered as PDF
    #[default]
    #[serde(alias = "pdf")]
    Lesson,
    /// Slide deck rendered as PPTX
    #[serde(alias = "ppt", alias = "pptx")]
    Presentation,
}

impl ContentType {
    /// Stable lowercase name used in storage and file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lesson => "lesson",
            Self::Presentation => "presentation",
        }
    }

    /// Human label shown in the UI
    pub fn label(&self) -> &'static str {
        match self {
            Self::Lesson => "Lesson Plan",
            Self::Presentation => "Presentation",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ForgeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lesson" | "pdf" => Ok(Self::Lesson),
            "presentation" | "ppt" | "pptx" => Ok(Self::Presentation),
            other => Err(ForgeError::Validation(format!(
                "Unknown content type: {}. Must be lesson or presentation",
                other
            ))),
        }
    }
}

/// A single generation request
///
/// # Examples
///
/// ```
/// use lesson_forge::generation::{ContentType, GenerationRequest};
///
/// let req: GenerationRequest =
///     serde_json::from_str(r#"{"prompt":"Weather vocabulary","mode":"ppt"}"#).unwrap();
/// assert_eq!(req.content_type, ContentType::Presentation);
/// assert!(!req.include_images);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Free-form prompt text
    pub prompt: String,

    /// Requested document kind
    #[serde(default, alias = "mode")]
    pub content_type: ContentType,

    /// Ask for image suggestions in the generated content
    #[serde(default)]
    pub include_images: bool,
}

impl GenerationRequest {
    /// Creates a new request
    pub fn new(prompt: impl Into<String>, content_type: ContentType, include_images: bool) -> Self {
        Self {
            prompt: prompt.into(),
            content_type,
            include_images,
        }
    }

    /// Validates the request against the configured prompt limit
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::Validation` if the trimmed prompt is empty or
    /// longer than `max_prompt_chars` characters.
    pub fn validate(&self, max_prompt_chars: usize) -> Result<()> {
        let trimmed = self.prompt.trim();
        if trimmed.is_empty() {
            return Err(ForgeError::Validation("Prompt cannot be empty".to_string()).into());
        }
        let chars = trimmed.chars().count();
        if chars > max_prompt_chars {
            return Err(ForgeError::Validation(format!(
                "Prompt is too long: {} characters (maximum {})",
                chars, max_prompt_chars
            ))
            .into());
        }
        Ok(())
    }

    /// Prompt text sent to the content provider
    ///
    /// Wraps the user's prompt with formatting instructions matching what
    /// the document renderers understand: `##` headings and `-` bullets for
    /// lesson plans, `---` separated slides for presentations.
    pub fn provider_prompt(&self) -> String {
        let mut out = String::new();
        match self.content_type {
            ContentType::Lesson => {
                out.push_str(
                    "Write an ESL lesson plan. Start with lines 'SUBJECT: ...', 'TOPIC: ...' \
                     and 'LEVEL: ...'. Use '## ' for section headings and '- ' for bullet points.\n",
                );
            }
            ContentType::Presentation => {
                out.push_str(
                    "Write classroom presentation slides. Separate slides with a line containing \
                     only '---'. The first line of each slide is its title; following lines are \
                     short bullet points.\n",
                );
            }
        }
        if self.include_images {
            out.push_str(
                "For each section or slide add one line 'IMAGE: <short description>' suggesting \
                 a supporting picture.\n",
            );
        }
        out.push_str("\nRequest: ");
        out.push_str(self.prompt.trim());
        out
    }
}
