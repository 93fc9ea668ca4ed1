//! Parser for the markdown-ish text that content providers return
//!
//! Providers are asked for `##` headings, `-` bullets and `---` slide
//! separators, but their output is not guaranteed to follow the request, so
//! the parser is lenient: anything it does not recognise becomes a paragraph.

use serde::Serialize;

/// Metadata keys lifted out of a lesson plan into its header block
pub const METADATA_KEYS: [&str; 3] = ["SUBJECT", "TOPIC", "LEVEL"];

/// One block of a lesson plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Block {
    /// Section heading (`#`, `##`, `###` ...)
    Heading(String),
    /// Bullet point (`-`, `*` or `•`)
    Bullet(String),
    /// Plain paragraph line
    Paragraph(String),
    /// Suggested picture (`IMAGE: ...`)
    Image(String),
}

/// A parsed lesson plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LessonDocument {
    /// `SUBJECT` / `TOPIC` / `LEVEL` lines in the order they appeared
    pub metadata: Vec<(String, String)>,
    /// Content blocks
    pub blocks: Vec<Block>,
}

/// A parsed slide
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Slide {
    /// First non-empty line of the slide
    pub title: String,
    /// Remaining lines with bullet markers removed
    pub bullets: Vec<String>,
    /// Suggested picture, if the slide had an `IMAGE:` line
    pub image: Option<String>,
}

/// Remove inline emphasis and heading markers
///
/// # Examples
///
/// ```
/// use lesson_forge::documents::markdown::strip_inline;
///
/// assert_eq!(strip_inline("## **Warm-up** __game__"), "Warm-up game");
/// ```
pub fn strip_inline(line: &str) -> String {
    line.replace("**", "")
        .replace("__", "")
        .replace('#', "")
        .replace('`', "")
        .trim()
        .to_string()
}

fn bullet_text(line: &str) -> Option<&str> {
    ["- ", "* ", "• "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
        .or_else(|| {
            // "-item" without a space, but not a "---" rule
            let dash = line.starts_with('-') && !is_separator(line);
            let star = line.starts_with('*') && !line.starts_with("**");
            if dash || star {
                line.get(1..)
            } else {
                None
            }
        })
        .map(str::trim)
}

fn image_text(line: &str) -> Option<String> {
    let (key, rest) = line.split_once(':')?;
    if strip_inline(key).eq_ignore_ascii_case("IMAGE") {
        Some(strip_inline(rest))
    } else {
        None
    }
}

fn metadata_entry(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;
    let key = strip_inline(key).to_ascii_uppercase();
    if METADATA_KEYS.contains(&key.as_str()) {
        Some((key, strip_inline(value)))
    } else {
        None
    }
}

/// Whether a line is a slide separator (three or more dashes)
pub fn is_separator(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 3 && line.chars().all(|c| c == '-')
}

/// Parse lesson plan text into metadata and blocks
///
/// # Examples
///
/// ```
/// use lesson_forge::documents::markdown::{parse_lesson, Block};
///
/// let doc = parse_lesson("SUBJECT: English\n## Warm-up\n- Greet the class\nDiscuss weekends.");
/// assert_eq!(doc.metadata, vec![("SUBJECT".to_string(), "English".to_string())]);
/// assert_eq!(doc.blocks[0], Block::Heading("Warm-up".to_string()));
/// assert_eq!(doc.blocks[1], Block::Bullet("Greet the class".to_string()));
/// ```
pub fn parse_lesson(text: &str) -> LessonDocument {
    let mut doc = LessonDocument::default();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || is_separator(line) {
            continue;
        }

        if let Some(image) = image_text(line) {
            doc.blocks.push(Block::Image(image));
        } else if let Some(entry) = metadata_entry(line) {
            doc.metadata.push(entry);
        } else if line.starts_with('#') {
            let heading = strip_inline(line);
            if !heading.is_empty() {
                doc.blocks.push(Block::Heading(heading));
            }
        } else if let Some(bullet) = bullet_text(line) {
            let bullet = strip_inline(bullet);
            if !bullet.is_empty() {
                doc.blocks.push(Block::Bullet(bullet));
            }
        } else {
            doc.blocks.push(Block::Paragraph(strip_inline(line)));
        }
    }

    doc
}

/// Split presentation text into slides
///
/// Slides are separated by lines of dashes. Empty sections are dropped.
///
/// # Examples
///
/// ```
/// use lesson_forge::documents::markdown::parse_slides;
///
/// let slides = parse_slides("# Weather\n- sunny\n- rainy\n---\nQuiz\n");
/// assert_eq!(slides.len(), 2);
/// assert_eq!(slides[0].title, "Weather");
/// assert_eq!(slides[0].bullets, vec!["sunny", "rainy"]);
/// assert_eq!(slides[1].title, "Quiz");
/// ```
pub fn parse_slides(text: &str) -> Vec<Slide> {
    let mut slides = Vec::new();
    let mut current: Option<Slide> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if is_separator(line) {
            slides.extend(current.take());
            continue;
        }
        if line.is_empty() {
            continue;
        }

        let slide = current.get_or_insert_with(Slide::default);
        if let Some(image) = image_text(line) {
            slide.image = Some(image);
            continue;
        }

        let content = bullet_text(line).unwrap_or(line);
        let content = strip_inline(content);
        if content.is_empty() {
            continue;
        }
        if slide.title.is_empty() {
            slide.title = content;
        } else {
            slide.bullets.push(content);
        }
    }
    slides.extend(current);

    slides
        .into_iter()
        .filter(|s| !s.title.is_empty() || s.image.is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lesson_metadata_any_case() {
        let doc = parse_lesson("subject: English\nTopic: **Food**\nLEVEL: A2\n");
        assert_eq!(
            doc.metadata,
            vec![
                ("SUBJECT".to_string(), "English".to_string()),
                ("TOPIC".to_string(), "Food".to_string()),
                ("LEVEL".to_string(), "A2".to_string()),
            ]
        );
        assert!(doc.blocks.is_empty());
    }

    #[test]
    fn test_parse_lesson_block_kinds() {
        let text = "# Lesson\n\n## Activities\n* Pair work\n-Role play\n• Wrap-up\nIMAGE: a market stall\nPlain text.";
        let doc = parse_lesson(text);
        assert_eq!(
            doc.blocks,
            vec![
                Block::Heading("Lesson".to_string()),
                Block::Heading("Activities".to_string()),
                Block::Bullet("Pair work".to_string()),
                Block::Bullet("Role play".to_string()),
                Block::Bullet("Wrap-up".to_string()),
                Block::Image("a market stall".to_string()),
                Block::Paragraph("Plain text.".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_lesson_skips_rules() {
        let doc = parse_lesson("Intro\n---\nOutro");
        assert_eq!(doc.blocks.len(), 2);
    }

    #[test]
    fn test_bold_line_is_paragraph_not_bullet() {
        let doc = parse_lesson("**Objective** learners can order food");
        assert_eq!(
            doc.blocks,
            vec![Block::Paragraph(
                "Objective learners can order food".to_string()
            )]
        );
    }

    #[test]
    fn test_parse_slides_strips_markdown() {
        let slides = parse_slides("## **Greetings**\n* __Hello__\n* Good morning");
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].title, "Greetings");
        assert_eq!(slides[0].bullets, vec!["Hello", "Good morning"]);
    }

    #[test]
    fn test_parse_slides_drops_empty_sections() {
        let slides = parse_slides("---\n\n---\nOnly slide\n---\n   \n");
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].title, "Only slide");
    }

    #[test]
    fn test_parse_slides_image_line() {
        let slides = parse_slides("Animals\nIMAGE: a cat on a mat\n- cat");
        assert_eq!(slides[0].image.as_deref(), Some("a cat on a mat"));
        assert_eq!(slides[0].bullets, vec!["cat"]);
    }

    #[test]
    fn test_mock_output_parses_as_one_slide() {
        let slides = parse_slides("# Mock Content\nGenerated for: weather");
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].title, "Mock Content");
        assert_eq!(slides[0].bullets, vec!["Generated for: weather"]);
    }

    #[test]
    fn test_is_separator() {
        assert!(is_separator("---"));
        assert!(is_separator(" ----- "));
        assert!(!is_separator("--"));
        assert!(!is_separator("- item"));
    }
}
