//! Content extraction shared by the live path and the genesis import.
//!
//! Both pipelines must produce identical entity shapes, so title/body
//! normalization, preview derivation and metadata parsing live here.

use serde_json::{json, Value};
use tracing::debug;

use lt_01_content_store::documents::{ContentBody, ContentSection};

/// Build the stored content section of a post or comment.
pub fn extract_content(
    title: &str,
    body: &str,
    json_metadata: &str,
    preview_length: usize,
) -> ContentSection {
    let full = normalize_text(body);
    let preview = preview_of(&full, preview_length);
    ContentSection {
        title: normalize_text(title),
        body: ContentBody { preview, full },
        metadata: parse_metadata(json_metadata),
    }
}

/// Strip control characters (newlines survive) and trim.
pub fn normalize_text(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !ch.is_control() || *ch == '\n')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Char-boundary-safe preview truncation.
pub fn preview_of(full: &str, limit: usize) -> String {
    if full.chars().count() <= limit {
        return full.to_string();
    }
    full.chars().take(limit).collect()
}

/// Embedded metadata is client-supplied; anything but a JSON object is
/// projected as empty.
pub fn parse_metadata(raw: &str) -> Value {
    if raw.is_empty() {
        return json!({});
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) | Err(_) => {
            debug!("invalid content metadata, projecting empty");
            json!({})
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metadata_accepts_objects_only() {
        assert_eq!(parse_metadata(""), json!({}));
        assert_eq!(parse_metadata("not json"), json!({}));
        assert_eq!(parse_metadata("[1,2]"), json!({}));
        assert_eq!(parse_metadata("null"), json!({}));
        assert_eq!(
            parse_metadata(r#"{"app":"lattice"}"#),
            json!({"app": "lattice"})
        );
    }

    #[test]
    fn test_normalize_text_strips_controls() {
        assert_eq!(normalize_text("  a\u{0000}b\tc\n d "), "abc\n d");
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview_of("абвгд", 3), "абв");
        assert_eq!(preview_of("short", 10), "short");
    }

    #[test]
    fn test_extract_content_shapes() {
        let content = extract_content("Title", "Body text", r#"{"app":"x"}"#, 4);
        assert_eq!(content.title, "Title");
        assert_eq!(content.body.preview, "Body");
        assert_eq!(content.body.full, "Body text");
        assert_eq!(content.metadata, json!({"app": "x"}));
    }
}
