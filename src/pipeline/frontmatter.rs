//! Frontmatter handling: split the YAML header, merge metadata, re-serialize.
//!
//! A malformed header never fails a document. The delimiters are stripped and
//! an empty mapping takes the header's place — losing a broken frontmatter
//! block is strictly better than losing the whole file from the bundle.

use chrono::Utc;
use serde_yaml::{Mapping, Value};
use std::path::Path;
use tracing::warn;

/// The frontmatter fence marker.
const DELIMITER: &str = "---";

/// Split a document into its parsed frontmatter and remaining body.
///
/// Returns an empty mapping when the document carries no frontmatter, the
/// closing delimiter is missing, or the YAML fails to parse (logged, not
/// fatal).
pub fn split<'a>(content: &'a str, source: &Path) -> (Mapping, &'a str) {
    if !content.starts_with(DELIMITER) {
        return (Mapping::new(), content);
    }

    let Some(end) = content[DELIMITER.len()..].find(DELIMITER) else {
        // Opening fence with no close: treat the whole text as body.
        return (Mapping::new(), content);
    };
    let end = end + DELIMITER.len();

    let header = content[DELIMITER.len()..end].trim();
    let body = content[end + DELIMITER.len()..].trim_start();

    match serde_yaml::from_str::<Value>(header) {
        Ok(Value::Mapping(map)) => (map, body),
        Ok(Value::Null) => (Mapping::new(), body),
        Ok(_) => {
            warn!("Frontmatter in {} is not a mapping; ignoring it", source.display());
            (Mapping::new(), body)
        }
        Err(e) => {
            warn!("Error parsing frontmatter in {}: {e}", source.display());
            (Mapping::new(), body)
        }
    }
}

/// Combine the pipeline defaults with the document's own frontmatter and the
/// computed fields.
///
/// Order matters: defaults first, frontmatter keys override them, and the
/// computed `word_count` / `has_images` land last (measured on the
/// pre-rewrite body, so they reflect the source document).
pub fn merge_metadata(source: &Path, frontmatter: Mapping, body: &str) -> Mapping {
    let mut merged = Mapping::new();
    merged.insert(
        Value::from("source_file"),
        Value::from(source.to_string_lossy().to_string()),
    );
    merged.insert(Value::from("type"), Value::from("documentation"));
    merged.insert(
        Value::from("last_processed"),
        Value::from(Utc::now().to_rfc3339()),
    );

    for (key, value) in frontmatter {
        merged.insert(key, value);
    }

    merged.insert(
        Value::from("word_count"),
        Value::from(body.split_whitespace().count() as u64),
    );
    merged.insert(Value::from("has_images"), Value::from(body.contains("![")));

    merged
}

/// Re-emit a document as a frontmatter block followed by its body.
pub fn render(metadata: &Mapping, body: &str) -> String {
    // Mapping-to-string cannot fail for the value types we insert; fall back
    // to an empty header rather than dropping the document.
    let yaml = serde_yaml::to_string(metadata).unwrap_or_default();
    format!("---\n{yaml}---\n\n{body}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn doc() -> PathBuf {
        PathBuf::from("docs/guide.md")
    }

    #[test]
    fn splits_valid_frontmatter() {
        let content = "---\ntitle: Guide\ntags: [a, b]\n---\n\n# Heading\n";
        let (fm, body) = split(content, &doc());
        assert_eq!(fm.get(Value::from("title")), Some(&Value::from("Guide")));
        assert_eq!(body, "# Heading\n");
    }

    #[test]
    fn no_frontmatter_yields_empty_mapping() {
        let content = "# Heading\nbody text";
        let (fm, body) = split(content, &doc());
        assert!(fm.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn unterminated_fence_is_all_body() {
        let content = "---\ntitle: Guide\nno closing fence";
        let (fm, body) = split(content, &doc());
        assert!(fm.is_empty());
        assert_eq!(body, content);
    }

    #[test]
    fn broken_yaml_degrades_to_empty_mapping() {
        let content = "---\ntitle: [unclosed\n---\n\nbody";
        let (fm, body) = split(content, &doc());
        assert!(fm.is_empty());
        assert_eq!(body, "body");
    }

    #[test]
    fn merge_defaults_then_overrides_then_computed() {
        let mut fm = Mapping::new();
        fm.insert(Value::from("type"), Value::from("tutorial"));
        fm.insert(Value::from("title"), Value::from("Guide"));

        let merged = merge_metadata(&doc(), fm, "one two three ![img](a.png)");

        // Frontmatter overrides the default type.
        assert_eq!(merged.get(Value::from("type")), Some(&Value::from("tutorial")));
        assert_eq!(merged.get(Value::from("title")), Some(&Value::from("Guide")));
        assert_eq!(merged.get(Value::from("word_count")), Some(&Value::from(4u64)));
        assert_eq!(merged.get(Value::from("has_images")), Some(&Value::from(true)));
        assert!(merged.get(Value::from("source_file")).is_some());
        assert!(merged.get(Value::from("last_processed")).is_some());
    }

    #[test]
    fn render_round_trips_through_split() {
        let mut meta = Mapping::new();
        meta.insert(Value::from("title"), Value::from("Guide"));
        let rendered = render(&meta, "body text");

        assert!(rendered.starts_with("---\n"));
        assert!(rendered.ends_with("body text"));
        let (fm, body) = split(&rendered, &doc());
        assert_eq!(fm.get(Value::from("title")), Some(&Value::from("Guide")));
        assert_eq!(body, "body text");
    }
}
