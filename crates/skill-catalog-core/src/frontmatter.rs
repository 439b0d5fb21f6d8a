//! YAML front matter extraction.
//!
//! Skill documents may start with a `---` delimited YAML block. The block is
//! parsed into a loosely typed map of JSON values; callers then pull out the
//! fields they understand with typed accessors and fall back when a field is
//! missing or has the wrong shape.

use serde_json::Value;
use std::collections::BTreeMap;

/// Parsed front matter fields. Empty when the document has none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    fields: BTreeMap<String, Value>,
}

impl FrontMatter {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// A field that holds a YAML string. Other shapes are treated as absent.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// A field that holds a YAML sequence, with every item rendered as text.
    pub fn list_field(&self, key: &str) -> Option<Vec<String>> {
        let items = self.fields.get(key)?.as_array()?;
        Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        )
    }
}

/// Split a document into its front matter and body.
///
/// The first line must be `---` (a leading BOM is ignored) and the block
/// ends at the next `---` or `...` line. Without a closing delimiter the
/// whole input is body. A block that is not a YAML mapping yields empty
/// front matter but is still removed from the body.
pub fn split_front_matter(input: &str) -> (FrontMatter, &str) {
    let text = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut lines = text.split_inclusive('\n');

    let first = match lines.next() {
        Some(line) => line,
        None => return (FrontMatter::default(), input),
    };
    if first.trim_end() != "---" {
        return (FrontMatter::default(), input);
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            let yaml = &text[yaml_start..offset];
            let body = &text[offset + line.len()..];
            return (parse_yaml(yaml), body);
        }
        offset += line.len();
    }

    (FrontMatter::default(), input)
}

fn parse_yaml(yaml: &str) -> FrontMatter {
    if yaml.trim().is_empty() {
        return FrontMatter::default();
    }

    let yaml_value: serde_yaml::Value = match serde_yaml::from_str(yaml) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!("ignoring malformed front matter: {}", e);
            return FrontMatter::default();
        }
    };

    match serde_json::to_value(yaml_value) {
        Ok(Value::Object(map)) => FrontMatter {
            fields: map.into_iter().collect(),
        },
        _ => FrontMatter::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_front_matter() {
        let input = "---\ntitle: PDF Tools\ncategory: documents\n---\n# Heading\nBody";
        let (fm, body) = split_front_matter(input);
        assert_eq!(fm.str_field("title"), Some("PDF Tools"));
        assert_eq!(fm.str_field("category"), Some("documents"));
        assert_eq!(body, "# Heading\nBody");
    }

    #[test]
    fn test_list_field_stringifies_items() {
        let input = "---\ntags:\n  - Rust\n  - 42\n  - true\n---\nbody";
        let (fm, _) = split_front_matter(input);
        assert_eq!(
            fm.list_field("tags").unwrap(),
            vec!["Rust".to_string(), "42".to_string(), "true".to_string()]
        );
    }

    #[test]
    fn test_non_string_scalar_is_not_a_string_field() {
        let (fm, _) = split_front_matter("---\ntitle: 123\n---\nbody");
        assert!(fm.get("title").is_some());
        assert_eq!(fm.str_field("title"), None);
        assert_eq!(fm.list_field("title"), None);
    }

    #[test]
    fn test_no_front_matter() {
        let input = "# Just markdown\n\n---\nnot a block";
        let (fm, body) = split_front_matter(input);
        assert!(fm.is_empty());
        assert_eq!(body, input);
    }

    #[test]
    fn test_unterminated_block_is_body() {
        let input = "---\ntitle: Broken\nno closing line";
        let (fm, body) = split_front_matter(input);
        assert!(fm.is_empty());
        assert_eq!(body, input);
    }

    #[test]
    fn test_malformed_yaml_is_stripped_but_ignored() {
        let input = "---\ntitle: [unclosed\n---\nreal body";
        let (fm, body) = split_front_matter(input);
        assert!(fm.is_empty());
        assert_eq!(body, "real body");
    }

    #[test]
    fn test_bom_and_crlf() {
        let input = "\u{feff}---\r\nname: windows\r\n---\r\nbody\r\n";
        let (fm, body) = split_front_matter(input);
        assert_eq!(fm.str_field("name"), Some("windows"));
        assert_eq!(body, "body\r\n");
    }

    #[test]
    fn test_empty_block() {
        let (fm, body) = split_front_matter("---\n---\ncontent");
        assert!(fm.is_empty());
        assert_eq!(body, "content");
    }
}
