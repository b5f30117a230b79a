//! Strict reader for the `---` delimited header of stored documents.

const DELIMITER: &str = "---";

/// Key/value pairs of a document header, in file order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    fields: Vec<(String, String)>,
}

impl FrontMatter {
    /// Parse the header at the very start of `content`.
    ///
    /// Returns `None` unless the first line is `---` and a closing `---`
    /// follows. Lines that are not `key: value` pairs are ignored, so a
    /// broken line never leaks into another field.
    pub fn parse(content: &str) -> Option<Self> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut lines = content.lines();

        if lines.next()?.trim_end() != DELIMITER {
            return None;
        }

        let mut fields = Vec::new();
        for line in lines {
            if line.trim_end() == DELIMITER {
                return Some(Self { fields });
            }
            if let Some(pair) = parse_field(line) {
                fields.push(pair);
            }
        }

        None
    }

    /// First value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn parse_field(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;
    let valid_key = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid_key {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

/// Source URL declared by a stored document, if it has a well-formed header.
pub fn source_url(content: &str) -> Option<String> {
    FrontMatter::parse(content)?
        .get("url")
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}
