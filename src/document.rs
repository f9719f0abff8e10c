// document.rs - Schema-less document: an _id plus an ordered list of text fields

use crate::scan;
use crate::DatabaseError;

/// A single stored record. The `_id` is kept apart from the field list and is
/// never duplicated into it; non-id fields preserve their insertion order.
/// All values are text.
///
/// Serialization does not escape anything, so field names and values
/// containing `"`, `\`, `{`, `}` or `,` are unsupported input: they will not
/// survive a round trip through [`Document::serialize`] /
/// [`Document::deserialize`].
#[derive(Debug, PartialEq)]
pub struct Document {
    id: String,
    fields: Vec<(String, String)>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Adds a field, or overwrites the value in place when the key already
    /// exists (keeping its position).
    pub fn add_field(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(field) = self.fields.iter_mut().find(|(k, _)| k == key) {
            field.1 = value;
        } else {
            self.fields.push((key.to_string(), value));
        }
    }

    /// Linear scan over the field list.
    pub fn get_field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Renders the document as one JSON line: `_id` first, then every non-id
    /// field in insertion order. Values are emitted verbatim, unescaped.
    pub fn serialize(&self) -> String {
        let mut json = String::with_capacity(16 + self.id.len() + self.fields.len() * 16);
        json.push_str("{\"_id\":\"");
        json.push_str(&self.id);
        json.push('"');
        for (key, value) in &self.fields {
            if key == "_id" {
                continue;
            }
            json.push_str(",\"");
            json.push_str(key);
            json.push_str("\":\"");
            json.push_str(value);
            json.push('"');
        }
        json.push('}');
        json
    }

    /// Parses one JSON-object line.
    ///
    /// A value is either a double-quoted string whose content is taken
    /// verbatim up to the next `"` (no escape processing), or a bare literal
    /// taken up to the next `,`/`}` and trimmed. The first `_id` with a
    /// non-empty value wins; further `_id` occurrences are discarded and
    /// never enter the field list. A document without an `_id` is an error.
    pub fn deserialize(json_line: &str) -> Result<Document, DatabaseError> {
        let s = scan::trim(json_line);
        if s.len() < 2 || !s.starts_with('{') || !s.ends_with('}') {
            return Err(parse_error("not a JSON object", s));
        }

        let bytes = s.as_bytes();
        let end = s.len() - 1; // index of the closing '}'
        let mut doc = Document::new("");
        let mut i = 1usize;

        while i < end {
            // separators between pairs
            while i < end && matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r' | b',') {
                i += 1;
            }
            if i >= end {
                break;
            }

            if bytes[i] != b'"' {
                return Err(parse_error("expected '\"' before key", s));
            }
            let key_start = i + 1;
            let key_end = scan::find_from(bytes, key_start, b'"')
                .ok_or_else(|| parse_error("unterminated key string", s))?;
            let key = &s[key_start..key_end];
            i = key_end + 1;

            while i < end && matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r') {
                i += 1;
            }
            if i >= end || bytes[i] != b':' {
                return Err(parse_error("expected ':' after key", s));
            }
            i += 1;

            while i < end && matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r') {
                i += 1;
            }
            if i >= end {
                return Err(parse_error("missing value for key", s));
            }

            let value: String;
            if bytes[i] == b'"' {
                let value_start = i + 1;
                let value_end = scan::find_from(bytes, value_start, b'"')
                    .ok_or_else(|| parse_error("unterminated string value", s))?;
                value = s[value_start..value_end].to_string();
                i = value_end + 1;
            } else {
                let value_start = i;
                let value_end = bytes[value_start..]
                    .iter()
                    .position(|&b| b == b',' || b == b'}')
                    .map(|offset| value_start + offset)
                    .ok_or_else(|| parse_error("invalid value", s))?;
                value = scan::trim(&s[value_start..value_end]).to_string();
                i = value_end;
            }

            if key == "_id" {
                if doc.id.is_empty() {
                    doc.id = value;
                }
            } else {
                doc.add_field(key, value);
            }
        }

        if doc.id.is_empty() {
            return Err(parse_error("document has no _id", s));
        }
        Ok(doc)
    }
}

fn parse_error(reason: &str, line: &str) -> DatabaseError {
    DatabaseError::DocumentParse {
        message: format!("{} in: {}", reason, line),
    }
}
