//! Front-matter extraction: a YAML block fenced by `---` lines or a TOML block
//! fenced by `+++` lines at the very start of a document.

use serde_json::{Map, Value};

use crate::error::{ErrorDetail, Result};

pub type Fields = Map<String, Value>;

/// A front-matter data format.
pub trait Format {
    /// The line that opens and closes a block in this format.
    const FENCE: &'static str;

    /// The data format's error type.
    type Error: ErrorDetail + 'static;

    /// Parses the text between the fences into a field map.
    fn parse(source: &str) -> Result<Fields, Self::Error>;
}

pub struct Yaml;

pub struct Toml;

impl Format for Yaml {
    const FENCE: &'static str = "---";

    type Error = serde_yaml_ng::Error;

    fn parse(source: &str) -> Result<Fields, Self::Error> {
        if source.trim().is_empty() {
            return Ok(Fields::new());
        }

        match serde_yaml_ng::from_str::<Value>(source)? {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Fields::new()),
            other => Err(serde::de::Error::custom(format!(
                "front-matter must be a mapping, found {}", kind(&other)
            ))),
        }
    }
}

impl Format for Toml {
    const FENCE: &'static str = "+++";

    type Error = toml::de::Error;

    fn parse(source: &str) -> Result<Fields, Self::Error> {
        let table: toml::Table = toml::from_str(source)?;
        Ok(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect())
    }
}

/// A document split into its front-matter and markdown body.
#[derive(Debug, Clone, PartialEq)]
pub struct Split<'a> {
    pub fields: Fields,
    pub body: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitError {
    /// An opening fence without a closing one.
    Unclosed(&'static str),
    /// The block did not parse in its format.
    Invalid(String),
}

impl std::fmt::Display for SplitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SplitError::Unclosed(fence) => write!(f, "front-matter opened with `{fence}` is never closed"),
            SplitError::Invalid(msg) => write!(f, "invalid front-matter: {msg}"),
        }
    }
}

/// Splits `input` into front-matter fields and body. A document with no
/// opening fence has no fields and is all body.
pub fn split(input: &str) -> Result<Split<'_>, SplitError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    match first_line(input) {
        Yaml::FENCE => split_with::<Yaml>(input),
        Toml::FENCE => split_with::<Toml>(input),
        _ => Ok(Split { fields: Fields::new(), body: input }),
    }
}

fn split_with<F: Format>(input: &str) -> Result<Split<'_>, SplitError> {
    let mut start = match memchr::memchr(b'\n', input.as_bytes()) {
        Some(i) => i + 1,
        None => return Err(SplitError::Unclosed(F::FENCE)),
    };

    let block_start = start;
    while start <= input.len() {
        let end = memchr::memchr(b'\n', &input.as_bytes()[start..])
            .map_or(input.len(), |i| start + i);

        if input[start..end].trim_end() == F::FENCE {
            let fields = F::parse(&input[block_start..start])
                .map_err(|e| SplitError::Invalid(e.to_string()))?;

            let body = input.get(end + 1..).unwrap_or("");
            return Ok(Split { fields, body });
        }

        start = end + 1;
    }

    Err(SplitError::Unclosed(F::FENCE))
}

fn first_line(input: &str) -> &str {
    let line = match memchr::memchr(b'\n', input.as_bytes()) {
        Some(i) => &input[..i],
        None => input,
    };

    line.trim_end()
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(array) => array.into_iter().map(toml_to_json).collect(),
        toml::Value::Table(table) => Value::Object(table.into_iter()
            .map(|(k, v)| (k, toml_to_json(v)))
            .collect()),
    }
}

pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_front_matter() {
        let doc = "---\ntitle: Hello\ntags: [a, b]\npublished: true\n---\n# Body\n";
        let split = split(doc).unwrap();
        assert_eq!(split.fields["title"], "Hello");
        assert_eq!(split.fields["tags"], serde_json::json!(["a", "b"]));
        assert_eq!(split.fields["published"], true);
        assert_eq!(split.body, "# Body\n");
    }

    #[test]
    fn toml_front_matter_with_datetime() {
        let doc = "+++\ntitle = \"Hello\"\ndate = 2024-01-05\n+++\nBody";
        let split = split(doc).unwrap();
        assert_eq!(split.fields["title"], "Hello");
        assert_eq!(split.fields["date"], "2024-01-05");
        assert_eq!(split.body, "Body");
    }

    #[test]
    fn no_front_matter() {
        let split = split("Just text.\n---\nmore").unwrap();
        assert!(split.fields.is_empty());
        assert_eq!(split.body, "Just text.\n---\nmore");
    }

    #[test]
    fn empty_block_and_crlf() {
        let split = split("---\r\n---\r\nBody").unwrap();
        assert!(split.fields.is_empty());
        assert_eq!(split.body, "Body");
    }

    #[test]
    fn unclosed_and_invalid() {
        assert_eq!(split("---\ntitle: x\n"), Err(SplitError::Unclosed("---")));
        assert!(matches!(split("---\n- a\n- b\n---\n"), Err(SplitError::Invalid(_))));
        assert!(matches!(split("+++\ntitle = \n+++\n"), Err(SplitError::Invalid(_))));
    }
}
