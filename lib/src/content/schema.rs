//! The content schema: which front-matter fields a document must carry and
//! how they are coerced.
//!
//! | field         | required | type            | default  |
//! |---------------|----------|-----------------|----------|
//! | `title`       | yes      | non-empty string|          |
//! | `date`        | yes      | date string     |          |
//! | `description` | no       | string          | none     |
//! | `published`   | no       | boolean         | `false`  |
//! | `tags`        | no       | list of strings | empty    |
//!
//! A `null` value is treated as absent. Other keys are ignored.

use serde_json::Value;

use crate::content::frontmatter::{kind, Fields};
use crate::content::Date;
use crate::error::ContentError;

pub const KNOWN_FIELDS: &[&str] = &["title", "date", "description", "published", "tags"];

/// A raw authored document: parsed front-matter, body text and its path.
#[derive(Debug, Clone)]
pub struct Document<'a> {
    pub path: &'a str,
    pub fields: &'a Fields,
    pub body: &'a str,
}

/// A document that passed validation, with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<'a> {
    pub title: String,
    pub description: Option<String>,
    pub date: Date,
    pub published: bool,
    pub tags: Vec<String>,
    pub body: &'a str,
}

pub fn validate<'a>(doc: &Document<'a>) -> Result<Validated<'a>, ContentError> {
    let fail = |field: &str, reason: String| ContentError::SchemaValidation {
        path: doc.path.to_string(),
        field: field.to_string(),
        reason,
    };

    for key in doc.fields.keys().filter(|k| !KNOWN_FIELDS.contains(&k.as_str())) {
        log::warn!("{}: ignoring unknown front-matter field `{key}`", doc.path);
    }

    let title = match field(doc.fields, "title") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) => return Err(fail("title", "must not be empty".into())),
        Some(other) => return Err(fail("title", expected("string", other))),
        None => return Err(fail("title", "missing required field".into())),
    };

    let date = match field(doc.fields, "date") {
        Some(Value::String(s)) => Date::parse(s)
            .ok_or_else(|| fail("date", format!("`{s}` is not a valid calendar date")))?,
        Some(other) => return Err(fail("date", expected("date string", other))),
        None => return Err(fail("date", "missing required field".into())),
    };

    let description = match field(doc.fields, "description") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => return Err(fail("description", expected("string", other))),
        None => None,
    };

    let published = match field(doc.fields, "published") {
        Some(Value::Bool(b)) => *b,
        Some(other) => return Err(fail("published", expected("boolean", other))),
        None => false,
    };

    let tags = match field(doc.fields, "tags") {
        Some(Value::Array(values)) => values.iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                other => Err(fail("tags", expected("list of strings", other))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => return Err(fail("tags", expected("list of strings", other))),
        None => vec![],
    };

    Ok(Validated { title, description, date, published, tags, body: doc.body })
}

fn field<'f>(fields: &'f Fields, name: &str) -> Option<&'f Value> {
    fields.get(name).filter(|v| !v.is_null())
}

fn expected(what: &str, found: &Value) -> String {
    format!("expected {what}, found {}", kind(found))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn check(value: Value) -> Result<Validated<'static>, ContentError> {
        let fields = Box::leak(Box::new(fields(value)));
        validate(&Document { path: "posts/doc.md", fields, body: "body" })
    }

    fn failing_field(value: Value) -> String {
        match check(value) {
            Err(ContentError::SchemaValidation { field, path, .. }) => {
                assert_eq!(path, "posts/doc.md");
                field
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn declared_fields_round_trip() {
        let valid = check(json!({
            "title": "Hello",
            "description": "A first post",
            "date": "2024-01-05",
            "published": true,
            "tags": ["Rust", "rust", "Web Dev"],
        })).unwrap();

        assert_eq!(valid.title, "Hello");
        assert_eq!(valid.description.as_deref(), Some("A first post"));
        assert_eq!(valid.date.as_str(), "2024-01-05");
        assert!(valid.published);
        assert_eq!(valid.tags, ["Rust", "rust", "Web Dev"]);
        assert_eq!(valid.body, "body");
    }

    #[test]
    fn optional_fields_default() {
        let valid = check(json!({ "title": "T", "date": "2024-01-05" })).unwrap();
        assert_eq!(valid.description, None);
        assert!(!valid.published);
        assert!(valid.tags.is_empty());

        let nulls = check(json!({
            "title": "T", "date": "2024-01-05",
            "description": null, "published": null, "tags": null,
        })).unwrap();

        assert_eq!(nulls, valid);
    }

    #[test]
    fn required_fields() {
        assert_eq!(failing_field(json!({ "title": "T" })), "date");
        assert_eq!(failing_field(json!({ "date": "2024-01-05" })), "title");
        assert_eq!(failing_field(json!({ "title": "  ", "date": "2024-01-05" })), "title");
        assert_eq!(failing_field(json!({ "title": 3, "date": "2024-01-05" })), "title");
        assert_eq!(failing_field(json!({ "title": "T", "date": "2024-13-01" })), "date");
        assert_eq!(failing_field(json!({ "title": "T", "date": 20240105 })), "date");
    }

    #[test]
    fn optional_field_types() {
        let base = |key: &str, value: Value| {
            let mut map = fields(json!({ "title": "T", "date": "2024-01-05" }));
            map.insert(key.into(), value);
            Value::Object(map)
        };

        assert_eq!(failing_field(base("published", json!("yes"))), "published");
        assert_eq!(failing_field(base("tags", json!("rust"))), "tags");
        assert_eq!(failing_field(base("tags", json!(["rust", 1]))), "tags");
        assert_eq!(failing_field(base("description", json!(["x"]))), "description");
        assert!(check(base("layout", json!("wide"))).is_ok());
    }
}
