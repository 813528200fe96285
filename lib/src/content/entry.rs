use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::markdown::{Node, ReadingMetadata, TocEntry};

/// One built document. Immutable once built: a rebuild replaces the whole
/// collection rather than patching entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEntry {
    /// Full public path, e.g. `/blog/2024/my-post`. Unique in a collection.
    pub slug: String,
    /// `slug` without the collection's route root, e.g. `2024/my-post`.
    pub slug_as_params: String,
    /// Source path relative to the content root, `/`-separated.
    pub path: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: Date,
    pub published: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// The compiled body. Only the render executor interprets it.
    pub body: Vec<Node>,
    #[serde(default)]
    pub toc: Vec<TocEntry>,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub metadata: ReadingMetadata,
}

/// A publication date: the string as authored plus the instant it denotes.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS` (optionally with fractional
/// seconds) and RFC 3339 timestamps with an offset, which are normalized to
/// UTC for ordering. Serializes as the authored string.
#[derive(Clone)]
pub struct Date {
    raw: String,
    instant: NaiveDateTime,
}

impl Date {
    pub fn parse(raw: &str) -> Option<Date> {
        let value = raw.trim();
        let instant = DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.naive_utc())
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0)
            })?;

        Some(Date { raw: raw.to_string(), instant })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn instant(&self) -> NaiveDateTime {
        self.instant
    }

    /// Human-readable form used in listings, e.g. `January 5, 2024`.
    pub fn display(&self) -> String {
        self.instant.format("%B %-d, %Y").to_string()
    }
}

impl PartialEq for Date {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant && self.raw == other.raw
    }
}

impl Eq for Date { }

impl PartialOrd for Date {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Date {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant.cmp(&other.instant).then_with(|| self.raw.cmp(&other.raw))
    }
}

impl fmt::Debug for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Date({:?})", self.raw)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.raw.fmt(f)
    }
}

impl Serialize for Date {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Date::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("`{raw}` is not a valid calendar date"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_forms() {
        let day = Date::parse("2024-03-01").unwrap();
        let time = Date::parse("2024-03-01T00:00:00").unwrap();
        let offset = Date::parse("2024-03-01T02:00:00+02:00").unwrap();

        assert_eq!(day.instant(), time.instant());
        assert_eq!(day.instant(), offset.instant());
        assert_eq!(day.as_str(), "2024-03-01");
        assert_eq!(day.display(), "March 1, 2024");
        assert_ne!(day, time);
    }

    #[test]
    fn invalid_dates() {
        assert!(Date::parse("2024-02-30").is_none());
        assert!(Date::parse("yesterday").is_none());
        assert!(Date::parse("").is_none());
    }

    #[test]
    fn serializes_as_authored_string() {
        let date = Date::parse("2023-12-24").unwrap();
        assert_eq!(serde_json::to_string(&date).unwrap(), "\"2023-12-24\"");

        let back: Date = serde_json::from_str("\"2023-12-24\"").unwrap();
        assert_eq!(back, date);
        assert!(serde_json::from_str::<Date>("\"not a date\"").is_err());
    }
}
