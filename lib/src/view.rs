//! Page-level view models built from the read model: what a listing page, a
//! tag page, or a list item needs to display, and nothing more.

use std::sync::Arc;

use serde::Serialize;

use crate::config::BuildSettings;
use crate::content::{Collection, ContentEntry};
use crate::query;
use crate::util::slugify_tag;

/// One entry as shown in a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub slug: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The authored date.
    pub date: String,
    /// The date for humans, e.g. `January 5, 2024`.
    pub display_date: String,
    pub tags: Vec<String>,
    pub reading_time: usize,
}

impl Summary {
    pub fn new(entry: &ContentEntry, description_limit: usize) -> Self {
        Summary {
            slug: entry.slug.clone(),
            title: entry.title.clone(),
            description: entry.description.as_deref().map(|d| truncate(d, description_limit)),
            date: entry.date.as_str().to_string(),
            display_date: entry.date.display(),
            tags: entry.tags.clone(),
            reading_time: entry.metadata.reading_time,
        }
    }
}

/// The first `limit` characters of `text` followed by `...`, or all of `text`
/// if it is no longer than `limit`.
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// A tag and how many entries carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
    /// Whether this is the tag of the page being shown.
    pub current: bool,
}

/// Tags of `entries`, most used first, with the tag whose slug is `current`
/// marked.
fn tag_cloud(entries: &[Arc<ContentEntry>], current: Option<&str>) -> Vec<TagCount> {
    let index = query::aggregate_tag_counts(entries);
    query::sort_tags_by_count_descending(&index)
        .into_iter()
        .map(|(tag, count)| TagCount {
            current: current.is_some_and(|slug| slugify_tag(tag) == slug),
            tag: tag.to_string(),
            count,
        })
        .collect()
}

/// A page of a collection's published entries, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub collection: String,
    pub route: String,
    pub page: usize,
    pub total_pages: usize,
    pub prev: Option<usize>,
    pub next: Option<usize>,
    pub entries: Vec<Summary>,
    /// Every tag of the collection's published entries, most used first.
    pub tags: Vec<TagCount>,
}

impl Listing {
    pub fn new(collection: &Collection, page: usize, settings: &BuildSettings) -> Self {
        let mut entries = query::published(&collection.entries);
        query::sort_by_date_descending(&mut entries);

        let total_pages = query::total_pages(entries.len(), settings.per_page);
        let tags = tag_cloud(&entries, None);
        Listing {
            collection: collection.name.clone(),
            route: collection.route.clone(),
            page,
            total_pages,
            prev: (page > 1 && page <= total_pages + 1).then(|| page - 1),
            next: (page < total_pages).then(|| page + 1),
            entries: summaries(query::paginate(&entries, settings.per_page, page), settings),
            tags,
        }
    }
}

/// The published entries carrying a tag, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagPage {
    pub slug: String,
    pub title: String,
    pub entries: Vec<Summary>,
    /// Every tag of the published entries, most used first, with this
    /// page's tag marked current.
    pub tags: Vec<TagCount>,
}

impl TagPage {
    pub fn new(entries: &[Arc<ContentEntry>], tag_slug: &str, settings: &BuildSettings) -> Self {
        let published = query::published(entries);
        let mut tagged = query::filter_by_tag_slug(&published, tag_slug);
        query::sort_by_date_descending(&mut tagged);

        TagPage {
            slug: tag_slug.to_string(),
            title: tag_slug.replace('-', " "),
            entries: summaries(&tagged, settings),
            tags: tag_cloud(&published, Some(tag_slug)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn summaries(entries: &[Arc<ContentEntry>], settings: &BuildSettings) -> Vec<Summary> {
    entries.iter()
        .map(|e| Summary::new(e, settings.description_limit))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::query::tests::entry;

    use super::*;

    fn collection(entries: Vec<Arc<ContentEntry>>) -> Collection {
        Collection { name: "posts".into(), route: "/blog".into(), entries }
    }

    fn slugs(summaries: &[Summary]) -> Vec<&str> {
        summaries.iter().map(|s| s.slug.as_str()).collect()
    }

    #[test]
    fn listing_pages() {
        let mut entries: Vec<_> = (1..=12)
            .map(|i| entry(&format!("p{i:02}"), &format!("2024-01-{i:02}"), true, &["rust"]))
            .collect();

        entries.push(entry("draft", "2024-02-01", false, &["secret"]));
        let posts = collection(entries);
        let settings = BuildSettings::default();

        let first = Listing::new(&posts, 1, &settings);
        assert_eq!(first.total_pages, 3);
        assert_eq!(slugs(&first.entries), ["/blog/p12", "/blog/p11", "/blog/p10", "/blog/p09", "/blog/p08"]);
        assert_eq!((first.prev, first.next), (None, Some(2)));
        assert_eq!(first.tags, [TagCount { tag: "rust".into(), count: 12, current: false }]);

        let third = Listing::new(&posts, 3, &settings);
        assert_eq!(slugs(&third.entries), ["/blog/p02", "/blog/p01"]);
        assert_eq!((third.prev, third.next), (Some(2), None));

        let fourth = Listing::new(&posts, 4, &settings);
        assert!(fourth.entries.is_empty());
        assert_eq!(fourth.next, None);
    }

    #[test]
    fn tag_page() {
        let entries = vec![
            entry("old", "2023-01-01", true, &["Web Dev"]),
            entry("new", "2024-01-01", true, &["web dev", "rust"]),
            entry("hidden", "2024-06-01", false, &["Web Dev"]),
            entry("other", "2024-02-01", true, &["rust"]),
        ];

        let page = TagPage::new(&entries, "web-dev", &BuildSettings::default());
        assert_eq!(page.title, "web dev");
        assert_eq!(slugs(&page.entries), ["/blog/new", "/blog/old"]);

        let cloud: Vec<_> = page.tags.iter().map(|t| (t.tag.as_str(), t.count, t.current)).collect();
        assert_eq!(cloud, [("rust", 2, false), ("Web Dev", 1, true), ("web dev", 1, true)]);
        assert!(TagPage::new(&entries, "zig", &BuildSettings::default()).is_empty());
    }

    #[test]
    fn summaries_truncate_descriptions() {
        assert_eq!(truncate("short", 150), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("abc", 3), "abc");

        let mut post = (*entry("p", "2024-01-05", true, &[])).clone();
        post.description = Some("x".repeat(200));
        let summary = Summary::new(&post, 150);
        assert_eq!(summary.description.unwrap().len(), 153);
        assert_eq!(summary.display_date, "January 5, 2024");
    }
}
