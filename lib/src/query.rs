//! The read model: pure functions over a built collection.
//!
//! Every function takes entries as a slice of anything that borrows as a
//! [`ContentEntry`], usually the `Arc<ContentEntry>`s of a collection, and
//! never mutates the entries themselves. Selections return cloned handles.
//! None of them filter on `published` unless they say so; callers decide
//! which set to pass in.

use std::borrow::Borrow;

use rustc_hash::FxHashMap;

use crate::content::{slug, ContentEntry};
use crate::util::slugify_tag;

/// The published entries of `entries`, in their original order.
pub fn published<E: Borrow<ContentEntry> + Clone>(entries: &[E]) -> Vec<E> {
    entries.iter().filter(|e| is_published(*e)).cloned().collect()
}

fn is_published<E: Borrow<ContentEntry>>(entry: &E) -> bool {
    entry.borrow().published
}

/// Sorts newest first. The sort is stable: entries dated to the same instant
/// keep their relative order, however the date was written.
pub fn sort_by_date_descending<E: Borrow<ContentEntry>>(entries: &mut [E]) {
    entries.sort_by_key(|e| std::cmp::Reverse(e.borrow().date.instant()));
}

/// Tag occurrence counts, in order of first appearance.
///
/// A tag repeated within one entry's tags is counted once per occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagIndex {
    counts: Vec<(String, usize)>,
    positions: FxHashMap<String, usize>,
}

impl TagIndex {
    pub fn get(&self, tag: &str) -> Option<usize> {
        self.positions.get(tag).map(|&i| self.counts[i].1)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.counts.iter().map(|(tag, count)| (tag.as_str(), *count))
    }

    fn add(&mut self, tag: &str) {
        match self.positions.get(tag) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.positions.insert(tag.to_string(), self.counts.len());
                self.counts.push((tag.to_string(), 1));
            }
        }
    }
}

/// Counts tags across `entries`, whichever set that is.
pub fn aggregate_tag_counts<E: Borrow<ContentEntry>>(entries: &[E]) -> TagIndex {
    let mut index = TagIndex::default();
    for entry in entries {
        for tag in &entry.borrow().tags {
            index.add(tag);
        }
    }

    index
}

/// Tags by count, highest first; equal counts by tag name, case-sensitive
/// ascending.
pub fn sort_tags_by_count_descending(index: &TagIndex) -> Vec<(&str, usize)> {
    let mut tags: Vec<_> = index.iter().collect();
    tags.sort_by(|(a, m), (b, n)| n.cmp(m).then_with(|| a.cmp(b)));
    tags
}

/// Entries with at least one tag whose tag slug is `tag_slug`.
pub fn filter_by_tag_slug<E: Borrow<ContentEntry> + Clone>(entries: &[E], tag_slug: &str) -> Vec<E> {
    entries.iter()
        .filter(|e| has_tag_slug(*e, tag_slug))
        .cloned()
        .collect()
}

fn has_tag_slug<E: Borrow<ContentEntry>>(entry: &E, tag_slug: &str) -> bool {
    entry.borrow().tags.iter().any(|t| slugify_tag(t) == tag_slug)
}

/// The 1-based `page` of `items` in pages of `size`. Out-of-range pages,
/// including page 0, are empty.
pub fn paginate<T>(items: &[T], size: usize, page: usize) -> &[T] {
    let Some(start) = page.checked_sub(1).and_then(|p| p.checked_mul(size)) else {
        return &[];
    };

    let end = start.saturating_add(size).min(items.len());
    items.get(start..end).unwrap_or_default()
}

/// A page number from a route or query parameter. Anything that is not a
/// positive integer is page 1.
pub fn parse_page(param: Option<&str>) -> usize {
    param.and_then(|p| p.trim().parse::<usize>().ok())
        .filter(|&page| page > 0)
        .unwrap_or(1)
}

pub fn total_pages(len: usize, size: usize) -> usize {
    match size {
        0 => 0,
        size => len.div_ceil(size),
    }
}

/// The entry whose route parameters are `segments`, exactly. Unpublished
/// entries are never found.
pub fn find_by_slug<'e, E, S>(entries: &'e [E], segments: &[S]) -> Option<&'e E>
    where E: Borrow<ContentEntry>, S: AsRef<str>
{
    let params = segments.iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join("/");

    entries.iter()
        .find(|e| (*e).borrow().slug_as_params == params)
        .filter(|e| is_published(*e))
}

/// The `n` most recent published entries.
pub fn latest<E: Borrow<ContentEntry> + Clone>(entries: &[E], n: usize) -> Vec<E> {
    let mut entries = published(entries);
    sort_by_date_descending(&mut entries);
    entries.truncate(n);
    entries
}

/// The route segments of every published entry.
pub fn static_slug_params<E: Borrow<ContentEntry>>(entries: &[E]) -> Vec<Vec<&str>> {
    entries.iter()
        .filter(|e| is_published(*e))
        .map(|e| slug::segments(&e.borrow().slug_as_params))
        .collect()
}

/// The distinct tag slugs of `index`, sorted.
pub fn static_tag_slugs(index: &TagIndex) -> Vec<String> {
    let mut slugs: Vec<_> = index.iter().map(|(tag, _)| slugify_tag(tag)).collect();
    slugs.sort();
    slugs.dedup();
    slugs
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use crate::content::Date;
    use crate::markdown::ReadingMetadata;

    use super::*;

    pub fn entry(params: &str, date: &str, published: bool, tags: &[&str]) -> Arc<ContentEntry> {
        Arc::new(ContentEntry {
            slug: slug::join_route("/blog", params),
            slug_as_params: params.to_string(),
            path: format!("posts/{params}.md"),
            title: params.to_string(),
            description: None,
            date: Date::parse(date).unwrap(),
            published,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            body: vec![],
            toc: vec![],
            excerpt: String::new(),
            metadata: ReadingMetadata::default(),
        })
    }

    fn params<E: Borrow<ContentEntry>>(entries: &[E]) -> Vec<&str> {
        entries.iter().map(|e| e.borrow().slug_as_params.as_str()).collect()
    }

    #[test]
    fn date_sort_is_stable_and_idempotent() {
        let mut entries = vec![
            entry("a", "2024-01-01", true, &[]),
            entry("b", "2024-03-01", true, &[]),
            entry("c", "2024-01-01", true, &[]),
            entry("d", "2024-01-01T00:00:00+00:00", true, &[]),
            entry("e", "2023-12-31", true, &[]),
        ];

        sort_by_date_descending(&mut entries);
        assert_eq!(params(&entries), ["b", "a", "c", "d", "e"]);

        let once = entries.clone();
        sort_by_date_descending(&mut entries);
        assert_eq!(entries, once);
    }

    #[test]
    fn unpublished_entries_are_hidden() {
        let entries = vec![
            entry("draft", "2024-05-01", false, &["rust"]),
            entry("live", "2024-01-01", true, &["rust"]),
        ];

        let mut visible = published(&entries);
        sort_by_date_descending(&mut visible);
        assert_eq!(params(&visible), ["live"]);
        assert!(find_by_slug(&entries, &["draft"]).is_none());
        assert!(find_by_slug(&entries, &["live"]).is_some());
        assert!(find_by_slug(&entries, &["missing"]).is_none());
        assert_eq!(params(&latest(&entries, 5)), ["live"]);
    }

    #[test]
    fn find_by_nested_segments() {
        let entries = vec![entry("2024/post", "2024-05-01", true, &[])];
        assert!(find_by_slug(&entries, &["2024", "post"]).is_some());
        assert!(find_by_slug(&entries, &["2024"]).is_none());
        assert!(find_by_slug(&entries, &["2024/post", "x"]).is_none());
        assert_eq!(static_slug_params(&entries), vec![vec!["2024", "post"]]);
    }

    #[test]
    fn tag_counts_per_occurrence() {
        let entries = vec![
            entry("a", "2024-01-01", true, &["rust", "web", "rust"]),
            entry("b", "2024-01-02", true, &["Web", "zig"]),
            entry("c", "2024-01-03", true, &["web", "zig"]),
        ];

        let index = aggregate_tag_counts(&entries);
        assert_eq!(index.iter().collect::<Vec<_>>(), [("rust", 2), ("web", 2), ("Web", 1), ("zig", 2)]);
        assert_eq!(index.get("web"), Some(2));
        assert_eq!(index.get("nope"), None);

        let sorted = sort_tags_by_count_descending(&index);
        assert_eq!(sorted, [("rust", 2), ("web", 2), ("zig", 2), ("Web", 1)]);
        assert!(sorted.windows(2).all(|w| w[0].1 >= w[1].1));

        assert_eq!(static_tag_slugs(&index), ["rust", "web", "zig"]);
    }

    #[test]
    fn aggregation_counts_what_it_is_given() {
        let entries = vec![
            entry("a", "2024-01-01", false, &["rust"]),
            entry("b", "2024-01-02", true, &["rust"]),
        ];

        assert_eq!(aggregate_tag_counts(&entries).get("rust"), Some(2));
        assert_eq!(aggregate_tag_counts(&published(&entries)).get("rust"), Some(1));
    }

    #[test]
    fn filter_matches_tag_slugs() {
        let entries = vec![
            entry("a", "2024-01-01", true, &["Web Dev"]),
            entry("b", "2024-01-02", true, &["Next.js", "rust"]),
            entry("c", "2024-01-03", true, &[]),
        ];

        assert_eq!(params(&filter_by_tag_slug(&entries, &slugify_tag("Web Dev"))), ["a"]);
        assert_eq!(params(&filter_by_tag_slug(&entries, "nextjs")), ["b"]);
        assert!(filter_by_tag_slug(&entries, "Web Dev").is_empty());

        for tag in ["Web Dev", "Next.js", "rust"] {
            let filtered = filter_by_tag_slug(&entries, &slugify_tag(tag));
            let expected: Vec<_> = entries.iter()
                .filter(|e| e.tags.iter().any(|t| t == tag))
                .cloned()
                .collect();
            assert_eq!(filtered, expected);
        }
    }

    #[test]
    fn pagination() {
        let items: Vec<usize> = (0..12).collect();
        assert_eq!(paginate(&items, 5, 1), &[0, 1, 2, 3, 4]);
        assert_eq!(paginate(&items, 5, 2).len(), 5);
        assert_eq!(paginate(&items, 5, 3), &[10, 11]);
        assert!(paginate(&items, 5, 4).is_empty());
        assert!(paginate(&items, 5, 0).is_empty());
        assert!(paginate(&items, 5, usize::MAX).is_empty());
        assert!(paginate(&items, 0, 1).is_empty());
        assert_eq!(total_pages(12, 5), 3);
        assert_eq!(total_pages(10, 5), 2);
        assert_eq!(total_pages(0, 5), 0);
    }

    #[test]
    fn page_params() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("3")), 3);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("-2")), 1);
        assert_eq!(parse_page(Some("two")), 1);
        assert_eq!(parse_page(Some("")), 1);
    }
}
