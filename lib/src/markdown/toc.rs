use pulldown_cmark::{Event, Tag, TagEnd};
use serde::{Deserialize, Serialize};

use crate::markdown::Plugin;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub title: String,
    pub level: u8,
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocEntry>,
}

/// Collects headings into a nested table of contents. A heading nests under
/// the closest preceding heading of a lower level.
#[derive(Debug, Default, Clone)]
pub struct TableOfContents {
    entries: Vec<TocEntry>,
    entry: Option<TocEntry>,
}

impl TableOfContents {
    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TocEntry> {
        self.entries
    }

    fn insert(entries: &mut Vec<TocEntry>, entry: TocEntry) {
        match entries.last_mut() {
            Some(last) if last.level < entry.level => Self::insert(&mut last.children, entry),
            _ => entries.push(entry),
        }
    }
}

impl Plugin for TableOfContents {
    fn remap<'a, I>(&'a mut self, events: I) -> impl Iterator<Item = Event<'a>> + 'a
        where I: Iterator<Item = Event<'a>> + 'a
    {
        self.entries.clear();
        self.entry = None;

        events.inspect(move |ev| match ev {
            Event::Start(Tag::Heading { level, id, .. }) => {
                self.entry = Some(TocEntry {
                    title: String::new(),
                    level: *level as u8,
                    id: id.as_deref().unwrap_or_default().to_string(),
                    children: vec![],
                });
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.title.push_str(text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(entry) = self.entry.take() {
                    Self::insert(&mut self.entries, entry);
                }
            }
            _ => {}
        })
    }
}

#[cfg(test)]
mod tests {
    use pulldown_cmark::Parser;

    use super::*;

    fn toc(source: &str) -> Vec<TocEntry> {
        let mut toc = TableOfContents::default();
        toc.remap(Parser::new(source)).for_each(drop);
        toc.into_entries()
    }

    fn titles(entries: &[TocEntry]) -> Vec<(u8, String, usize)> {
        entries.iter().map(|e| (e.level, e.title.clone(), e.children.len())).collect()
    }

    #[test]
    fn nesting() {
        let entries = toc("# A\n## B\n### C\n## D `x`\n# E\n### F\n## G\n");
        assert_eq!(titles(&entries), [(1, "A".to_string(), 2), (1, "E".to_string(), 2)]);
        assert_eq!(titles(&entries[0].children), [(2, "B".to_string(), 1), (2, "D x".to_string(), 0)]);
        assert_eq!(titles(&entries[1].children), [(3, "F".to_string(), 0), (2, "G".to_string(), 0)]);
    }

    #[test]
    fn starts_below_top_level() {
        let entries = toc("### Deep\n## Shallow\n");
        assert_eq!(titles(&entries), [(3, "Deep".to_string(), 0), (2, "Shallow".to_string(), 0)]);
    }
}
