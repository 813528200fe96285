use std::collections::VecDeque;

use pulldown_cmark::{Event, Tag, TagEnd};
use rustc_hash::FxHashMap;

use super::Plugin;

/// Gives every heading without an explicit `{#id}` an id slugified from its
/// text. Repeated ids get `-1`, `-2`, ... suffixes in document order.
#[derive(Default)]
pub struct AutoHeading {
    seen: FxHashMap<String, usize>,
}

struct HeadingIterator<'a, 's, I: Iterator<Item = Event<'a>>> {
    queue: VecDeque<Event<'a>>,
    seen: &'s mut FxHashMap<String, usize>,
    inner: I,
}

impl AutoHeading {
    fn unique(seen: &mut FxHashMap<String, usize>, id: String) -> String {
        let Some(&last) = seen.get(&id) else {
            seen.insert(id.clone(), 0);
            return id;
        };

        let mut n = last;
        let candidate = loop {
            n += 1;
            let candidate = format!("{id}-{n}");
            if !seen.contains_key(&candidate) {
                break candidate;
            }
        };

        seen.insert(id, n);
        seen.insert(candidate.clone(), 0);
        candidate
    }
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for HeadingIterator<'a, '_, I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.queue.pop_front() {
            return Some(event);
        }

        match self.inner.next()? {
            Event::Start(Tag::Heading { level, id: None, classes, attrs }) => {
                let mut text = String::new();
                for event in self.inner.by_ref() {
                    if let Event::Text(ref s) | Event::Code(ref s) = event {
                        text.push_str(s);
                    }

                    let end = matches!(event, Event::End(TagEnd::Heading(..)));
                    self.queue.push_back(event);
                    if end {
                        break;
                    }
                }

                let id = AutoHeading::unique(self.seen, crate::util::slugify(&text));
                Some(Event::Start(Tag::Heading { level, id: Some(id.into()), classes, attrs }))
            }
            Event::Start(Tag::Heading { level, id: Some(id), classes, attrs }) => {
                self.seen.entry(id.to_string()).or_insert(0);
                Some(Event::Start(Tag::Heading { level, id: Some(id), classes, attrs }))
            }
            event => Some(event),
        }
    }
}

impl Plugin for AutoHeading {
    fn remap<'a, I>(&'a mut self, events: I) -> impl Iterator<Item = Event<'a>> + 'a
        where I: Iterator<Item = Event<'a>> + 'a
    {
        self.seen.clear();
        HeadingIterator {
            seen: &mut self.seen,
            inner: events,
            queue: VecDeque::with_capacity(4),
        }
    }
}
