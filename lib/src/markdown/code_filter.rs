use std::collections::VecDeque;
use std::ops::Range;

use pulldown_cmark::{CowStr, Event, Tag, TagEnd};

use super::Plugin;

/// Decides, per line of a code block, whether to drop the line. Receives the
/// line (with its newline) and its index in the block.
pub trait CodeFilter: FnMut(&str, usize) -> bool {}
impl<F: FnMut(&str, usize) -> bool> CodeFilter for F {}

/// Drops code block lines selected by a [`CodeFilter`].
#[derive(Clone)]
pub struct CodeTrim<F> {
    trimmer: F,
}

struct Iter<'a, F, I: Iterator<Item = Event<'a>>> {
    trimmer: F,
    inner: I,
    line_num: Option<usize>,
    queue: VecDeque<Event<'a>>,
}

impl<F: CodeFilter> CodeTrim<F> {
    pub fn trim(trimmer: F) -> Self {
        Self { trimmer }
    }
}

impl CodeTrim<()> {
    /// Drops the blank lines at the start of each code block.
    pub fn trim_start() -> CodeTrim<impl CodeFilter> {
        let mut at_start = true;
        CodeTrim::trim(move |line: &str, n: usize| {
            if n == 0 {
                at_start = true;
            }

            at_start = at_start && line.trim().is_empty();
            at_start
        })
    }
}

impl<F: CodeFilter> Plugin for CodeTrim<F> {
    fn remap<'a, I>(&'a mut self, events: I) -> impl Iterator<Item = Event<'a>> + 'a
        where I: Iterator<Item = Event<'a>> + 'a
    {
        Iter {
            trimmer: &mut self.trimmer,
            inner: events,
            line_num: None,
            queue: VecDeque::new(),
        }
    }
}

impl<'a, F: CodeFilter, I: Iterator<Item = Event<'a>>> Iter<'a, F, I> {
    /// Byte ranges of the lines in `text` to keep.
    fn kept(&mut self, text: &str) -> Vec<Range<usize>> {
        let mut ranges = vec![];
        let mut start = 0;
        for line in text.split_inclusive('\n') {
            let end = start + line.len();
            if let Some(n) = self.line_num.as_mut() {
                if !(self.trimmer)(line, *n) {
                    ranges.push(start..end);
                }

                *n += 1;
            }

            start = end;
        }

        ranges
    }
}

impl<'a, F: CodeFilter, I: Iterator<Item = Event<'a>>> Iterator for Iter<'a, F, I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(event);
            }

            match self.inner.next()? {
                event @ Event::Start(Tag::CodeBlock(_)) => {
                    self.line_num = Some(0);
                    return Some(event);
                }
                event @ Event::End(TagEnd::CodeBlock) => {
                    self.line_num = None;
                    return Some(event);
                }
                Event::Text(text) if self.line_num.is_some() => {
                    let kept = self.kept(&text);
                    match text {
                        CowStr::Borrowed(s) => self.queue.extend(kept.into_iter()
                            .map(|r| Event::Text(CowStr::Borrowed(&s[r])))),
                        text => self.queue.extend(kept.into_iter()
                            .map(|r| Event::Text(text[r].to_string().into()))),
                    }
                }
                event => return Some(event),
            }
        }
    }
}
