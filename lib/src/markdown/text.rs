use pulldown_cmark::{Event, Tag, TagEnd};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::markdown::Plugin;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingMetadata {
    pub word_count: usize,
    /// Whole minutes, at least 1 for any document with words in it.
    pub reading_time: usize,
}

/// Extracts the plain text of a document: an excerpt of the prose and
/// reading metadata over all of the text, code included.
#[derive(Debug, Clone)]
pub struct PlainText {
    excerpt_length: usize,
    words_per_minute: usize,
    prose: String,
    all: String,
    in_code: bool,
    excerpt: String,
    metadata: ReadingMetadata,
}

impl PlainText {
    pub fn new(excerpt_length: usize, words_per_minute: usize) -> Self {
        PlainText {
            excerpt_length,
            words_per_minute,
            prose: String::new(),
            all: String::new(),
            in_code: false,
            excerpt: String::new(),
            metadata: ReadingMetadata::default(),
        }
    }

    pub fn excerpt(&self) -> &str {
        &self.excerpt
    }

    pub fn metadata(&self) -> ReadingMetadata {
        self.metadata
    }

    fn push(&mut self, text: &str) {
        self.all.push_str(text);
        if !self.in_code && self.prose.len() <= self.excerpt_length * 4 {
            self.prose.push_str(text);
        }
    }

    fn separate(&mut self) {
        self.all.push(' ');
        self.prose.push(' ');
    }
}

impl Plugin for PlainText {
    fn remap<'a, I>(&'a mut self, events: I) -> impl Iterator<Item = Event<'a>> + 'a
        where I: Iterator<Item = Event<'a>> + 'a
    {
        self.prose.clear();
        self.all.clear();
        self.in_code = false;

        events.inspect(move |ev| match ev {
            Event::Start(Tag::CodeBlock(_)) => {
                self.separate();
                self.in_code = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                self.in_code = false;
                self.separate();
            }
            Event::Text(text) | Event::Code(text) => self.push(text),
            Event::SoftBreak | Event::HardBreak => self.push(" "),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::BlockQuote
                | TagEnd::TableCell | TagEnd::FootnoteDefinition | TagEnd::HtmlBlock) => self.separate(),
            _ => {}
        })
    }

    fn finalize(&mut self) -> Result<()> {
        self.excerpt = excerpt(&self.prose, self.excerpt_length);

        let word_count = self.all.split_whitespace().count();
        let reading_time = match word_count {
            0 => 0,
            n => n.div_ceil(self.words_per_minute.max(1)).max(1),
        };

        self.metadata = ReadingMetadata { word_count, reading_time };
        self.prose = String::new();
        self.all = String::new();
        Ok(())
    }
}

/// Collapses whitespace in `text` and cuts it to at most `length` characters
/// at a word boundary, appending `…` when anything was cut.
pub fn excerpt(text: &str, length: usize) -> String {
    let mut output = String::new();
    if length == 0 {
        return output;
    }

    let mut count = 0;
    for word in text.split_whitespace() {
        let chars = word.chars().count();
        let needed = if output.is_empty() { chars } else { chars + 1 };
        if count + needed > length {
            if output.is_empty() {
                output.extend(word.chars().take(length));
            }

            output.push('…');
            return output;
        }

        if !output.is_empty() {
            output.push(' ');
        }

        output.push_str(word);
        count += needed;
    }

    output
}

#[cfg(test)]
mod tests {
    use pulldown_cmark::Parser;

    use super::*;

    fn extract(source: &str, length: usize) -> PlainText {
        let mut text = PlainText::new(length, 2);
        text.remap(Parser::new(source)).for_each(drop);
        text.finalize().unwrap();
        text
    }

    #[test]
    fn excerpt_cuts_at_words() {
        assert_eq!(excerpt("one two  three\nfour", 9), "one two…");
        assert_eq!(excerpt("one two", 7), "one two");
        assert_eq!(excerpt("supercalifragilistic", 5), "super…");
        assert_eq!(excerpt("anything", 0), "");
        assert_eq!(excerpt("", 10), "");
    }

    #[test]
    fn prose_excludes_code_blocks() {
        let text = extract("# Title\n\nSome *prose*\nhere.\n\n```\nlet code;\n```\n\nEnd.", 100);
        assert_eq!(text.excerpt(), "Title Some prose here. End.");
        assert_eq!(text.metadata(), ReadingMetadata { word_count: 7, reading_time: 4 });
    }

    #[test]
    fn empty_document() {
        let text = extract("", 100);
        assert_eq!(text.excerpt(), "");
        assert_eq!(text.metadata(), ReadingMetadata { word_count: 0, reading_time: 0 });
    }
}
