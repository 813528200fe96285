use pulldown_cmark::{Options, Parser};

use crate::config::MarkdownSettings;
use crate::error::{Chainable, Result};
use crate::markdown::{
    Admonition, AutoHeading, CodeTrim, ComponentSet, Node, Plugin, PlainText,
    ReadingMetadata, TableOfContents, TocEntry, TreeBuilder,
};

/// The compiled form of a document body.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub body: Vec<Node>,
    pub toc: Vec<TocEntry>,
    pub excerpt: String,
    pub metadata: ReadingMetadata,
}

/// Compiles markdown with embedded components into a [`Node`] tree.
///
/// Compilation is a pure function of the input text and the compiler's
/// settings: the same input always compiles to the same tree.
#[derive(Debug, Clone)]
pub struct Compiler {
    components: ComponentSet,
    options: Options,
    highlight: bool,
    excerpt_length: usize,
    words_per_minute: usize,
}

impl Compiler {
    pub fn new(settings: &MarkdownSettings) -> Self {
        Compiler {
            components: ComponentSet::standard(),
            options: Options::ENABLE_TABLES
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_HEADING_ATTRIBUTES,
            highlight: settings.highlight,
            excerpt_length: settings.excerpt_length,
            words_per_minute: settings.words_per_minute,
        }
    }

    pub fn compile(&self, path: &str, source: &str) -> Result<Compiled> {
        self.compile_from(path, source, 1)
    }

    /// Like [`Compiler::compile()`] for a body that starts at line
    /// `first_line` of its file, so that errors point at the right line.
    pub fn compile_from(&self, path: &str, source: &str, first_line: usize) -> Result<Compiled> {
        let input = Admonition.preprocess(source)
            .chain_with(|| error!("markdown preprocessing failed", "document" => path))?;

        let mut headings = AutoHeading::default();
        let mut trim = CodeTrim::trim_start();
        let mut toc = TableOfContents::default();
        let mut text = PlainText::new(self.excerpt_length, self.words_per_minute);

        let parser = Parser::new_ext(&input, self.options);
        let events = text.remap(toc.remap(trim.remap(headings.remap(parser))));
        let body = TreeBuilder::new(path, source, &self.components)
            .highlight(self.highlight)
            .first_line(first_line)
            .build(events)?;

        headings.finalize()?;
        trim.finalize()?;
        toc.finalize()?;
        text.finalize()?;

        Ok(Compiled {
            body,
            toc: toc.into_entries(),
            excerpt: text.excerpt().to_string(),
            metadata: text.metadata(),
        })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new(&MarkdownSettings::default())
    }
}
