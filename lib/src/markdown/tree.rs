use std::collections::BTreeMap;

use pulldown_cmark::{Alignment, CodeBlockKind, Event, Tag, TagEnd};
use serde_json::Value;

use crate::error::ContentError;
use crate::markdown::component::{self, ComponentSet, Kind, Token};
use crate::markdown::highlight;
use crate::markdown::node::{plain_text, Align, Node, Props};

/// Intrinsic elements that survive compilation.
const ELEMENTS: &[&str] = &[
    "br", "hr", "sup", "sub", "kbd", "mark", "abbr", "small", "span", "div",
    "details", "summary", "u", "s", "del", "ins", "figure", "figcaption",
];

const VOID_ELEMENTS: &[&str] = &["br", "hr"];

const ATTRIBUTES: &[&str] = &["class", "id", "title", "href", "open"];

/// Folds a markdown event stream into a [`Node`] tree, resolving embedded
/// component tags against a [`ComponentSet`].
pub struct TreeBuilder<'c> {
    path: &'c str,
    components: &'c ComponentSet,
    highlight: bool,
    /// Text the events were parsed from, for locating tags by line.
    source: &'c str,
    cursor: usize,
    line: usize,
    root: Vec<Node>,
    stack: Vec<Frame>,
    /// Raw HTML cut off mid-tag, completed by the next HTML event.
    pending: String,
    /// Adjacent text events, merged so tags split across them are seen whole.
    prose: String,
    in_html_block: bool,
    aligns: Vec<Align>,
    column: usize,
}

struct Frame {
    open: Open,
    children: Vec<Node>,
}

enum Open {
    Paragraph,
    Heading { level: u8, id: String },
    BlockQuote,
    List { start: Option<u64> },
    Item,
    Emphasis,
    Strong,
    Strikethrough,
    Link { href: String, title: String },
    Image { src: String, title: String },
    Table,
    TableHead,
    TableRow,
    TableCell { align: Align },
    Footnote { label: String },
    CodeBlock { lang: Option<String>, code: String },
    Component { name: String, props: Props, kind: Kind, line: usize },
    Element { name: String, attrs: BTreeMap<String, String> },
}

impl<'c> TreeBuilder<'c> {
    pub fn new(path: &'c str, source: &'c str, components: &'c ComponentSet) -> Self {
        TreeBuilder {
            path,
            components,
            highlight: true,
            source,
            cursor: 0,
            line: 1,
            root: vec![],
            stack: vec![],
            pending: String::new(),
            prose: String::new(),
            in_html_block: false,
            aligns: vec![],
            column: 0,
        }
    }

    pub fn highlight(mut self, highlight: bool) -> Self {
        self.highlight = highlight;
        self
    }

    /// Line numbers reported in errors start at `line`.
    pub fn first_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn build<'a, I>(mut self, events: I) -> Result<Vec<Node>, ContentError>
        where I: Iterator<Item = Event<'a>>
    {
        for event in events {
            self.event(event)?;
        }

        self.flush_prose()?;
        self.flush_pending()?;
        while let Some(frame) = self.stack.pop() {
            if let Open::Component { name, line, .. } = &frame.open {
                return Err(self.error(*line, format!("unclosed component `<{name}>`")));
            }

            let node = self.close(frame)?;
            self.push(node);
        }

        Ok(self.root)
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), ContentError> {
        if !matches!(event, Event::Text(_)) {
            self.flush_prose()?;
        }

        if !matches!(event, Event::Html(_) | Event::InlineHtml(_)) {
            self.flush_pending()?;
        }

        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(end) => self.end(end)?,
            Event::Text(text) => match self.stack.last_mut() {
                Some(Frame { open: Open::CodeBlock { code, .. }, .. }) => code.push_str(&text),
                _ => self.prose.push_str(&text),
            },
            Event::Code(code) => self.push(Node::Code { value: code.into_string() }),
            Event::Html(html) | Event::InlineHtml(html) => self.html(&html)?,
            Event::FootnoteReference(label) => {
                self.push(Node::FootnoteReference { label: label.into_string() })
            }
            Event::SoftBreak => self.push(Node::SoftBreak),
            Event::HardBreak => self.push(Node::HardBreak),
            Event::Rule => self.push(Node::Rule),
            Event::TaskListMarker(checked) => self.push(Node::TaskMarker { checked }),
        }

        Ok(())
    }

    fn start(&mut self, tag: Tag<'_>) {
        let open = match tag {
            Tag::Paragraph => Open::Paragraph,
            Tag::Heading { level, id, .. } => Open::Heading {
                level: level as u8,
                id: id.map(|id| id.into_string()).unwrap_or_default(),
            },
            Tag::BlockQuote => Open::BlockQuote,
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split(|c: char| c == ',' || c.is_whitespace())
                        .next()
                        .filter(|lang| !lang.is_empty())
                        .map(String::from),
                    CodeBlockKind::Indented => None,
                };

                Open::CodeBlock { lang, code: String::new() }
            }
            Tag::List(start) => Open::List { start },
            Tag::Item => Open::Item,
            Tag::FootnoteDefinition(label) => Open::Footnote { label: label.into_string() },
            Tag::Table(aligns) => {
                self.aligns = aligns.into_iter().map(align).collect();
                Open::Table
            }
            Tag::TableHead => {
                self.column = 0;
                Open::TableHead
            }
            Tag::TableRow => {
                self.column = 0;
                Open::TableRow
            }
            Tag::TableCell => {
                let align = self.aligns.get(self.column).copied().unwrap_or_default();
                self.column += 1;
                Open::TableCell { align }
            }
            Tag::Emphasis => Open::Emphasis,
            Tag::Strong => Open::Strong,
            Tag::Strikethrough => Open::Strikethrough,
            Tag::Link { dest_url, title, .. } => Open::Link {
                href: safe_url(dest_url.into_string()),
                title: title.into_string(),
            },
            Tag::Image { dest_url, title, .. } => Open::Image {
                src: safe_url(dest_url.into_string()),
                title: title.into_string(),
            },
            Tag::HtmlBlock => {
                self.in_html_block = true;
                return;
            }
            Tag::MetadataBlock(_) => return,
        };

        self.stack.push(Frame { open, children: vec![] });
    }

    fn end(&mut self, end: TagEnd) -> Result<(), ContentError> {
        match end {
            TagEnd::HtmlBlock => {
                self.in_html_block = false;
                return Ok(());
            }
            TagEnd::MetadataBlock(_) => return Ok(()),
            _ => {}
        }

        self.close_elements()?;
        let Some(frame) = self.stack.pop() else { return Ok(()) };
        if let Open::Component { name, line, .. } = &frame.open {
            return Err(self.error(*line, format!("unclosed component `<{name}>`")));
        }

        let node = self.close(frame)?;
        self.push(node);
        Ok(())
    }

    fn html(&mut self, chunk: &str) -> Result<(), ContentError> {
        let mut input = std::mem::take(&mut self.pending);
        input.push_str(chunk);

        let tokens = component::tokenize(&input)
            .map_err(|message| self.error(self.line, message))?;

        for token in tokens {
            match token {
                Token::Text(text) if text.contains('\n') && text.trim().is_empty() => {}
                Token::Text(text) => {
                    self.check_container_body(text)?;
                    self.push(Node::text(component::decode_entities(text)))
                }
                Token::Comment => {}
                Token::Partial(rest) => self.pending = rest.to_string(),
                Token::Open { raw, name, attrs, self_closing } => {
                    self.open_tag(raw, name, attrs, self_closing)?
                }
                Token::Close { raw, name } => self.close_tag(raw, name)?,
            }
        }

        Ok(())
    }

    /// Component tags in text that the markdown parser did not take for HTML,
    /// such as tags with `{...}` expressions containing spaces or quotes.
    fn flush_prose(&mut self) -> Result<(), ContentError> {
        let prose = std::mem::take(&mut self.prose);
        if prose.is_empty() {
            return Ok(());
        }

        if !component::mentions_component(&prose) {
            self.push(Node::text(prose));
            return Ok(());
        }

        let tokens = match component::tokenize_components(&prose) {
            Ok(tokens) => tokens,
            Err(message) => {
                let line = self.locate_component(&prose);
                return Err(self.error(line, message));
            }
        };

        for token in tokens {
            match token {
                Token::Open { raw, name, attrs, self_closing } if self.written(raw) => {
                    self.open_tag(raw, name, attrs, self_closing)?
                }
                Token::Close { raw, name } if self.written(raw) => self.close_tag(raw, name)?,
                Token::Partial(rest) if component::mentions_component(rest) => {
                    let line = self.locate_component(rest);
                    let name = rest.trim_start_matches(['<', '/'])
                        .split(|c: char| !c.is_ascii_alphanumeric())
                        .next()
                        .unwrap_or_default();

                    return Err(self.error(line, format!("unterminated `<{name}>` tag")));
                }
                Token::Open { raw, .. } | Token::Close { raw, .. } => self.push(Node::text(raw)),
                Token::Text(text) | Token::Partial(text) => self.push(Node::text(text)),
                Token::Comment => {}
            }
        }

        Ok(())
    }

    /// Whether `raw` appears unescaped in the source at or after the last
    /// located tag. `\<Foo>` and `&lt;Foo>` are text.
    fn written(&self, raw: &str) -> bool {
        let rest = &self.source[self.cursor..];
        rest.match_indices(raw).any(|(k, _)| {
            let before = &self.source.as_bytes()[..self.cursor + k];
            before.iter().rev().take_while(|&&b| b == b'\\').count() % 2 == 0
        })
    }

    fn locate_component(&mut self, text: &str) -> usize {
        let start = memchr::memchr_iter(b'<', text.as_bytes())
            .find(|&i| component::mentions_component(&text[i..]))
            .unwrap_or(0);

        let tag = text[start..].split(char::is_whitespace).next().unwrap_or_default();
        self.locate(tag)
    }

    /// Markdown in a component body is only parsed when it is separated from
    /// the tags by blank lines; otherwise the whole block is raw HTML.
    fn check_container_body(&self, text: &str) -> Result<(), ContentError> {
        if !self.in_html_block || text.trim().is_empty() {
            return Ok(());
        }

        match self.stack.last() {
            Some(Frame { open: Open::Component { name, kind: Kind::Container, line, .. }, .. }) => {
                Err(self.error(*line, format!(
                    "the content of `<{name}>` must be separated from its tags by blank lines"
                )))
            }
            _ => Ok(()),
        }
    }

    fn open_tag(
        &mut self,
        raw: &str,
        name: &str,
        attrs: Vec<(&str, Value)>,
        self_closing: bool,
    ) -> Result<(), ContentError> {
        if component::is_component_name(name) {
            let line = self.locate(raw);
            let spec = self.components.get(name).ok_or_else(|| ContentError::UnknownComponent {
                path: self.path.to_string(),
                name: name.to_string(),
            })?;

            let props: Props = attrs.into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect();

            spec.check(&props).map_err(|message| self.error(line, message))?;
            let open = Open::Component { name: name.into(), props, kind: spec.kind, line };
            match self_closing {
                true => {
                    let node = self.close(Frame { open, children: vec![] })?;
                    self.push(node);
                }
                false => self.stack.push(Frame { open, children: vec![] }),
            }

            return Ok(());
        }

        let lowercase = name.to_ascii_lowercase();
        if !ELEMENTS.contains(&lowercase.as_str()) {
            self.push(Node::text(raw));
            return Ok(());
        }

        let open = Open::Element { attrs: element_attrs(attrs), name: lowercase };
        match self_closing || VOID_ELEMENTS.contains(&name) {
            true => {
                let node = self.close(Frame { open, children: vec![] })?;
                self.push(node);
            }
            false => self.stack.push(Frame { open, children: vec![] }),
        }

        Ok(())
    }

    fn close_tag(&mut self, raw: &str, name: &str) -> Result<(), ContentError> {
        if !component::is_component_name(name) {
            let lowercase = name.to_ascii_lowercase();
            match self.stack.last() {
                Some(Frame { open: Open::Element { name: open, .. }, .. }) if *open == lowercase => {
                    if let Some(frame) = self.stack.pop() {
                        let node = self.close(frame)?;
                        self.push(node);
                    }
                }
                _ if VOID_ELEMENTS.contains(&lowercase.as_str()) => {}
                _ => self.push(Node::text(raw)),
            }

            return Ok(());
        }

        let line = self.locate(raw);
        if self.components.get(name).is_none() {
            return Err(ContentError::UnknownComponent {
                path: self.path.to_string(),
                name: name.to_string(),
            });
        }

        self.close_elements()?;
        let message = match self.stack.last() {
            Some(Frame { open: Open::Component { name: open, .. }, .. }) if open == name => {
                if let Some(frame) = self.stack.pop() {
                    let node = self.close(frame)?;
                    self.push(node);
                }

                return Ok(());
            }
            Some(Frame { open: Open::Component { name: open, .. }, .. }) => {
                format!("expected `</{open}>`, found `</{name}>`")
            }
            _ => format!("`</{name}>` does not close an open component here"),
        };

        Err(self.error(line, message))
    }

    /// Converts a finished frame into its node.
    fn close(&self, frame: Frame) -> Result<Node, ContentError> {
        let Frame { open, children } = frame;
        let node = match open {
            Open::Paragraph => Node::Paragraph { children },
            Open::Heading { level, id } => Node::Heading { level, id, children },
            Open::BlockQuote => Node::BlockQuote { children },
            Open::List { start } => Node::List { start, children },
            Open::Item => Node::Item { children },
            Open::Emphasis => Node::Emphasis { children },
            Open::Strong => Node::Strong { children },
            Open::Strikethrough => Node::Strikethrough { children },
            Open::Link { href, title } => Node::Link { href, title, children },
            Open::Image { src, title } => Node::Image { src, alt: plain_text(&children), title },
            Open::Table => Node::Table { children },
            Open::TableHead => Node::TableHead { children },
            Open::TableRow => Node::TableRow { children },
            Open::TableCell { align } => Node::TableCell { align, children },
            Open::Footnote { label } => Node::FootnoteDefinition { label, children },
            Open::CodeBlock { lang, code } => {
                let html = match self.highlight {
                    true => highlight::highlight(lang.as_deref(), &code),
                    false => None,
                };

                Node::CodeBlock { lang, code, html }
            }
            Open::Element { name, attrs } => Node::Element { name, attrs, children },
            Open::Component { name, props, kind, line } => {
                let children: Vec<Node> = children.into_iter()
                    .filter(|n| !matches!(n, Node::Text { value } if value.trim().is_empty()))
                    .collect();

                if kind == Kind::Void && !children.is_empty() {
                    return Err(self.error(line, format!("`<{name}>` does not accept children")));
                }

                Node::Component { name, props, children }
            }
        };

        Ok(node)
    }

    fn close_elements(&mut self) -> Result<(), ContentError> {
        while matches!(self.stack.last(), Some(Frame { open: Open::Element { .. }, .. })) {
            if let Some(frame) = self.stack.pop() {
                let node = self.close(frame)?;
                self.push(node);
            }
        }

        Ok(())
    }

    fn push(&mut self, node: Node) {
        let children = match self.stack.last_mut() {
            Some(frame) => &mut frame.children,
            None => &mut self.root,
        };

        match (children.last_mut(), node) {
            (Some(Node::Text { value }), Node::Text { value: next }) => value.push_str(&next),
            (_, node) => children.push(node),
        }
    }

    fn flush_pending(&mut self) -> Result<(), ContentError> {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() || pending.starts_with("<!--") {
            return Ok(());
        }

        let name: String = pending[1..].chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();

        if component::is_component_name(&name) {
            let line = self.locate(&pending);
            return Err(self.error(line, format!("unterminated `<{name}>` tag")));
        }

        self.push(Node::text(pending));
        Ok(())
    }

    /// Finds the line of `raw` at or after the last located tag. Tags that
    /// don't appear verbatim (indented blocks, generated markup) report the
    /// line of the last tag found.
    fn locate(&mut self, raw: &str) -> usize {
        if let Some(k) = self.source[self.cursor..].find(raw) {
            let start = self.cursor + k;
            self.line += memchr::memchr_iter(b'\n', &self.source.as_bytes()[self.cursor..start]).count();
            self.cursor = start;
        }

        self.line
    }

    fn error(&self, line: usize, message: String) -> ContentError {
        ContentError::Compilation { path: self.path.to_string(), line, message }
    }
}

fn align(alignment: Alignment) -> Align {
    match alignment {
        Alignment::None => Align::None,
        Alignment::Left => Align::Left,
        Alignment::Center => Align::Center,
        Alignment::Right => Align::Right,
    }
}

fn safe_url(url: String) -> String {
    match component::is_safe_url(&url) {
        true => url,
        false => "#".into(),
    }
}

fn element_attrs(attrs: Vec<(&str, Value)>) -> BTreeMap<String, String> {
    let mut filtered = BTreeMap::new();
    for (name, value) in attrs {
        let name = name.to_ascii_lowercase();
        if !ATTRIBUTES.contains(&name.as_str()) {
            continue;
        }

        let value = match value {
            Value::String(s) => s,
            Value::Bool(true) => String::new(),
            Value::Bool(false) | Value::Null => continue,
            other => other.to_string(),
        };

        if name == "href" && !component::is_safe_url(&value) {
            continue;
        }

        filtered.insert(name, value);
    }

    filtered
}
