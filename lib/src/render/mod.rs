//! The render executor: interprets a compiled body against a fixed table of
//! component implementations and produces HTML.
//!
//! A compiled body is data, not code. The only things rendered beyond plain
//! escaped markup are the components in the table passed to [`render()`] and
//! the compiler's own highlighted code blocks. A body naming a component the
//! table lacks fails to render; it is never silently dropped.

mod components;

use std::fmt::Write;

use derive_more::Debug;
use pulldown_cmark_escape::{escape_href, escape_html};
use rustc_hash::FxHashMap;

use crate::error::{Chainable, Result};
use crate::markdown::{Align, Node, Props};

pub use components::{callout, image, tag};

/// An embeddable component implementation.
///
/// `children` is the rendered HTML of the component's children, or `None` for
/// a component used without children.
pub trait Component: Send + Sync {
    fn render(&self, props: &Props, children: Option<&str>, out: &mut String) -> Result<()>;
}

impl<F> Component for F
    where F: Fn(&Props, Option<&str>, &mut String) -> Result<()> + Send + Sync
{
    #[inline(always)]
    fn render(&self, props: &Props, children: Option<&str>, out: &mut String) -> Result<()> {
        self(props, children, out)
    }
}

/// The name to implementation table a body is rendered against.
#[derive(Debug, Default)]
pub struct Components {
    #[debug(ignore)]
    table: FxHashMap<String, Box<dyn Component>>,
}

impl Components {
    pub fn empty() -> Self {
        Components::default()
    }

    /// The standard `Image`, `Callout`, and `Tag` implementations.
    pub fn standard() -> Self {
        Components::empty()
            .with("Image", image)
            .with("Callout", callout)
            .with("Tag", tag)
    }

    /// Adds or replaces the implementation of `name`.
    pub fn with<C: Component + 'static>(mut self, name: &str, component: C) -> Self {
        self.table.insert(name.to_string(), Box::new(component));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Component> {
        self.table.get(name).map(|c| &**c)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }
}

/// Renders `body` to HTML.
pub fn render(body: &[Node], components: &Components) -> Result<String> {
    let mut executor = Executor { components, in_head: false };
    let mut out = String::with_capacity(body.len() * 64);
    executor.nodes(body, &mut out)?;
    Ok(out)
}

struct Executor<'c> {
    components: &'c Components,
    in_head: bool,
}

pub(crate) fn escape(out: &mut String, text: &str) -> Result<()> {
    escape_html(&mut *out, text).map_err(|_| error!("failed to escape text"))
}

pub(crate) fn escape_url(out: &mut String, url: &str) -> Result<()> {
    escape_href(&mut *out, url).map_err(|_| error!("failed to escape url", "url" => url))
}

/// Writes ` name="value"` with `value` escaped.
pub(crate) fn attr(out: &mut String, name: &str, value: &str) -> Result<()> {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    match name {
        "href" | "src" => escape_url(out, value)?,
        _ => escape(out, value)?,
    }

    out.push('"');
    Ok(())
}

impl Executor<'_> {
    fn nodes(&mut self, nodes: &[Node], out: &mut String) -> Result<()> {
        for node in nodes {
            self.node(node, out)?;
        }

        Ok(())
    }

    fn wrap(&mut self, tag: &str, children: &[Node], out: &mut String) -> Result<()> {
        out.push('<');
        out.push_str(tag);
        out.push('>');
        self.nodes(children, out)?;
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
        Ok(())
    }

    fn node(&mut self, node: &Node, out: &mut String) -> Result<()> {
        match node {
            Node::Text { value } => escape(out, value)?,
            Node::Code { value } => {
                out.push_str("<code>");
                escape(out, value)?;
                out.push_str("</code>");
            }
            Node::SoftBreak => out.push('\n'),
            Node::HardBreak => out.push_str("<br />\n"),
            Node::Rule => out.push_str("<hr />\n"),
            Node::Paragraph { children } => {
                self.wrap("p", children, out)?;
                out.push('\n');
            }
            Node::Heading { level, id, children } => {
                let level = (*level).clamp(1, 6);
                let _ = write!(out, "<h{level}");
                if !id.is_empty() {
                    attr(out, "id", id)?;
                }

                out.push('>');
                self.nodes(children, out)?;
                let _ = writeln!(out, "</h{level}>");
            }
            Node::BlockQuote { children } => {
                out.push_str("<blockquote>\n");
                self.nodes(children, out)?;
                out.push_str("</blockquote>\n");
            }
            Node::List { start: None, children } => {
                out.push_str("<ul>\n");
                self.nodes(children, out)?;
                out.push_str("</ul>\n");
            }
            Node::List { start: Some(start), children } => {
                match start {
                    1 => out.push_str("<ol>\n"),
                    n => { let _ = writeln!(out, "<ol start=\"{n}\">"); }
                }

                self.nodes(children, out)?;
                out.push_str("</ol>\n");
            }
            Node::Item { children } => {
                self.wrap("li", children, out)?;
                out.push('\n');
            }
            Node::TaskMarker { checked } => match checked {
                true => out.push_str("<input disabled=\"\" type=\"checkbox\" checked=\"\"/>\n"),
                false => out.push_str("<input disabled=\"\" type=\"checkbox\"/>\n"),
            },
            Node::Emphasis { children } => self.wrap("em", children, out)?,
            Node::Strong { children } => self.wrap("strong", children, out)?,
            Node::Strikethrough { children } => self.wrap("del", children, out)?,
            Node::Link { href, title, children } => {
                out.push_str("<a");
                attr(out, "href", href)?;
                if !title.is_empty() {
                    attr(out, "title", title)?;
                }

                out.push('>');
                self.nodes(children, out)?;
                out.push_str("</a>");
            }
            Node::Image { src, alt, title } => {
                out.push_str("<img");
                attr(out, "src", src)?;
                attr(out, "alt", alt)?;
                if !title.is_empty() {
                    attr(out, "title", title)?;
                }

                out.push_str(" />");
            }
            Node::CodeBlock { html: Some(html), .. } => {
                out.push_str(html);
                out.push('\n');
            }
            Node::CodeBlock { lang, code, html: None } => {
                out.push_str("<pre><code");
                if let Some(lang) = lang {
                    attr(out, "class", &format!("language-{lang}"))?;
                }

                out.push('>');
                escape(out, code)?;
                out.push_str("</code></pre>\n");
            }
            Node::Table { children } => {
                out.push_str("<table>");
                let (head, rows) = match children.split_first() {
                    Some((head @ Node::TableHead { .. }, rows)) => (Some(head), rows),
                    _ => (None, &children[..]),
                };

                if let Some(head) = head {
                    self.node(head, out)?;
                }

                if !rows.is_empty() {
                    out.push_str("<tbody>\n");
                    self.nodes(rows, out)?;
                    out.push_str("</tbody>");
                }

                out.push_str("</table>\n");
            }
            Node::TableHead { children } => {
                out.push_str("<thead><tr>");
                self.in_head = true;
                let result = self.nodes(children, out);
                self.in_head = false;
                result?;
                out.push_str("</tr></thead>\n");
            }
            Node::TableRow { children } => {
                out.push_str("<tr>");
                self.nodes(children, out)?;
                out.push_str("</tr>\n");
            }
            Node::TableCell { align, children } => {
                let cell = if self.in_head { "th" } else { "td" };
                let _ = write!(out, "<{cell}");
                match align {
                    Align::None => {}
                    Align::Left => out.push_str(" style=\"text-align: left\""),
                    Align::Center => out.push_str(" style=\"text-align: center\""),
                    Align::Right => out.push_str(" style=\"text-align: right\""),
                }

                out.push('>');
                self.nodes(children, out)?;
                let _ = write!(out, "</{cell}>");
            }
            Node::FootnoteReference { label } => {
                out.push_str("<sup class=\"footnote-reference\"><a");
                attr(out, "href", &format!("#{label}"))?;
                out.push('>');
                escape(out, label)?;
                out.push_str("</a></sup>");
            }
            Node::FootnoteDefinition { label, children } => {
                out.push_str("<div class=\"footnote-definition\"");
                attr(out, "id", label)?;
                out.push_str("><sup class=\"footnote-definition-label\">");
                escape(out, label)?;
                out.push_str("</sup>\n");
                self.nodes(children, out)?;
                out.push_str("</div>\n");
            }
            Node::Element { name, attrs, children } => {
                out.push('<');
                out.push_str(name);
                for (key, value) in attrs {
                    attr(out, key, value)?;
                }

                match name.as_str() {
                    "br" | "hr" => out.push_str(" />"),
                    _ => {
                        out.push('>');
                        self.nodes(children, out)?;
                        out.push_str("</");
                        out.push_str(name);
                        out.push('>');
                    }
                }
            }
            Node::Component { name, props, children } => {
                let Some(component) = self.components.get(name) else {
                    return err! {
                        "compiled body references a component with no implementation",
                        "component" => name,
                    };
                };

                let children = match children.is_empty() {
                    true => None,
                    false => {
                        let mut inner = String::new();
                        self.nodes(children, &mut inner)?;
                        Some(inner)
                    }
                };

                component.render(props, children.as_deref(), out)
                    .chain_with(|| error!("component failed to render", "component" => name))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::markdown::Compiler;

    use super::*;

    fn html(source: &str) -> String {
        let compiled = Compiler::default().compile("doc.md", source).unwrap();
        render(&compiled.body, &Components::standard()).unwrap()
    }

    #[test]
    fn markdown_basics() {
        assert_eq!(html("Hello *there* & `x<y>`"), "<p>Hello <em>there</em> &amp; <code>x&lt;y&gt;</code></p>\n");
        assert_eq!(html("# Title"), "<h1 id=\"title\">Title</h1>\n");
        assert_eq!(html("- a\n- b\n"), "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n");
        assert_eq!(html("3. a\n"), "<ol start=\"3\">\n<li>a</li>\n</ol>\n");
        assert_eq!(html("[x](/a?b&c \"t\")"), "<p><a href=\"/a?b&amp;c\" title=\"t\">x</a></p>\n");
    }

    #[test]
    fn tables() {
        let out = html("| a | b |\n|---|--:|\n| 1 | 2 |\n");
        assert_eq!(out, "<table><thead><tr><th>a</th><th style=\"text-align: right\">b</th></tr></thead>\n\
            <tbody>\n<tr><td>1</td><td style=\"text-align: right\">2</td></tr>\n</tbody></table>\n");
    }

    #[test]
    fn raw_html_is_escaped_or_allowed() {
        let out = html("<script>alert(1)</script>\n\nA<br>B <kbd class=\"k\" onclick=\"x()\">C</kbd>");
        assert!(out.contains("&lt;script&gt;"));
        assert!(!out.contains("<script"));
        assert!(out.contains("A<br />B"));
        assert!(out.contains("<kbd class=\"k\">C</kbd>"));
        assert!(!out.contains("onclick"));
    }

    #[test]
    fn components_render() {
        let out = html("<Callout type=\"warning\" title=\"Heads up\">\n\nBe *careful*.\n\n</Callout>\n");
        assert_eq!(out, "<div class=\"callout callout-warning\"><p class=\"callout-title\">Heads up</p>\
            <p>Be <em>careful</em>.</p>\n</div>\n");

        let out = html("See <Tag tag=\"Web Dev\" count={3} />.");
        assert_eq!(out, "<p>See <a class=\"tag\" href=\"/tags/web-dev\">Web Dev\
            <span class=\"tag-count\">3</span></a>.</p>\n");
    }

    #[test]
    fn unimplemented_component_is_an_error() {
        let body = vec![Node::Component {
            name: "Chart".into(),
            props: Props::new(),
            children: vec![],
        }];

        assert!(render(&body, &Components::standard()).is_err());
        assert!(render(&body, &Components::empty()).is_err());
    }

    #[test]
    fn custom_components() {
        let components = Components::empty().with("Tag", |props: &Props, _: Option<&str>, out: &mut String| -> Result<()> {
            out.push_str(props["tag"].as_str().unwrap_or_default());
            Ok(())
        });

        let body = Compiler::default().compile("doc.md", "Tagged <Tag tag=\"x\" />").unwrap().body;
        assert_eq!(render(&body, &components).unwrap(), "<p>Tagged x</p>\n");

        let body = Compiler::default().compile("doc.md", "<Tag tag=\"y\" />\n").unwrap().body;
        assert_eq!(render(&body, &components).unwrap(), "y");
        assert!(components.contains("Tag"));
        assert!(!components.contains("Image"));
    }

    #[test]
    fn highlighted_code_is_emitted_as_is() {
        let out = html("```rust\nfn main() {}\n```\n");
        assert!(out.starts_with("<div class=\"code\""));

        let body = vec![Node::CodeBlock { lang: Some("x".into()), code: "<b>".into(), html: None }];
        let out = render(&body, &Components::empty()).unwrap();
        assert_eq!(out, "<pre><code class=\"language-x\">&lt;b&gt;</code></pre>\n");
    }
}
