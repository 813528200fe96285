use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Props passed to an embedded component, in name order.
pub type Props = BTreeMap<String, serde_json::Value>;

/// One node of a compiled document body.
///
/// The tree is plain data: it names embedded components and carries their
/// props, but never carries author-supplied markup that is emitted unescaped.
/// The one exception is [`Node::CodeBlock::html`], which is produced by the
/// compiler's own highlighter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Text { value: String },
    Code { value: String },
    SoftBreak,
    HardBreak,
    Rule,
    Paragraph { children: Vec<Node> },
    Heading { level: u8, id: String, children: Vec<Node> },
    BlockQuote { children: Vec<Node> },
    List {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<u64>,
        children: Vec<Node>,
    },
    Item { children: Vec<Node> },
    TaskMarker { checked: bool },
    Emphasis { children: Vec<Node> },
    Strong { children: Vec<Node> },
    Strikethrough { children: Vec<Node> },
    Link {
        href: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        title: String,
        children: Vec<Node>,
    },
    Image {
        src: String,
        alt: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        title: String,
    },
    CodeBlock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
        code: String,
        /// Highlighted markup, when highlighting is enabled.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        html: Option<String>,
    },
    Table { children: Vec<Node> },
    TableHead { children: Vec<Node> },
    TableRow { children: Vec<Node> },
    TableCell {
        #[serde(default)]
        align: Align,
        children: Vec<Node>,
    },
    FootnoteReference { label: String },
    FootnoteDefinition { label: String, children: Vec<Node> },
    /// An allow-listed intrinsic HTML element with filtered attributes.
    Element {
        name: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attrs: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<Node>,
    },
    /// An embedded component call.
    Component {
        name: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        props: Props,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<Node>,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl Node {
    pub fn text<S: Into<String>>(value: S) -> Node {
        Node::Text { value: value.into() }
    }

    /// The node's children, if it is a container.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Paragraph { children }
            | Node::Heading { children, .. }
            | Node::BlockQuote { children }
            | Node::List { children, .. }
            | Node::Item { children }
            | Node::Emphasis { children }
            | Node::Strong { children }
            | Node::Strikethrough { children }
            | Node::Link { children, .. }
            | Node::Table { children }
            | Node::TableHead { children }
            | Node::TableRow { children }
            | Node::TableCell { children, .. }
            | Node::FootnoteDefinition { children, .. }
            | Node::Element { children, .. }
            | Node::Component { children, .. } => children,
            _ => &[],
        }
    }

    /// Depth-first, pre-order walk over `nodes` and all of their descendants.
    pub fn walk<'a, F: FnMut(&'a Node)>(nodes: &'a [Node], f: &mut F) {
        for node in nodes {
            f(node);
            Node::walk(node.children(), f);
        }
    }
}

/// The concatenated text content of `nodes`, as used for image alt text.
pub fn plain_text(nodes: &[Node]) -> String {
    let mut string = String::new();
    Node::walk(nodes, &mut |node| match node {
        Node::Text { value } | Node::Code { value } => string.push_str(value),
        Node::SoftBreak | Node::HardBreak => string.push(' '),
        _ => {}
    });

    string
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_shape() {
        let node = Node::Paragraph {
            children: vec![
                Node::text("Hi "),
                Node::Component {
                    name: "Tag".into(),
                    props: Props::from([("tag".into(), "rust".into())]),
                    children: vec![],
                },
            ],
        };

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json, serde_json::json!({
            "type": "paragraph",
            "children": [
                { "type": "text", "value": "Hi " },
                { "type": "component", "name": "Tag", "props": { "tag": "rust" } },
            ]
        }));

        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn text_content() {
        let nodes = vec![
            Node::text("a"),
            Node::Strong { children: vec![Node::Code { value: "b".into() }] },
            Node::SoftBreak,
            Node::text("c"),
        ];

        assert_eq!(plain_text(&nodes), "ab c");
    }
}
