//! Embedded components: the allowed set, prop checking, and the tokenizer for
//! the tag syntax found in raw HTML events.
//!
//! A tag whose name starts with an uppercase ASCII letter is a component
//! reference. Attribute values may be `"string"`, `'string'`, a `{json}`
//! scalar such as `{3}` or `{true}`, an unquoted word, or absent, which means
//! `true`.

use std::borrow::Cow;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::markdown::node::Props;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Never has children: `<Image src="a.png" />`.
    Void,
    /// May wrap markdown: `<Callout>...</Callout>`.
    Container,
}

#[derive(Debug, Clone, Copy)]
pub struct PropSpec {
    pub name: &'static str,
    pub required: bool,
    /// When non-empty, the only accepted string values.
    pub one_of: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct ComponentSpec {
    pub name: &'static str,
    pub kind: Kind,
    pub props: &'static [PropSpec],
}

pub const IMAGE: ComponentSpec = ComponentSpec {
    name: "Image",
    kind: Kind::Void,
    props: &[
        PropSpec { name: "src", required: true, one_of: &[] },
        PropSpec { name: "alt", required: false, one_of: &[] },
    ],
};

pub const CALLOUT: ComponentSpec = ComponentSpec {
    name: "Callout",
    kind: Kind::Container,
    props: &[
        PropSpec { name: "type", required: false, one_of: &["default", "warning", "danger"] },
        PropSpec { name: "title", required: false, one_of: &[] },
    ],
};

pub const TAG: ComponentSpec = ComponentSpec {
    name: "Tag",
    kind: Kind::Void,
    props: &[
        PropSpec { name: "tag", required: true, one_of: &[] },
        PropSpec { name: "count", required: false, one_of: &[] },
        PropSpec { name: "current", required: false, one_of: &[] },
    ],
};

/// The set of components a document may reference.
#[derive(Debug, Clone, Default)]
pub struct ComponentSet {
    specs: FxHashMap<&'static str, ComponentSpec>,
}

impl ComponentSet {
    pub fn empty() -> Self {
        ComponentSet::default()
    }

    /// `Image`, `Callout`, and `Tag`.
    pub fn standard() -> Self {
        ComponentSet::empty().with(IMAGE).with(CALLOUT).with(TAG)
    }

    pub fn with(mut self, spec: ComponentSpec) -> Self {
        self.specs.insert(spec.name, spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ComponentSpec> {
        self.specs.get(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.specs.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl ComponentSpec {
    /// Checks `props` against the declared props. Undeclared props are kept.
    pub fn check(&self, props: &Props) -> Result<(), String> {
        for spec in self.props {
            match props.get(spec.name) {
                None if spec.required => {
                    return Err(format!("`{}` is missing required prop `{}`", self.name, spec.name));
                }
                Some(Value::String(v)) if !spec.one_of.is_empty() && !spec.one_of.contains(&v.as_str()) => {
                    return Err(format!(
                        "`{}` prop `{}` must be one of {:?}, found {v:?}",
                        self.name, spec.name, spec.one_of
                    ));
                }
                Some(v) if !spec.one_of.is_empty() && !v.is_string() => {
                    return Err(format!("`{}` prop `{}` must be a string", self.name, spec.name));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

pub fn is_component_name(name: &str) -> bool {
    name.starts_with(|c: char| c.is_ascii_uppercase())
}

/// Whether a URL may be emitted in an `href` or `src`.
pub fn is_safe_url(url: &str) -> bool {
    let scheme: String = url.trim_start()
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .take(11)
        .collect::<String>()
        .to_ascii_lowercase();

    !(scheme.starts_with("javascript:") || scheme.starts_with("vbscript:") || scheme.starts_with("data:text"))
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token<'s> {
    Text(&'s str),
    Comment,
    Open { raw: &'s str, name: &'s str, attrs: Vec<(&'s str, Value)>, self_closing: bool },
    Close { raw: &'s str, name: &'s str },
    /// A tag cut off by the end of the input.
    Partial(&'s str),
}

/// Splits `input` into tags and the text between them.
///
/// Malformed component tags are errors. Anything else that fails to parse as
/// a tag is text.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Token<'_>>, String> {
    tokenize_with(input, false)
}

/// Like [`tokenize()`], but only component tags are recognized; every other
/// `<` is text.
pub(crate) fn tokenize_components(input: &str) -> Result<Vec<Token<'_>>, String> {
    tokenize_with(input, true)
}

/// Whether `input` contains something that looks like the start of a
/// component tag.
pub(crate) fn mentions_component(input: &str) -> bool {
    memchr::memchr_iter(b'<', input.as_bytes()).any(|i| starts_component_tag(&input[i..]))
}

fn starts_component_tag(s: &str) -> bool {
    let name = s.strip_prefix("</").or_else(|| s.strip_prefix('<')).unwrap_or("");
    is_component_name(name)
}

fn tokenize_with(input: &str, components_only: bool) -> Result<Vec<Token<'_>>, String> {
    let mut tokens = vec![];
    let mut text_start = 0;
    let mut i = 0;

    while let Some(j) = memchr::memchr(b'<', &input.as_bytes()[i..]) {
        let start = i + j;
        let rest = &input[start..];
        if components_only && !starts_component_tag(rest) {
            i = start + 1;
            continue;
        }

        let tag = match scan_tag(rest) {
            Scan::Tag(token, len) => Some((token, len)),
            Scan::Partial => {
                push_text(&mut tokens, &input[text_start..start]);
                tokens.push(Token::Partial(rest));
                return Ok(tokens);
            }
            Scan::NotATag => None,
            Scan::Malformed(name, reason) if is_component_name(name) => {
                return Err(format!("malformed `<{name}>` tag: {reason}"));
            }
            Scan::Malformed(..) => None,
        };

        match tag {
            Some((token, len)) => {
                push_text(&mut tokens, &input[text_start..start]);
                tokens.push(token);
                i = start + len;
                text_start = i;
            }
            None => i = start + 1,
        }
    }

    push_text(&mut tokens, &input[text_start..]);
    Ok(tokens)
}

fn push_text<'s>(tokens: &mut Vec<Token<'s>>, text: &'s str) {
    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
}

enum Scan<'s> {
    Tag(Token<'s>, usize),
    Partial,
    NotATag,
    Malformed(&'s str, &'static str),
}

/// Scans one tag at the start of `s`, which begins with `<`.
fn scan_tag(s: &str) -> Scan<'_> {
    let bytes = s.as_bytes();
    if s.starts_with("<!--") {
        return match s[4..].find("-->") {
            Some(end) => Scan::Tag(Token::Comment, 4 + end + 3),
            None => Scan::Partial,
        };
    }

    let (closing, name_start) = match bytes.get(1) {
        Some(b'/') => (true, 2),
        Some(_) => (false, 1),
        None => return Scan::Partial,
    };

    let name_len = name_length(&s[name_start..]);
    if name_len == 0 {
        return match bytes.get(name_start) {
            None => Scan::Partial,
            Some(_) => Scan::NotATag,
        };
    }

    let name = &s[name_start..name_start + name_len];
    let mut i = skip_whitespace(s, name_start + name_len);
    if closing {
        return match bytes.get(i) {
            Some(b'>') => Scan::Tag(Token::Close { raw: &s[..i + 1], name }, i + 1),
            Some(_) => Scan::Malformed(name, "closing tags take no attributes"),
            None => Scan::Partial,
        };
    }

    let mut attrs = vec![];
    loop {
        i = skip_whitespace(s, i);
        match bytes.get(i) {
            None => return Scan::Partial,
            Some(b'>') => {
                let token = Token::Open { raw: &s[..i + 1], name, attrs, self_closing: false };
                return Scan::Tag(token, i + 1);
            }
            Some(b'/') => return match bytes.get(i + 1) {
                Some(b'>') => {
                    let token = Token::Open { raw: &s[..i + 2], name, attrs, self_closing: true };
                    Scan::Tag(token, i + 2)
                }
                Some(_) => Scan::Malformed(name, "expected `>` after `/`"),
                None => Scan::Partial,
            },
            Some(_) => {}
        }

        let attr_len = attr_name_length(&s[i..]);
        if attr_len == 0 {
            return Scan::Malformed(name, "invalid attribute name");
        }

        let attr = &s[i..i + attr_len];
        i = skip_whitespace(s, i + attr_len);
        if bytes.get(i) != Some(&b'=') {
            if i >= s.len() {
                return Scan::Partial;
            }

            attrs.push((attr, Value::Bool(true)));
            continue;
        }

        i = skip_whitespace(s, i + 1);
        let (value, len) = match scan_value(&s[i..]) {
            Ok(Some(v)) => v,
            Ok(None) => return Scan::Partial,
            Err(reason) => return Scan::Malformed(name, reason),
        };

        attrs.push((attr, value));
        i += len;
    }
}

/// Scans an attribute value. `Ok(None)` means the input ended first.
fn scan_value(s: &str) -> Result<Option<(Value, usize)>, &'static str> {
    let bytes = s.as_bytes();
    match bytes.first() {
        None => Ok(None),
        Some(&q @ (b'"' | b'\'')) => match memchr::memchr(q, &bytes[1..]) {
            Some(end) => {
                let value = decode_entities(&s[1..1 + end]).into_owned();
                Ok(Some((Value::String(value), end + 2)))
            }
            None => Ok(None),
        },
        Some(b'{') => {
            let Some(end) = expression_end(s) else { return Ok(None) };
            match serde_json::from_str::<Value>(s[1..end].trim()) {
                Ok(v) if !v.is_array() && !v.is_object() => Ok(Some((v, end + 1))),
                _ => Err("only string, number, and boolean expressions are supported"),
            }
        }
        Some(b'>') => Err("missing attribute value"),
        Some(_) => {
            let end = s.char_indices()
                .find(|&(k, c)| match c {
                    '/' => s[k + 1..].starts_with('>'),
                    c => c.is_ascii_whitespace() || c == '>',
                })
                .map_or(s.len(), |(k, _)| k);

            if end == s.len() {
                return Ok(None);
            }

            Ok(Some((Value::String(s[..end].to_string()), end)))
        }
    }
}

/// Index of the `}` closing the `{` at the start of `s`, skipping over
/// quoted strings.
fn expression_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

fn name_length(s: &str) -> usize {
    if !s.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return 0;
    }

    s.find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'))
        .unwrap_or(s.len())
}

fn attr_name_length(s: &str) -> usize {
    if !s.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_' || c == ':') {
        return 0;
    }

    s.find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')))
        .unwrap_or(s.len())
}

fn skip_whitespace(s: &str, from: usize) -> usize {
    s[from..].find(|c: char| !c.is_ascii_whitespace())
        .map_or(s.len(), |k| from + k)
}

/// Decodes the five predefined entities. Anything else is left as written.
pub(crate) fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(i) = rest.find('&') {
        out.push_str(&rest[..i]);
        rest = &rest[i..];
        let (decoded, len) = [("&amp;", '&'), ("&lt;", '<'), ("&gt;", '>'), ("&quot;", '"'), ("&#39;", '\'')]
            .into_iter()
            .find(|(entity, _)| rest.starts_with(entity))
            .map_or(('&', 1), |(entity, c)| (c, entity.len()));

        out.push(decoded);
        rest = &rest[len..];
    }

    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn open(raw: &str) -> (String, Vec<(String, Value)>, bool) {
        match tokenize(raw).unwrap().as_slice() {
            [Token::Open { name, attrs, self_closing, .. }] => {
                let attrs = attrs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
                (name.to_string(), attrs, *self_closing)
            }
            other => panic!("expected one open tag, got {other:?}"),
        }
    }

    #[test]
    fn attribute_forms() {
        let (name, attrs, self_closing) = open(r#"<Tag tag="rust" count={3} current n='a &amp; b' flag={false} />"#);
        assert_eq!(name, "Tag");
        assert!(self_closing);
        assert_eq!(attrs, vec![
            ("tag".into(), json!("rust")),
            ("count".into(), json!(3)),
            ("current".into(), json!(true)),
            ("n".into(), json!("a & b")),
            ("flag".into(), json!(false)),
        ]);

        let (name, attrs, self_closing) = open("<Callout type=warning>");
        assert_eq!(name, "Callout");
        assert!(!self_closing);
        assert_eq!(attrs, vec![("type".into(), json!("warning"))]);
    }

    #[test]
    fn text_comments_and_closing_tags() {
        let tokens = tokenize("a <!-- note --> b </Callout>\n").unwrap();
        assert_eq!(tokens, vec![
            Token::Text("a "),
            Token::Comment,
            Token::Text(" b "),
            Token::Close { raw: "</Callout>", name: "Callout" },
            Token::Text("\n"),
        ]);

        assert_eq!(tokenize("1 < 2 <= 3").unwrap(), vec![Token::Text("1 < 2 <= 3")]);
    }

    #[test]
    fn partial_tags() {
        assert_eq!(tokenize("x <Image\n").unwrap(), vec![Token::Text("x "), Token::Partial("<Image\n")]);
        assert_eq!(tokenize("<Image src=\"a").unwrap(), vec![Token::Partial("<Image src=\"a")]);
        assert_eq!(tokenize("<!-- open").unwrap(), vec![Token::Partial("<!-- open")]);
    }

    #[test]
    fn malformed_components_are_errors() {
        assert!(tokenize("<Tag tag={[1, 2]} />").is_err());
        assert!(tokenize("<Tag tag= />").is_ok());
        assert!(tokenize("<Tag =x />").is_err());
        assert!(tokenize("</Callout extra>").is_err());
        assert!(tokenize("<div =x>").is_ok());
    }

    #[test]
    fn unquoted_values_may_contain_slashes() {
        let (_, attrs, self_closing) = open("<Image src=/images/a.png />");
        assert!(self_closing);
        assert_eq!(attrs, vec![("src".into(), json!("/images/a.png"))]);

        let (_, attrs, self_closing) = open("<Image src=/a.png/>");
        assert!(self_closing);
        assert_eq!(attrs, vec![("src".into(), json!("/a.png"))]);
    }

    #[test]
    fn component_only_tokens() {
        let tokens = tokenize_components("a <b> <Tag tag={1} /> 1 < 2").unwrap();
        assert_eq!(tokens[0], Token::Text("a <b> "));
        assert!(matches!(tokens[1], Token::Open { name: "Tag", self_closing: true, .. }));
        assert_eq!(tokens[2], Token::Text(" 1 < 2"));

        assert!(mentions_component("x </Callout>"));
        assert!(!mentions_component("a <b> and 1 <2"));
    }

    #[test]
    fn prop_checks() {
        let props = |v: Value| -> Props { serde_json::from_value(v).unwrap() };
        assert!(IMAGE.check(&props(json!({ "src": "/a.png" }))).is_ok());
        assert!(IMAGE.check(&props(json!({ "alt": "x" }))).unwrap_err().contains("`src`"));
        assert!(CALLOUT.check(&props(json!({}))).is_ok());
        assert!(CALLOUT.check(&props(json!({ "type": "danger" }))).is_ok());
        assert!(CALLOUT.check(&props(json!({ "type": "info" }))).is_err());
        assert!(CALLOUT.check(&props(json!({ "type": 1 }))).is_err());
    }

    #[test]
    fn urls() {
        assert!(is_safe_url("https://example.com"));
        assert!(is_safe_url("/images/a.png"));
        assert!(!is_safe_url("javascript:alert(1)"));
        assert!(!is_safe_url("  JavaScript:alert(1)"));
        assert!(!is_safe_url("java\tscript:alert(1)"));
    }

    #[test]
    fn standard_set() {
        assert_eq!(ComponentSet::standard().names(), ["Callout", "Image", "Tag"]);
        assert!(ComponentSet::standard().get("Foo").is_none());
    }
}
