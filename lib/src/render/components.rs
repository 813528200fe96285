use std::borrow::Cow;

use serde_json::Value;

use crate::error::Result;
use crate::markdown::Props;
use crate::render::{attr, escape};
use crate::util::slugify_tag;

/// A prop as display text. Scalars are stringified; anything else is `None`.
fn text<'p>(props: &'p Props, name: &str) -> Option<Cow<'p, str>> {
    match props.get(name)? {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        _ => None,
    }
}

fn required<'p>(props: &'p Props, component: &str, name: &str) -> Result<Cow<'p, str>> {
    text(props, name).ok_or_else(|| error! {
        "missing required prop",
        "component" => component,
        "prop" => name,
    })
}

fn flag(props: &Props, name: &str) -> bool {
    match props.get(name) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

/// `<Image src="..." alt="..." />`: a lazily loaded image with an optional
/// caption taken from `alt`.
pub fn image(props: &Props, _: Option<&str>, out: &mut String) -> Result<()> {
    let src = required(props, "Image", "src")?;
    let alt = text(props, "alt").unwrap_or_default();

    out.push_str("<figure class=\"image\"><img");
    attr(out, "src", &src)?;
    attr(out, "alt", &alt)?;
    out.push_str(" loading=\"lazy\" />");
    if !alt.is_empty() {
        out.push_str("<figcaption>");
        escape(out, &alt)?;
        out.push_str("</figcaption>");
    }

    out.push_str("</figure>");
    Ok(())
}

/// `<Callout type="warning" title="...">...</Callout>`. `type` defaults to
/// `default`.
pub fn callout(props: &Props, children: Option<&str>, out: &mut String) -> Result<()> {
    let kind = text(props, "type");
    let kind = match kind.as_deref() {
        Some(kind @ ("warning" | "danger")) => kind,
        _ => "default",
    };

    out.push_str("<div");
    attr(out, "class", &format!("callout callout-{kind}"))?;
    out.push('>');
    if let Some(title) = text(props, "title").filter(|t| !t.is_empty()) {
        out.push_str("<p class=\"callout-title\">");
        escape(out, &title)?;
        out.push_str("</p>");
    }

    out.push_str(children.unwrap_or_default());
    out.push_str("</div>\n");
    Ok(())
}

/// `<Tag tag="..." count={3} current />`: a chip linking to the tag's page.
pub fn tag(props: &Props, _: Option<&str>, out: &mut String) -> Result<()> {
    let tag = required(props, "Tag", "tag")?;
    let class = match flag(props, "current") {
        true => "tag current",
        false => "tag",
    };

    out.push_str("<a");
    attr(out, "class", class)?;
    attr(out, "href", &format!("/tags/{}", slugify_tag(&tag)))?;
    out.push('>');
    escape(out, &tag)?;
    if let Some(count) = text(props, "count") {
        out.push_str("<span class=\"tag-count\">");
        escape(out, &count)?;
        out.push_str("</span>");
    }

    out.push_str("</a>");
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn props(value: Value) -> Props {
        serde_json::from_value(value).unwrap()
    }

    fn run(f: fn(&Props, Option<&str>, &mut String) -> Result<()>, value: Value, children: Option<&str>) -> String {
        let mut out = String::new();
        f(&props(value), children, &mut out).unwrap();
        out
    }

    #[test]
    fn image_escapes_attributes() {
        let out = run(image, json!({ "src": "/a b.png", "alt": "A \"quote\"" }), None);
        assert_eq!(out, "<figure class=\"image\"><img src=\"/a%20b.png\" alt=\"A &quot;quote&quot;\" loading=\"lazy\" />\
            <figcaption>A &quot;quote&quot;</figcaption></figure>");

        let mut out = String::new();
        assert!(image(&Props::new(), None, &mut out).is_err());
    }

    #[test]
    fn callout_kinds() {
        let out = run(callout, json!({}), Some("<p>x</p>"));
        assert_eq!(out, "<div class=\"callout callout-default\"><p>x</p></div>\n");

        let out = run(callout, json!({ "type": "danger", "title": "<b>" }), None);
        assert_eq!(out, "<div class=\"callout callout-danger\"><p class=\"callout-title\">&lt;b&gt;</p></div>\n");
    }

    #[test]
    fn tag_chips() {
        let out = run(tag, json!({ "tag": "Next.js", "current": true }), None);
        assert_eq!(out, "<a class=\"tag current\" href=\"/tags/nextjs\">Next.js</a>");

        let out = run(tag, json!({ "tag": "rust", "count": 2 }), None);
        assert_eq!(out, "<a class=\"tag\" href=\"/tags/rust\">rust<span class=\"tag-count\">2</span></a>");
    }
}
