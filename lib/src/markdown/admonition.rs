//! Admonition shorthand. A line `!kind` or `!kind: Title` followed by lines
//! indented by two spaces becomes a `Callout`:
//!
//! ```text
//! !warning: Mind the gap
//!   The indented body is regular markdown.
//!
//! Back to the document.
//! ```
//!
//! `warning`/`caution` map to a warning callout, `danger`/`error` to a danger
//! callout, and any other kind to the default one.

use std::borrow::Cow;
use std::fmt::Write;

use crate::error::Result;

#[derive(Default, Clone)]
pub struct Admonition;

impl crate::markdown::Plugin for Admonition {
    fn preprocess<'a>(&self, input: &'a str) -> Result<Cow<'a, str>> {
        let lines: Vec<&str> = input.split_inclusive('\n').collect();
        if !lines.iter().any(|line| parse_header(line).is_some()) {
            return Ok(Cow::Borrowed(input));
        }

        let mut output = String::with_capacity(input.len() + 64);
        let mut fence: Option<&str> = None;
        let mut changed = false;
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            i += 1;

            if let Some(marker) = fence_marker(line) {
                match fence {
                    None => fence = Some(marker),
                    Some(open) if marker.starts_with(open) => fence = None,
                    Some(_) => {}
                }
            }

            let header = match fence {
                None => parse_header(line),
                Some(_) => None,
            };

            let Some((kind, title)) = header else {
                output.push_str(line);
                continue;
            };

            let start = i;
            while i < lines.len() && (lines[i].trim().is_empty() || lines[i].starts_with("  ")) {
                i += 1;
            }

            let mut end = i;
            while end > start && lines[end - 1].trim().is_empty() {
                end -= 1;
            }

            if !output.is_empty() && !output.ends_with("\n\n") {
                if !output.ends_with('\n') {
                    output.push('\n');
                }

                output.push('\n');
            }

            let _ = write!(output, r#"<Callout type="{}""#, callout_type(kind));
            if !title.is_empty() {
                let _ = write!(output, r#" title="{}""#, escape_attr(title));
            }

            output.push_str(">\n\n");
            for line in &lines[start..end] {
                output.push_str(line.strip_prefix("  ").unwrap_or(line));
            }

            if !output.ends_with('\n') {
                output.push('\n');
            }

            output.push_str("\n</Callout>\n\n");
            changed = true;
        }

        Ok(match changed {
            true => Cow::Owned(output),
            false => Cow::Borrowed(input),
        })
    }
}

/// Returns `(kind, title)` if `line` opens an admonition.
fn parse_header(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('!')?;
    if !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }

    let name_end = rest.find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());

    let (kind, rest) = rest.split_at(name_end);
    let rest = rest.trim_end();
    match rest.strip_prefix(':') {
        Some(title) => Some((kind, title.trim())),
        None if rest.is_empty() => Some((kind, "")),
        None => None,
    }
}

fn callout_type(kind: &str) -> &'static str {
    match kind.to_ascii_lowercase().as_str() {
        "warning" | "caution" => "warning",
        "danger" | "error" => "danger",
        _ => "default",
    }
}

/// The opening run of backticks or tildes if `line` is a code fence.
fn fence_marker(line: &str) -> Option<&str> {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return None;
    }

    let c = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = trimmed.find(|x: char| x != c).unwrap_or(trimmed.len());
    (run >= 3).then(|| &trimmed[..run])
}

fn escape_attr(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '"', '<', '>']) {
        return Cow::Borrowed(value);
    }

    Cow::Owned(value.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::Plugin;

    fn run(input: &str) -> String {
        Admonition.preprocess(input).unwrap().into_owned()
    }

    #[test]
    fn rewrites_to_callout() {
        assert_eq!(
            run("!warning: Mind \"this\"\n  Body text\n  more.\n\nAfter\n"),
            "<Callout type=\"warning\" title=\"Mind &quot;this&quot;\">\n\nBody text\nmore.\n\n</Callout>\n\nAfter\n"
        );
    }

    #[test]
    fn kinds_and_bare_headers() {
        assert_eq!(run("Intro\n!note\n"), "Intro\n\n<Callout type=\"default\">\n\n\n</Callout>\n\n");
        assert!(run("!DANGER: x\n").starts_with("<Callout type=\"danger\""));
    }

    #[test]
    fn leaves_other_text_alone() {
        let input = "![image](a.png)\n!important point\n```\n!warning: in code\n```\n";
        assert!(matches!(Admonition.preprocess(input).unwrap(), Cow::Borrowed(_)));
        assert_eq!(run("```\n!warning: in code\n```\n"), "```\n!warning: in code\n```\n");
    }
}
