use std::fmt::Write;

use once_cell::sync::Lazy;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

/// Loads the syntax definitions in the background so the first highlighted
/// document doesn't pay for it.
#[inline]
pub fn warm_up() {
    rayon::spawn(|| { Lazy::force(&SYNTAX_SET); });
}

fn syntax(lang: Option<&str>) -> &'static SyntaxReference {
    lang.and_then(|lang| SYNTAX_SET.find_syntax_by_token(lang))
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text())
}

/// Highlights `code` into class-based spans wrapped in a line-numbered block.
/// Unknown languages are highlighted as plain text. Returns `None` if the
/// highlighter fails, in which case the caller falls back to escaped text.
pub fn highlight(lang: Option<&str>, code: &str) -> Option<String> {
    let syntax = syntax(lang);
    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, ClassStyle::Spaced);

    let mut lines = 0;
    for line in LinesWithEndings::from(code) {
        if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
            log::warn!("failed to highlight {} code block: {e}", syntax.name);
            return None;
        }

        lines += 1;
    }

    Some(code_div(lines, &generator.finalize()))
}

#[allow(unused_must_use)]
fn code_div(lines: usize, code: &str) -> String {
    let mut div = String::with_capacity(code.len() + 64 + lines * 4);
    write!(&mut div, "<div class=\"code\" style=\"display: flex;\">");

    write!(&mut div, "<pre class=\"line-nums\">");
    for i in 1..=lines {
        if i < lines { writeln!(&mut div, "{i}"); }
        else { write!(&mut div, "{i}"); }
    }
    write!(&mut div, "</pre>");

    write!(&mut div, "<pre class=\"code\">{code}</pre>");
    write!(&mut div, "</div>");

    div
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlighted_with_gutter() {
        let html = highlight(Some("rust"), "fn main() {\n    <b>\n}\n").unwrap();
        assert!(html.starts_with("<div class=\"code\""));
        assert!(html.contains("<pre class=\"line-nums\">1\n2\n3</pre>"));
        assert!(html.contains("<span class=\"source rust\">"));
        assert!(html.contains("&lt;"));
        assert!(html.contains("&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn unknown_language_is_plain_text() {
        let html = highlight(Some("no-such-language"), "<script>\n").unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert_eq!(highlight(None, "x\n"), highlight(Some("no-such-language"), "x\n"));
    }
}
