mod macros;

pub use macros::*;

/// Convert spaces to hyphens. Remove characters that aren't alphanumerics,
/// underscores, or hyphens. Convert to lowercase. Also strip leading and
/// trailing whitespace. Used for heading anchors.
pub fn slugify(string: &str) -> String {
    let mut output = String::with_capacity(string.len());

    let mut need_dash = false;
    for ch in string.chars() {
        let ascii = match ch.is_whitespace() {
            true => " ",
            false => deunicode::deunicode_char(ch).unwrap_or("-"),
        };

        for b in ascii.bytes() {
            match b {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' => {
                    if need_dash {
                        output.push('-');
                        need_dash = false;
                    }

                    output.push(b.to_ascii_lowercase() as char);
                }
                _ => {
                    // All sequences of characters not alphanumeric or `_` are
                    // converted into one `-`.
                    need_dash = !output.is_empty();
                }
            }
        }
    }

    output
}

/// The slug of a tag as it appears in tag routes (`/tags/<slug>`).
///
/// Unlike [`slugify()`], this is not a normalizing transform: it lowercases,
/// turns every single space into `-`, keeps alphanumerics (any script), `-`
/// and `_`, and drops everything else. Runs of spaces are not collapsed and
/// nothing is trimmed, so `"a  b"` becomes `"a--b"`.
pub fn slugify_tag(tag: &str) -> String {
    let mut output = String::with_capacity(tag.len());
    for ch in tag.chars().flat_map(char::to_lowercase) {
        match ch {
            ' ' => output.push('-'),
            '-' | '_' => output.push(ch),
            c if c.is_alphanumeric() => output.push(c),
            _ => { }
        }
    }

    output
}

/// Whether a file or directory name marks content that is never built:
/// dotfiles and `_`-prefixed drafts/partials.
pub fn is_hidden(file_name: &str) -> bool {
    file_name.starts_with('.') || file_name.starts_with('_')
}
