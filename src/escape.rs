use std::borrow::Cow;

use crate::lexer::is_hex_digit;
use crate::lexer::is_white_space;
use crate::lexer::C_REVERSE_SOLIDUS;

fn is_single_escape(c: char) -> bool {
    matches!(c, ' '..=',' | '.' | '/' | ':'..='@' | '[' | ']' | '^' | '`' | '{'..='~')
        || c == C_REVERSE_SOLIDUS
}

fn is_control(c: char) -> bool {
    matches!(c, '\0'..='\u{1f}' | '\u{7f}')
}

fn needs_escape(c: char) -> bool {
    is_single_escape(c) || is_control(c)
}

/// Escapes `input` into the text of a CSS identifier. NUL has no escape and becomes
/// U+FFFD.
pub fn escape_identifier(input: &str) -> Cow<'_, str> {
    let mut chars = input.chars();
    let Some(first) = chars.next() else {
        return Cow::Borrowed(input);
    };
    let second = chars.next();
    let dashed_start =
        first == '-' && second.map_or(true, |c| c == '-' || c.is_ascii_digit());
    if !dashed_start && !first.is_ascii_digit() && !input.chars().any(needs_escape) {
        return Cow::Borrowed(input);
    }

    let mut output = String::with_capacity(input.len() + 8);
    let mut iter = input.chars().peekable();
    if dashed_start {
        output.push_str("\\-");
        iter.next();
    } else if first.is_ascii_digit() {
        iter.next();
        push_hex_escape(&mut output, first as u32, iter.peek().copied());
    }
    while let Some(c) = iter.next() {
        if c == '\0' {
            output.push(char::REPLACEMENT_CHARACTER);
        } else if is_control(c) {
            push_hex_escape(&mut output, c as u32, iter.peek().copied());
        } else if is_single_escape(c) {
            output.push(C_REVERSE_SOLIDUS);
            output.push(c);
        } else {
            output.push(c);
        }
    }
    Cow::Owned(output)
}

// The trailing space is only kept when the next output char would continue the escape.
fn push_hex_escape(output: &mut String, code: u32, next: Option<char>) {
    output.push(C_REVERSE_SOLIDUS);
    output.push_str(&format!("{code:X}"));
    if matches!(next, Some(c) if is_hex_digit(c)) {
        output.push(' ');
    }
}

/// Resolves CSS escapes in identifier text.
pub fn unescape_identifier(input: &str) -> Cow<'_, str> {
    if !input.contains(C_REVERSE_SOLIDUS) {
        return Cow::Borrowed(input);
    }
    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(index) = rest.find(C_REVERSE_SOLIDUS) {
        output.push_str(&rest[..index]);
        rest = &rest[index + 1..];
        let hex_len = rest
            .bytes()
            .take(6)
            .take_while(|b| b.is_ascii_hexdigit())
            .count();
        if hex_len > 0 {
            let decoded = u32::from_str_radix(&rest[..hex_len], 16)
                .ok()
                .and_then(char::from_u32);
            output.push(match decoded {
                Some('\0') | None => char::REPLACEMENT_CHARACTER,
                Some(c) => c,
            });
            rest = &rest[hex_len..];
            if let Some(after) = rest.strip_prefix("\r\n") {
                rest = after;
            } else if rest.starts_with(is_white_space) {
                rest = &rest[1..];
            }
        } else if let Some(c) = rest.chars().next() {
            output.push(c);
            rest = &rest[c.len_utf8()..];
        } else {
            output.push(C_REVERSE_SOLIDUS);
        }
    }
    output.push_str(rest);
    Cow::Owned(output)
}

/// Normalizes the request of a `url()` or a string url: line continuations are dropped
/// (strings only), whitespace is trimmed, escapes are resolved, and percent escapes are
/// decoded for everything except `data:` urls.
pub fn normalize_url(value: &str, is_string: bool) -> Cow<'_, str> {
    let mut value = Cow::Borrowed(value);
    if is_string && value.contains(C_REVERSE_SOLIDUS) {
        value = Cow::Owned(
            value
                .replace("\\\r\n", "")
                .replace("\\\n", "")
                .replace("\\\r", "")
                .replace("\\\u{c}", ""),
        );
    }
    let value = match value {
        Cow::Borrowed(v) => Cow::Borrowed(v.trim_matches(is_white_space)),
        Cow::Owned(v) => Cow::Owned(v.trim_matches(is_white_space).to_string()),
    };
    let value = match value {
        Cow::Borrowed(v) => unescape_identifier(v),
        Cow::Owned(v) => Cow::Owned(unescape_identifier(&v).into_owned()),
    };
    if !value.contains('%') || is_data_url(&value) {
        return value;
    }
    match percent_decode(&value) {
        Some(decoded) => Cow::Owned(decoded),
        None => value,
    }
}

fn is_data_url(value: &str) -> bool {
    value
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// Decodes `%XX` sequences. Fails like `decodeURIComponent` on a malformed sequence or
/// when the decoded bytes aren't UTF-8.
fn percent_decode(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let high = (*bytes.get(i + 1)? as char).to_digit(16)?;
            let low = (*bytes.get(i + 2)? as char).to_digit(16)?;
            result.push((high * 16 + low) as u8);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(result).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_plain_identifier_is_borrowed() {
        assert!(matches!(escape_identifier("foo-bar_1"), Cow::Borrowed("foo-bar_1")));
        assert!(matches!(escape_identifier(""), Cow::Borrowed("")));
    }

    #[test]
    fn escape_special_chars() {
        assert_eq!(escape_identifier("a.b"), "a\\.b");
        assert_eq!(escape_identifier("a/b:c"), "a\\/b\\:c");
        assert_eq!(escape_identifier("a b"), "a\\ b");
        assert_eq!(escape_identifier("a\\b"), "a\\\\b");
        assert_eq!(escape_identifier("[x]"), "\\[x\\]");
    }

    #[test]
    fn escape_leading_digit_and_dash() {
        assert_eq!(escape_identifier("1x"), "\\31x");
        assert_eq!(escape_identifier("1a"), "\\31 a");
        assert_eq!(escape_identifier("1"), "\\31");
        assert_eq!(escape_identifier("-1"), "\\-1");
        assert_eq!(escape_identifier("--a"), "\\--a");
        assert_eq!(escape_identifier("-a"), "-a");
        assert_eq!(escape_identifier("-"), "\\-");
    }

    #[test]
    fn escape_control_chars() {
        assert_eq!(escape_identifier("a\u{1}b"), "a\\1 b");
        assert_eq!(escape_identifier("a\u{7f}"), "a\\7F");
        assert_eq!(escape_identifier("a\u{1f}z"), "a\\1Fz");
        assert_eq!(escape_identifier("\0"), "\u{FFFD}");
        assert_eq!(escape_identifier("a\nb"), "a\\A b");
        assert_eq!(escape_identifier("a\nz"), "a\\Az");
        assert_eq!(escape_identifier("a\t"), "a\\9");
        assert_eq!(escape_identifier("a\n "), "a\\A\\ ");
    }

    #[test]
    fn unescape_hex() {
        assert_eq!(unescape_identifier("\\31 a"), "1a");
        assert_eq!(unescape_identifier("\\31x"), "1x");
        assert_eq!(unescape_identifier("a\\A b"), "a\nb");
        assert_eq!(unescape_identifier("\\1F600"), "\u{1F600}");
        assert_eq!(unescape_identifier("\\000041B"), "AB");
    }

    #[test]
    fn unescape_invalid_code_points() {
        assert_eq!(unescape_identifier("\\0"), "\u{FFFD}");
        assert_eq!(unescape_identifier("\\D800"), "\u{FFFD}");
        assert_eq!(unescape_identifier("\\110000"), "\u{FFFD}");
    }

    #[test]
    fn unescape_literal_chars() {
        assert!(matches!(unescape_identifier("plain"), Cow::Borrowed("plain")));
        assert_eq!(unescape_identifier("a\\.b"), "a.b");
        assert_eq!(unescape_identifier("a\\\\b"), "a\\b");
        assert_eq!(unescape_identifier("a\\"), "a\\");
    }

    #[test]
    fn normalize() {
        assert_eq!(normalize_url(" foo.png ", false), "foo.png");
        assert_eq!(normalize_url("a\\\nb.png", true), "ab.png");
        assert_eq!(normalize_url("a\\\nb.png", false), "a\nb.png");
        assert_eq!(normalize_url("img%20name.png", false), "img name.png");
        assert_eq!(normalize_url("bad%zz.png", false), "bad%zz.png");
        assert_eq!(
            normalize_url("data:image/svg+xml;utf8,%3Csvg%3E", false),
            "data:image/svg+xml;utf8,%3Csvg%3E"
        );
        assert_eq!(normalize_url("\\66oo.png", true), "foo.png");
    }
}
