//! String literal encoding and decoding.

/// Quote `value` as a single-quoted string literal.
///
/// The literal never spans lines, so it is safe to embed in one generated
/// line.
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Decode the body of a quoted literal, quotes included.
///
/// Returns `None` when an escape sequence is malformed.
pub fn decode_string_literal(quoted: &str) -> Option<String> {
    let body = quoted.get(1..quoted.len().checked_sub(1)?)?;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '0' => out.push('\0'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'x' => out.push(read_hex(&mut chars, 2)?),
            'u' => out.push(read_hex(&mut chars, 4)?),
            'U' => out.push(read_hex(&mut chars, 8)?),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Some(out)
}

fn read_hex(chars: &mut std::str::Chars<'_>, digits: usize) -> Option<char> {
    let hex: String = chars.by_ref().take(digits).collect();
    if hex.len() != digits {
        return None;
    }
    char::from_u32(u32::from_str_radix(&hex, 16).ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal("plain"), "'plain'");
        assert_eq!(string_literal("it's\n"), r"'it\'s\n'");
        assert_eq!(string_literal("a\\b"), r"'a\\b'");
        assert_eq!(string_literal("\u{1}"), r"'\x01'");
        assert_eq!(string_literal("é"), "'é'");
    }

    #[test]
    fn test_decode_string_literal() {
        assert_eq!(decode_string_literal(r"'it\'s\n'").as_deref(), Some("it's\n"));
        assert_eq!(decode_string_literal(r#""\x41é""#).as_deref(), Some("Aé"));
        assert_eq!(decode_string_literal(r"'\d'").as_deref(), Some("\\d"));
        assert_eq!(decode_string_literal(r"'\x4'"), None);
    }

    #[test]
    fn test_literal_survives_decoding() {
        let value = "<a href=\"x\">'q'</a>\n\t\\";
        assert_eq!(decode_string_literal(&string_literal(value)).as_deref(), Some(value));
    }
}
