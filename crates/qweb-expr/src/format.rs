//! Compilation of interpolated strings.
//!
//! `#{expr}` and `{{expr}}` embed expressions in literal text. The result is a
//! single expression: the bare literal when nothing is interpolated, otherwise
//! `'<literal with {} slots>'.format(to_text(<expr>), ...)`.

use crate::error::ExprResult;
use crate::literal::string_literal;
use crate::rewrite::rewrite;
use once_cell::sync::Lazy;
use regex::Regex;

static FORMAT_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?:#\{(.+?)\})|(?:\{\{(.+?)\}\})").ok());

/// Compile an interpolated string into an expression.
pub fn compile_format(template: &str) -> ExprResult<String> {
    let mut literal = String::with_capacity(template.len());
    let mut args = Vec::new();
    let mut last = 0;
    let Some(re) = FORMAT_REGEX.as_ref() else {
        return Ok(string_literal(template));
    };

    for captures in re.captures_iter(template) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let Some(body) = captures.get(1).or_else(|| captures.get(2)) else {
            continue;
        };
        literal.push_str(&escape_braces(&template[last..whole.start()]));
        literal.push_str("{}");
        args.push(format!("to_text({})", rewrite(body.as_str().trim(), false)?));
        last = whole.end();
    }

    if args.is_empty() {
        return Ok(string_literal(template));
    }
    literal.push_str(&escape_braces(&template[last..]));
    Ok(format!("{}.format({})", string_literal(&literal), args.join(", ")))
}

/// Check if a string contains any interpolation.
pub fn has_interpolation(template: &str) -> bool {
    FORMAT_REGEX.as_ref().is_some_and(|re| re.is_match(template))
}

fn escape_braces(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_literal() {
        assert_eq!(compile_format("hello {world}").unwrap(), "'hello {world}'");
        assert!(!has_interpolation("hello {world}"));
    }

    #[test]
    fn test_both_syntaxes() {
        insta::assert_snapshot!(
            compile_format("a #{x} b {{ y.z }} {c}").unwrap(),
            @"'a {} b {} {{c}}'.format(to_text(values.get('x')), to_text(values['y'].z))"
        );
    }

    #[test]
    fn test_interpolation_not_rescanned() {
        assert_eq!(
            compile_format("#{'{{'}}").unwrap(),
            "'{}}}'.format(to_text('{{'))"
        );
    }

    #[test]
    fn test_only_interpolation() {
        assert_eq!(compile_format("{{n}}").unwrap(), "'{}'.format(to_text(values.get('n')))");
    }

    #[test]
    fn test_bad_expression() {
        assert!(compile_format("#{a +}").is_err());
    }
}
