//! Tokenizer for template expressions and generated statements.

use crate::error::{ExprError, ExprResult};
use logos::Logos;
use source_map::Span;

/// Kinds of tokens.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("in")]
    In,
    #[token("is")]
    Is,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("lambda")]
    Lambda,
    #[token("None")]
    None,
    #[token("True")]
    True,
    #[token("False")]
    False,
    #[token("def")]
    Def,
    #[token("yield")]
    Yield,
    #[token("from")]
    From,
    #[token("pass")]
    Pass,
    #[token("continue")]
    Continue,
    #[token("break")]
    Break,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Name,
    #[regex(r"[0-9]+")]
    Int,
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+")]
    Float,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r#"'([^'\\\n]|\\.)*'"#)]
    Str,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("=")]
    Assign,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    DoubleStar,
    #[token("/")]
    Slash,
    #[token("//")]
    DoubleSlash,
    #[token("%")]
    Percent,
}

impl TokenKind {
    /// Check if this kind opens a bracketed region.
    pub fn is_open_bracket(self) -> bool {
        matches!(self, Self::LParen | Self::LBracket | Self::LBrace)
    }

    /// Check if this kind closes a bracketed region.
    pub fn is_close_bracket(self) -> bool {
        matches!(self, Self::RParen | Self::RBracket | Self::RBrace)
    }
}

/// A token with its position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// The token kind.
    pub kind: TokenKind,
    /// Byte span in the source.
    pub span: Span,
}

impl Token {
    /// The source text of this token.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.to_range()]
    }
}

/// Tokenize a source string.
pub fn tokenize(source: &str) -> ExprResult<Vec<Token>> {
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = Span::from_range(lexer.span());
        match result {
            Ok(kind) => tokens.push(Token { kind, span }),
            Err(()) => return Err(ExprError::invalid_token(lexer.slice(), span)),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_and_names() {
        assert_eq!(
            kinds("not x in lambda_ or None"),
            vec![
                TokenKind::Not,
                TokenKind::Name,
                TokenKind::In,
                TokenKind::Name,
                TokenKind::Or,
                TokenKind::None
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 1.5 .5 2e3 3."),
            vec![
                TokenKind::Int,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Float
            ]
        );
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            kinds("a ** b // c == d <= e = f"),
            vec![
                TokenKind::Name,
                TokenKind::DoubleStar,
                TokenKind::Name,
                TokenKind::DoubleSlash,
                TokenKind::Name,
                TokenKind::EqEq,
                TokenKind::Name,
                TokenKind::LtEq,
                TokenKind::Name,
                TokenKind::Assign,
                TokenKind::Name
            ]
        );
    }

    #[test]
    fn test_strings_with_escapes() {
        let source = r#"'it\'s' "a\"b""#;
        let tokens = tokenize(source).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text(source), r"'it\'s'");
        assert_eq!(tokens[1].text(source), r#""a\"b""#);
    }

    #[test]
    fn test_invalid_token() {
        let err = tokenize("a ? b").unwrap_err();
        assert_eq!(err.span, Span::new(2, 3));
        assert!(tokenize("'unterminated").is_err());
    }
}
