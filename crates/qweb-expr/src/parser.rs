//! Recursive-descent parser for template expressions.
//!
//! The grammar is the Python expression subset templates are written in.
//! [`Parser`] works over a token slice so that callers parsing larger
//! constructs (generated statements) can drive it one expression at a time.

use crate::ast::*;
use crate::error::{ExprError, ExprResult};
use crate::literal::decode_string_literal;
use crate::token::{tokenize, Token, TokenKind};
use smol_str::SmolStr;
use source_map::Span;

/// Parse a complete expression. A top-level `a, b` is a tuple.
pub fn parse_expression(source: &str) -> ExprResult<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(source, &tokens);
    let expr = parser.test_list()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parser over a token slice.
pub struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Create a parser positioned at the first token.
    pub fn new(source: &'a str, tokens: &'a [Token]) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
        }
    }

    /// Check if all tokens are consumed.
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Peek at the next token.
    pub fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    /// Peek at the kind of the next token.
    pub fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    /// Peek at the kind of the token `n` positions ahead.
    pub fn peek_nth_kind(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind)
    }

    /// Consume the next token.
    pub fn bump(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    /// Consume the next token if it has the given kind.
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume a token of the given kind or fail.
    pub fn expect(&mut self, kind: TokenKind, what: &str) -> ExprResult<Token> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    /// Consume a name token or fail.
    pub fn expect_name(&mut self) -> ExprResult<Name> {
        let token = self.expect(TokenKind::Name, "a name")?;
        Ok(Name {
            id: token.text(self.source).into(),
            span: token.span,
        })
    }

    /// Fail unless all tokens are consumed.
    pub fn expect_end(&self) -> ExprResult<()> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(self.unexpected("end of expression"))
        }
    }

    /// Build the error for the token at the current position.
    pub fn unexpected(&self, expected: &str) -> ExprError {
        match self.peek() {
            Some(token) => ExprError::unexpected_token(expected, token.text(self.source), token.span),
            None => ExprError::unexpected_end(expected, self.source.len() as u32),
        }
    }

    /// Parse an expression, allowing a bare tuple `a, b`.
    pub fn test_list(&mut self) -> ExprResult<Expr> {
        let first = self.test()?;
        if self.peek_kind() != Some(TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(TokenKind::Comma) {
            if !self.peek_kind().is_some_and(starts_expression) {
                break;
            }
            items.push(self.test()?);
        }
        Ok(Expr::Tuple(items))
    }

    /// Parse one expression, including `lambda` and conditional expressions.
    pub fn test(&mut self) -> ExprResult<Expr> {
        if self.eat(TokenKind::Lambda) {
            return self.lambda();
        }
        let body = self.or_test()?;
        if !self.eat(TokenKind::If) {
            return Ok(body);
        }
        let test = self.or_test()?;
        self.expect(TokenKind::Else, "'else'")?;
        let orelse = self.test()?;
        Ok(Expr::IfExp {
            test: Box::new(test),
            body: Box::new(body),
            orelse: Box::new(orelse),
        })
    }

    /// Parse loop targets: `a`, `a, b` or `(a, (b, c))`.
    pub fn target_list(&mut self) -> ExprResult<Target> {
        let first = self.target()?;
        if self.peek_kind() != Some(TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(TokenKind::Comma) {
            if !matches!(self.peek_kind(), Some(TokenKind::Name | TokenKind::LParen)) {
                break;
            }
            items.push(self.target()?);
        }
        Ok(Target::Tuple(items))
    }

    fn target(&mut self) -> ExprResult<Target> {
        if self.eat(TokenKind::LParen) {
            let inner = self.target_list()?;
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(inner);
        }
        Ok(Target::Name(self.expect_name()?))
    }

    fn lambda(&mut self) -> ExprResult<Expr> {
        let mut params = Vec::new();
        while self.peek_kind() != Some(TokenKind::Colon) {
            let name = self.expect_name()?;
            let default = if self.eat(TokenKind::Assign) {
                Some(self.test()?)
            } else {
                None
            };
            params.push(Param { name, default });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Colon, "':'")?;
        let body = self.test()?;
        Ok(Expr::Lambda {
            params,
            body: Box::new(body),
        })
    }

    fn or_test(&mut self) -> ExprResult<Expr> {
        let mut left = self.and_test()?;
        while self.eat(TokenKind::Or) {
            let right = self.and_test()?;
            left = Expr::BoolOp {
                op: BoolOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn and_test(&mut self) -> ExprResult<Expr> {
        let mut left = self.not_test()?;
        while self.eat(TokenKind::And) {
            let right = self.not_test()?;
            left = Expr::BoolOp {
                op: BoolOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn not_test(&mut self) -> ExprResult<Expr> {
        if self.eat(TokenKind::Not) {
            let operand = self.not_test()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> ExprResult<Expr> {
        let left = self.arith()?;
        let mut ops = Vec::new();
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::EqEq) => CmpOp::Eq,
                Some(TokenKind::NotEq) => CmpOp::NotEq,
                Some(TokenKind::Lt) => CmpOp::Lt,
                Some(TokenKind::LtEq) => CmpOp::LtE,
                Some(TokenKind::Gt) => CmpOp::Gt,
                Some(TokenKind::GtEq) => CmpOp::GtE,
                Some(TokenKind::In) => CmpOp::In,
                Some(TokenKind::Not) if self.peek_nth_kind(1) == Some(TokenKind::In) => {
                    self.bump();
                    CmpOp::NotIn
                }
                Some(TokenKind::Is) if self.peek_nth_kind(1) == Some(TokenKind::Not) => {
                    self.bump();
                    CmpOp::IsNot
                }
                Some(TokenKind::Is) => CmpOp::Is,
                _ => break,
            };
            self.bump();
            ops.push((op, self.arith()?));
        }
        if ops.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare {
                left: Box::new(left),
                ops,
            })
        }
    }

    fn arith(&mut self) -> ExprResult<Expr> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.term()?;
            left = binary(op, left, right);
        }
    }

    fn term(&mut self) -> ExprResult<Expr> {
        let mut left = self.factor()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinOp::Mul,
                Some(TokenKind::Slash) => BinOp::Div,
                Some(TokenKind::DoubleSlash) => BinOp::FloorDiv,
                Some(TokenKind::Percent) => BinOp::Mod,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.factor()?;
            left = binary(op, left, right);
        }
    }

    fn factor(&mut self) -> ExprResult<Expr> {
        let op = match self.peek_kind() {
            Some(TokenKind::Minus) => UnaryOp::Neg,
            Some(TokenKind::Plus) => UnaryOp::Pos,
            _ => return self.power(),
        };
        self.bump();
        let operand = self.factor()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn power(&mut self) -> ExprResult<Expr> {
        let base = self.primary()?;
        if self.eat(TokenKind::DoubleStar) {
            let exponent = self.factor()?;
            return Ok(binary(BinOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> ExprResult<Expr> {
        let mut expr = self.atom()?;
        loop {
            if self.eat(TokenKind::LParen) {
                expr = self.call(expr)?;
            } else if self.eat(TokenKind::LBracket) {
                let index = self.subscript()?;
                self.expect(TokenKind::RBracket, "']'")?;
                expr = Expr::Subscript {
                    value: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat(TokenKind::Dot) {
                let attr = self.expect_name()?;
                expr = Expr::Attribute {
                    value: Box::new(expr),
                    attr: attr.id,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn call(&mut self, func: Expr) -> ExprResult<Expr> {
        let mut args = Vec::new();
        let mut kwargs: Vec<(SmolStr, Expr)> = Vec::new();
        while !self.eat(TokenKind::RParen) {
            if self.peek_kind() == Some(TokenKind::Name)
                && self.peek_nth_kind(1) == Some(TokenKind::Assign)
            {
                let name = self.expect_name()?;
                self.bump();
                kwargs.push((name.id, self.test()?));
            } else {
                if !kwargs.is_empty() {
                    return Err(self.unexpected("keyword argument"));
                }
                let arg = self.test()?;
                if self.peek_kind() == Some(TokenKind::For) {
                    let generators = self.comprehension()?;
                    args.push(Expr::ListComp {
                        element: Box::new(arg),
                        generators,
                    });
                } else {
                    args.push(arg);
                }
            }
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RParen, "')'")?;
                break;
            }
        }
        Ok(Expr::Call {
            func: Box::new(func),
            args,
            kwargs,
        })
    }

    fn subscript(&mut self) -> ExprResult<Expr> {
        let lower = if self.peek_kind() == Some(TokenKind::Colon) {
            None
        } else {
            Some(self.test()?)
        };
        if !self.eat(TokenKind::Colon) {
            return lower.ok_or_else(|| self.unexpected("subscript"));
        }
        let upper = match self.peek_kind() {
            Some(TokenKind::Colon | TokenKind::RBracket) => None,
            _ => Some(Box::new(self.test()?)),
        };
        let step = if self.eat(TokenKind::Colon) && self.peek_kind() != Some(TokenKind::RBracket) {
            Some(Box::new(self.test()?))
        } else {
            None
        };
        Ok(Expr::Slice {
            lower: lower.map(Box::new),
            upper,
            step,
        })
    }

    fn comprehension(&mut self) -> ExprResult<Vec<Comprehension>> {
        let mut generators = Vec::new();
        while self.eat(TokenKind::For) {
            let target = self.target_list()?;
            self.expect(TokenKind::In, "'in'")?;
            let iter = self.or_test()?;
            let mut ifs = Vec::new();
            while self.eat(TokenKind::If) {
                ifs.push(self.or_test()?);
            }
            generators.push(Comprehension { target, iter, ifs });
        }
        Ok(generators)
    }

    fn atom(&mut self) -> ExprResult<Expr> {
        let Some(token) = self.bump() else {
            return Err(self.unexpected("an expression"));
        };
        let text = token.text(self.source);
        match token.kind {
            TokenKind::Name => Ok(Expr::Name(Name {
                id: text.into(),
                span: token.span,
            })),
            TokenKind::None => Ok(Expr::Literal(Literal::None)),
            TokenKind::True => Ok(Expr::Literal(Literal::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(Literal::Bool(false))),
            TokenKind::Int => text
                .parse()
                .map(|n| Expr::Literal(Literal::Int(n)))
                .map_err(|_| ExprError::invalid_literal(text, token.span)),
            TokenKind::Float => text
                .parse()
                .map(|n| Expr::Literal(Literal::Float(n)))
                .map_err(|_| ExprError::invalid_literal(text, token.span)),
            TokenKind::Str => {
                let mut value = decode(text, token.span)?;
                while let Some(next) = self.peek().filter(|t| t.kind == TokenKind::Str) {
                    self.bump();
                    value.push_str(&decode(next.text(self.source), next.span)?);
                }
                Ok(Expr::Literal(Literal::Str(value)))
            }
            TokenKind::LParen => self.paren(),
            TokenKind::LBracket => self.list(),
            TokenKind::LBrace => self.dict(),
            _ => {
                self.pos -= 1;
                Err(self.unexpected("an expression"))
            }
        }
    }

    fn paren(&mut self) -> ExprResult<Expr> {
        if self.eat(TokenKind::RParen) {
            return Ok(Expr::Tuple(Vec::new()));
        }
        let first = self.test()?;
        if self.peek_kind() == Some(TokenKind::For) {
            let generators = self.comprehension()?;
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(Expr::ListComp {
                element: Box::new(first),
                generators,
            });
        }
        if self.eat(TokenKind::RParen) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(TokenKind::Comma) {
            if self.peek_kind() == Some(TokenKind::RParen) {
                break;
            }
            items.push(self.test()?);
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(Expr::Tuple(items))
    }

    fn list(&mut self) -> ExprResult<Expr> {
        if self.eat(TokenKind::RBracket) {
            return Ok(Expr::List(Vec::new()));
        }
        let first = self.test()?;
        if self.peek_kind() == Some(TokenKind::For) {
            let generators = self.comprehension()?;
            self.expect(TokenKind::RBracket, "']'")?;
            return Ok(Expr::ListComp {
                element: Box::new(first),
                generators,
            });
        }
        let mut items = vec![first];
        while self.eat(TokenKind::Comma) {
            if self.peek_kind() == Some(TokenKind::RBracket) {
                break;
            }
            items.push(self.test()?);
        }
        self.expect(TokenKind::RBracket, "']'")?;
        Ok(Expr::List(items))
    }

    fn dict(&mut self) -> ExprResult<Expr> {
        if self.eat(TokenKind::RBrace) {
            return Ok(Expr::Dict(Vec::new()));
        }
        let key = self.test()?;
        self.expect(TokenKind::Colon, "':'")?;
        let value = self.test()?;
        if self.peek_kind() == Some(TokenKind::For) {
            let generators = self.comprehension()?;
            self.expect(TokenKind::RBrace, "'}'")?;
            return Ok(Expr::DictComp {
                key: Box::new(key),
                value: Box::new(value),
                generators,
            });
        }
        let mut items = vec![(key, value)];
        while self.eat(TokenKind::Comma) {
            if self.peek_kind() == Some(TokenKind::RBrace) {
                break;
            }
            let key = self.test()?;
            self.expect(TokenKind::Colon, "':'")?;
            items.push((key, self.test()?));
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Expr::Dict(items))
    }
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn decode(text: &str, span: Span) -> ExprResult<String> {
    decode_string_literal(text).ok_or_else(|| ExprError::invalid_literal(text, span))
}

/// Check if a token can begin an expression.
pub fn starts_expression(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Name
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::Str
            | TokenKind::None
            | TokenKind::True
            | TokenKind::False
            | TokenKind::LParen
            | TokenKind::LBracket
            | TokenKind::LBrace
            | TokenKind::Minus
            | TokenKind::Plus
            | TokenKind::Not
            | TokenKind::Lambda
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExprErrorCode;

    fn name(id: &str, start: u32) -> Expr {
        Expr::Name(Name {
            id: id.into(),
            span: Span::new(start, start + id.len() as u32),
        })
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinOp::Add,
                left: Box::new(Expr::Literal(Literal::Int(1))),
                right: Box::new(Expr::Binary {
                    op: BinOp::Mul,
                    left: Box::new(Expr::Literal(Literal::Int(2))),
                    right: Box::new(Expr::Literal(Literal::Int(3))),
                }),
            }
        );
    }

    #[test]
    fn test_comparison_chain_and_not_in() {
        let expr = parse_expression("a not in b is not c").unwrap();
        match expr {
            Expr::Compare { left, ops } => {
                assert_eq!(*left, name("a", 0));
                assert_eq!(ops.len(), 2);
                assert_eq!(ops[0].0, CmpOp::NotIn);
                assert_eq!(ops[1].0, CmpOp::IsNot);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_conditional_and_lambda() {
        let expr = parse_expression("lambda x, y=1: x if y else -x").unwrap();
        match expr {
            Expr::Lambda { params, body } => {
                assert_eq!(params.len(), 2);
                assert!(params[1].default.is_some());
                assert!(matches!(*body, Expr::IfExp { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_trailers() {
        let expr = parse_expression("a.b[0](1, key=2)").unwrap();
        match expr {
            Expr::Call { func, args, kwargs } => {
                assert_eq!(args.len(), 1);
                assert_eq!(kwargs[0].0, "key");
                assert!(matches!(*func, Expr::Subscript { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_comprehensions() {
        assert!(matches!(
            parse_expression("[x * 2 for x in xs if x]").unwrap(),
            Expr::ListComp { .. }
        ));
        assert!(matches!(
            parse_expression("{k: v for k, v in d.items()}").unwrap(),
            Expr::DictComp { .. }
        ));
        match parse_expression("sum(x for x in xs)").unwrap() {
            Expr::Call { args, .. } => assert!(matches!(args[0], Expr::ListComp { .. })),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_containers_and_slices() {
        assert_eq!(parse_expression("()").unwrap(), Expr::Tuple(vec![]));
        assert_eq!(
            parse_expression("(1,)").unwrap(),
            Expr::Tuple(vec![Expr::Literal(Literal::Int(1))])
        );
        assert!(matches!(parse_expression("{'a': 1, 'b': 2}").unwrap(), Expr::Dict(items) if items.len() == 2));
        assert!(matches!(
            parse_expression("s[1:]").unwrap(),
            Expr::Subscript { index, .. } if matches!(*index, Expr::Slice { upper: None, .. })
        ));
        assert!(matches!(parse_expression("a, b").unwrap(), Expr::Tuple(items) if items.len() == 2));
    }

    #[test]
    fn test_adjacent_strings() {
        assert_eq!(
            parse_expression("'a' \"b\"").unwrap(),
            Expr::Literal(Literal::Str("ab".into()))
        );
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(parse_expression("1 +").unwrap_err().code, ExprErrorCode::UnexpectedEnd);
        assert_eq!(parse_expression("a b").unwrap_err().code, ExprErrorCode::UnexpectedToken);
        assert_eq!(parse_expression("f(a=1, 2)").unwrap_err().code, ExprErrorCode::UnexpectedToken);
        assert!(parse_expression("(1, 2").is_err());
        assert!(parse_expression("99999999999999999999").is_err());
    }
}
