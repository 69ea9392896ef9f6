//! Parser for generated statement code.
//!
//! Generated code is line oriented: one statement per line, blocks opened by
//! a trailing `:` and delimited by four-space indentation. Expressions reuse
//! the template expression grammar.

use qweb_expr::{ExprError, Expr, Parser, Target, Token, TokenKind};
use smol_str::SmolStr;
use std::rc::Rc;
use thiserror::Error;

const INDENT: usize = 4;

/// A syntax error in generated code.
#[derive(Debug, Clone, Error)]
#[error("line {line}: {message}")]
pub struct ProgramError {
    /// 1-based line.
    pub line: u32,
    pub message: String,
}

impl ProgramError {
    fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }

    fn expr(line: u32, error: ExprError) -> Self {
        Self::new(line, error.to_string())
    }
}

/// A parsed module: top-level statements, usually function definitions.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}

impl Program {
    /// Parse generated source.
    pub fn parse(source: &str) -> Result<Self, ProgramError> {
        let lines = split_lines(source)?;
        let mut pos = 0;
        let body = parse_block(&lines, &mut pos, 0)?;
        if let Some(line) = lines.get(pos) {
            return Err(ProgramError::new(line.number, "unexpected indent"));
        }
        Ok(Self { body })
    }

    /// Find a top-level function.
    pub fn function(&self, name: &str) -> Option<Rc<FunctionDef>> {
        self.body.iter().find_map(|stmt| match &stmt.kind {
            StmtKind::Def(def) if def.name == name => Some(def.clone()),
            _ => None,
        })
    }
}

/// A function definition.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: SmolStr,
    pub params: Vec<SmolStr>,
    pub body: Vec<Stmt>,
    pub line: u32,
}

/// A statement with its line number.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Def(Rc<FunctionDef>),
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        orelse: Vec<Stmt>,
    },
    For {
        target: Target,
        iter: Expr,
        body: Vec<Stmt>,
    },
    Assign {
        target: AssignTarget,
        value: Expr,
    },
    Yield(Expr),
    YieldFrom(Expr),
    Expr(Expr),
    Pass,
    Continue,
    Break,
}

/// Left-hand side of an assignment.
#[derive(Debug, Clone)]
pub enum AssignTarget {
    Name(SmolStr),
    Subscript { value: Expr, index: Expr },
    Tuple(Vec<AssignTarget>),
}

impl AssignTarget {
    fn from_expr(expr: Expr) -> Option<Self> {
        match expr {
            Expr::Name(name) => Some(Self::Name(name.id)),
            Expr::Subscript { value, index } => Some(Self::Subscript {
                value: *value,
                index: *index,
            }),
            Expr::Tuple(items) | Expr::List(items) => items
                .into_iter()
                .map(Self::from_expr)
                .collect::<Option<Vec<_>>>()
                .map(Self::Tuple),
            _ => None,
        }
    }
}

/// A non-blank source line.
struct Line<'a> {
    number: u32,
    depth: usize,
    text: &'a str,
}

fn split_lines(source: &str) -> Result<Vec<Line<'_>>, ProgramError> {
    let mut lines = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let number = index as u32 + 1;
        let text = raw.trim_start_matches(' ');
        if text.trim().is_empty() || text.starts_with('#') {
            continue;
        }
        if text.starts_with('\t') {
            return Err(ProgramError::new(number, "tabs are not allowed in indentation"));
        }
        let indent = raw.len() - text.len();
        if indent % INDENT != 0 {
            return Err(ProgramError::new(number, "unindent does not match any outer indentation level"));
        }
        lines.push(Line {
            number,
            depth: indent / INDENT,
            text: text.trim_end(),
        });
    }
    Ok(lines)
}

fn parse_block(lines: &[Line<'_>], pos: &mut usize, depth: usize) -> Result<Vec<Stmt>, ProgramError> {
    let mut body = Vec::new();
    while let Some(line) = lines.get(*pos) {
        if line.depth < depth {
            break;
        }
        if line.depth > depth {
            return Err(ProgramError::new(line.number, "unexpected indent"));
        }
        body.push(parse_statement(lines, pos, depth)?);
    }
    Ok(body)
}

/// Parse the indented block following a header line.
fn parse_suite(lines: &[Line<'_>], pos: &mut usize, depth: usize, header: u32) -> Result<Vec<Stmt>, ProgramError> {
    match lines.get(*pos) {
        Some(next) if next.depth == depth + 1 => parse_block(lines, pos, depth + 1),
        _ => Err(ProgramError::new(header, "expected an indented block")),
    }
}

fn parse_statement(lines: &[Line<'_>], pos: &mut usize, depth: usize) -> Result<Stmt, ProgramError> {
    let line = &lines[*pos];
    *pos += 1;
    let number = line.number;
    let tokens = qweb_expr::tokenize(line.text).map_err(|e| ProgramError::expr(number, e))?;
    let header = Header::new(line.text, &tokens, number);

    let kind = match header.first() {
        Some(TokenKind::Def) => {
            let (name, params) = header.def()?;
            let body = parse_suite(lines, pos, depth, number)?;
            StmtKind::Def(Rc::new(FunctionDef {
                name,
                params,
                body,
                line: number,
            }))
        }
        Some(TokenKind::If) => {
            let test = header.block_header()?;
            let mut branches = vec![(test, parse_suite(lines, pos, depth, number)?)];
            let mut orelse = Vec::new();
            while let Some(next) = lines.get(*pos).filter(|next| next.depth == depth) {
                let tokens = qweb_expr::tokenize(next.text).map_err(|e| ProgramError::expr(next.number, e))?;
                let clause = Header::new(next.text, &tokens, next.number);
                match clause.first() {
                    Some(TokenKind::Elif) => {
                        *pos += 1;
                        let test = clause.block_header()?;
                        branches.push((test, parse_suite(lines, pos, depth, next.number)?));
                    }
                    Some(TokenKind::Else) => {
                        *pos += 1;
                        clause.else_header()?;
                        orelse = parse_suite(lines, pos, depth, next.number)?;
                        break;
                    }
                    _ => break,
                }
            }
            StmtKind::If { branches, orelse }
        }
        Some(TokenKind::Elif | TokenKind::Else) => {
            return Err(ProgramError::new(number, "'elif' or 'else' without 'if'"));
        }
        Some(TokenKind::For) => {
            let (target, iter) = header.for_header()?;
            let body = parse_suite(lines, pos, depth, number)?;
            StmtKind::For { target, iter, body }
        }
        Some(TokenKind::Yield) => header.yield_statement()?,
        Some(TokenKind::Pass) => header.keyword(StmtKind::Pass)?,
        Some(TokenKind::Continue) => header.keyword(StmtKind::Continue)?,
        Some(TokenKind::Break) => header.keyword(StmtKind::Break)?,
        _ => header.simple_statement()?,
    };
    Ok(Stmt { kind, line: number })
}

/// Tokens of one line.
struct Header<'a> {
    source: &'a str,
    tokens: &'a [Token],
    line: u32,
}

impl<'a> Header<'a> {
    fn new(source: &'a str, tokens: &'a [Token], line: u32) -> Self {
        Self {
            source,
            tokens,
            line,
        }
    }

    fn first(&self) -> Option<TokenKind> {
        self.tokens.first().map(|t| t.kind)
    }

    fn error(&self, error: ExprError) -> ProgramError {
        ProgramError::expr(self.line, error)
    }

    /// Tokens between the leading keyword and the trailing colon.
    fn inner(&self) -> Result<&'a [Token], ProgramError> {
        match self.tokens.last() {
            Some(last) if last.kind == TokenKind::Colon && self.tokens.len() > 1 => {
                Ok(&self.tokens[1..self.tokens.len() - 1])
            }
            _ => Err(ProgramError::new(self.line, "expected ':'")),
        }
    }

    fn expression(&self, tokens: &[Token]) -> Result<Expr, ProgramError> {
        let mut parser = Parser::new(self.source, tokens);
        let expr = parser.test_list().map_err(|e| self.error(e))?;
        parser.expect_end().map_err(|e| self.error(e))?;
        Ok(expr)
    }

    fn def(&self) -> Result<(SmolStr, Vec<SmolStr>), ProgramError> {
        let inner = self.inner()?;
        let mut parser = Parser::new(self.source, inner);
        let name = parser.expect_name().map_err(|e| self.error(e))?;
        parser
            .expect(TokenKind::LParen, "'('")
            .map_err(|e| self.error(e))?;
        let mut params = Vec::new();
        while !parser.eat(TokenKind::RParen) {
            params.push(parser.expect_name().map_err(|e| self.error(e))?.id);
            if !parser.eat(TokenKind::Comma) {
                parser
                    .expect(TokenKind::RParen, "')'")
                    .map_err(|e| self.error(e))?;
                break;
            }
        }
        parser.expect_end().map_err(|e| self.error(e))?;
        Ok((name.id, params))
    }

    fn block_header(&self) -> Result<Expr, ProgramError> {
        let inner = self.inner()?;
        self.expression(inner)
    }

    fn else_header(&self) -> Result<(), ProgramError> {
        match self.tokens {
            [_, colon] if colon.kind == TokenKind::Colon => Ok(()),
            _ => Err(ProgramError::new(self.line, "expected ':' after 'else'")),
        }
    }

    fn for_header(&self) -> Result<(Target, Expr), ProgramError> {
        let inner = self.inner()?;
        let mut parser = Parser::new(self.source, inner);
        let target = parser.target_list().map_err(|e| self.error(e))?;
        parser
            .expect(TokenKind::In, "'in'")
            .map_err(|e| self.error(e))?;
        let iter = parser.test_list().map_err(|e| self.error(e))?;
        parser.expect_end().map_err(|e| self.error(e))?;
        Ok((target, iter))
    }

    fn yield_statement(&self) -> Result<StmtKind, ProgramError> {
        match self.tokens.get(1).map(|t| t.kind) {
            Some(TokenKind::From) => Ok(StmtKind::YieldFrom(self.expression(&self.tokens[2..])?)),
            Some(_) => Ok(StmtKind::Yield(self.expression(&self.tokens[1..])?)),
            None => Ok(StmtKind::Yield(Expr::Literal(qweb_expr::Literal::None))),
        }
    }

    fn keyword(&self, kind: StmtKind) -> Result<StmtKind, ProgramError> {
        if self.tokens.len() == 1 {
            Ok(kind)
        } else {
            let token = self.tokens[1];
            Err(ProgramError::new(
                self.line,
                format!("unexpected '{}'", token.text(self.source)),
            ))
        }
    }

    /// An assignment or a bare expression.
    fn simple_statement(&self) -> Result<StmtKind, ProgramError> {
        let mut depth = 0usize;
        let mut split = None;
        for (index, token) in self.tokens.iter().enumerate() {
            match token.kind {
                kind if kind.is_open_bracket() => depth += 1,
                kind if kind.is_close_bracket() => depth = depth.saturating_sub(1),
                TokenKind::Lambda if depth == 0 => break,
                TokenKind::Assign if depth == 0 => {
                    split = Some(index);
                    break;
                }
                _ => {}
            }
        }
        let Some(split) = split else {
            return Ok(StmtKind::Expr(self.expression(self.tokens)?));
        };
        let target = self.expression(&self.tokens[..split])?;
        let target = AssignTarget::from_expr(target)
            .ok_or_else(|| ProgramError::new(self.line, "cannot assign to expression"))?;
        let value = self.expression(&self.tokens[split + 1..])?;
        Ok(StmtKind::Assign { target, value })
    }
}
