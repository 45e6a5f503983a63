//! Recursive-descent parser for normalized rating expressions.
//!
//! Precedence, loosest first:
//!
//! ```text
//! conditional   t if c else e
//! or
//! and
//! not
//! comparison    == != <> < <= > >=   (at most one per operand pair)
//! additive      + -
//! term          * /
//! unary         + -
//! primary       number | "text" | name | `quoted name` | (expr) | MIN(..) | MAX(..)
//! ```
//!
//! Anything outside this grammar is a compile error, so a compiled
//! expression can only read record values and call MIN/MAX. Nesting (and
//! operator chains, which nest in the tree) is capped at [`MAX_DEPTH`].

use crate::error::FormulaError;
use crate::formula::ast::{BinaryOp, CompareOp, Expr, Function, UnaryOp};
use crate::formula::token::{tokenize, Token, TokenKind};

const KEYWORDS: [&str; 5] = ["if", "else", "and", "or", "not"];

/// Deepest expression tree the parser builds.
pub const MAX_DEPTH: usize = 128;

pub fn parse(expression: &str) -> Result<Expr, FormulaError> {
    let tokens = tokenize(expression);
    check_lexical(&tokens)?;

    let mut parser = Parser { tokens: &tokens, pos: 0, depth: 0 };
    let expr = parser.conditional()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(FormulaError::TrailingInput(token.text.clone())),
    }
}

/// Reject tokens the grammar never accepts before parsing starts.
fn check_lexical(tokens: &[Token]) -> Result<(), FormulaError> {
    for token in tokens {
        match token.kind {
            TokenKind::Other => {
                let ch = token.text.chars().next().unwrap_or('?');
                return Err(FormulaError::UnexpectedChar { ch, offset: token.offset });
            }
            TokenKind::Str if !token.is_terminated_string() => {
                return Err(FormulaError::UnterminatedString { offset: token.offset });
            }
            _ => {}
        }
    }
    Ok(())
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(token) if token.is_ident(keyword) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn eat_operator(&mut self, ops: &[&str]) -> Option<&'t str> {
        let token = self.peek()?;
        if token.kind == TokenKind::Operator && ops.contains(&token.text.as_str()) {
            self.pos += 1;
            Some(token.text.as_str())
        } else {
            None
        }
    }

    fn enter(&mut self) -> Result<(), FormulaError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FormulaError::TooDeep);
        }
        Ok(())
    }

    /// Run `parse` one level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, FormulaError>) -> Result<T, FormulaError> {
        self.enter()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<(), FormulaError> {
        match self.advance() {
            Some(token) if token.kind == kind => Ok(()),
            Some(token) => Err(unexpected(token, expected)),
            None => Err(FormulaError::UnexpectedEnd { expected }),
        }
    }

    fn conditional(&mut self) -> Result<Expr, FormulaError> {
        let then = self.or()?;
        if !self.eat_keyword("if") {
            return Ok(then);
        }
        let cond = self.or()?;
        if !self.eat_keyword("else") {
            return match self.peek() {
                Some(token) => Err(unexpected(token, "'else'")),
                None => Err(FormulaError::UnexpectedEnd { expected: "'else'" }),
            };
        }
        let otherwise = self.nested(Self::conditional)?;
        Ok(Expr::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn or(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.and()?;
        let mut links = 0;
        while self.eat_keyword("or") {
            self.enter()?;
            links += 1;
            let right = self.and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.depth -= links;
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.not()?;
        let mut links = 0;
        while self.eat_keyword("and") {
            self.enter()?;
            links += 1;
            let right = self.not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.depth -= links;
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, FormulaError> {
        if self.eat_keyword("not") {
            let expr = self.nested(Self::not)?;
            return Ok(Expr::Unary { op: UnaryOp::Not, expr: Box::new(expr) });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, FormulaError> {
        const OPS: [&str; 7] = ["==", "!=", "<>", "<", "<=", ">", ">="];

        let left = self.additive()?;
        let Some(symbol) = self.eat_operator(&OPS) else {
            return Ok(left);
        };
        let right = self.additive()?;
        if self.eat_operator(&OPS).is_some() {
            return Err(FormulaError::ChainedComparison);
        }

        let op = CompareOp::from_symbol(symbol)
            .ok_or(FormulaError::UnexpectedToken { found: symbol.to_string(), expected: "comparison" })?;
        Ok(Expr::Compare { op, left: Box::new(left), right: Box::new(right) })
    }

    fn additive(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.term()?;
        let mut links = 0;
        while let Some(symbol) = self.eat_operator(&["+", "-"]) {
            self.enter()?;
            links += 1;
            let op = if symbol == "+" { BinaryOp::Add } else { BinaryOp::Sub };
            let right = self.term()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        self.depth -= links;
        Ok(left)
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.unary()?;
        let mut links = 0;
        while let Some(symbol) = self.eat_operator(&["*", "/"]) {
            self.enter()?;
            links += 1;
            let op = if symbol == "*" { BinaryOp::Mul } else { BinaryOp::Div };
            let right = self.unary()?;
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }
        self.depth -= links;
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        match self.eat_operator(&["-", "+"]) {
            Some("-") => Ok(Expr::Unary { op: UnaryOp::Neg, expr: Box::new(self.nested(Self::unary)?) }),
            Some(_) => Ok(Expr::Unary { op: UnaryOp::Plus, expr: Box::new(self.nested(Self::unary)?) }),
            None => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        const EXPECTED: &str = "value";

        let token = self.advance().ok_or(FormulaError::UnexpectedEnd { expected: EXPECTED })?;
        match token.kind {
            TokenKind::Number => token
                .text
                .parse::<f64>()
                .map(Expr::Number)
                .map_err(|_| unexpected(token, "number")),
            TokenKind::Str => Ok(Expr::Str(token.string_value())),
            TokenKind::QuotedIdent => {
                Ok(Expr::Var(token.ident_name().unwrap_or_default().to_string()))
            }
            TokenKind::Ident if KEYWORDS.contains(&token.text.as_str()) => {
                Err(unexpected(token, EXPECTED))
            }
            TokenKind::Ident => {
                if self.peek().map(|t| t.kind) == Some(TokenKind::LParen) {
                    self.nested(|p| p.call(token))
                } else {
                    Ok(Expr::Var(token.text.clone()))
                }
            }
            TokenKind::LParen => {
                let expr = self.nested(Self::conditional)?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            _ => Err(unexpected(token, EXPECTED)),
        }
    }

    fn call(&mut self, name: &Token) -> Result<Expr, FormulaError> {
        let func = Function::lookup(&name.text)
            .ok_or_else(|| FormulaError::UnknownFunction(name.text.clone()))?;
        self.expect(TokenKind::LParen, "'('")?;

        let mut args = Vec::new();
        if self.peek().map(|t| t.kind) == Some(TokenKind::RParen) {
            self.pos += 1;
            return Ok(Expr::Call { func, args });
        }
        loop {
            args.push(self.conditional()?);
            match self.advance() {
                Some(t) if t.kind == TokenKind::Comma => continue,
                Some(t) if t.kind == TokenKind::RParen => break,
                Some(t) => return Err(unexpected(t, "',' or ')'")),
                None => return Err(FormulaError::UnexpectedEnd { expected: "')'" }),
            }
        }
        Ok(Expr::Call { func, args })
    }
}

fn unexpected(token: &Token, expected: &'static str) -> FormulaError {
    FormulaError::UnexpectedToken { found: token.text.clone(), expected }
}
