//! Expression engine for the numeric formulas and cut strings found in
//! identification configurations.
//!
//! Supports arithmetic (+, -, *, /), comparisons (==, !=, <, <=, >, >=),
//! boolean operators (&&, ||, !), parentheses, and the built-in functions
//! abs, fabs, sqrt, exp, log, pow, min and max. Booleans are represented as
//! 1 (true) and 0 (false), as in ROOT's formula language.
//!
//! Variables are bound at compile time: the caller lists the identifiers that
//! an expression may use, and any other identifier is rejected right away.
//! Identifiers may contain dots (`superCluster.eta`).

use crate::{
    error::{Error, Result},
    numeric::Float,
};
use prefix_num_ops::real::*;
use std::{iter::Peekable, str::CharIndices};

// ### AST ###

#[derive(Debug, Clone)]
enum Expr {
    Number(Float),
    Var(usize),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(Func, Vec<Expr>),
}

#[derive(Debug, Clone, Copy)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy)]
enum Func {
    Abs,
    Sqrt,
    Exp,
    Log,
    Pow,
    Min,
    Max,
}
//
impl Func {
    /// Look up a built-in function by name
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "abs" | "fabs" => Func::Abs,
            "sqrt" => Func::Sqrt,
            "exp" => Func::Exp,
            "log" => Func::Log,
            "pow" => Func::Pow,
            "min" => Func::Min,
            "max" => Func::Max,
            _ => return None,
        })
    }

    /// Number of arguments expected by the function
    fn arity(self) -> usize {
        match self {
            Func::Abs | Func::Sqrt | Func::Exp | Func::Log => 1,
            Func::Pow | Func::Min | Func::Max => 2,
        }
    }
}

// ### COMPILED EXPRESSION ###

/// A compiled expression, ready for evaluation
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    ast: Expr,
    source: String,
    variables: Vec<String>,
}
//
impl CompiledExpr {
    /// Parse and compile an expression over a fixed set of variables
    ///
    /// At evaluation time, values must be provided in the order of
    /// `variables`. Referencing an identifier which is not in this list is an
    /// error.
    ///
    pub fn compile(input: &str, variables: &[&str]) -> Result<Self> {
        let tokens = tokenize(input)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            variables,
            source: input,
        };
        let ast = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(Error::Expression(format!(
                "unexpected {token:?} after the end of '{input}'"
            )));
        }
        Ok(CompiledExpr {
            ast,
            source: input.to_owned(),
            variables: variables.iter().map(|&v| v.to_owned()).collect(),
        })
    }

    /// Original text of the expression
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Variables which must be provided at evaluation time, in order
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Evaluate the expression for a set of variable values
    pub fn eval(&self, values: &[Float]) -> Float {
        debug_assert_eq!(values.len(), self.variables.len());
        eval_expr(&self.ast, values)
    }

    /// Evaluate the expression as a predicate (nonzero means true)
    pub fn holds(&self, values: &[Float]) -> bool {
        self.eval(values) != 0.
    }
}

// ### EVALUATION ###

fn truth(b: bool) -> Float {
    if b {
        1.
    } else {
        0.
    }
}

fn eval_expr(e: &Expr, vals: &[Float]) -> Float {
    match e {
        Expr::Number(n) => *n,
        Expr::Var(i) => vals[*i],
        Expr::Neg(a) => -eval_expr(a, vals),
        Expr::Not(a) => truth(eval_expr(a, vals) == 0.),
        Expr::Binary(op, a, b) => {
            let lhs = eval_expr(a, vals);
            // Logical operators short-circuit
            match op {
                BinOp::And if lhs == 0. => return 0.,
                BinOp::Or if lhs != 0. => return 1.,
                _ => {}
            }
            let rhs = eval_expr(b, vals);
            match op {
                BinOp::Add => lhs + rhs,
                BinOp::Sub => lhs - rhs,
                BinOp::Mul => lhs * rhs,
                BinOp::Div => lhs / rhs,
                BinOp::Eq => truth(lhs == rhs),
                BinOp::Ne => truth(lhs != rhs),
                BinOp::Lt => truth(lhs < rhs),
                BinOp::Le => truth(lhs <= rhs),
                BinOp::Gt => truth(lhs > rhs),
                BinOp::Ge => truth(lhs >= rhs),
                BinOp::And | BinOp::Or => truth(rhs != 0.),
            }
        }
        Expr::Call(f, args) => {
            let arg = |i: usize| eval_expr(&args[i], vals);
            match f {
                Func::Abs => abs(arg(0)),
                Func::Sqrt => sqrt(arg(0)),
                Func::Exp => exp(arg(0)),
                Func::Log => ln(arg(0)),
                Func::Pow => arg(0).powf(arg(1)),
                Func::Min => arg(0).min(arg(1)),
                Func::Max => arg(0).max(arg(1)),
            }
        }
    }
}

// ### TOKENIZER ###

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Float),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let token = match c {
            _ if c.is_whitespace() => continue,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '<' if followed_by(&mut chars, '=') => Token::Le,
            '<' => Token::Lt,
            '>' if followed_by(&mut chars, '=') => Token::Ge,
            '>' => Token::Gt,
            '!' if followed_by(&mut chars, '=') => Token::Ne,
            '!' => Token::Not,
            '=' if followed_by(&mut chars, '=') => Token::Eq,
            '&' if followed_by(&mut chars, '&') => Token::And,
            '|' if followed_by(&mut chars, '|') => Token::Or,
            _ if c.is_ascii_digit() || c == '.' => {
                let mut end = start + c.len_utf8();
                let mut prev = c;
                while let Some(&(pos, next)) = chars.peek() {
                    let exponent_sign = (next == '+' || next == '-') && (prev == 'e' || prev == 'E');
                    if !(next.is_ascii_digit() || next == '.' || next == 'e' || next == 'E' || exponent_sign) {
                        break;
                    }
                    chars.next();
                    end = pos + next.len_utf8();
                    prev = next;
                }
                let text = &input[start..end];
                let value = text.parse::<Float>().map_err(|_| {
                    Error::Expression(format!("invalid number '{text}' in '{input}'"))
                })?;
                Token::Num(value)
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = start + c.len_utf8();
                while let Some((pos, next)) =
                    chars.next_if(|&(_, n)| n.is_ascii_alphanumeric() || n == '_' || n == '.')
                {
                    end = pos + next.len_utf8();
                }
                Token::Ident(input[start..end].to_owned())
            }
            _ => {
                return Err(Error::Expression(format!(
                    "unexpected character '{c}' in '{input}'"
                )))
            }
        };
        tokens.push(token);
    }

    Ok(tokens)
}

/// Consume the next character if it completes a two-character operator
fn followed_by(chars: &mut Peekable<CharIndices<'_>>, next: char) -> bool {
    chars.next_if(|&(_, c)| c == next).is_some()
}

// ### PARSER (RECURSIVE DESCENT) ###

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    variables: &'a [&'a str],
    source: &'a str,
}
//
impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Consume the next token if it is the expected one
    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        match self.advance() {
            Some(t) if t == expected => Ok(()),
            other => Err(self.error(format!("expected {expected:?}, got {other:?}"))),
        }
    }

    fn error(&self, message: String) -> Error {
        Error::Expression(format!("{message} in '{}'", self.source))
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_cmp()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_cmp()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_cmp(&mut self) -> Result<Expr> {
        let lhs = self.parse_add()?;
        let op = match self.peek() {
            Some(Token::Eq) => BinOp::Eq,
            Some(Token::Ne) => BinOp::Ne,
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Le) => BinOp::Le,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Ge) => BinOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.parse_add()?;
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_add(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_mul()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_mul(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.eat(&Token::Minus) {
            Ok(Expr::Neg(Box::new(self.parse_unary()?)))
        } else if self.eat(&Token::Plus) {
            self.parse_unary()
        } else if self.eat(&Token::Not) {
            Ok(Expr::Not(Box::new(self.parse_unary()?)))
        } else {
            self.parse_atom()
        }
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Num(n)) => Ok(Expr::Number(*n)),
            Some(Token::LParen) => {
                let e = self.parse_or()?;
                self.expect(&Token::RParen)?;
                Ok(e)
            }
            Some(Token::Ident(name)) if self.eat(&Token::LParen) => {
                let func = Func::from_name(name)
                    .ok_or_else(|| self.error(format!("unknown function '{name}'")))?;
                let mut args = vec![self.parse_or()?];
                while self.eat(&Token::Comma) {
                    args.push(self.parse_or()?);
                }
                self.expect(&Token::RParen)?;
                if args.len() != func.arity() {
                    return Err(self.error(format!(
                        "'{name}' takes {} argument(s), got {}",
                        func.arity(),
                        args.len()
                    )));
                }
                Ok(Expr::Call(func, args))
            }
            Some(Token::Ident(name)) => self
                .variables
                .iter()
                .position(|v| v == name)
                .map(Expr::Var)
                .ok_or_else(|| self.error(format!("unknown variable '{name}'"))),
            other => Err(self.error(format!(
                "expected number, identifier or '(', got {other:?}"
            ))),
        }
    }
}
