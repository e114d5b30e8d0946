//! Sandboxed arithmetic formulas
//!
//! Parameter definitions describe how response bytes become a physical value
//! with formulas such as `(A*256+B)/4` or `A-40`. A formula is parsed into a
//! closed expression tree and interpreted directly; nothing outside this
//! grammar can ever be expressed:
//!
//! ```text
//! expr    := term   (('+' | '-') term)*
//! term    := unary  (('*' | '/' | '//' | '%') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary ('**' unary)?
//! primary := NUMBER | 'A' | 'B' | 'C' | 'D' | '(' expr ')'
//! ```
//!
//! Any other construct (function calls, attribute access, comparisons,
//! boolean operators, strings, other names) is rejected while parsing,
//! before a single operator is applied.
//!
//! Numeric semantics follow the usual calculator conventions for diagnostic
//! formulas: integer arithmetic stays integral, `/` always produces a float,
//! `//` floors toward negative infinity and `%` takes the sign of the divisor.
//!
//! ```rust
//! use vdiag_conv::expr::{evaluate, Bindings, Number, Var};
//!
//! let vars = Bindings::new().with(Var::A, 0x1A).with(Var::B, 0xF8);
//! let rpm = evaluate("(A*256+B)/4", &vars).unwrap();
//! assert_eq!(rpm, Number::Float(1726.0));
//! ```

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{EvalError, EvalResult};

/// Maximum nesting of parentheses and unary/power chains
pub const MAX_DEPTH: usize = 64;

/// Numeric value produced by a formula
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Number::Int(i) => i == 0,
            Number::Float(f) => f == 0.0,
        }
    }

    /// Round floats to `places` decimals; integers are returned unchanged
    pub fn rounded(self, places: u8) -> Self {
        match self {
            Number::Int(_) => self,
            Number::Float(f) => Number::Float(crate::precision::round_to_precision(f, places)),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::Int(value as i64)
    }
}

impl From<u8> for Number {
    fn from(value: u8) -> Self {
        Number::Int(value as i64)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Number::Int(i) => serializer.serialize_i64(*i),
            Number::Float(x) => serializer.serialize_f64(*x),
        }
    }
}

/// The four byte variables a formula may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Var {
    A,
    B,
    C,
    D,
}

impl Var {
    pub const ALL: [Var; 4] = [Var::A, Var::B, Var::C, Var::D];

    fn index(self) -> usize {
        match self {
            Var::A => 0,
            Var::B => 1,
            Var::C => 2,
            Var::D => 3,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "A" => Some(Var::A),
            "B" => Some(Var::B),
            "C" => Some(Var::C),
            "D" => Some(Var::D),
            _ => None,
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Var::A => "A",
            Var::B => "B",
            Var::C => "C",
            Var::D => "D",
        };
        f.write_str(s)
    }
}

/// Variable values for one evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bindings {
    slots: [Option<Number>; 4],
}

impl Bindings {
    /// Create an empty set of bindings (every variable unbound)
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind A..D to the first four payload bytes; missing bytes bind to 0
    pub fn from_payload(payload: &[u8]) -> Self {
        let mut bindings = Self::new();
        for (i, var) in Var::ALL.iter().enumerate() {
            let byte = payload.get(i).copied().unwrap_or(0);
            bindings.bind(*var, byte);
        }
        bindings
    }

    pub fn with(mut self, var: Var, value: impl Into<Number>) -> Self {
        self.bind(var, value);
        self
    }

    pub fn bind(&mut self, var: Var, value: impl Into<Number>) {
        self.slots[var.index()] = Some(value.into());
    }

    pub fn get(&self, var: Var) -> Option<Number> {
        self.slots[var.index()]
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Number),
    Variable(Var),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
}

impl Expr {
    /// Evaluate the tree against a set of bindings
    pub fn eval(&self, vars: &Bindings) -> EvalResult<Number> {
        match self {
            Expr::Literal(n) => Ok(*n),
            Expr::Variable(var) => vars.get(*var).ok_or(EvalError::UnboundVariable(*var)),
            Expr::Binary(op, left, right) => {
                let l = left.eval(vars)?;
                let r = right.eval(vars)?;
                op.apply(l, r)
            }
            Expr::Unary(op, operand) => op.apply(operand.eval(vars)?),
        }
    }
}

impl UnaryOp {
    fn apply(self, value: Number) -> EvalResult<Number> {
        Ok(match (self, value) {
            (UnaryOp::Plus, v) => v,
            (UnaryOp::Neg, Number::Int(i)) => match i.checked_neg() {
                Some(n) => Number::Int(n),
                None => Number::Float(-(i as f64)),
            },
            (UnaryOp::Neg, Number::Float(f)) => Number::Float(-f),
        })
    }
}

impl BinOp {
    fn apply(self, l: Number, r: Number) -> EvalResult<Number> {
        match self {
            BinOp::Add => Ok(int_or_float(l, r, i64::checked_add, |a, b| a + b)),
            BinOp::Sub => Ok(int_or_float(l, r, i64::checked_sub, |a, b| a - b)),
            BinOp::Mul => Ok(int_or_float(l, r, i64::checked_mul, |a, b| a * b)),
            BinOp::Div => {
                if r.is_zero() {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(Number::Float(l.as_f64() / r.as_f64()))
            }
            BinOp::FloorDiv => {
                if r.is_zero() {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(int_or_float(l, r, floor_div, |a, b| (a / b).floor()))
            }
            BinOp::Mod => {
                if r.is_zero() {
                    return Err(EvalError::ModuloByZero);
                }
                Ok(int_or_float(l, r, floor_mod, float_mod))
            }
            BinOp::Pow => power(l, r),
        }
    }
}

/// Apply an integer operation when both operands are integers and it does
/// not overflow, otherwise fall back to the float operation.
fn int_or_float(
    l: Number,
    r: Number,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Number {
    if let (Number::Int(a), Number::Int(b)) = (l, r) {
        if let Some(v) = int_op(a, b) {
            return Number::Int(v);
        }
    }
    Number::Float(float_op(l.as_f64(), r.as_f64()))
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Some(r + b)
    } else {
        Some(r)
    }
}

fn float_mod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
        r + b
    } else {
        r
    }
}

fn power(base: Number, exp: Number) -> EvalResult<Number> {
    if base.is_zero() && exp.as_f64() < 0.0 {
        return Err(EvalError::DivisionByZero);
    }

    if let (Number::Int(b), Number::Int(e)) = (base, exp) {
        if e >= 0 {
            if let Some(v) = u32::try_from(e).ok().and_then(|e| b.checked_pow(e)) {
                return Ok(Number::Int(v));
            }
        }
    }

    let (b, e) = (base.as_f64(), exp.as_f64());
    if b < 0.0 && e.fract() != 0.0 {
        return Err(EvalError::InvalidPower(format!(
            "negative base {} with fractional exponent {}",
            base, exp
        )));
    }

    let value = b.powf(e);
    if !value.is_finite() {
        return Err(EvalError::InvalidPower(format!(
            "{} ** {} overflows",
            base, exp
        )));
    }
    Ok(Number::Float(value))
}

// =============================================================================
// Lexer
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Number),
    Ident(String),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(s) => f.write_str(s),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::StarStar => f.write_str("**"),
            Token::Slash => f.write_str("/"),
            Token::SlashSlash => f.write_str("//"),
            Token::Percent => f.write_str("%"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn lex(input: &str) -> EvalResult<Vec<(Token, usize)>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        let token = match ch {
            ' ' | '\t' | '\r' | '\n' => continue,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '%' => Token::Percent,
            '*' => {
                if chars.next_if(|&(_, c)| c == '*').is_some() {
                    Token::StarStar
                } else {
                    Token::Star
                }
            }
            '/' => {
                if chars.next_if(|&(_, c)| c == '/').is_some() {
                    Token::SlashSlash
                } else {
                    Token::Slash
                }
            }
            c if c.is_ascii_digit()
                || (c == '.' && input[pos + 1..].starts_with(|n: char| n.is_ascii_digit())) =>
            {
                let mut end = pos + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    let continues_exponent = matches!(next, '+' | '-')
                        && matches!(input[..i].chars().last(), Some('e' | 'E'))
                        && !input[pos..i].starts_with("0x")
                        && !input[pos..i].starts_with("0X");
                    if next.is_ascii_alphanumeric() || next == '.' || continues_exponent {
                        chars.next();
                        end = i + next.len_utf8();
                    } else {
                        break;
                    }
                }
                Token::Number(parse_number(&input[pos..end])?)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = pos + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        chars.next();
                        end = i + next.len_utf8();
                    } else {
                        break;
                    }
                }
                Token::Ident(input[pos..end].to_string())
            }
            other => return Err(EvalError::UnexpectedCharacter { ch: other, pos }),
        };
        tokens.push((token, pos));
    }

    Ok(tokens)
}

fn parse_number(text: &str) -> EvalResult<Number> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16)
            .map(Number::Int)
            .map_err(|_| EvalError::InvalidNumber(text.to_string()));
    }

    if text.chars().all(|c| c.is_ascii_digit()) {
        return match text.parse::<i64>() {
            Ok(i) => Ok(Number::Int(i)),
            // Too large for i64 but still a valid literal
            Err(_) => text
                .parse::<f64>()
                .map(Number::Float)
                .map_err(|_| EvalError::InvalidNumber(text.to_string())),
        };
    }

    let valid_float = text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !valid_float {
        return Err(EvalError::InvalidNumber(text.to_string()));
    }
    text.parse::<f64>()
        .map(Number::Float)
        .map_err(|_| EvalError::InvalidNumber(text.to_string()))
}

// =============================================================================
// Parser
// =============================================================================

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn parse_expr(&mut self) -> EvalResult<Expr> {
        let mut node = self.parse_term()?;
        loop {
            let op = if self.match_token(&Token::Plus) {
                BinOp::Add
            } else if self.match_token(&Token::Minus) {
                BinOp::Sub
            } else {
                break;
            };
            let right = self.parse_term()?;
            node = Expr::Binary(op, Box::new(node), Box::new(right));
        }
        Ok(node)
    }

    fn parse_term(&mut self) -> EvalResult<Expr> {
        let mut node = self.parse_unary()?;
        loop {
            let op = if self.match_token(&Token::Star) {
                BinOp::Mul
            } else if self.match_token(&Token::Slash) {
                BinOp::Div
            } else if self.match_token(&Token::SlashSlash) {
                BinOp::FloorDiv
            } else if self.match_token(&Token::Percent) {
                BinOp::Mod
            } else {
                break;
            };
            let right = self.parse_unary()?;
            node = Expr::Binary(op, Box::new(node), Box::new(right));
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> EvalResult<Expr> {
        let op = if self.match_token(&Token::Minus) {
            UnaryOp::Neg
        } else if self.match_token(&Token::Plus) {
            UnaryOp::Plus
        } else {
            return self.parse_power();
        };
        self.enter()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_power(&mut self) -> EvalResult<Expr> {
        let base = self.parse_primary()?;
        if self.match_token(&Token::StarStar) {
            // Right-associative, and the exponent may carry a sign: 2**-1
            self.enter()?;
            let exponent = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> EvalResult<Expr> {
        let (token, pos) = self.advance().ok_or(EvalError::UnexpectedEnd)?;
        match token {
            Token::Number(n) => Ok(Expr::Literal(n)),
            Token::Ident(name) => Var::from_name(&name)
                .map(Expr::Variable)
                .ok_or(EvalError::UnknownName(name)),
            Token::LParen => {
                self.enter()?;
                let inner = self.parse_expr()?;
                self.depth -= 1;
                match self.advance() {
                    Some((Token::RParen, _)) => Ok(inner),
                    Some((other, pos)) => Err(EvalError::UnexpectedToken {
                        token: other.to_string(),
                        pos,
                    }),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            other => Err(EvalError::UnexpectedToken {
                token: other.to_string(),
                pos,
            }),
        }
    }

    fn enter(&mut self) -> EvalResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::NestingTooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn match_token(&mut self, token: &Token) -> bool {
        if let Some((t, _)) = self.tokens.get(self.pos) {
            if t == token {
                self.pos += 1;
                return true;
            }
        }
        false
    }
}

/// Parse a formula into an expression tree, rejecting anything outside the grammar
pub fn parse(formula: &str) -> EvalResult<Expr> {
    let tokens = lex(formula)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_expr()?;

    if let Some((token, pos)) = parser.tokens.get(parser.pos) {
        return Err(EvalError::UnexpectedToken {
            token: token.to_string(),
            pos: *pos,
        });
    }

    Ok(expr)
}

/// Parse and evaluate a formula in one step
pub fn evaluate(formula: &str, vars: &Bindings) -> EvalResult<Number> {
    parse(formula)?.eval(vars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_with(formula: &str, a: i64, b: i64, c: i64, d: i64) -> EvalResult<Number> {
        let vars = Bindings::new()
            .with(Var::A, a)
            .with(Var::B, b)
            .with(Var::C, c)
            .with(Var::D, d);
        evaluate(formula, &vars)
    }

    fn eval(formula: &str) -> EvalResult<Number> {
        eval_with(formula, 0, 0, 0, 0)
    }

    #[test]
    fn test_standard_obd_formulas() {
        // Engine RPM: 0x1AF8 / 4
        assert_eq!(
            eval_with("(A*256+B)/4", 0x1A, 0xF8, 0, 0).unwrap(),
            Number::Float(1726.0)
        );
        // Coolant temperature stays integral
        assert_eq!(eval_with("A-40", 130, 0, 0, 0).unwrap(), Number::Int(90));
        // Throttle position
        let throttle = eval_with("A*100/255", 255, 0, 0, 0).unwrap();
        assert_eq!(throttle, Number::Float(100.0));
    }

    #[test]
    fn test_true_division_is_float() {
        assert_eq!(eval("4/2").unwrap(), Number::Float(2.0));
        assert_eq!(eval("7/2").unwrap(), Number::Float(3.5));
    }

    #[test]
    fn test_floor_division() {
        assert_eq!(eval("7//2").unwrap(), Number::Int(3));
        assert_eq!(eval("-7//2").unwrap(), Number::Int(-4));
        assert_eq!(eval("7//-2").unwrap(), Number::Int(-4));
        assert_eq!(eval("7.5//2").unwrap(), Number::Float(3.0));
        assert_eq!(eval("-7.5//2").unwrap(), Number::Float(-4.0));
    }

    #[test]
    fn test_modulo_follows_divisor_sign() {
        assert_eq!(eval("7%3").unwrap(), Number::Int(1));
        assert_eq!(eval("-7%3").unwrap(), Number::Int(2));
        assert_eq!(eval("7%-3").unwrap(), Number::Int(-2));
        assert_eq!(eval("-7.5%2").unwrap(), Number::Float(0.5));
    }

    #[test]
    fn test_power() {
        assert_eq!(eval("2**10").unwrap(), Number::Int(1024));
        assert_eq!(eval("2**-1").unwrap(), Number::Float(0.5));
        assert_eq!(eval("2.5**2").unwrap(), Number::Float(6.25));
        // Right-associative
        assert_eq!(eval("2**3**2").unwrap(), Number::Int(512));
        // Unary minus binds looser than power
        assert_eq!(eval("-2**2").unwrap(), Number::Int(-4));
        assert_eq!(eval("(-2)**2").unwrap(), Number::Int(4));
    }

    #[test]
    fn test_power_errors() {
        assert_eq!(eval("0**-1"), Err(EvalError::DivisionByZero));
        assert!(matches!(eval("(-8)**0.5"), Err(EvalError::InvalidPower(_))));
        assert!(matches!(eval("10.0**400"), Err(EvalError::InvalidPower(_))));
    }

    #[test]
    fn test_precedence_and_unary() {
        assert_eq!(eval("1+2*3").unwrap(), Number::Int(7));
        assert_eq!(eval("(1+2)*3").unwrap(), Number::Int(9));
        assert_eq!(eval("10-4-3").unwrap(), Number::Int(3));
        assert_eq!(eval("-(3)").unwrap(), Number::Int(-3));
        assert_eq!(eval("+-+3").unwrap(), Number::Int(-3));
        assert_eq!(eval("2*-3").unwrap(), Number::Int(-6));
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval("0.5").unwrap(), Number::Float(0.5));
        assert_eq!(eval(".5").unwrap(), Number::Float(0.5));
        assert_eq!(eval("1.").unwrap(), Number::Float(1.0));
        assert_eq!(eval("1e3").unwrap(), Number::Float(1000.0));
        assert_eq!(eval("2.5e-1").unwrap(), Number::Float(0.25));
        assert_eq!(eval("0xFF").unwrap(), Number::Int(255));
        assert!(matches!(eval("1.2.3"), Err(EvalError::InvalidNumber(_))));
        assert!(matches!(eval("12abc"), Err(EvalError::InvalidNumber(_))));
    }

    #[test]
    fn test_integer_overflow_falls_back_to_float() {
        let result = eval("9223372036854775807+1").unwrap();
        assert!(matches!(result, Number::Float(_)));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval("A/B"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("1//0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval("1%0.0"), Err(EvalError::ModuloByZero));
    }

    #[test]
    fn test_rejects_disallowed_constructs() {
        assert!(matches!(eval("abs(A)"), Err(EvalError::UnknownName(n)) if n == "abs"));
        assert!(matches!(
            eval("A.real"),
            Err(EvalError::UnexpectedCharacter { ch: '.', .. })
        ));
        assert!(matches!(
            eval("A < B"),
            Err(EvalError::UnexpectedCharacter { ch: '<', .. })
        ));
        assert!(matches!(
            eval("A and B"),
            Err(EvalError::UnexpectedToken { token, .. }) if token == "and"
        ));
        assert!(matches!(eval("not A"), Err(EvalError::UnknownName(_))));
        assert!(matches!(
            eval("\"A\""),
            Err(EvalError::UnexpectedCharacter { ch: '"', .. })
        ));
        assert!(matches!(eval("E*2"), Err(EvalError::UnknownName(n)) if n == "E"));
        assert!(matches!(eval("a+1"), Err(EvalError::UnknownName(_))));
        assert!(matches!(eval("__import__"), Err(EvalError::UnknownName(_))));
        assert!(matches!(eval("A[0]"), Err(EvalError::UnexpectedCharacter { .. })));
        assert!(matches!(eval("A if B else C"), Err(EvalError::UnexpectedToken { .. })));
    }

    #[test]
    fn test_call_on_variable_is_rejected_before_evaluation() {
        // Parsing fails on the leftover tokens even though `B/0` would also fail
        assert!(matches!(
            eval("A(B/0)"),
            Err(EvalError::UnexpectedToken { token, .. }) if token == "("
        ));
    }

    #[test]
    fn test_malformed_syntax() {
        assert_eq!(eval(""), Err(EvalError::Empty));
        assert_eq!(eval("   "), Err(EvalError::Empty));
        assert_eq!(eval("A+"), Err(EvalError::UnexpectedEnd));
        assert_eq!(eval("(A+B"), Err(EvalError::UnexpectedEnd));
        assert!(matches!(eval("A+B)"), Err(EvalError::UnexpectedToken { .. })));
        assert!(matches!(eval("*A"), Err(EvalError::UnexpectedToken { .. })));
        assert!(matches!(eval("A B"), Err(EvalError::UnexpectedToken { .. })));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(eval(&deep), Err(EvalError::NestingTooDeep(MAX_DEPTH)));
        let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(eval(&shallow).unwrap(), Number::Int(1));
    }

    #[test]
    fn test_lone_decimal_point() {
        assert_eq!(
            eval("."),
            Err(EvalError::UnexpectedCharacter { ch: '.', pos: 0 })
        );
        assert_eq!(
            eval("A+."),
            Err(EvalError::UnexpectedCharacter { ch: '.', pos: 2 })
        );
        assert_eq!(eval(".5*2").unwrap(), Number::Float(1.0));
    }

    #[test]
    fn test_bindings_accept_plain_literals() {
        let vars = Bindings::new().with(Var::A, 7).with(Var::B, 2u8).with(Var::C, 0.5);
        assert_eq!(evaluate("A*B", &vars).unwrap(), Number::Int(14));
        assert_eq!(evaluate("A*C", &vars).unwrap(), Number::Float(3.5));
    }

    #[test]
    fn test_unbound_variable() {
        let vars = Bindings::new().with(Var::A, 1);
        assert_eq!(evaluate("A+B", &vars), Err(EvalError::UnboundVariable(Var::B)));
    }

    #[test]
    fn test_bindings_from_short_payload() {
        let vars = Bindings::from_payload(&[0x0A]);
        assert_eq!(vars.get(Var::A), Some(Number::Int(10)));
        assert_eq!(vars.get(Var::B), Some(Number::Int(0)));
        assert_eq!(vars.get(Var::D), Some(Number::Int(0)));
    }

    #[test]
    fn test_parse_tree_shape() {
        let tree = parse("A*2+1").unwrap();
        assert_eq!(
            tree,
            Expr::Binary(
                BinOp::Add,
                Box::new(Expr::Binary(
                    BinOp::Mul,
                    Box::new(Expr::Variable(Var::A)),
                    Box::new(Expr::Literal(Number::Int(2))),
                )),
                Box::new(Expr::Literal(Number::Int(1))),
            )
        );
    }

    #[test]
    fn test_rounded() {
        assert_eq!(Number::Float(1.23456).rounded(2), Number::Float(1.23));
        assert_eq!(Number::Int(7).rounded(2), Number::Int(7));
    }
}
