//! Boosting formula evaluation
//!
//! An indexer may carry a boosting formula: a small arithmetic expression
//! over inspector variable names that combines per-field scores into the
//! final document score, e.g. `title * 2 + log(popularity + 1)`.
//!
//! Grammar:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := NUMBER | IDENT | 'log' '(' expr ')' | '(' expr ')' | '-' factor
//! ```
//!
//! `log` is the natural logarithm. Identifiers that are bound to no field
//! evaluate to 0; the formula is parsed once per build, not per document.

use crate::index::IndexError;
use std::collections::HashMap;

/// A parsed boosting formula
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Log(Box<Expr>),
}

impl Expr {
    /// Parses a formula string
    ///
    /// # Arguments
    ///
    /// * `input` - The formula text
    ///
    /// # Returns
    ///
    /// * `Ok(Expr)` - Parsed expression tree
    /// * `Err(IndexError::Formula)` - The text is not a valid formula
    pub fn parse(input: &str) -> Result<Self, IndexError> {
        let tokens = lex(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(IndexError::Formula(format!(
                "unexpected trailing input at token {}",
                parser.pos
            )));
        }
        Ok(expr)
    }

    /// Evaluates the formula against a variable binding
    ///
    /// Unknown variables read as 0; division by zero and log of a
    /// non-positive value read as 0 rather than poisoning the ranking with
    /// NaN or infinity.
    pub fn eval(&self, variables: &HashMap<String, f64>) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Variable(name) => variables.get(name).copied().unwrap_or(0.0),
            Self::Neg(inner) => -inner.eval(variables),
            Self::Add(a, b) => a.eval(variables) + b.eval(variables),
            Self::Sub(a, b) => a.eval(variables) - b.eval(variables),
            Self::Mul(a, b) => a.eval(variables) * b.eval(variables),
            Self::Div(a, b) => {
                let denominator = b.eval(variables);
                if denominator == 0.0 {
                    0.0
                } else {
                    a.eval(variables) / denominator
                }
            }
            Self::Log(inner) => {
                let value = inner.eval(variables);
                if value <= 0.0 {
                    0.0
                } else {
                    value.ln()
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn lex(input: &str) -> Result<Vec<Token>, IndexError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let number = literal
                    .parse()
                    .map_err(|_| IndexError::Formula(format!("bad number: {}", literal)))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(IndexError::Formula(format!("unexpected character: {}", other)));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), IndexError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            other => Err(IndexError::Formula(format!(
                "expected {:?}, found {:?}",
                expected, other
            ))),
        }
    }

    fn expr(&mut self) -> Result<Expr, IndexError> {
        let mut left = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    left = Expr::Add(Box::new(left), Box::new(self.term()?));
                }
                Some(Token::Minus) => {
                    self.advance();
                    left = Expr::Sub(Box::new(left), Box::new(self.term()?));
                }
                _ => return Ok(left),
            }
        }
    }

    fn term(&mut self) -> Result<Expr, IndexError> {
        let mut left = self.factor()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    left = Expr::Mul(Box::new(left), Box::new(self.factor()?));
                }
                Some(Token::Slash) => {
                    self.advance();
                    left = Expr::Div(Box::new(left), Box::new(self.factor()?));
                }
                _ => return Ok(left),
            }
        }
    }

    fn factor(&mut self) -> Result<Expr, IndexError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Minus) => Ok(Expr::Neg(Box::new(self.factor()?))),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) if name == "log" => {
                self.expect(Token::LParen)?;
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(Expr::Log(Box::new(inner)))
            }
            Some(Token::Ident(name)) => Ok(Expr::Variable(name)),
            other => Err(IndexError::Formula(format!(
                "expected a value, found {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_number() {
        let expr = Expr::parse("3.5").unwrap();
        assert_eq!(expr.eval(&HashMap::new()), 3.5);
    }

    #[test]
    fn test_variable_lookup() {
        let expr = Expr::parse("title").unwrap();
        assert_eq!(expr.eval(&vars(&[("title", 2.0)])), 2.0);
    }

    #[test]
    fn test_unknown_variable_is_zero() {
        let expr = Expr::parse("title + price").unwrap();
        assert_eq!(expr.eval(&vars(&[("title", 2.0)])), 2.0);
    }

    #[test]
    fn test_precedence() {
        let expr = Expr::parse("1 + 2 * 3").unwrap();
        assert_eq!(expr.eval(&HashMap::new()), 7.0);

        let expr = Expr::parse("(1 + 2) * 3").unwrap();
        assert_eq!(expr.eval(&HashMap::new()), 9.0);
    }

    #[test]
    fn test_field_combination() {
        let expr = Expr::parse("title * 2 + description").unwrap();
        let bound = vars(&[("title", 1.5), ("description", 0.5)]);
        assert_eq!(expr.eval(&bound), 3.5);
    }

    #[test]
    fn test_log() {
        let expr = Expr::parse("log(title)").unwrap();
        let result = expr.eval(&vars(&[("title", std::f64::consts::E)]));
        assert!((result - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_log_of_non_positive_is_zero() {
        let expr = Expr::parse("log(title)").unwrap();
        assert_eq!(expr.eval(&vars(&[("title", 0.0)])), 0.0);
        assert_eq!(expr.eval(&vars(&[("title", -2.0)])), 0.0);
    }

    #[test]
    fn test_division_by_zero_is_zero() {
        let expr = Expr::parse("title / price").unwrap();
        assert_eq!(expr.eval(&vars(&[("title", 3.0), ("price", 0.0)])), 0.0);
    }

    #[test]
    fn test_unary_minus() {
        let expr = Expr::parse("-title + 5").unwrap();
        assert_eq!(expr.eval(&vars(&[("title", 2.0)])), 3.0);
    }

    #[test]
    fn test_parse_errors() {
        assert!(Expr::parse("1 +").is_err());
        assert!(Expr::parse("(1 + 2").is_err());
        assert!(Expr::parse("1 2").is_err());
        assert!(Expr::parse("price $ 2").is_err());
        assert!(Expr::parse("log 3").is_err());
    }
}
