//! Platform expressions: a small boolean formula over cmake-var identifiers.
//!
//! Composes with `!`, `&`, `|` and parentheses. Evaluation is total: an
//! undefined identifier evaluates to `false` (see `spec.md` §9, "Open
//! question" — this implementation takes that position explicitly).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorCode};
use crate::Result;

/// A parsed platform expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatformExpr {
    /// A bare identifier test, e.g. `windows`.
    Var(String),
    /// Logical negation.
    Not(Box<PlatformExpr>),
    /// Logical conjunction of all sub-expressions.
    And(Vec<PlatformExpr>),
    /// Logical disjunction of all sub-expressions.
    Or(Vec<PlatformExpr>),
}

/// A value is "truthy" the way a cmake boolean variable is: defined, and not
/// one of the conventional false spellings.
fn is_truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_uppercase().as_str(),
        "" | "0" | "OFF" | "FALSE" | "NO" | "N" | "IGNORE" | "NOTFOUND"
    )
}

impl PlatformExpr {
    /// Parse a platform expression from its textual form.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parser = Parser::new(text);
        let expr = parser.parse_or()?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(Error::Paragraph {
                code: ErrorCode::Unsupported,
                message: format!("unexpected trailing input in platform expression: {text}"),
            });
        }
        Ok(expr)
    }

    /// Evaluate against a map of cmake-var name to its string value.
    ///
    /// An identifier absent from `vars` evaluates to `false`; this is total,
    /// it never errors.
    #[must_use]
    pub fn evaluate(&self, vars: &HashMap<String, String>) -> bool {
        match self {
            Self::Var(name) => vars.get(name).is_some_and(|v| is_truthy(v)),
            Self::Not(inner) => !inner.evaluate(vars),
            Self::And(parts) => parts.iter().all(|p| p.evaluate(vars)),
            Self::Or(parts) => parts.iter().any(|p| p.evaluate(vars)),
        }
    }
}

impl fmt::Display for PlatformExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(name) => write!(f, "{name}"),
            Self::Not(inner) => write!(f, "!{inner}"),
            Self::And(parts) => {
                write!(f, "(")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " & ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
            Self::Or(parts) => {
                write!(f, "(")?;
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
        }
    }
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += self.peek().unwrap().len_utf8();
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn parse_or(&mut self) -> Result<PlatformExpr> {
        let mut parts = vec![self.parse_and()?];
        loop {
            self.skip_ws();
            if self.peek() == Some('|') {
                self.bump();
                parts.push(self.parse_and()?);
            } else {
                break;
            }
        }
        Ok(if parts.len() == 1 {
            parts.pop().unwrap()
        } else {
            PlatformExpr::Or(parts)
        })
    }

    fn parse_and(&mut self) -> Result<PlatformExpr> {
        let mut parts = vec![self.parse_unary()?];
        loop {
            self.skip_ws();
            if self.peek() == Some('&') {
                self.bump();
                parts.push(self.parse_unary()?);
            } else {
                break;
            }
        }
        Ok(if parts.len() == 1 {
            parts.pop().unwrap()
        } else {
            PlatformExpr::And(parts)
        })
    }

    fn parse_unary(&mut self) -> Result<PlatformExpr> {
        self.skip_ws();
        if self.peek() == Some('!') {
            self.bump();
            return Ok(PlatformExpr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<PlatformExpr> {
        self.skip_ws();
        match self.peek() {
            Some('(') => {
                self.bump();
                let inner = self.parse_or()?;
                self.skip_ws();
                if self.bump() != Some(')') {
                    return Err(Error::Paragraph {
                        code: ErrorCode::Unsupported,
                        message: "unterminated '(' in platform expression".to_string(),
                    });
                }
                Ok(inner)
            }
            Some(c) if is_ident_start(c) => {
                let start = self.pos;
                while self.peek().is_some_and(is_ident_continue) {
                    self.bump();
                }
                Ok(PlatformExpr::Var(self.text[start..self.pos].to_string()))
            }
            _ => Err(Error::Paragraph {
                code: ErrorCode::Unsupported,
                message: format!(
                    "expected identifier or '(' in platform expression at byte {}",
                    self.pos
                ),
            }),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn unknown_identifier_is_false() {
        let expr = PlatformExpr::parse("windows").unwrap();
        assert!(!expr.evaluate(&vars(&[])));
    }

    #[test]
    fn negation_and_conjunction() {
        let expr = PlatformExpr::parse("!windows & linux").unwrap();
        assert!(expr.evaluate(&vars(&[("linux", "1")])));
        assert!(!expr.evaluate(&vars(&[("windows", "1"), ("linux", "1")])));
    }

    #[test]
    fn disjunction_and_parens() {
        let expr = PlatformExpr::parse("(windows | osx) & !static").unwrap();
        assert!(expr.evaluate(&vars(&[("osx", "1")])));
        assert!(!expr.evaluate(&vars(&[("osx", "1"), ("static", "1")])));
    }

    #[test]
    fn falsey_spellings_are_not_truthy() {
        let expr = PlatformExpr::parse("flag").unwrap();
        assert!(!expr.evaluate(&vars(&[("flag", "OFF")])));
        assert!(!expr.evaluate(&vars(&[("flag", "0")])));
        assert!(expr.evaluate(&vars(&[("flag", "ON")])));
    }
}
