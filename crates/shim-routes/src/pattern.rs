//! Route pattern parsing
//!
//! Grammar:
//!
//! - `:name` matches one path segment
//! - `:name?` optional segment, `:name*` zero or more, `:name+` one or more
//! - `*` anonymous zero-or-more segments, keyed `"0"`, `"1"`, ...
//! - `\:` (or any `\x`) is the literal character
//!
//! A `/` directly before a parameter becomes that parameter's prefix, so an
//! optional parameter takes its slash with it (`/users/:id?` matches `/users`).

use shim_core::{Result, ShimError};
use std::collections::HashSet;

/// How many segments a parameter consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    One,
    Optional,
    ZeroOrMore,
    OneOrMore,
}

impl Modifier {
    pub fn is_optional(self) -> bool {
        matches!(self, Modifier::Optional | Modifier::ZeroOrMore)
    }

    pub fn is_repeated(self) -> bool {
        matches!(self, Modifier::ZeroOrMore | Modifier::OneOrMore)
    }
}

/// A parsed piece of a route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Param {
        name: String,
        /// Either `"/"` or empty
        prefix: String,
        modifier: Modifier,
    },
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn invalid(pattern: &str, reason: impl Into<String>) -> ShimError {
    ShimError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

/// Split a pattern into literal and parameter tokens
pub fn parse(pattern: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut seen = HashSet::new();
    let mut anonymous = 0usize;
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| invalid(pattern, "unterminated escape at end of pattern"))?;
                literal.push(escaped);
            }
            ':' => {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if !is_name_char(next) {
                        break;
                    }
                    name.push(next);
                    chars.next();
                }
                if name.is_empty() {
                    return Err(invalid(pattern, "parameter name expected after ':'"));
                }
                if !seen.insert(name.clone()) {
                    return Err(invalid(pattern, format!("duplicate parameter '{}'", name)));
                }

                let modifier = match chars.peek() {
                    Some('?') => Modifier::Optional,
                    Some('*') => Modifier::ZeroOrMore,
                    Some('+') => Modifier::OneOrMore,
                    _ => Modifier::One,
                };
                if modifier != Modifier::One {
                    chars.next();
                }

                push_param(&mut tokens, &mut literal, name, modifier);
            }
            '*' => {
                let name = anonymous.to_string();
                anonymous += 1;
                push_param(&mut tokens, &mut literal, name, Modifier::ZeroOrMore);
            }
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }

    Ok(tokens)
}

fn push_param(tokens: &mut Vec<Token>, literal: &mut String, name: String, modifier: Modifier) {
    let prefix = if literal.ends_with('/') {
        literal.pop();
        "/".to_string()
    } else {
        String::new()
    };

    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal)));
    }

    tokens.push(Token::Param {
        name,
        prefix,
        modifier,
    });
}

/// Parameter names in the order they appear in `pattern`
pub fn parameter_names(pattern: &str) -> Result<Vec<String>> {
    Ok(parse(pattern)?
        .into_iter()
        .filter_map(|token| match token {
            Token::Param { name, .. } => Some(name),
            Token::Literal(_) => None,
        })
        .collect())
}
