//! Route pattern compiler.
//!
//! Turns a pattern string into an end-anchored [`Regex`] plus the ordered
//! list of placeholder names it captures.
//!
//! # Syntax
//!
//! | Token | Meaning | Compiles to |
//! |-------|---------|-------------|
//! | `*` | Anonymous wildcard (runs of `*` collapse) | `(?:.*?)` |
//! | `:name` | Named placeholder, `name` is `[a-zA-Z0-9]+` | `(.+?)` |
//! | `\*`, `\:` | Literal `*` / `:` | escaped literal |
//! | anything else | Literal | `regex::escape` |
//!
//! A wildcard or placeholder directly touching a named placeholder is
//! rejected because the boundary between the two captures is ambiguous.
//!
//! # Example
//!
//! ```
//! use scheme_router::RoutePattern;
//!
//! let pattern = RoutePattern::compile("/db/issues/:id").unwrap();
//! let params = pattern.extract("/db/issues/42").unwrap();
//! assert_eq!(params.get("id"), Some("42"));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use regex::Regex;
use tracing::trace;

use crate::error::{Error, Result};

use super::Params;

// ============================================================================
// Constants
// ============================================================================

/// Expression for an anonymous wildcard.
const WILDCARD_EXPR: &str = "(?:.*?)";

/// Expression for a named placeholder.
const PLACEHOLDER_EXPR: &str = "(.+?)";

// ============================================================================
// Token
// ============================================================================

/// Lexical unit of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Wildcard,
    Placeholder(String),
}

// ============================================================================
// RoutePattern
// ============================================================================

/// A compiled route pattern.
///
/// Immutable once compiled. `placeholder_names().len()` always equals the
/// number of capture groups in the matcher.
#[derive(Clone)]
pub struct RoutePattern {
    /// Pattern as registered.
    source: String,
    /// End-anchored matcher.
    matcher: Regex,
    /// Placeholder names in occurrence order.
    placeholder_names: Vec<String>,
}

impl RoutePattern {
    /// Compiles a pattern string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] when two named placeholders touch,
    /// a wildcard touches a named placeholder, or the resulting expression
    /// fails to build.
    pub fn compile(source: &str) -> Result<Self> {
        validate(source)?;
        let tokens = tokenize(source);

        let mut expr = String::with_capacity(source.len() * 2 + 1);
        let mut placeholder_names = Vec::new();

        for token in tokens {
            match token {
                Token::Literal(text) => expr.push_str(&regex::escape(&text)),
                Token::Wildcard => expr.push_str(WILDCARD_EXPR),
                Token::Placeholder(name) => {
                    expr.push_str(PLACEHOLDER_EXPR);
                    placeholder_names.push(name);
                }
            }
        }
        expr.push('$');

        let matcher =
            Regex::new(&expr).map_err(|e| Error::invalid_pattern(source, e.to_string()))?;

        if matcher.captures_len() - 1 != placeholder_names.len() {
            return Err(Error::invalid_pattern(
                source,
                "capture groups do not line up with placeholders",
            ));
        }

        trace!(pattern = source, %expr, "Compiled route pattern");

        Ok(Self {
            source: source.to_string(),
            matcher,
            placeholder_names,
        })
    }

    /// Returns the pattern as registered.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the placeholder names in occurrence order.
    #[inline]
    #[must_use]
    pub fn placeholder_names(&self) -> &[String] {
        &self.placeholder_names
    }

    /// Returns the underlying matcher.
    #[inline]
    #[must_use]
    pub fn matcher(&self) -> &Regex {
        &self.matcher
    }

    /// Returns `true` if `path` matches this pattern.
    #[inline]
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }

    /// Extracts named parameters from `path`.
    ///
    /// Captured group *i* is paired with placeholder name *i*.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MatchExtraction`] if the path does not match or the
    /// capture count disagrees with the placeholder names.
    pub fn extract(&self, path: &str) -> Result<Params> {
        let captures = self
            .matcher
            .captures(path)
            .ok_or_else(|| Error::match_extraction(&self.source, path, "path does not match"))?;

        let groups = captures.len() - 1;
        if groups != self.placeholder_names.len() {
            return Err(Error::match_extraction(
                &self.source,
                path,
                format!(
                    "{groups} captures for {} placeholders",
                    self.placeholder_names.len()
                ),
            ));
        }

        let mut params = Params::with_capacity(groups);
        for (name, group) in self.placeholder_names.iter().zip(captures.iter().skip(1)) {
            let value = group.ok_or_else(|| {
                Error::match_extraction(&self.source, path, format!("no capture for {name}"))
            })?;
            params.insert(name.as_str(), value.as_str());
        }

        Ok(params)
    }
}

impl fmt::Debug for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutePattern")
            .field("source", &self.source)
            .field("matcher", &self.matcher.as_str())
            .field("placeholder_names", &self.placeholder_names)
            .finish()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Splits a pattern into literal, wildcard and placeholder tokens.
fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = source.chars().peekable();

    let flush = |literal: &mut String, tokens: &mut Vec<Token>| {
        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(literal)));
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next_if(|next| matches!(next, '*' | ':')) {
                Some(escaped) => literal.push(escaped),
                None => literal.push('\\'),
            },
            '*' => {
                while chars.next_if_eq(&'*').is_some() {}
                flush(&mut literal, &mut tokens);
                tokens.push(Token::Wildcard);
            }
            ':' if chars.peek().is_some_and(char::is_ascii_alphanumeric) => {
                let mut name = String::new();
                while let Some(next) = chars.next_if(char::is_ascii_alphanumeric) {
                    name.push(next);
                }
                flush(&mut literal, &mut tokens);
                tokens.push(Token::Placeholder(name));
            }
            _ => literal.push(c),
        }
    }
    flush(&mut literal, &mut tokens);

    tokens
}

/// Rejects patterns whose capture boundaries are ambiguous.
///
/// Checks run on the raw text, so an escaped `\:name` still counts as a
/// name when something captures right after it. Only `\*` is exempt: it is
/// removed before checking.
fn validate(source: &str) -> Result<()> {
    let unescaped = source.replace(r"\*", "");
    if let Some((a, b)) = crowded_names(&unescaped) {
        return Err(Error::invalid_pattern(
            source,
            format!("placeholders :{a} and :{b} need a separator"),
        ));
    }
    if let Some(name) = wildcard_touching_name(&unescaped) {
        return Err(Error::invalid_pattern(
            source,
            format!("wildcard touches placeholder :{name}"),
        ));
    }

    Ok(())
}

/// Returns the end of the `[a-zA-Z0-9]+` run starting at `start`, if any.
fn name_end(bytes: &[u8], start: usize) -> Option<usize> {
    let len = bytes
        .get(start..)?
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    (len > 0).then_some(start + len)
}

/// Finds `:a:b` anywhere in `text`.
fn crowded_names(text: &str) -> Option<(&str, &str)> {
    let bytes = text.as_bytes();
    (0..bytes.len())
        .filter(|&i| bytes[i] == b':')
        .find_map(|i| {
            let first_end = name_end(bytes, i + 1)?;
            if bytes.get(first_end) != Some(&b':') {
                return None;
            }
            let second_end = name_end(bytes, first_end + 1)?;
            Some((&text[i + 1..first_end], &text[first_end + 1..second_end]))
        })
}

/// Finds `*:name` or `:name*` anywhere in `text`.
fn wildcard_touching_name(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    (0..bytes.len())
        .filter(|&i| bytes[i] == b':')
        .find_map(|i| {
            let end = name_end(bytes, i + 1)?;
            let before = i.checked_sub(1).map(|j| bytes[j]);
            (before == Some(b'*') || bytes.get(end) == Some(&b'*')).then(|| &text[i + 1..end])
        })
}

// ============================================================================
// Tests
// ============================================================================
