//! Placeholder token grammar.
//!
//! A token is `{{`, a variable name made of lowercase letters, digits and
//! underscores, an optional `|transform`, then `}}`. This module owns the only
//! definition of that grammar; the substitution engine and the file scanner
//! both go through [`find_tokens`].

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// Regular expression source for a placeholder token.
pub const TOKEN_PATTERN: &str = r"\{\{([a-z0-9_]+)(?:\|([a-z0-9_]+))?\}\}";

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    // The pattern is a compile-time constant covered by tests.
    Regex::new(TOKEN_PATTERN).expect("token pattern is valid")
});

/// One placeholder occurrence in a piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'t> {
    /// The full matched text, braces included.
    pub text: &'t str,
    /// Variable name.
    pub name: &'t str,
    /// Raw transform name, if the token has a `|transform` part.
    pub transform: Option<&'t str>,
    /// Byte range of the token in the scanned text.
    pub span: Range<usize>,
    /// 1-based line the token starts on.
    pub line: usize,
}

/// Iterates over every token in `text`, left to right, without overlap.
pub fn find_tokens(text: &str) -> impl Iterator<Item = Token<'_>> + '_ {
    let mut line = 1;
    let mut counted_to = 0;
    TOKEN_RE.captures_iter(text).map(move |caps| {
        let whole = caps.get(0).expect("group 0 always participates");
        line += text[counted_to..whole.start()].matches('\n').count();
        counted_to = whole.start();
        Token {
            text: whole.as_str(),
            name: caps.get(1).map_or("", |m| m.as_str()),
            transform: caps.get(2).map(|m| m.as_str()),
            span: whole.range(),
            line,
        }
    })
}

/// Whether `text` contains at least one token.
pub fn contains_token(text: &str) -> bool {
    TOKEN_RE.is_match(text)
}

/// Whether `name` is a valid variable name under the token grammar.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
