//! A small compiled matcher for SQL `LIKE` patterns.
//!
//! Patterns are compiled once, at plan time, into a token sequence — never
//! re-parsed per row. `%` matches any run of characters (including none),
//! `_` matches exactly one character, and `\` escapes the next character so
//! literal `%`/`_`/`\` can appear in a pattern. This is a purpose-built
//! matcher rather than the `regex` crate: the pattern language is a fixed,
//! tiny subset, and a hand-rolled automaton avoids paying for general regex
//! features (backreferences, character classes, compilation caching) that
//! `LIKE` never uses.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Char(char),
    AnyOne,
    AnyRun,
}

/// A pattern compiled once at plan time and matched against many rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePattern {
    tokens: Vec<Token>,
}

impl LikePattern {
    pub fn compile(pattern: &str) -> Self {
        let mut tokens = Vec::new();
        let mut chars = pattern.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        tokens.push(Token::Char(escaped));
                    } else {
                        tokens.push(Token::Char('\\'));
                    }
                }
                '%' => {
                    if !matches!(tokens.last(), Some(Token::AnyRun)) {
                        tokens.push(Token::AnyRun);
                    }
                }
                '_' => tokens.push(Token::AnyOne),
                other => tokens.push(Token::Char(other)),
            }
        }
        LikePattern { tokens }
    }

    /// Whether this pattern contains no `%`/`_` metacharacters, i.e. `LIKE`
    /// degenerates to a plain equality check.
    pub fn is_literal(&self) -> bool {
        self.tokens.iter().all(|t| matches!(t, Token::Char(_)))
    }

    pub fn matches(&self, text: &str) -> bool {
        let text: Vec<char> = text.chars().collect();
        match_from(&self.tokens, &text)
    }
}

fn match_from(tokens: &[Token], text: &[char]) -> bool {
    match tokens.first() {
        None => text.is_empty(),
        Some(Token::Char(c)) => match text.first() {
            Some(t) if t == c => match_from(&tokens[1..], &text[1..]),
            _ => false,
        },
        Some(Token::AnyOne) => !text.is_empty() && match_from(&tokens[1..], &text[1..]),
        Some(Token::AnyRun) => {
            // Try consuming 0, then 1, then 2, ... characters of `text`.
            (0..=text.len()).any(|skip| match_from(&tokens[1..], &text[skip..]))
        }
    }
}
