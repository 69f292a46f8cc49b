//! Host-side token storage.

use crate::provider::{Token, TokenApplication};
use crate::text::{Edit, Span};

/// Tokens for one document, sorted by range.
///
/// Applying a [`TokenApplication`] replaces everything within its range:
/// tokens inside are removed, tokens straddling an edge keep only their
/// outside part, and the new tokens are inserted. Recomputing a span twice
/// therefore never duplicates tokens.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    tokens: Vec<Token>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    /// Tokens intersecting `span`
    pub fn tokens_in(&self, span: Span) -> impl Iterator<Item = &Token> {
        self.tokens
            .iter()
            .take_while(move |token| token.range.start < span.end())
            .filter(move |token| token.range.intersects(&span))
    }

    /// Replace the tokens within `application.range`.
    pub fn apply(&mut self, application: &TokenApplication) {
        let range = application.range;
        let mut kept = Vec::with_capacity(self.tokens.len() + application.tokens.len());

        for token in self.tokens.drain(..) {
            if !token.range.intersects(&range) {
                kept.push(token);
                continue;
            }
            if token.range.start < range.start {
                kept.push(Token::new(
                    token.name.clone(),
                    Span::between(token.range.start, range.start),
                ));
            }
            if token.range.end() > range.end() {
                kept.push(Token::new(
                    token.name,
                    Span::between(range.end(), token.range.end()),
                ));
            }
        }

        kept.extend(
            application
                .tokens
                .iter()
                .filter(|token| !token.range.is_empty() && range.contains(&token.range))
                .cloned(),
        );
        kept.sort_by_key(|token| token.range);
        self.tokens = kept;
    }

    /// Keep stored tokens positioned across an edit.
    ///
    /// Tokens touching the edited range describe text that no longer exists
    /// and are dropped; tokens after it move by `delta`.
    pub fn apply_edit(&mut self, edit: &Edit) {
        self.tokens.retain_mut(|token| {
            if token.range.touches(&edit.range) {
                return false;
            }
            match token.range.shifted(edit) {
                Some(range) => {
                    token.range = range;
                    true
                }
                None => false,
            }
        });
    }
}
