//! Token provider contract.
//!
//! A provider computes tokens for a span of a content snapshot. It is asked
//! synchronously first; only when it cannot answer without blocking does the
//! validator fall back to the asynchronous path.

use std::future::Future;

use crate::content::ContentSnapshot;
use crate::error::ProviderError;
use crate::text::Span;

/// A labelled annotation over a sub-range of the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub name: String,
    pub range: Span,
}

impl Token {
    pub fn new(name: impl Into<String>, range: Span) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }
}

/// Tokens that fully replace whatever was stored within `range`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenApplication {
    pub tokens: Vec<Token>,
    pub range: Span,
}

impl TokenApplication {
    pub fn new(tokens: Vec<Token>, range: Span) -> Self {
        Self { tokens, range }
    }

    /// Build an application from provider output, renaming each token through
    /// `rename` (unmapped names should be returned unchanged).
    pub fn from_named_ranges<'a>(
        named: impl IntoIterator<Item = (&'a str, Span)>,
        range: Span,
        rename: impl Fn(&'a str) -> &'a str,
    ) -> Self {
        let tokens = named
            .into_iter()
            .map(|(name, span)| Token::new(rename(name), span))
            .collect();
        Self { tokens, range }
    }

    /// Restrict the application to `span`: tokens outside it are dropped and
    /// tokens crossing its edges are clipped.
    pub fn clipped_to(self, span: Span) -> Self {
        let tokens = self
            .tokens
            .into_iter()
            .filter_map(|token| {
                token
                    .range
                    .intersection(&span)
                    .map(|range| Token::new(token.name, range))
            })
            .collect();
        Self {
            tokens,
            range: span,
        }
    }
}

/// Outcome of one computation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputationResult {
    /// New tokens for the span
    Tokens(TokenApplication),
    /// The span is valid as-is
    NoChange,
    /// No answer right now; try later or fall back
    Unavailable,
}

/// Result of a provider call; errors go through a separate channel from
/// `Unavailable`.
pub type ProviderResult = Result<ComputationResult, ProviderError>;

/// Computes derived tokens for spans of content.
///
/// Implementations close over whatever parser or state they need. Both
/// methods must tolerate overlapping concurrent requests, and dropping the
/// future returned by [`TokenProvider::compute_async`] must leave the
/// provider usable.
pub trait TokenProvider: Send + Sync + 'static {
    /// Answer immediately or return `Unavailable`. Must never block.
    fn try_sync(&self, span: Span, content: &ContentSnapshot) -> ProviderResult;

    /// Compute the span, suspending as long as needed.
    fn compute_async(
        &self,
        span: Span,
        content: ContentSnapshot,
    ) -> impl Future<Output = ProviderResult> + Send;
}
