//! Host adapter surface.
//!
//! The engine never owns the characters or the stored tokens; it reaches
//! them through [`TextSystem`]. [`InMemoryTextSystem`] is a complete host
//! for tests and for embedders without a text view of their own.

mod in_memory;
mod token_store;

pub use in_memory::InMemoryTextSystem;
pub use token_store::TokenStore;

use crate::content::{ContentSnapshot, Version};
use crate::error::ProviderError;
use crate::provider::TokenApplication;
use crate::text::{Span, SpanSet};

/// What the engine requires from the surrounding text system.
///
/// All methods are called from the engine's owning context.
pub trait TextSystem {
    /// Current content and its version. The version must increase by one
    /// with every mutation reported to the engine and stay put otherwise.
    fn content(&self) -> ContentSnapshot;

    /// Current version without materializing a snapshot.
    fn version(&self) -> Version {
        self.content().version
    }

    /// Spans to service first, typically the viewport. Queried fresh on
    /// each validation.
    fn visible_spans(&self) -> SpanSet;

    /// Replace stored tokens within `application.range` with `application.tokens`.
    fn apply_tokens(&mut self, application: &TokenApplication);

    /// `span` now holds current data and should be redrawn.
    fn on_range_revalidated(&mut self, span: Span);

    /// A provider failed for `span`. The span stays invalid and will be
    /// retried by a later validation.
    fn on_provider_failure(&mut self, span: Span, error: &ProviderError) {
        log::warn!(
            target: "irodori::host",
            "Token provider failed for {}: {}",
            span,
            error
        );
    }
}
