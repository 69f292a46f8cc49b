//! One-shot highlighting of a string.

use std::sync::Arc;

use tree_sitter::Language;

use crate::config::{EngineConfig, HighlightConfig};
use crate::error::IrodoriResult;
use crate::host::InMemoryTextSystem;
use crate::provider::{Token, TokenProvider};
use crate::text::RangeTarget;
use crate::treesitter::TreeSitterProvider;
use crate::validator::SinglePhaseValidator;

/// Run one validation pass over `text` and return the resulting tokens.
///
/// Waits for every asynchronous request the pass issues. Spans the provider
/// failed on, or reported unavailable for, have no tokens.
pub async fn highlight<P: TokenProvider>(text: &str, provider: Arc<P>) -> Vec<Token> {
    let host = InMemoryTextSystem::new(text);
    let (mut validator, mut completions) =
        SinglePhaseValidator::new(host.clone(), provider, EngineConfig::default());

    validator.validate(&RangeTarget::All);
    while !validator.is_idle() {
        match completions.recv().await {
            Some(completion) => validator.handle_completion(completion),
            None => break,
        }
    }
    host.tokens()
}

/// Highlight `text` with a tree-sitter grammar and highlights query.
pub async fn highlight_with_tree_sitter(
    text: &str,
    language: Language,
    highlights: &str,
    config: HighlightConfig,
) -> IrodoriResult<Vec<Token>> {
    let provider = TreeSitterProvider::new(language, highlights, config)?;
    Ok(highlight(text, Arc::new(provider)).await)
}
