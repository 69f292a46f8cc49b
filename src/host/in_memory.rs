use std::sync::{Arc, Mutex, RwLock};

use arc_swap::ArcSwap;

use super::{TextSystem, TokenStore};
use crate::content::{ContentSnapshot, Version, VersionedDocument};
use crate::error::{IrodoriResult, LockResultExt, ProviderError};
use crate::provider::{Token, TokenApplication};
use crate::text::{Edit, Span, SpanSet};

/// A self-contained host: a [`VersionedDocument`], a [`TokenStore`], and a
/// viewport.
///
/// Clones share state, so a test can hand one clone to the engine and keep
/// another to edit the document and inspect the stored tokens.
#[derive(Debug, Clone)]
pub struct InMemoryTextSystem {
    document: Arc<RwLock<VersionedDocument>>,
    tokens: Arc<Mutex<TokenStore>>,
    visible: Arc<ArcSwap<SpanSet>>,
    revalidated: Arc<Mutex<Vec<Span>>>,
    failures: Arc<Mutex<Vec<(Span, ProviderError)>>>,
}

impl InMemoryTextSystem {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self {
            document: Arc::new(RwLock::new(VersionedDocument::new(text))),
            tokens: Arc::new(Mutex::new(TokenStore::new())),
            visible: Arc::new(ArcSwap::from_pointee(SpanSet::new())),
            revalidated: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replace `range` with `text`, shifting stored tokens.
    ///
    /// Returns the edit to report to the engine.
    pub fn replace(&self, range: Span, text: &str) -> IrodoriResult<Edit> {
        let edit = self
            .document
            .write()
            .recover_poison("InMemoryTextSystem::replace")
            .replace(range, text)?;
        self.tokens
            .lock()
            .recover_poison("InMemoryTextSystem::replace")
            .apply_edit(&edit);
        Ok(edit)
    }

    pub fn insert(&self, at: usize, text: &str) -> IrodoriResult<Edit> {
        self.replace(Span::point(at), text)
    }

    pub fn delete(&self, range: Span) -> IrodoriResult<Edit> {
        self.replace(range, "")
    }

    pub fn text(&self) -> String {
        self.document
            .read()
            .recover_poison("InMemoryTextSystem::text")
            .text()
            .to_string()
    }

    pub fn len(&self) -> usize {
        self.document
            .read()
            .recover_poison("InMemoryTextSystem::len")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_visible(&self, spans: impl Into<SpanSet>) {
        self.visible.store(Arc::new(spans.into()));
    }

    /// Stored tokens, sorted by range
    pub fn tokens(&self) -> Vec<Token> {
        self.tokens
            .lock()
            .recover_poison("InMemoryTextSystem::tokens")
            .tokens()
            .to_vec()
    }

    pub fn tokens_in(&self, span: Span) -> Vec<Token> {
        self.tokens
            .lock()
            .recover_poison("InMemoryTextSystem::tokens_in")
            .tokens_in(span)
            .cloned()
            .collect()
    }

    /// Drain the spans reported through [`TextSystem::on_range_revalidated`].
    pub fn take_revalidated(&self) -> Vec<Span> {
        std::mem::take(
            &mut *self
                .revalidated
                .lock()
                .recover_poison("InMemoryTextSystem::take_revalidated"),
        )
    }

    pub fn failures(&self) -> Vec<(Span, ProviderError)> {
        self.failures
            .lock()
            .recover_poison("InMemoryTextSystem::failures")
            .clone()
    }
}

impl TextSystem for InMemoryTextSystem {
    fn content(&self) -> ContentSnapshot {
        self.document
            .read()
            .recover_poison("InMemoryTextSystem::content")
            .snapshot()
    }

    fn version(&self) -> Version {
        self.document
            .read()
            .recover_poison("InMemoryTextSystem::version")
            .version()
    }

    fn visible_spans(&self) -> SpanSet {
        SpanSet::clone(&self.visible.load())
    }

    fn apply_tokens(&mut self, application: &TokenApplication) {
        self.tokens
            .lock()
            .recover_poison("InMemoryTextSystem::apply_tokens")
            .apply(application);
    }

    fn on_range_revalidated(&mut self, span: Span) {
        self.revalidated
            .lock()
            .recover_poison("InMemoryTextSystem::on_range_revalidated")
            .push(span);
    }

    fn on_provider_failure(&mut self, span: Span, error: &ProviderError) {
        log::warn!(
            target: "irodori::host",
            "Token provider failed for {}: {}",
            span,
            error
        );
        self.failures
            .lock()
            .recover_poison("InMemoryTextSystem::on_provider_failure")
            .push((span, error.clone()));
    }
}
