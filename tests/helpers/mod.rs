//! Shared test helpers.
//!
//! Note: We use `helpers/mod.rs` instead of `helpers.rs` because Cargo
//! auto-discovers top-level `.rs` files in `tests/` as integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use irodori::{ComputationResult, ContentSnapshot, ProviderError, ProviderResult, Span, Token, TokenApplication, TokenProvider};
use tokio::sync::Semaphore;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// How [`ScriptedProvider`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `try_sync` answers with tokens
    Sync,
    /// `try_sync` is unavailable; `compute_async` answers with tokens
    Async,
    /// `try_sync` answers `NoChange`
    NoChange,
    /// `try_sync` fails
    Failing,
}

/// A provider that tags every ASCII word as a `word` token and records the
/// spans it was asked for.
///
/// In gated mode each asynchronous request waits for a permit released by
/// [`ScriptedProvider::release`], so tests decide when results arrive. In
/// span-gated mode each span has its own gate, opened by
/// [`ScriptedProvider::release_span`], so tests also decide the order.
pub struct ScriptedProvider {
    mode: Mode,
    gate: Option<Semaphore>,
    span_gates: Option<Mutex<HashMap<Span, Arc<Semaphore>>>>,
    sync_requests: Mutex<Vec<Span>>,
    async_requests: Mutex<Vec<Span>>,
}

impl ScriptedProvider {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            gate: None,
            span_gates: None,
            sync_requests: Mutex::new(Vec::new()),
            async_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(Mode::Async)
        }
    }

    pub fn span_gated() -> Self {
        Self {
            span_gates: Some(Mutex::new(HashMap::new())),
            ..Self::new(Mode::Async)
        }
    }

    /// Let the pending or next asynchronous request for `span` complete.
    pub fn release_span(&self, span: Span) {
        if let Some(gate) = self.span_gate(span) {
            gate.add_permits(1);
        }
    }

    fn span_gate(&self, span: Span) -> Option<Arc<Semaphore>> {
        let gates = self.span_gates.as_ref()?;
        let mut gates = gates.lock().unwrap();
        Some(Arc::clone(
            gates.entry(span).or_insert_with(|| Arc::new(Semaphore::new(0))),
        ))
    }

    /// Let `n` pending or future asynchronous requests complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn sync_requests(&self) -> Vec<Span> {
        self.sync_requests.lock().unwrap().clone()
    }

    pub fn async_requests(&self) -> Vec<Span> {
        self.async_requests.lock().unwrap().clone()
    }

    /// Every span asked for, sync attempts first-come
    pub fn request_count(&self) -> usize {
        self.sync_requests.lock().unwrap().len() + self.async_requests.lock().unwrap().len()
    }

    pub fn clear_requests(&self) {
        self.sync_requests.lock().unwrap().clear();
        self.async_requests.lock().unwrap().clear();
    }
}

impl TokenProvider for ScriptedProvider {
    fn try_sync(&self, span: Span, content: &ContentSnapshot) -> ProviderResult {
        self.sync_requests.lock().unwrap().push(span);
        match self.mode {
            Mode::Sync => Ok(ComputationResult::Tokens(word_tokens(&content.text, span))),
            Mode::Async => Ok(ComputationResult::Unavailable),
            Mode::NoChange => Ok(ComputationResult::NoChange),
            Mode::Failing => Err(ProviderError::failed("scripted failure")),
        }
    }

    async fn compute_async(&self, span: Span, content: ContentSnapshot) -> ProviderResult {
        self.async_requests.lock().unwrap().push(span);
        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.map_err(|_| ProviderError::Cancelled)?;
            permit.forget();
        }
        if let Some(gate) = self.span_gate(span) {
            let permit = gate.acquire().await.map_err(|_| ProviderError::Cancelled)?;
            permit.forget();
        }
        Ok(ComputationResult::Tokens(word_tokens(&content.text, span)))
    }
}

/// `word` tokens for the ASCII alphanumeric runs intersecting `span`.
pub fn word_tokens(text: &str, span: Span) -> TokenApplication {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, byte) in text.bytes().chain(std::iter::once(b' ')).enumerate() {
        match (byte.is_ascii_alphanumeric(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                let word = Span::between(s, i);
                if word.intersects(&span) {
                    tokens.push(Token::new("word", word));
                }
                start = None;
            }
            _ => {}
        }
    }
    TokenApplication::new(tokens, span)
}

/// Words of `text` as expected after a full validation.
pub fn expected_words(text: &str) -> Vec<Token> {
    word_tokens(text, Span::new(0, text.len())).tokens
}
