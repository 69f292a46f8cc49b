use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tree_sitter::{Language, Parser, Query, QueryCursor, StreamingIterator, Tree};

use crate::config::HighlightConfig;
use crate::content::{ContentSnapshot, Version};
use crate::error::{IrodoriError, IrodoriResult, LockResultExt, ProviderError};
use crate::provider::{ComputationResult, ProviderResult, TokenApplication, TokenProvider};
use crate::text::{OffsetIndex, Span};

const LOG_TARGET: &str = "irodori::treesitter";

/// A parse of one content version.
#[derive(Clone)]
struct ParsedTree {
    version: Version,
    tree: Tree,
    offsets: Arc<OffsetIndex>,
}

/// Highlights spans by running a tree-sitter query over a cached parse.
///
/// `try_sync` answers only when the cached tree matches the snapshot's
/// version. Otherwise the asynchronous path parses on the blocking pool and
/// caches the result. Parses are serialized, and a request that waited
/// behind another one rechecks the cache first, so concurrent requests for
/// one version share a single parse.
pub struct TreeSitterProvider {
    language: Language,
    query: Query,
    config: HighlightConfig,
    cache: Mutex<Option<ParsedTree>>,
    parse_lock: tokio::sync::Mutex<()>,
    parses: AtomicUsize,
}

impl TreeSitterProvider {
    /// Compile `highlights` for `language`.
    pub fn new(language: Language, highlights: &str, config: HighlightConfig) -> IrodoriResult<Self> {
        let query = Query::new(&language, highlights).map_err(|e| IrodoriError::query(e.to_string()))?;

        // Fail here rather than on every parse
        Parser::new()
            .set_language(&language)
            .map_err(|e| IrodoriError::language_not_supported(e.to_string()))?;

        Ok(Self {
            language,
            query,
            config,
            cache: Mutex::new(None),
            parse_lock: tokio::sync::Mutex::new(()),
            parses: AtomicUsize::new(0),
        })
    }

    /// Version of the cached parse, if any
    pub fn cached_version(&self) -> Option<Version> {
        self.cache
            .lock()
            .recover_poison("TreeSitterProvider::cached_version")
            .as_ref()
            .map(|parsed| parsed.version)
    }

    /// Number of completed parses since creation
    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::Relaxed)
    }

    /// Capture names of the highlights query
    pub fn capture_names(&self) -> &[&str] {
        self.query.capture_names()
    }

    fn cached(&self, version: Version) -> Option<ParsedTree> {
        self.cache
            .lock()
            .recover_poison("TreeSitterProvider::cached")
            .as_ref()
            .filter(|parsed| parsed.version == version)
            .cloned()
    }

    /// Cache `parsed` unless a newer version is already cached.
    fn store(&self, parsed: ParsedTree) {
        let mut cache = self.cache.lock().recover_poison("TreeSitterProvider::store");
        match cache.as_ref() {
            Some(current) if current.version >= parsed.version => {}
            _ => *cache = Some(parsed),
        }
    }

    /// Parse `content` unless a request that held the lock before us already
    /// did.
    async fn parse_once(&self, content: &ContentSnapshot) -> Result<ParsedTree, ProviderError> {
        let _guard = self.parse_lock.lock().await;
        if let Some(parsed) = self.cached(content.version) {
            return Ok(parsed);
        }

        let language = self.language.clone();
        let text = Arc::clone(&content.text);
        let tree = tokio::task::spawn_blocking(move || parse(&language, &text))
            .await
            .map_err(|e| {
                if e.is_cancelled() {
                    ProviderError::Cancelled
                } else {
                    ProviderError::failed(format!("parse task panicked: {e}"))
                }
            })??;

        self.parses.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            target: LOG_TARGET,
            "Parsed {} units at {}",
            content.len(),
            content.version
        );
        let parsed = ParsedTree {
            version: content.version,
            tree,
            offsets: Arc::new(OffsetIndex::new(&content.text)),
        };
        self.store(parsed.clone());
        Ok(parsed)
    }

    fn named_ranges<'a>(
        &'a self,
        parsed: &ParsedTree,
        content: &ContentSnapshot,
        span: Span,
    ) -> Vec<(&'a str, Span)> {
        let offsets = &parsed.offsets;
        let byte_range = offsets.to_byte(span.start)..offsets.to_byte(span.end());

        let mut cursor = QueryCursor::new();
        cursor.set_byte_range(byte_range);
        let mut matches = cursor.matches(&self.query, parsed.tree.root_node(), content.text.as_bytes());

        let capture_names = self.query.capture_names();
        let mut named = Vec::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let capture_name = capture_names[capture.index as usize];
                // Underscore captures are helpers for predicates, not highlights
                if capture_name.starts_with('_') {
                    continue;
                }
                let node_range = capture.node.byte_range();
                let range = Span::between(
                    offsets.to_utf16(node_range.start),
                    offsets.to_utf16(node_range.end),
                );
                if range.is_empty() {
                    continue;
                }
                named.push((capture_name, range));
            }
        }
        named
    }

    fn application(&self, parsed: &ParsedTree, content: &ContentSnapshot, span: Span) -> ProviderResult {
        let named = self.named_ranges(parsed, content, span);
        log::trace!(
            target: LOG_TARGET,
            "Found {} token(s) in {} at {}",
            named.len(),
            span,
            content.version
        );
        let application =
            TokenApplication::from_named_ranges(named, span, |name| self.config.resolve(name));
        Ok(ComputationResult::Tokens(application.clipped_to(span)))
    }
}

impl TokenProvider for TreeSitterProvider {
    fn try_sync(&self, span: Span, content: &ContentSnapshot) -> ProviderResult {
        match self.cached(content.version) {
            Some(parsed) => self.application(&parsed, content, span),
            None => Ok(ComputationResult::Unavailable),
        }
    }

    async fn compute_async(&self, span: Span, content: ContentSnapshot) -> ProviderResult {
        let parsed = match self.cached(content.version) {
            Some(parsed) => parsed,
            None => self.parse_once(&content).await?,
        };
        self.application(&parsed, &content, span)
    }
}

fn parse(language: &Language, text: &str) -> Result<Tree, ProviderError> {
    let mut parser = Parser::new();
    parser
        .set_language(language)
        .map_err(|e| ProviderError::parse(e.to_string()))?;
    parser
        .parse(text, None)
        .ok_or_else(|| ProviderError::parse("parser produced no tree"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const QUERY: &str = r#"
        (line_comment) @comment
        "fn" @keyword
        (function_item name: (identifier) @function)
    "#;

    fn provider(config: HighlightConfig) -> TreeSitterProvider {
        TreeSitterProvider::new(tree_sitter_rust::LANGUAGE.into(), QUERY, config).unwrap()
    }

    fn names(result: ProviderResult) -> Vec<(String, Span)> {
        match result.unwrap() {
            ComputationResult::Tokens(application) => application
                .tokens
                .into_iter()
                .map(|token| (token.name, token.range))
                .collect(),
            other => panic!("expected tokens, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_query_is_rejected() {
        let result = TreeSitterProvider::new(
            tree_sitter_rust::LANGUAGE.into(),
            "(not_a_node) @x",
            HighlightConfig::default(),
        );
        assert!(matches!(result, Err(IrodoriError::Query { .. })));
    }

    #[test]
    fn test_try_sync_without_tree_is_unavailable() {
        let provider = provider(HighlightConfig::default());
        let content = ContentSnapshot::new("fn main() {}", Version::INITIAL);

        let result = provider.try_sync(content.extent(), &content);

        assert_eq!(result, Ok(ComputationResult::Unavailable));
    }

    #[tokio::test]
    async fn test_async_parse_then_sync_hit() {
        let provider = provider(HighlightConfig::default());
        let content = ContentSnapshot::new("fn main() {}\n// hi", Version::new(3));

        let tokens = names(provider.compute_async(content.extent(), content.clone()).await);
        assert_eq!(
            tokens,
            vec![
                ("keyword".to_string(), Span::from(0..2)),
                ("function".to_string(), Span::from(3..7)),
                ("comment".to_string(), Span::from(13..18)),
            ]
        );
        assert_eq!(provider.cached_version(), Some(Version::new(3)));

        // Same version answers synchronously, restricted to the span
        let tokens = names(provider.try_sync(Span::from(3..18), &content));
        assert_eq!(
            tokens,
            vec![
                ("function".to_string(), Span::from(3..7)),
                ("comment".to_string(), Span::from(13..18)),
            ]
        );
    }

    #[tokio::test]
    async fn test_older_parse_does_not_replace_newer() {
        let provider = provider(HighlightConfig::default());
        let newer = ContentSnapshot::new("fn b() {}", Version::new(5));
        let older = ContentSnapshot::new("fn a() {}", Version::new(4));

        provider.compute_async(newer.extent(), newer).await.unwrap();
        provider.compute_async(older.extent(), older).await.unwrap();

        assert_eq!(provider.cached_version(), Some(Version::new(5)));
    }

    #[tokio::test]
    async fn test_offsets_are_utf16() {
        let provider = provider(HighlightConfig::default());
        // "é" is two bytes and one UTF-16 unit; "𝄞" is four bytes and two units
        let content = ContentSnapshot::new("fn é() {} // 𝄞", Version::INITIAL);

        let tokens = names(provider.compute_async(content.extent(), content.clone()).await);

        assert_eq!(
            tokens,
            vec![
                ("keyword".to_string(), Span::from(0..2)),
                ("function".to_string(), Span::from(3..4)),
                ("comment".to_string(), Span::from(10..15)),
            ]
        );
    }

    #[tokio::test]
    async fn test_name_map_is_applied() {
        let provider = provider(HighlightConfig {
            name_map: HashMap::from([("keyword".to_string(), "kw".to_string())]),
        });
        let content = ContentSnapshot::new("fn f() {}", Version::INITIAL);

        let tokens = names(provider.compute_async(content.extent(), content.clone()).await);

        assert_eq!(tokens[0], ("kw".to_string(), Span::from(0..2)));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_parse() {
        let provider = Arc::new(provider(HighlightConfig::default()));
        let content = ContentSnapshot::new("fn a() {}\n".repeat(8), Version::new(2));

        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let provider = Arc::clone(&provider);
                let content = content.clone();
                tokio::spawn(async move {
                    provider
                        .compute_async(Span::new(i * 20, 20), content)
                        .await
                })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }

        assert_eq!(provider.parse_count(), 1);
        assert_eq!(provider.cached_version(), Some(Version::new(2)));
    }
}
