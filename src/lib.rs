pub mod config;
pub mod content;
pub mod error;
pub mod highlight;
pub mod host;
pub mod provider;
pub mod styler;
pub mod text;
pub mod treesitter;
pub mod validator;
pub mod validity;

// Re-export the types an embedder needs to wire up an engine
pub use config::{EngineConfig, HighlightConfig, Settings};
pub use content::{ContentSnapshot, Version, VersionedDocument};
pub use error::{IrodoriError, IrodoriResult, ProviderError};
pub use highlight::{highlight, highlight_with_tree_sitter};
pub use host::{InMemoryTextSystem, TextSystem, TokenStore};
pub use provider::{ComputationResult, ProviderResult, Token, TokenApplication, TokenProvider};
pub use styler::{StylerHandle, spawn_styler};
pub use text::{Edit, PrioritySet, RangeTarget, Span, SpanSet};
pub use treesitter::TreeSitterProvider;
pub use validator::{Completion, PassSummary, SinglePhaseValidator, ValidatorPhase, ValidatorStats};
pub use validity::{Validity, ValidityTracker};
