//! Token provider backed by a tree-sitter grammar and highlights query.

mod provider;

pub use provider::TreeSitterProvider;
