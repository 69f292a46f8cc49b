//! Coordinate model: spans, span sets, edits, and offset conversion.

pub mod edit;
pub mod offsets;
pub mod span;
pub mod span_set;

pub use edit::{Edit, shift_spans};
pub use offsets::{OffsetIndex, byte_to_utf16, utf16_len, utf16_to_byte};
pub use span::Span;
pub use span_set::{PrioritySet, RangeTarget, SpanSet};
