//! Normalized sets of spans and validation targets.

use super::edit::{Edit, shift_spans};
use super::span::Span;

/// A sorted set of non-empty, disjoint, non-adjacent spans.
///
/// Inserting overlapping or touching spans merges them, so the set is always
/// in canonical form and two sets covering the same offsets compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanSet {
    spans: Vec<Span>,
}

/// Spans the host wants serviced first, typically the visible viewport.
pub type PrioritySet = SpanSet;

impl SpanSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_span(span: Span) -> Self {
        let mut set = Self::new();
        set.insert(span);
        set
    }

    pub fn from_spans(spans: impl IntoIterator<Item = Span>) -> Self {
        let mut set = Self::new();
        for span in spans {
            set.insert(span);
        }
        set
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn iter(&self) -> impl Iterator<Item = &Span> {
        self.spans.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Add a span, merging with any span it overlaps or touches.
    pub fn insert(&mut self, span: Span) {
        if span.is_empty() {
            return;
        }
        let lo = self.spans.partition_point(|s| s.end() < span.start);
        let hi = self.spans.partition_point(|s| s.start <= span.end());

        let mut merged = span;
        if lo < hi {
            merged = merged.union(&self.spans[lo]).union(&self.spans[hi - 1]);
        }
        self.spans.splice(lo..hi, std::iter::once(merged));
    }

    /// Append a span known to start at or after every span in the set.
    fn push_sorted(&mut self, span: Span) {
        if span.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.end() >= span.start => *last = last.union(&span),
            _ => self.spans.push(span),
        }
    }

    pub fn contains_offset(&self, offset: usize) -> bool {
        let idx = self.spans.partition_point(|s| s.end() <= offset);
        self.spans
            .get(idx)
            .is_some_and(|s| s.contains_offset(offset))
    }

    /// True if every offset of `span` is in the set.
    pub fn covers(&self, span: &Span) -> bool {
        if span.is_empty() {
            return true;
        }
        let idx = self.spans.partition_point(|s| s.end() <= span.start);
        self.spans.get(idx).is_some_and(|s| s.contains(span))
    }

    pub fn intersects(&self, span: &Span) -> bool {
        let idx = self.spans.partition_point(|s| s.end() <= span.start);
        self.spans.get(idx).is_some_and(|s| s.intersects(span))
    }

    /// The parts of the set inside `span`.
    pub fn intersect_span(&self, span: &Span) -> SpanSet {
        let idx = self.spans.partition_point(|s| s.end() <= span.start);
        let mut out = SpanSet::new();
        for s in &self.spans[idx..] {
            if s.start >= span.end() {
                break;
            }
            if let Some(piece) = s.intersection(span) {
                out.push_sorted(piece);
            }
        }
        out
    }

    pub fn intersection(&self, other: &SpanSet) -> SpanSet {
        let mut out = SpanSet::new();
        let (mut i, mut j) = (0, 0);
        while i < self.spans.len() && j < other.spans.len() {
            let (a, b) = (self.spans[i], other.spans[j]);
            if let Some(piece) = a.intersection(&b) {
                out.push_sorted(piece);
            }
            if a.end() <= b.end() {
                i += 1;
            } else {
                j += 1;
            }
        }
        out
    }

    /// The parts of this set not covered by `other`.
    pub fn difference(&self, other: &SpanSet) -> SpanSet {
        let mut out = SpanSet::new();
        let mut j = 0;
        for span in &self.spans {
            let end = span.end();
            let mut cursor = span.start;
            while j < other.spans.len() && other.spans[j].end() <= cursor {
                j += 1;
            }
            let mut k = j;
            while k < other.spans.len() && other.spans[k].start < end {
                let cut = other.spans[k];
                if cut.start > cursor {
                    out.push_sorted(Span::between(cursor, cut.start));
                }
                cursor = cursor.max(cut.end());
                k += 1;
            }
            if cursor < end {
                out.push_sorted(Span::between(cursor, end));
            }
        }
        out
    }

    pub fn union(&self, other: &SpanSet) -> SpanSet {
        let mut out = self.clone();
        for span in &other.spans {
            out.insert(*span);
        }
        out
    }

    /// Map the set through an edit. See [`Span::shifted`].
    pub fn shifted(&self, edit: &Edit) -> SpanSet {
        let mut spans = self.spans.clone();
        shift_spans(&mut spans, edit);
        SpanSet::from_spans(spans)
    }
}

impl FromIterator<Span> for SpanSet {
    fn from_iter<I: IntoIterator<Item = Span>>(iter: I) -> Self {
        SpanSet::from_spans(iter)
    }
}

impl From<Span> for SpanSet {
    fn from(span: Span) -> Self {
        SpanSet::from_span(span)
    }
}

/// What a validation or invalidation call applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeTarget {
    /// The whole document, whatever its length at the time of the call
    All,
    Span(Span),
    Set(SpanSet),
}

impl RangeTarget {
    /// Resolve against a document of `length` units.
    pub fn resolve(&self, length: usize) -> SpanSet {
        let document = Span::new(0, length);
        match self {
            RangeTarget::All => SpanSet::from_span(document),
            RangeTarget::Span(span) => span
                .intersection(&document)
                .map(SpanSet::from_span)
                .unwrap_or_default(),
            RangeTarget::Set(set) => set.intersect_span(&document),
        }
    }
}

impl From<Span> for RangeTarget {
    fn from(span: Span) -> Self {
        RangeTarget::Span(span)
    }
}

impl From<SpanSet> for RangeTarget {
    fn from(set: SpanSet) -> Self {
        RangeTarget::Set(set)
    }
}
