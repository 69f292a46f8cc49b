//! Validity tracking for derived data.
//!
//! The tracker partitions `[0, length)` into runs labelled valid or invalid.
//! Runs are disjoint, cover the whole document, and adjacent runs always
//! carry different labels.
//!
//! # Edits
//!
//! An edit keeps runs before it, translates runs after it by `delta`, and
//! turns every run touching the closed edit interval into one invalid run
//! that also covers the replacement text. Touching counts: typing at the end
//! of a valid run can change how that run tokenizes, so the run is dropped
//! rather than trusted.
//!
//! Runs live in a `BTreeMap` keyed by start offset. Lookups are logarithmic;
//! an edit costs the touched runs plus re-keying the runs after it, and never
//! depends on the document length.

use std::collections::BTreeMap;

use crate::text::{Edit, RangeTarget, Span, SpanSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Validity {
    Valid,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    end: usize,
    validity: Validity,
}

/// Authoritative record of which parts of the document hold current data.
#[derive(Debug, Clone)]
pub struct ValidityTracker {
    runs: BTreeMap<usize, Run>,
    length: usize,
}

impl ValidityTracker {
    /// A fully invalid partition of `length` units.
    pub fn new(length: usize) -> Self {
        let mut tracker = Self {
            runs: BTreeMap::new(),
            length,
        };
        tracker.reset(length);
        tracker
    }

    /// Forget everything and start over fully invalid.
    pub fn reset(&mut self, length: usize) {
        self.runs.clear();
        self.length = length;
        if length > 0 {
            self.runs.insert(
                0,
                Run {
                    end: length,
                    validity: Validity::Invalid,
                },
            );
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// All runs in document order.
    pub fn runs(&self) -> impl Iterator<Item = (Span, Validity)> + '_ {
        self.runs
            .iter()
            .map(|(&start, run)| (Span::between(start, run.end), run.validity))
    }

    pub fn is_fully_valid(&self) -> bool {
        self.runs.values().all(|run| run.validity == Validity::Valid)
    }

    /// True if every offset of `span` is valid. Offsets past the end are never valid.
    pub fn is_valid(&self, span: &Span) -> bool {
        if span.is_empty() {
            return true;
        }
        if span.end() > self.length {
            return false;
        }
        self.runs_intersecting(span)
            .all(|(_, run)| run.validity == Validity::Valid)
    }

    /// Apply a content change.
    pub fn content_changed(&mut self, edit: &Edit) {
        let edit = edit.clamped(self.length);
        let edit_start = edit.range.start;
        let edit_end = edit.range.end();

        let touched: Vec<(usize, Run)> = self
            .runs
            .range(..=edit_end)
            .rev()
            .take_while(|(_, run)| run.end >= edit_start)
            .map(|(&start, &run)| (start, run))
            .collect();

        let lo = touched
            .last()
            .map_or(edit_start, |(start, _)| (*start).min(edit_start));
        let hi = touched
            .first()
            .map_or(edit_end, |(_, run)| run.end.max(edit_end));

        for (start, _) in &touched {
            self.runs.remove(start);
        }

        let tail = self.runs.split_off(&hi);
        for (start, run) in tail {
            self.runs.insert(
                start.saturating_add_signed(edit.delta),
                Run {
                    end: run.end.saturating_add_signed(edit.delta),
                    validity: run.validity,
                },
            );
        }

        self.length = self.length.saturating_add_signed(edit.delta);

        let invalid = Span::between(lo, hi.saturating_add_signed(edit.delta));
        if !invalid.is_empty() {
            self.runs.insert(
                invalid.start,
                Run {
                    end: invalid.end(),
                    validity: Validity::Invalid,
                },
            );
            self.coalesce_around(invalid.start);
        } else if let Some((&prev, _)) = self.runs.range(..lo).next_back() {
            // A pure deletion of whole runs can leave two equal neighbors adjacent
            self.merge_with_next(prev);
        }
    }

    /// Mark everything the target covers as invalid.
    pub fn invalidate(&mut self, target: &RangeTarget) {
        for span in target.resolve(self.length).iter() {
            self.set(*span, Validity::Invalid);
        }
    }

    /// Mark exactly `span` valid. Parts outside the document are ignored.
    pub fn mark_valid(&mut self, span: Span) {
        if let Some(span) = span.clamp_to(self.length) {
            self.set(span, Validity::Valid);
        }
    }

    /// Maximal invalid runs intersecting the target, ascending.
    pub fn invalid_ranges(&self, target: &RangeTarget) -> Vec<Span> {
        let mut out: Vec<Span> = Vec::new();
        for span in target.resolve(self.length).iter() {
            for (start, run) in self.runs_intersecting(span) {
                if run.validity != Validity::Invalid {
                    continue;
                }
                let run_span = Span::between(start, run.end);
                if out.last() != Some(&run_span) {
                    out.push(run_span);
                }
            }
        }
        out
    }

    /// Invalid parts of the document as a set
    pub fn invalid_set(&self) -> SpanSet {
        self.invalid_ranges(&RangeTarget::All).into_iter().collect()
    }

    fn runs_intersecting(&self, span: &Span) -> impl Iterator<Item = (usize, Run)> + '_ {
        let span = *span;
        let first = self
            .runs
            .range(..=span.start)
            .next_back()
            .map_or(span.start, |(&start, _)| start);
        self.runs
            .range(first..span.end())
            .filter(move |(_, run)| run.end > span.start)
            .map(|(&start, &run)| (start, run))
    }

    /// Label exactly `span` (already clamped, non-empty).
    fn set(&mut self, span: Span, validity: Validity) {
        self.split_at(span.start);
        self.split_at(span.end());

        let inner: Vec<usize> = self
            .runs
            .range(span.start..span.end())
            .map(|(&start, _)| start)
            .collect();
        for start in inner {
            self.runs.remove(&start);
        }
        self.runs.insert(
            span.start,
            Run {
                end: span.end(),
                validity,
            },
        );
        self.coalesce_around(span.start);
    }

    /// Ensure a run boundary at `offset`.
    fn split_at(&mut self, offset: usize) {
        let Some((&start, &run)) = self.runs.range(..=offset).next_back() else {
            return;
        };
        if start < offset && offset < run.end {
            self.runs.insert(
                start,
                Run {
                    end: offset,
                    validity: run.validity,
                },
            );
            self.runs.insert(offset, run);
        }
    }

    fn coalesce_around(&mut self, start: usize) {
        self.merge_with_next(start);
        if let Some((&prev, _)) = self.runs.range(..start).next_back() {
            self.merge_with_next(prev);
        }
    }

    fn merge_with_next(&mut self, start: usize) {
        let Some(run) = self.runs.get(&start).copied() else {
            return;
        };
        let Some(next) = self.runs.get(&run.end).copied() else {
            return;
        };
        if next.validity == run.validity {
            self.runs.remove(&run.end);
            if let Some(merged) = self.runs.get_mut(&start) {
                merged.end = next.end;
            }
        }
    }
}
