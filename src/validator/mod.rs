//! Single-phase validation scheduler.
//!
//! A pass collects the invalid spans of a target, orders them so the priority
//! set comes first, and asks the provider for each one: synchronously first,
//! then, if the provider cannot answer without blocking, as a spawned
//! asynchronous task. Each span escalates at most once per pass.
//!
//! Asynchronous results come back as [`Completion`]s on a channel owned by
//! whoever drives the validator. A completion is merged only if the host
//! version still equals the version its pass started at; otherwise it is
//! discarded and the span stays invalid for a later pass.

mod in_flight;

pub use in_flight::RequestId;

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::EngineConfig;
use crate::content::{ContentSnapshot, Version};
use crate::error::ProviderError;
use crate::host::TextSystem;
use crate::provider::{ComputationResult, ProviderResult, TokenProvider};
use crate::text::{Edit, PrioritySet, RangeTarget, Span, SpanSet};
use crate::validity::ValidityTracker;
use in_flight::InFlightRequests;

const LOG_TARGET: &str = "irodori::validator";

/// Result of an asynchronous request, delivered back to the owner.
#[derive(Debug)]
pub struct Completion {
    id: RequestId,
    span: Span,
    version: Version,
    result: ProviderResult,
}

impl Completion {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Version the request was issued against
    pub fn version(&self) -> Version {
        self.version
    }
}

/// Observable scheduler state between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorPhase {
    Idle,
    AsyncPending { outstanding: usize },
}

/// Counters accumulated over the validator's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidatorStats {
    /// Spans answered by `try_sync` with tokens or no change
    pub sync_resolved: u64,
    /// Asynchronous requests spawned
    pub async_requested: u64,
    /// Asynchronous results merged
    pub async_applied: u64,
    /// Asynchronous results dropped because the content moved on
    pub stale_discarded: u64,
    /// Provider errors, sync or async
    pub failures: u64,
}

/// Summary of one validation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub candidates: usize,
    pub sync_resolved: usize,
    pub async_requested: usize,
    pub skipped_in_flight: usize,
    pub failed: usize,
}

/// Keeps a host's tokens current by driving a [`TokenProvider`] over the
/// invalid parts of a [`ValidityTracker`].
///
/// Must be used from within a tokio runtime: asynchronous requests are
/// spawned with [`tokio::spawn`]. The caller owns the completion receiver
/// returned by [`SinglePhaseValidator::new`] and feeds each completion back
/// through [`SinglePhaseValidator::handle_completion`].
pub struct SinglePhaseValidator<P, H> {
    tracker: ValidityTracker,
    provider: Arc<P>,
    host: H,
    config: EngineConfig,
    in_flight: InFlightRequests,
    completions: mpsc::UnboundedSender<Completion>,
    stats: ValidatorStats,
    /// Version produced by the most recently reported edit
    reported: Version,
    /// Version whose geometry the tracker currently describes
    aligned: Version,
}

impl<P, H> SinglePhaseValidator<P, H>
where
    P: TokenProvider,
    H: TextSystem,
{
    /// Create a validator whose tracker starts fully invalid.
    pub fn new(
        host: H,
        provider: Arc<P>,
        config: EngineConfig,
    ) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let content = host.content();
        let validator = Self {
            tracker: ValidityTracker::new(content.len()),
            provider,
            host,
            config,
            in_flight: InFlightRequests::new(),
            completions: tx,
            stats: ValidatorStats::default(),
            reported: content.version,
            aligned: content.version,
        };
        (validator, rx)
    }

    pub fn tracker(&self) -> &ValidityTracker {
        &self.tracker
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> ValidatorStats {
        self.stats
    }

    pub fn phase(&self) -> ValidatorPhase {
        if self.in_flight.is_empty() {
            ValidatorPhase::Idle
        } else {
            ValidatorPhase::AsyncPending {
                outstanding: self.in_flight.len(),
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Report that the content in `range` (pre-edit coordinates) was replaced
    /// by text whose length differs by `delta`.
    ///
    /// In-flight requests keep running; the version check neutralizes their
    /// results. With `cancel_stale_requests` they are aborted instead.
    pub fn content_changed(&mut self, range: Span, delta: isize) {
        self.apply_edit(&Edit::new(range, delta));
    }

    /// [`SinglePhaseValidator::content_changed`] for an already-built edit.
    ///
    /// Each reported edit is taken to advance the host version by one. An
    /// edit whose version a length reset already caught up with is skipped,
    /// since the reset tracker describes the post-edit text.
    pub fn apply_edit(&mut self, edit: &Edit) {
        self.reported = self.reported.next();
        if self.reported <= self.aligned {
            log::debug!(
                target: LOG_TARGET,
                "Skipping edit at {}: tracker was reset at {}",
                edit.range,
                self.aligned
            );
            return;
        }
        self.aligned = self.reported;

        log::trace!(
            target: LOG_TARGET,
            "Content changed at {} by {:+}",
            edit.range,
            edit.delta
        );
        self.tracker.content_changed(edit);
        if self.config.cancel_stale_requests {
            let aborted = self.in_flight.abort_all();
            if aborted > 0 {
                log::debug!(
                    target: LOG_TARGET,
                    "Aborted {} stale request(s) after edit",
                    aborted
                );
            }
        }
    }

    /// Force spans to be recomputed on the next validation.
    pub fn invalidate(&mut self, target: &RangeTarget) {
        self.tracker.invalidate(target);
    }

    /// Validate `target` with no priority set.
    pub fn validate(&mut self, target: &RangeTarget) -> PassSummary {
        self.validate_with(target, &PrioritySet::new())
    }

    /// Validate the whole document, servicing the host's visible spans first.
    pub fn validate_visible(&mut self) -> PassSummary {
        let visible = self.host.visible_spans();
        self.validate_with(&RangeTarget::All, &visible)
    }

    /// Validate only the host's visible spans. Text outside the viewport is
    /// left for a later pass.
    pub fn validate_viewport(&mut self) -> PassSummary {
        let visible = self.host.visible_spans();
        self.validate_with(&RangeTarget::Set(visible.clone()), &visible)
    }

    /// Run one pass over the invalid parts of `target`, spans intersecting
    /// `priority` first.
    pub fn validate_with(&mut self, target: &RangeTarget, priority: &PrioritySet) -> PassSummary {
        let content = self.host.content();
        let version = content.version;
        self.sync_length(&content);

        let candidates = self.candidates(target, priority, content.len());
        let mut summary = PassSummary {
            candidates: candidates.len(),
            ..PassSummary::default()
        };

        for span in candidates {
            if self.in_flight.covers(&span, version) {
                log::trace!(
                    target: LOG_TARGET,
                    "Skipping {}: already requested at {}",
                    span,
                    version
                );
                summary.skipped_in_flight += 1;
                continue;
            }

            log::trace!(target: LOG_TARGET, "Trying {} synchronously at {}", span, version);
            match self.provider.try_sync(span, &content) {
                Ok(ComputationResult::Unavailable) => {
                    self.spawn_request(span, &content);
                    summary.async_requested += 1;
                }
                Ok(result) => {
                    self.merge(span, result);
                    self.stats.sync_resolved += 1;
                    summary.sync_resolved += 1;
                }
                Err(error) => {
                    self.fail(span, &error);
                    summary.failed += 1;
                }
            }
        }

        if summary.candidates > 0 {
            log::debug!(
                target: LOG_TARGET,
                "Pass at {}: {} candidate(s), {} sync, {} async, {} skipped, {} failed",
                version,
                summary.candidates,
                summary.sync_resolved,
                summary.async_requested,
                summary.skipped_in_flight,
                summary.failed
            );
        }
        summary
    }

    /// Merge or discard the result of an asynchronous request.
    pub fn handle_completion(&mut self, completion: Completion) {
        let Completion {
            id,
            span,
            version,
            result,
        } = completion;

        if self.in_flight.finish(id).is_none() {
            log::trace!(target: LOG_TARGET, "Ignoring aborted request for {}", span);
            return;
        }

        let current = self.host.version();
        if current != version {
            self.stats.stale_discarded += 1;
            log::debug!(
                target: LOG_TARGET,
                "Discarding stale result for {}: computed at {}, content is at {}",
                span,
                version,
                current
            );
            return;
        }

        match result {
            Ok(ComputationResult::Unavailable) => {
                log::trace!(target: LOG_TARGET, "Provider unavailable for {}", span);
            }
            Ok(result) => {
                self.merge(span, result);
                self.stats.async_applied += 1;
            }
            Err(error) => self.fail(span, &error),
        }
    }

    /// Abort all outstanding requests. Their spans stay invalid.
    pub fn abort_in_flight(&mut self) -> usize {
        self.in_flight.abort_all()
    }

    /// Invalid parts of `target`, clipped to it, priority spans first and
    /// split to the configured request size.
    fn candidates(&self, target: &RangeTarget, priority: &PrioritySet, length: usize) -> Vec<Span> {
        let invalid = SpanSet::from_spans(self.tracker.invalid_ranges(target))
            .intersection(&target.resolve(length));
        let high = invalid.intersection(priority);
        let rest = invalid.difference(priority);

        let max_len = self.config.max_request_len.unwrap_or(usize::MAX);
        high.iter()
            .chain(rest.iter())
            .flat_map(|span| span.chunks(max_len))
            .collect()
    }

    fn sync_length(&mut self, content: &ContentSnapshot) {
        if self.tracker.length() != content.len() {
            log::warn!(
                target: LOG_TARGET,
                "Tracked length {} does not match content length {} at {}; invalidating everything",
                self.tracker.length(),
                content.len(),
                content.version
            );
            self.tracker.reset(content.len());
            self.aligned = self.aligned.max(content.version);
        }
    }

    fn spawn_request(&mut self, span: Span, content: &ContentSnapshot) {
        let id = self.in_flight.next_id();
        let version = content.version;
        let provider = Arc::clone(&self.provider);
        let snapshot = content.clone();
        let completions = self.completions.clone();

        let task = tokio::spawn(async move {
            let result = provider.compute_async(span, snapshot).await;
            // The owner may be gone; its tracker went with it.
            let _ = completions.send(Completion {
                id,
                span,
                version,
                result,
            });
        });

        log::trace!(
            target: LOG_TARGET,
            "Requested {} asynchronously at {}",
            span,
            version
        );
        self.in_flight.insert(id, span, version, task.abort_handle());
        self.stats.async_requested += 1;
    }

    fn merge(&mut self, span: Span, result: ComputationResult) {
        match result {
            ComputationResult::Tokens(application) => {
                let application = application.clipped_to(span);
                self.host.apply_tokens(&application);
                self.tracker.mark_valid(span);
                self.host.on_range_revalidated(span);
            }
            ComputationResult::NoChange => self.tracker.mark_valid(span),
            ComputationResult::Unavailable => {}
        }
    }

    fn fail(&mut self, span: Span, error: &ProviderError) {
        self.stats.failures += 1;
        log::debug!(target: LOG_TARGET, "Provider failed for {}: {}", span, error);
        self.host.on_provider_failure(span, error);
    }
}
