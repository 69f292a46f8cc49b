//! Actor that owns a validator and its host.
//!
//! Every engine operation becomes a message on a bounded command queue; the
//! actor task applies them in order and merges asynchronous completions as
//! they arrive. Commands are polled before completions, so an edit queued
//! ahead of a completion is always applied first and the completion's
//! version check sees it.
//!
//! ```ignore
//! let handle = spawn_styler(host, provider, EngineConfig::default());
//! handle.content_changed(edit.range, edit.delta).await?;
//! handle.validate_visible().await?;
//! let stats = handle.wait_idle().await?;
//! handle.shutdown().await;
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::error::{IrodoriError, IrodoriResult};
use crate::host::TextSystem;
use crate::provider::TokenProvider;
use crate::text::{Edit, PrioritySet, RangeTarget, Span};
use crate::validator::{Completion, SinglePhaseValidator, ValidatorStats};

const LOG_TARGET: &str = "irodori::styler";

enum StylerCommand {
    ContentChanged(Edit),
    Invalidate(RangeTarget),
    Validate {
        target: RangeTarget,
        priority: PrioritySet,
    },
    ValidateVisible,
    VisibleContentChanged,
    Flush(oneshot::Sender<ValidatorStats>),
    WhenIdle(oneshot::Sender<ValidatorStats>),
}

/// Cloneable handle to a running styler.
///
/// Methods return [`IrodoriError::EngineClosed`] once the actor has stopped.
#[derive(Clone)]
pub struct StylerHandle {
    commands: mpsc::Sender<StylerCommand>,
    cancel_token: CancellationToken,
}

impl StylerHandle {
    /// Report a content change. See [`SinglePhaseValidator::content_changed`].
    pub async fn content_changed(&self, range: Span, delta: isize) -> IrodoriResult<()> {
        self.apply_edit(Edit::new(range, delta)).await
    }

    pub async fn apply_edit(&self, edit: Edit) -> IrodoriResult<()> {
        self.send(StylerCommand::ContentChanged(edit)).await
    }

    pub async fn invalidate(&self, target: impl Into<RangeTarget>) -> IrodoriResult<()> {
        self.send(StylerCommand::Invalidate(target.into())).await
    }

    pub async fn validate(&self, target: impl Into<RangeTarget>) -> IrodoriResult<()> {
        self.validate_with(target, PrioritySet::new()).await
    }

    pub async fn validate_with(
        &self,
        target: impl Into<RangeTarget>,
        priority: PrioritySet,
    ) -> IrodoriResult<()> {
        self.send(StylerCommand::Validate {
            target: target.into(),
            priority,
        })
        .await
    }

    /// Validate the whole document, the host's visible spans first.
    pub async fn validate_visible(&self) -> IrodoriResult<()> {
        self.send(StylerCommand::ValidateVisible).await
    }

    /// The viewport or the text under it changed. Only the visible spans
    /// are validated; the rest of the document waits for a wider pass.
    pub async fn visible_content_changed(&self) -> IrodoriResult<()> {
        self.send(StylerCommand::VisibleContentChanged).await
    }

    /// Wait until every command sent before this call has been applied.
    /// Asynchronous requests may still be outstanding.
    pub async fn flush(&self) -> IrodoriResult<ValidatorStats> {
        let (tx, rx) = oneshot::channel();
        self.send(StylerCommand::Flush(tx)).await?;
        rx.await.map_err(|_| IrodoriError::EngineClosed)
    }

    /// Wait until no asynchronous request is outstanding.
    pub async fn wait_idle(&self) -> IrodoriResult<ValidatorStats> {
        let (tx, rx) = oneshot::channel();
        self.send(StylerCommand::WhenIdle(tx)).await?;
        rx.await.map_err(|_| IrodoriError::EngineClosed)
    }

    /// Stop the actor, aborting outstanding provider tasks, and wait for it
    /// to exit. Commands still queued are dropped.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();
        self.commands.closed().await;
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn send(&self, command: StylerCommand) -> IrodoriResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| IrodoriError::EngineClosed)
    }
}

/// Spawn a styler task owning `host` and driving `provider`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_styler<P, H>(host: H, provider: Arc<P>, config: EngineConfig) -> StylerHandle
where
    P: TokenProvider,
    H: TextSystem + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.command_queue_capacity.max(1));
    let cancel_token = CancellationToken::new();
    let (validator, completions) = SinglePhaseValidator::new(host, provider, config);

    let actor = StylerActor {
        validator,
        commands: rx,
        completions,
        cancel_token: cancel_token.clone(),
        idle_waiters: Vec::new(),
    };
    tokio::spawn(actor.run());

    StylerHandle {
        commands: tx,
        cancel_token,
    }
}

struct StylerActor<P, H> {
    validator: SinglePhaseValidator<P, H>,
    commands: mpsc::Receiver<StylerCommand>,
    completions: mpsc::UnboundedReceiver<Completion>,
    cancel_token: CancellationToken,
    idle_waiters: Vec<oneshot::Sender<ValidatorStats>>,
}

impl<P, H> StylerActor<P, H>
where
    P: TokenProvider,
    H: TextSystem + Send + 'static,
{
    async fn run(mut self) {
        log::debug!(target: LOG_TARGET, "Styler started");

        loop {
            tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => {
                    log::debug!(target: LOG_TARGET, "Styler cancelled");
                    break;
                }

                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        log::debug!(target: LOG_TARGET, "All styler handles dropped");
                        break;
                    }
                },

                Some(completion) = self.completions.recv() => {
                    self.validator.handle_completion(completion);
                }
            }

            self.notify_idle();
        }

        let aborted = self.validator.abort_in_flight();
        if aborted > 0 {
            log::debug!(
                target: LOG_TARGET,
                "Aborted {} outstanding request(s) on shutdown",
                aborted
            );
        }
        // Closing the queue wakes `StylerHandle::shutdown`; pending waiters
        // see their sender dropped.
        self.commands.close();
    }

    fn handle_command(&mut self, command: StylerCommand) {
        match command {
            StylerCommand::ContentChanged(edit) => self.validator.apply_edit(&edit),
            StylerCommand::Invalidate(target) => self.validator.invalidate(&target),
            StylerCommand::Validate { target, priority } => {
                self.validator.validate_with(&target, &priority);
            }
            StylerCommand::ValidateVisible => {
                self.validator.validate_visible();
            }
            StylerCommand::VisibleContentChanged => {
                self.validator.validate_viewport();
            }
            StylerCommand::Flush(reply) => {
                let _ = reply.send(self.validator.stats());
            }
            StylerCommand::WhenIdle(reply) => self.idle_waiters.push(reply),
        }
    }

    fn notify_idle(&mut self) {
        if self.idle_waiters.is_empty() || !self.validator.is_idle() {
            return;
        }
        let stats = self.validator.stats();
        for waiter in self.idle_waiters.drain(..) {
            let _ = waiter.send(stats);
        }
    }
}
