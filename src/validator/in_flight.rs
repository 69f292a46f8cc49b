//! Bookkeeping for asynchronous provider requests that have not completed.

use std::collections::HashMap;

use tokio::task::AbortHandle;

use crate::content::Version;
use crate::text::Span;

/// Identifies one asynchronous request for the lifetime of a validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub(crate) struct PendingRequest {
    pub(crate) span: Span,
    pub(crate) version: Version,
    handle: AbortHandle,
}

/// Requests issued but not yet merged or discarded.
///
/// Dropping the set aborts every task still running.
#[derive(Debug, Default)]
pub(crate) struct InFlightRequests {
    requests: HashMap<RequestId, PendingRequest>,
    next_id: u64,
}

impl InFlightRequests {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Reserve the id for the next request.
    pub(crate) fn next_id(&mut self) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn insert(&mut self, id: RequestId, span: Span, version: Version, handle: AbortHandle) {
        self.requests.insert(
            id,
            PendingRequest {
                span,
                version,
                handle,
            },
        );
    }

    /// Remove a request on completion. `None` if it was already aborted.
    pub(crate) fn finish(&mut self, id: RequestId) -> Option<PendingRequest> {
        self.requests.remove(&id)
    }

    /// Whether a request issued at `version` already covers `span`.
    pub(crate) fn covers(&self, span: &Span, version: Version) -> bool {
        self.requests
            .values()
            .any(|request| request.version == version && request.span.contains(span))
    }

    pub(crate) fn len(&self) -> usize {
        self.requests.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Abort every outstanding task and forget it. Returns how many were aborted.
    pub(crate) fn abort_all(&mut self) -> usize {
        let count = self.requests.len();
        for (_, request) in self.requests.drain() {
            request.handle.abort();
        }
        count
    }
}

impl Drop for InFlightRequests {
    fn drop(&mut self) {
        self.abort_all();
    }
}
