//! Per-instance slot for a deferred request.
//!
//! A deferred operation spawns its HTTP call on the tokio runtime and parks
//! the join handle here together with a description of how to apply the
//! response. The owning object applies it when settled, and settles before
//! starting any other operation, so at most one request per instance is in
//! flight and responses are applied in issue order.

use crate::error::{ClientError, ClientResult};
use crate::executor::{ApiRequest, SharedExecutor};
use crate::response::HttpResponse;
use std::fmt;
use std::future::Future;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::JoinHandle;

pub(crate) struct Pending<Op> {
    slot: Option<InFlight<Op>>,
}

struct InFlight<Op> {
    op: Op,
    task: JoinHandle<HttpResponse>,
    runtime: Handle,
}

impl<Op: Send + 'static> Pending<Op> {
    /// Spawns `request` and parks it. Fails outside a tokio runtime.
    pub(crate) fn start(
        &mut self,
        op: Op,
        executor: SharedExecutor,
        request: ApiRequest,
    ) -> ClientResult<()> {
        debug_assert!(self.slot.is_none(), "settle before starting a new request");
        let runtime = Handle::try_current().map_err(|e| {
            ClientError::Deferred(format!("deferred requests need a tokio runtime: {e}"))
        })?;
        let task = runtime.spawn(async move { executor.execute(request).await });
        self.slot = Some(InFlight { op, task, runtime });
        Ok(())
    }
}

impl<Op> Pending<Op> {
    pub(crate) fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    /// Waits for the parked request, returning its op and response.
    pub(crate) async fn take(&mut self) -> ClientResult<Option<(Op, HttpResponse)>> {
        let Some(InFlight { op, task, .. }) = self.slot.take() else {
            return Ok(None);
        };
        let response = task
            .await
            .map_err(|e| ClientError::Deferred(e.to_string()))?;
        Ok(Some((op, response)))
    }

    /// The runtime the parked request was spawned on.
    pub(crate) fn runtime(&self) -> Option<Handle> {
        self.slot.as_ref().map(|s| s.runtime.clone())
    }
}

impl<Op> Default for Pending<Op> {
    fn default() -> Self {
        Self { slot: None }
    }
}

// A clone is a new, idle object; the in-flight request stays with the source.
impl<Op> Clone for Pending<Op> {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl<Op> fmt::Debug for Pending<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_pending() { "Pending" } else { "Idle" })
    }
}

/// Drives `future` to completion from synchronous code.
///
/// Inside a multi-thread runtime the current worker is handed off with
/// `block_in_place`; outside any runtime the request's own runtime is used.
/// A current-thread runtime cannot make progress while blocked, so that case
/// is an error rather than a deadlock.
pub(crate) fn block_on<F: Future>(runtime: Handle, future: F) -> ClientResult<F::Output> {
    match Handle::try_current() {
        Ok(current) => match current.runtime_flavor() {
            RuntimeFlavor::MultiThread => {
                Ok(tokio::task::block_in_place(|| current.block_on(future)))
            }
            _ => Err(ClientError::Deferred(
                "blocking settle needs a multi-thread runtime; await settle() instead".to_string(),
            )),
        },
        Err(_) => Ok(runtime.block_on(future)),
    }
}
