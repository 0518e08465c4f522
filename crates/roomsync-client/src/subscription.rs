//! Live, cancellable snapshot streams.
//!
//! A [`Subscription`] owns a background task that runs a query against the
//! store, pushes the result, then sleeps until the change feed reports a
//! relevant change and runs the query again. One task per subscription runs
//! its queries sequentially, so a later snapshot never reflects an older
//! store state than an earlier one.
//!
//! A failing query is delivered once as `Err` and ends the stream, while a
//! cancelled subscription simply ends. Consumers can tell a dropped feed from
//! one they closed themselves.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use roomsync_shared::SyncError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::events::Change;

/// A complete view of the subscribed data set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<T> {
    /// Strictly increasing per subscription, starting at 1.
    pub version: u64,
    pub items: T,
}

pub type SnapshotResult<T> = Result<Snapshot<T>, SyncError>;

pub struct Subscription<T> {
    label: String,
    rx: mpsc::Receiver<SnapshotResult<T>>,
    task: Option<JoinHandle<()>>,
    cancelled: bool,
}

impl<T> Subscription<T>
where
    T: PartialEq + Clone + Send + 'static,
{
    /// Start a subscription.
    ///
    /// `changes` must be subscribed before this call so that no change
    /// between the caller's last write and the first query is lost.
    /// `relevant` decides which changes trigger a re-query. Snapshots equal
    /// to the previously delivered one are skipped.
    pub(crate) fn spawn<Q, R>(
        label: impl Into<String>,
        mut changes: broadcast::Receiver<Change>,
        buffer: usize,
        relevant: R,
        mut query: Q,
    ) -> Self
    where
        Q: FnMut() -> Result<T, SyncError> + Send + 'static,
        R: Fn(&Change) -> bool + Send + 'static,
    {
        let label = label.into();
        let (tx, rx) = mpsc::channel(buffer.max(1));

        let task_label = label.clone();
        let task = tokio::spawn(async move {
            let mut version = 0u64;
            let mut last: Option<T> = None;

            loop {
                match query() {
                    Ok(items) => {
                        if last.as_ref() != Some(&items) {
                            version += 1;
                            last = Some(items.clone());
                            let snapshot = Snapshot { version, items };
                            if tx.send(Ok(snapshot)).await.is_err() {
                                debug!(subscription = %task_label, "receiver gone, stopping");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(subscription = %task_label, error = %e, "subscription query failed");
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }

                loop {
                    match changes.recv().await {
                        Ok(change) if relevant(&change) => break,
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(subscription = %task_label, skipped, "change feed lagged, re-querying");
                            break;
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!(subscription = %task_label, "change feed closed");
                            return;
                        }
                    }
                }
            }
        });

        debug!(subscription = %label, "subscription started");
        Self {
            label,
            rx,
            task: Some(task),
            cancelled: false,
        }
    }
}

impl<T> Subscription<T> {
    /// Stop delivery and release the background task.
    ///
    /// Idempotent. Snapshots that were already buffered are discarded, so
    /// nothing is observed after this returns.
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.rx.close();
        debug!(subscription = %self.label, "subscription cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<T> Unpin for Subscription<T> {}

impl<T> Stream for Subscription<T> {
    type Item = SnapshotResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.cancelled {
            return Poll::Ready(None);
        }
        this.rx.poll_recv(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}
