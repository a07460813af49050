//! Live event subscription - a forwarding task between a log feed and a
//! consumer sink

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::abi::{decode_event, EventRecord, Schema};
use crate::domain::backend::LogFeed;
use crate::error::{Error, Result};

/// Handle to a live event subscription.
///
/// A background task decodes each newly matching log and forwards it to
/// the sink, blocking on backpressure rather than buffering unboundedly.
/// The task stops on the first feed or decode error without retrying;
/// reconnection policy belongs to the caller.
///
/// Cancellation is cooperative and race-safe: when both cancellation and
/// a feed error are ready, cancellation wins, and by the time `cancel`
/// returns the underlying feed has been unsubscribed and no further sink
/// writes can occur. Dropping the handle without cancelling has the same
/// effect, observed at the task's next wait point.
#[derive(Debug)]
pub struct EventSubscription {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl EventSubscription {
    pub(crate) fn spawn(
        schema: Arc<Schema>,
        event: String,
        feed: LogFeed,
        sink: mpsc::Sender<EventRecord>,
    ) -> Self {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(forward(schema, event, feed, sink, cancel_rx));
        Self {
            cancel: Some(cancel_tx),
            task,
        }
    }

    /// Cancel the subscription and wait for the forwarding task to exit.
    ///
    /// When this returns, the underlying feed is unsubscribed and the
    /// sink will receive no further records.
    pub async fn cancel(mut self) -> Result<()> {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        flatten(self.task.await)
    }

    /// Wait for the subscription to terminate on its own: `Err` on a
    /// feed or decode failure, `Ok` when the feed closes or the sink is
    /// dropped.
    pub async fn join(self) -> Result<()> {
        flatten(self.task.await)
    }

    /// Whether the forwarding task has already exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

fn flatten(joined: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    match joined {
        Ok(outcome) => outcome,
        Err(err) => Err(Error::Transport(anyhow::anyhow!(
            "forwarding task failed: {err}"
        ))),
    }
}

/// The forwarding loop. Each turn races cancellation, the feed's error
/// channel, and the next log - in that priority order - and the same
/// three-way race guards the blocking sink send, so a slow consumer
/// stalls forwarding without masking cancellation or feed failure.
async fn forward(
    schema: Arc<Schema>,
    event: String,
    feed: LogFeed,
    sink: mpsc::Sender<EventRecord>,
    mut cancel: oneshot::Receiver<()>,
) -> Result<()> {
    let LogFeed {
        mut logs,
        mut error,
        mut closer,
    } = feed;

    let outcome = loop {
        tokio::select! {
            biased;
            _ = &mut cancel => {
                debug!(%event, "subscription cancelled");
                break Ok(());
            }
            failed = &mut error => match failed {
                Ok(err) => break Err(Error::Transport(err)),
                // Producer finished without an error; drain is over.
                Err(_) => break Ok(()),
            },
            received = logs.recv() => {
                let Some(log) = received else {
                    debug!(%event, "log feed closed");
                    break Ok(());
                };
                let record = match decode_event(&schema, &event, &log) {
                    Ok(record) => record,
                    Err(err) => break Err(err),
                };
                tokio::select! {
                    biased;
                    _ = &mut cancel => {
                        debug!(%event, "subscription cancelled while forwarding");
                        break Ok(());
                    }
                    failed = &mut error => match failed {
                        Ok(err) => break Err(Error::Transport(err)),
                        Err(_) => break Ok(()),
                    },
                    sent = sink.send(record) => {
                        if sent.is_err() {
                            debug!(%event, "consumer dropped the sink");
                            break Ok(());
                        }
                    }
                }
            }
        }
    };

    // Unsubscribe before reporting back, so no delivery can race a
    // completed cancel.
    closer.close();
    if let Err(err) = &outcome {
        debug!(%event, %err, "subscription stopped on error");
    }
    outcome
}
