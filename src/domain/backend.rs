//! Transport backend seams - the capabilities a contract handle is bound
//! with
//!
//! The layer depends on these traits but does not implement the chain
//! protocol itself; implementations may sit on a local node, a remote RPC
//! endpoint, or an in-memory test harness. Backend failures are opaque
//! `anyhow` errors and are propagated verbatim, never retried here.

use alloy::rpc::types::{Filter, Log};
use alloy_primitives::{Address, Bytes, B256, U256};
use tokio::sync::{mpsc, oneshot};

/// Read-only call execution against a deployed address.
#[async_trait::async_trait]
pub trait CallBackend: Send + Sync + 'static {
    /// Execute a read-only call and return the raw response bytes.
    async fn call(&self, to: Address, calldata: Bytes) -> anyhow::Result<Bytes>;
}

/// State-changing call submission.
#[async_trait::async_trait]
pub trait TransactBackend: Send + Sync + 'static {
    /// Submit a state-changing call, returning the transaction hash to
    /// track. Submission failures (authorization, nonce conflicts) come
    /// back as errors; retry policy belongs to the caller.
    async fn send_raw(&self, to: Address, calldata: Bytes, value: U256) -> anyhow::Result<B256>;
}

/// Historical log queries and live log feeds.
#[async_trait::async_trait]
pub trait LogBackend: Send + Sync + 'static {
    /// Query historical logs matching the filter, in chain-canonical
    /// order (ascending block number, then log index).
    async fn get_logs(&self, filter: &Filter) -> anyhow::Result<Vec<Log>>;

    /// Open a live feed of newly matching logs.
    async fn watch_logs(&self, filter: &Filter) -> anyhow::Result<LogFeed>;

    /// Whether this backend's transport can serve live feeds at all.
    fn supports_watch(&self) -> bool;
}

/// Consumer half of a live log feed: matching logs, a one-shot terminal
/// error, and a closer that unsubscribes the producer.
pub struct LogFeed {
    /// Newly matching raw logs, in arrival order
    pub logs: mpsc::Receiver<Log>,
    /// The feed's terminal failure, if it ever produces one
    pub error: oneshot::Receiver<anyhow::Error>,
    /// Unsubscribes the underlying feed when fired or dropped
    pub closer: FeedCloser,
}

impl LogFeed {
    /// Create a paired producer/consumer feed with the given log buffer.
    pub fn channel(buffer: usize) -> (FeedProducer, LogFeed) {
        let (log_tx, log_rx) = mpsc::channel(buffer);
        let (err_tx, err_rx) = oneshot::channel();
        let (close_tx, close_rx) = oneshot::channel();

        let producer = FeedProducer {
            logs: log_tx,
            error: err_tx,
            closed: close_rx,
        };
        let feed = LogFeed {
            logs: log_rx,
            error: err_rx,
            closer: FeedCloser(Some(close_tx)),
        };
        (producer, feed)
    }
}

/// Producer half of a live log feed, held by the backend's pump task.
///
/// The task must stop producing once `closed` resolves - it resolves both
/// on an explicit unsubscribe and when the consumer drops the feed.
pub struct FeedProducer {
    /// Sink for newly matching raw logs
    pub logs: mpsc::Sender<Log>,
    /// One-shot slot for the feed's terminal failure
    pub error: oneshot::Sender<anyhow::Error>,
    /// Resolves when the consumer unsubscribes
    pub closed: oneshot::Receiver<()>,
}

/// Fires the unsubscribe signal for a [`LogFeed`]; dropping it unfired
/// has the same effect.
pub struct FeedCloser(Option<oneshot::Sender<()>>);

impl FeedCloser {
    /// Signal the producer to unsubscribe. Idempotent.
    pub fn close(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}
