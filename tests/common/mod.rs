//! In-memory transport backend for exercising contract handles without a
//! node

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use alloy::rpc::types::{Filter, Log};
use alloy_primitives::{Address, Bytes, B256, U256};
use hitch::{CallBackend, FeedProducer, LogBackend, LogFeed, TransactBackend};

/// Scriptable backend: canned call responses, a historical log store,
/// and a live feed whose producer half the test takes over.
#[derive(Default)]
pub struct MockBackend {
    /// Queued responses for `call`, popped front first
    call_responses: Mutex<VecDeque<anyhow::Result<Bytes>>>,
    /// Recorded `call` invocations
    pub calls: Mutex<Vec<(Address, Bytes)>>,
    /// Recorded `send_raw` invocations
    pub sent: Mutex<Vec<(Address, Bytes, U256)>>,
    /// Historical store served by `get_logs`
    logs: Mutex<Vec<Log>>,
    /// Error the next `get_logs` reports instead of data
    fail_get_logs: Mutex<Option<String>>,
    /// Producer half of the last opened live feed
    feed: Mutex<Option<FeedProducer>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_call_response(&self, response: Bytes) {
        self.call_responses
            .lock()
            .unwrap()
            .push_back(Ok(response));
    }

    pub fn push_call_error(&self, message: &str) {
        self.call_responses
            .lock()
            .unwrap()
            .push_back(Err(anyhow::anyhow!("{message}")));
    }

    pub fn set_logs(&self, logs: Vec<Log>) {
        *self.logs.lock().unwrap() = logs;
    }

    pub fn fail_next_get_logs(&self, message: &str) {
        *self.fail_get_logs.lock().unwrap() = Some(message.to_string());
    }

    /// Take over the producer half of the feed the last `watch_logs`
    /// call opened.
    pub fn take_feed(&self) -> FeedProducer {
        self.feed
            .lock()
            .unwrap()
            .take()
            .expect("no live feed was opened")
    }

    fn log_matches(filter: &Filter, log: &Log) -> bool {
        if !filter.address.matches(&log.address()) {
            return false;
        }
        for (position, topic_filter) in filter.topics.iter().enumerate() {
            match log.topics().get(position) {
                Some(topic) => {
                    if !topic_filter.matches(topic) {
                        return false;
                    }
                }
                None => {
                    if !topic_filter.is_empty() {
                        return false;
                    }
                }
            }
        }
        true
    }
}

#[async_trait::async_trait]
impl CallBackend for MockBackend {
    async fn call(&self, to: Address, calldata: Bytes) -> anyhow::Result<Bytes> {
        self.calls.lock().unwrap().push((to, calldata));
        self.call_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("no canned response")))
    }
}

#[async_trait::async_trait]
impl TransactBackend for MockBackend {
    async fn send_raw(&self, to: Address, calldata: Bytes, value: U256) -> anyhow::Result<B256> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((to, calldata, value));
        Ok(B256::repeat_byte(sent.len() as u8))
    }
}

#[async_trait::async_trait]
impl LogBackend for MockBackend {
    async fn get_logs(&self, filter: &Filter) -> anyhow::Result<Vec<Log>> {
        if let Some(message) = self.fail_get_logs.lock().unwrap().take() {
            anyhow::bail!("{message}");
        }
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| Self::log_matches(filter, log))
            .cloned()
            .collect())
    }

    async fn watch_logs(&self, _filter: &Filter) -> anyhow::Result<LogFeed> {
        let (producer, feed) = LogFeed::channel(16);
        *self.feed.lock().unwrap() = Some(producer);
        Ok(feed)
    }

    fn supports_watch(&self) -> bool {
        true
    }
}

/// Build a mined log carrying the given topics and payload.
pub fn make_log(
    address: Address,
    topics: Vec<B256>,
    data: Vec<u8>,
    block: u64,
    index: u64,
) -> Log {
    Log {
        inner: alloy_primitives::Log::new_unchecked(address, topics, data.into()),
        block_hash: Some(B256::repeat_byte(block as u8)),
        block_number: Some(block),
        block_timestamp: None,
        transaction_hash: Some(B256::repeat_byte(0xf0)),
        transaction_index: Some(0),
        log_index: Some(index),
        removed: false,
    }
}
