//! Historical event iterator - a pull-based state machine over buffered
//! logs

use std::collections::VecDeque;
use std::sync::Arc;

use alloy::rpc::types::Log;

use crate::domain::abi::{decode_event, EventRecord, Schema};
use crate::error::{Error, Result};

/// Lifecycle state of an [`EventIterator`].
///
/// `Exhausted`, `Errored`, and `Closed` are terminal; a fresh filter call
/// is required for a new iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterState {
    /// Created, first record not yet requested
    Ready,
    /// Advancing over the buffered query result
    Active,
    /// All buffered records delivered
    Exhausted,
    /// A decode or transport error latched; see [`EventIterator::error`]
    Errored,
    /// Explicitly released
    Closed,
}

/// Iterates over the decoded records of one historical log query.
///
/// Single-consumer: concurrent `next` calls must be serialized by the
/// caller. Records come back in the order the query returned them,
/// ascending block number then log index.
#[derive(Debug)]
pub struct EventIterator {
    schema: Arc<Schema>,
    event: String,
    buffered: VecDeque<Log>,
    state: IterState,
    error: Option<Error>,
}

impl EventIterator {
    pub(crate) fn new(schema: Arc<Schema>, event: String, logs: Vec<Log>) -> Self {
        Self {
            schema,
            event,
            buffered: logs.into(),
            state: IterState::Ready,
            error: None,
        }
    }

    /// Advance to the next decoded record.
    ///
    /// Returns `None` once the buffer is drained or after the first
    /// failure; a failed iterator stays failed rather than retrying, so
    /// a partial read is never mistaken for a complete one.
    pub fn next(&mut self) -> Option<EventRecord> {
        match self.state {
            IterState::Exhausted | IterState::Errored | IterState::Closed => None,
            IterState::Ready | IterState::Active => {
                self.state = IterState::Active;

                let Some(log) = self.buffered.pop_front() else {
                    self.state = IterState::Exhausted;
                    return None;
                };

                match decode_event(&self.schema, &self.event, &log) {
                    Ok(record) => Some(record),
                    Err(err) => {
                        self.error = Some(err);
                        self.state = IterState::Errored;
                        None
                    }
                }
            }
        }
    }

    /// The latched failure, if iteration stopped on one.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Release buffered resources. Idempotent; the latched error, if
    /// any, stays observable.
    pub fn close(&mut self) {
        self.buffered.clear();
        self.state = IterState::Closed;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> IterState {
        self.state
    }

    /// Number of records not yet delivered.
    pub fn remaining(&self) -> usize {
        self.buffered.len()
    }

    /// Drain the iterator, returning every remaining record or the first
    /// failure.
    pub fn collect_all(mut self) -> Result<Vec<EventRecord>> {
        let mut records = Vec::with_capacity(self.buffered.len());
        while let Some(record) = self.next() {
            records.push(record);
        }
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(records),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_dyn_abi::DynSolValue;
    use alloy_primitives::{Address, U256};

    const ABI: &str = r#"[
        {"type":"event","name":"Ping","inputs":[{"name":"value","type":"uint256","indexed":false}],"anonymous":false}
    ]"#;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::parse(ABI).unwrap())
    }

    fn ping_log(schema: &Schema, value: u64, block: u64, index: u64) -> Log {
        let topic = schema.event("Ping").unwrap().selector();
        Log {
            inner: alloy_primitives::Log::new_unchecked(
                Address::repeat_byte(0x01),
                vec![topic],
                DynSolValue::Uint(U256::from(value), 256).abi_encode().into(),
            ),
            block_hash: None,
            block_number: Some(block),
            block_timestamp: None,
            transaction_hash: None,
            transaction_index: None,
            log_index: Some(index),
            removed: false,
        }
    }

    fn corrupt_log(schema: &Schema) -> Log {
        let topic = schema.event("Ping").unwrap().selector();
        Log {
            inner: alloy_primitives::Log::new_unchecked(
                Address::repeat_byte(0x01),
                vec![topic],
                vec![0u8; 5].into(),
            ),
            ..ping_log(schema, 0, 9, 9)
        }
    }

    #[test]
    fn test_exhaustion_in_order() {
        let schema = schema();
        let logs = vec![
            ping_log(&schema, 1, 10, 0),
            ping_log(&schema, 2, 10, 1),
            ping_log(&schema, 3, 11, 0),
        ];
        let mut iter = EventIterator::new(schema, "Ping".to_string(), logs);
        assert_eq!(iter.state(), IterState::Ready);

        let mut seen = Vec::new();
        while let Some(record) = iter.next() {
            seen.push(record.meta.block_number.unwrap());
        }
        assert_eq!(seen, vec![10, 10, 11]);
        assert_eq!(iter.state(), IterState::Exhausted);
        assert!(iter.next().is_none());
        assert!(iter.error().is_none());
    }

    #[test]
    fn test_error_latches() {
        let schema = schema();
        let logs = vec![
            ping_log(&schema, 1, 10, 0),
            corrupt_log(&schema),
            ping_log(&schema, 3, 11, 0),
        ];
        let mut iter = EventIterator::new(schema, "Ping".to_string(), logs);

        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
        assert_eq!(iter.state(), IterState::Errored);
        assert!(iter.error().is_some());

        // Stays latched; the third record is never delivered.
        assert!(iter.next().is_none());
        assert_eq!(iter.state(), IterState::Errored);
    }

    #[test]
    fn test_close_is_idempotent_and_terminal() {
        let schema = schema();
        let logs = vec![ping_log(&schema, 1, 10, 0)];
        let mut iter = EventIterator::new(schema, "Ping".to_string(), logs);

        iter.close();
        assert_eq!(iter.state(), IterState::Closed);
        assert!(iter.next().is_none());
        iter.close();
        assert_eq!(iter.state(), IterState::Closed);
        assert_eq!(iter.remaining(), 0);
    }

    #[test]
    fn test_collect_all_surfaces_error() {
        let schema = schema();
        let logs = vec![ping_log(&schema, 1, 10, 0), corrupt_log(&schema)];
        let iter = EventIterator::new(schema.clone(), "Ping".to_string(), logs);
        assert!(iter.collect_all().is_err());

        let logs = vec![ping_log(&schema, 1, 10, 0), ping_log(&schema, 2, 10, 1)];
        let iter = EventIterator::new(schema, "Ping".to_string(), logs);
        assert_eq!(iter.collect_all().unwrap().len(), 2);
    }
}
