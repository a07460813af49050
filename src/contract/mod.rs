//! Bound contract handle - an address, a schema, and the backends it was
//! bound with

use std::sync::Arc;

use alloy::rpc::types::Filter;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, B256, U256};
use tokio::sync::mpsc;

use crate::domain::abi::{self, EventRecord, Schema};
use crate::domain::backend::{CallBackend, LogBackend, TransactBackend};
use crate::error::{Capability, Error, Result};
use crate::stream::{EventIterator, EventSubscription};

/// Handle to a submitted state-changing call.
///
/// Carries only the transaction hash to track; a transaction's outcome is
/// not decodable at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCall {
    pub tx_hash: B256,
}

/// Block span for a historical log query. `to = None` means latest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockRange {
    pub from: u64,
    pub to: Option<u64>,
}

impl BlockRange {
    /// From the given block to the latest.
    pub fn from_block(from: u64) -> Self {
        Self { from, to: None }
    }

    /// A closed span, both ends inclusive.
    pub fn span(from: u64, to: u64) -> Self {
        Self { from, to: Some(to) }
    }
}

/// A deployed contract's address bound to its schema and to whatever
/// backend capabilities it was constructed with.
///
/// The binding is immutable after construction and safe for concurrent
/// use; every call/transact/filter/watch operation is independent.
/// Operations that need an unbound capability fail with
/// [`Error::NoBackend`].
#[derive(Clone)]
pub struct BoundContract {
    address: Address,
    schema: Arc<Schema>,
    caller: Option<Arc<dyn CallBackend>>,
    transactor: Option<Arc<dyn TransactBackend>>,
    filterer: Option<Arc<dyn LogBackend>>,
}

impl BoundContract {
    /// Start binding a contract at `address` against `schema`.
    pub fn builder(address: Address, schema: Arc<Schema>) -> BoundContractBuilder {
        BoundContractBuilder {
            address,
            schema,
            caller: None,
            transactor: None,
            filterer: None,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn can_call(&self) -> bool {
        self.caller.is_some()
    }

    pub fn can_transact(&self) -> bool {
        self.transactor.is_some()
    }

    pub fn can_filter(&self) -> bool {
        self.filterer.is_some()
    }

    /// Execute a read-only method call and decode its declared outputs.
    pub async fn call(&self, method: &str, args: &[DynSolValue]) -> Result<Vec<DynSolValue>> {
        let backend = self.caller.as_ref().ok_or(Error::NoBackend {
            capability: Capability::Call,
        })?;

        let calldata = abi::encode_call(&self.schema, method, args)?;
        let raw = backend.call(self.address, calldata).await?;
        abi::decode_output(&self.schema, method, &raw)
    }

    /// Submit a state-changing method call.
    pub async fn transact(&self, method: &str, args: &[DynSolValue]) -> Result<PendingCall> {
        self.transact_with_value(method, args, U256::ZERO).await
    }

    /// Submit a state-changing method call carrying native value.
    pub async fn transact_with_value(
        &self,
        method: &str,
        args: &[DynSolValue],
        value: U256,
    ) -> Result<PendingCall> {
        let backend = self.transactor.as_ref().ok_or(Error::NoBackend {
            capability: Capability::Transact,
        })?;

        let calldata = abi::encode_call(&self.schema, method, args)?;
        let tx_hash = backend.send_raw(self.address, calldata, value).await?;
        Ok(PendingCall { tx_hash })
    }

    /// Query historical logs for `event` and return an iterator over the
    /// decoded records.
    ///
    /// `filters` holds one candidate list per indexed parameter in
    /// declaration order: values within a list are OR-matched, lists are
    /// AND-matched across positions, and an empty or missing list is a
    /// wildcard.
    pub async fn filter_logs(
        &self,
        event: &str,
        filters: &[Vec<DynSolValue>],
        range: BlockRange,
    ) -> Result<EventIterator> {
        let backend = self.filterer.as_ref().ok_or(Error::NoBackend {
            capability: Capability::Filter,
        })?;

        let filter = self.build_filter(event, filters, Some(range))?;
        let logs = backend.get_logs(&filter).await?;
        Ok(EventIterator::new(
            self.schema.clone(),
            event.to_string(),
            logs,
        ))
    }

    /// Open a live feed for `event` and forward decoded records to
    /// `sink` until the subscription is cancelled or fails.
    pub async fn watch_logs(
        &self,
        event: &str,
        filters: &[Vec<DynSolValue>],
        sink: mpsc::Sender<EventRecord>,
    ) -> Result<EventSubscription> {
        let backend = self.filterer.as_ref().ok_or(Error::NoBackend {
            capability: Capability::Filter,
        })?;

        let filter = self.build_filter(event, filters, None)?;
        let feed = backend.watch_logs(&filter).await?;
        Ok(EventSubscription::spawn(
            self.schema.clone(),
            event.to_string(),
            feed,
            sink,
        ))
    }

    /// Assemble the address+topics filter for one event.
    fn build_filter(
        &self,
        event: &str,
        filters: &[Vec<DynSolValue>],
        range: Option<BlockRange>,
    ) -> Result<Filter> {
        let declared = self.schema.event(event)?;
        let topics = abi::event_topics(&self.schema, event, filters)?;

        let mut filter = Filter::new().address(self.address);
        if let Some(range) = range {
            filter = filter.from_block(range.from);
            if let Some(to) = range.to {
                filter = filter.to_block(to);
            }
        }

        // Anonymous events carry no signature topic; their indexed
        // parameters start at topic position zero.
        let offset = if declared.anonymous {
            0
        } else {
            filter = filter.event_signature(declared.selector());
            1
        };

        for (position, candidates) in topics.into_iter().enumerate() {
            let Some(words) = candidates else { continue };
            filter = match position + offset {
                0 => filter.event_signature(words),
                1 => filter.topic1(words),
                2 => filter.topic2(words),
                3 => filter.topic3(words),
                _ => {
                    return Err(Error::mismatch(format!(
                        "event '{event}' declares more indexed parameters than a log has topics"
                    )))
                }
            };
        }

        Ok(filter)
    }
}

/// Builder for [`BoundContract`]; capabilities left unset stay unbound.
pub struct BoundContractBuilder {
    address: Address,
    schema: Arc<Schema>,
    caller: Option<Arc<dyn CallBackend>>,
    transactor: Option<Arc<dyn TransactBackend>>,
    filterer: Option<Arc<dyn LogBackend>>,
}

impl BoundContractBuilder {
    /// Bind the read-only call capability.
    pub fn caller(mut self, backend: Arc<dyn CallBackend>) -> Self {
        self.caller = Some(backend);
        self
    }

    /// Bind the transaction submission capability.
    pub fn transactor(mut self, backend: Arc<dyn TransactBackend>) -> Self {
        self.transactor = Some(backend);
        self
    }

    /// Bind the log query/watch capability.
    pub fn filterer(mut self, backend: Arc<dyn LogBackend>) -> Self {
        self.filterer = Some(backend);
        self
    }

    /// Bind one backend for all three capabilities.
    pub fn backend<B>(self, backend: Arc<B>) -> Self
    where
        B: CallBackend + TransactBackend + LogBackend,
    {
        self.caller(backend.clone())
            .transactor(backend.clone())
            .filterer(backend)
    }

    pub fn build(self) -> BoundContract {
        BoundContract {
            address: self.address,
            schema: self.schema,
            caller: self.caller,
            transactor: self.transactor,
            filterer: self.filterer,
        }
    }
}
