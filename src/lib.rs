//! Hitch: typed call encoding and event-log streaming over EVM contract
//! ABIs
//!
//! The crate binds a deployed contract's address to a parsed [`Schema`]
//! and to pluggable transport backends, then exposes uniform entry
//! points: encode-and-call, encode-and-transact, historical event
//! iteration, and live event subscriptions. Per-contract method surfaces
//! are deliberately not generated here; everything is driven by schema
//! data at runtime.

pub mod config;
pub mod contract;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod stream;

pub use contract::{BlockRange, BoundContract, BoundContractBuilder, PendingCall};
pub use domain::abi::{
    decode_any_event, decode_event, decode_output, encode_call, event_topics, EventField,
    EventRecord, LogMeta, Schema,
};
pub use domain::backend::{CallBackend, FeedCloser, FeedProducer, LogBackend, LogFeed, TransactBackend};
pub use error::{Capability, Error, Result};
pub use infrastructure::ethereum::{connect, AlloyBackend, EndpointKind};
pub use infrastructure::schema::{SchemaScanner, SchemaSet};
pub use stream::{EventIterator, EventSubscription, IterState};
