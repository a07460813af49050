//! ABI domain models - schema, call codec, and typed event records

mod codec;
mod event;
mod schema;

pub use codec::{decode_any_event, decode_event, decode_output, encode_call, event_topics};
pub use event::{EventField, EventRecord, LogMeta};
pub use schema::Schema;
