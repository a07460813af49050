//! Decoded event records and raw log metadata

use alloy::rpc::types::Log;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, B256};

/// One decoded event parameter, in declaration order.
#[derive(Debug, Clone)]
pub struct EventField {
    /// Parameter name (or "arg{n}" if unnamed)
    pub name: String,
    /// Solidity type (e.g., "address", "uint256")
    pub kind: String,
    /// Decoded value. Indexed dynamic parameters carry the 32-byte topic
    /// hash, since the chain never stores the preimage.
    pub value: DynSolValue,
    /// Whether the parameter was stored as a topic
    pub indexed: bool,
}

/// A decoded event plus the raw log coordinates it came from.
///
/// The metadata identifies the log uniquely on chain, which consumers need
/// for traceability and idempotence checks.
#[derive(Debug, Clone)]
pub struct EventRecord {
    /// Event name as declared in the schema
    pub event: String,
    /// Decoded parameters in declaration order
    pub fields: Vec<EventField>,
    /// Raw log coordinates
    pub meta: LogMeta,
}

impl EventRecord {
    /// Find a decoded field by name.
    pub fn field(&self, name: &str) -> Option<&DynSolValue> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }

    /// Render the record as a JSON object for display or export.
    pub fn to_json(&self) -> serde_json::Value {
        let mut fields = serde_json::Map::new();
        for field in &self.fields {
            fields.insert(field.name.clone(), format_value(&field.value));
        }
        serde_json::json!({
            "event": self.event,
            "fields": fields,
            "block_number": self.meta.block_number,
            "transaction_hash": self.meta.transaction_hash.map(|h| format!("{h:?}")),
            "log_index": self.meta.log_index,
        })
    }
}

/// On-chain coordinates of a raw log record.
#[derive(Debug, Clone, Default)]
pub struct LogMeta {
    /// Address the log was emitted from
    pub address: Address,
    /// Containing block number, if the log is mined
    pub block_number: Option<u64>,
    /// Containing block hash
    pub block_hash: Option<B256>,
    /// Emitting transaction hash
    pub transaction_hash: Option<B256>,
    /// Position of the transaction within the block
    pub transaction_index: Option<u64>,
    /// Position of the log within the block
    pub log_index: Option<u64>,
    /// Whether the log was removed by a chain reorganization
    pub removed: bool,
}

impl From<&Log> for LogMeta {
    fn from(log: &Log) -> Self {
        Self {
            address: log.address(),
            block_number: log.block_number,
            block_hash: log.block_hash,
            transaction_hash: log.transaction_hash,
            transaction_index: log.transaction_index,
            log_index: log.log_index,
            removed: log.removed,
        }
    }
}

/// Render a decoded value as JSON.
fn format_value(value: &DynSolValue) -> serde_json::Value {
    match value {
        DynSolValue::Bool(b) => serde_json::Value::Bool(*b),
        DynSolValue::Int(i, _) => serde_json::Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => serde_json::Value::String(u.to_string()),
        DynSolValue::FixedBytes(word, size) => {
            let bytes = &word.as_slice()[..(*size).min(32)];
            serde_json::Value::String(format!("0x{}", hex::encode(bytes)))
        }
        DynSolValue::Address(addr) => serde_json::Value::String(format!("{addr:?}")),
        DynSolValue::Function(func) => {
            serde_json::Value::String(format!("0x{}", hex::encode(func.as_slice())))
        }
        DynSolValue::Bytes(bytes) => {
            serde_json::Value::String(format!("0x{}", hex::encode(bytes)))
        }
        DynSolValue::String(s) => serde_json::Value::String(s.clone()),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            serde_json::Value::Array(items.iter().map(format_value).collect())
        }
        DynSolValue::Tuple(fields) => {
            serde_json::Value::Array(fields.iter().map(format_value).collect())
        }
    }
}
