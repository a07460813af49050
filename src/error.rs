//! Error taxonomy for the binding layer

use alloy_primitives::B256;

/// Backend capability a contract handle can be bound with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Read-only calls (`eth_call`)
    Call,
    /// State-changing transactions
    Transact,
    /// Historical log queries and live log feeds
    Filter,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::Call => "call",
            Capability::Transact => "transact",
            Capability::Filter => "filter",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by schema lookup, codec, and contract operations.
///
/// None of these are retried internally; retry policy depends on context
/// this layer does not have.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown method/event name, or arguments that disagree with the
    /// schema's declared parameter list. Always a caller bug.
    #[error("schema mismatch: {reason}")]
    SchemaMismatch { reason: String },

    /// Malformed or truncated binary payload. Indicates the backend and
    /// the schema disagree, or the data is corrupt.
    #[error("decode failed: {context}")]
    Decode { context: String },

    /// A log's signature topic matches no event declared in the schema.
    #[error("unknown event topic {}", fmt_topic(.topic))]
    UnknownEvent { topic: Option<B256> },

    /// The operation needs a backend capability the handle was not bound
    /// with.
    #[error("no {capability} backend bound")]
    NoBackend { capability: Capability },

    /// Opaque failure propagated verbatim from the transport backend.
    #[error("transport: {0}")]
    Transport(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn mismatch(reason: impl Into<String>) -> Self {
        Error::SchemaMismatch {
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(context: impl Into<String>) -> Self {
        Error::Decode {
            context: context.into(),
        }
    }
}

fn fmt_topic(topic: &Option<B256>) -> String {
    match topic {
        Some(t) => format!("0x{}", hex::encode(t)),
        None => "(missing)".to_string(),
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
