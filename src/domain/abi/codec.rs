//! ABI call codec - typed values to calldata and back, log records to
//! typed events
//!
//! Every function here is a pure function of a [`Schema`] and input bytes;
//! nothing talks to a transport.

use alloy::rpc::types::Log;
use alloy_dyn_abi::{DynSolValue, EventExt, FunctionExt, JsonAbiExt, Specifier};
use alloy_primitives::{keccak256, Bytes, B256};

use crate::domain::abi::event::{EventField, EventRecord, LogMeta};
use crate::domain::abi::Schema;
use crate::error::{Error, Result};

/// Encode a method call into selector-prefixed calldata.
///
/// Arity and per-argument types are validated against the schema before
/// any bytes are produced; a mismatch leaves nothing partially encoded.
pub fn encode_call(schema: &Schema, method: &str, args: &[DynSolValue]) -> Result<Bytes> {
    let function = schema.function(method)?;

    if args.len() != function.inputs.len() {
        return Err(Error::mismatch(format!(
            "method '{}' takes {} argument(s), got {}",
            method,
            function.inputs.len(),
            args.len()
        )));
    }

    for (index, (param, arg)) in function.inputs.iter().zip(args).enumerate() {
        let ty = param
            .resolve()
            .map_err(|err| Error::mismatch(format!("unresolvable type '{}': {err}", param.ty)))?;
        if !ty.matches(arg) {
            return Err(Error::mismatch(format!(
                "method '{}' argument #{} ('{}') expects {}, got {:?}",
                method,
                index,
                display_name(&param.name, index),
                param.ty,
                arg
            )));
        }
    }

    let calldata = function
        .abi_encode_input(args)
        .map_err(|err| Error::mismatch(format!("encoding '{method}' failed: {err}")))?;

    Ok(calldata.into())
}

/// Decode a call's returned bytes against the method's declared outputs.
pub fn decode_output(schema: &Schema, method: &str, data: &[u8]) -> Result<Vec<DynSolValue>> {
    let function = schema.function(method)?;

    function
        .abi_decode_output(data)
        .map_err(|err| Error::decode(format!("output of '{method}': {err}")))
}

/// Decode a raw log into a typed record for the named event.
///
/// Indexed parameters are read from the log's topics (skipping the
/// signature topic for non-anonymous events), the rest from the data
/// payload; fields come back in declaration order.
pub fn decode_event(schema: &Schema, event: &str, log: &Log) -> Result<EventRecord> {
    let declared = schema.event(event)?;

    if !declared.anonymous {
        let topic0 = match log.topic0() {
            Some(topic) => *topic,
            None => return Err(Error::UnknownEvent { topic: None }),
        };
        if topic0 != declared.selector() {
            // A topic that names a different declared event is a routing
            // mistake by the caller, not an unknown log.
            return match schema.event_by_topic(topic0) {
                Some(other) => Err(Error::mismatch(format!(
                    "log carries event '{}', not '{}'",
                    other.name, event
                ))),
                None => Err(Error::UnknownEvent {
                    topic: Some(topic0),
                }),
            };
        }
    }

    let decoded = declared
        .decode_log_parts(log.topics().iter().copied(), log.data().data.as_ref())
        .map_err(|err| Error::decode(format!("event '{event}': {err}")))?;

    let mut indexed = decoded.indexed.into_iter();
    let mut body = decoded.body.into_iter();
    let mut fields = Vec::with_capacity(declared.inputs.len());

    for (index, param) in declared.inputs.iter().enumerate() {
        let value = if param.indexed {
            indexed.next()
        } else {
            body.next()
        };
        let value = value.ok_or_else(|| {
            Error::decode(format!("event '{event}': missing value for '{}'", param.name))
        })?;

        fields.push(EventField {
            name: display_name(&param.name, index),
            kind: param.ty.clone(),
            value,
            indexed: param.indexed,
        });
    }

    Ok(EventRecord {
        event: declared.name.clone(),
        fields,
        meta: LogMeta::from(log),
    })
}

/// Decode a raw log by routing its signature topic through the schema.
pub fn decode_any_event(schema: &Schema, log: &Log) -> Result<EventRecord> {
    let topic0 = match log.topic0() {
        Some(topic) => *topic,
        None => return Err(Error::UnknownEvent { topic: None }),
    };
    let event = schema.event_by_topic(topic0).ok_or(Error::UnknownEvent {
        topic: Some(topic0),
    })?;
    let name = event.name.clone();
    decode_event(schema, &name, log)
}

/// Build per-indexed-field topic candidate lists for a log filter.
///
/// Each inner list is OR-matched within its field; fields are AND-matched
/// across positions. An empty (or absent) list is a wildcard for that
/// position. The returned vector has one slot per indexed parameter, in
/// declaration order, and does not include the signature topic.
pub fn event_topics(
    schema: &Schema,
    event: &str,
    filters: &[Vec<DynSolValue>],
) -> Result<Vec<Option<Vec<B256>>>> {
    let declared = schema.event(event)?;
    let indexed: Vec<_> = declared.inputs.iter().filter(|p| p.indexed).collect();

    if filters.len() > indexed.len() {
        return Err(Error::mismatch(format!(
            "event '{}' has {} indexed parameter(s), got {} filter position(s)",
            event,
            indexed.len(),
            filters.len()
        )));
    }

    let mut topics = Vec::with_capacity(indexed.len());
    for (position, param) in indexed.iter().enumerate() {
        let candidates = filters.get(position).filter(|c| !c.is_empty());
        let Some(candidates) = candidates else {
            topics.push(None);
            continue;
        };

        let ty = param
            .resolve()
            .map_err(|err| Error::mismatch(format!("unresolvable type '{}': {err}", param.ty)))?;

        let mut words = Vec::with_capacity(candidates.len());
        for value in candidates {
            if !ty.matches(value) {
                return Err(Error::mismatch(format!(
                    "filter for '{}' expects {}, got {:?}",
                    param.name, param.ty, value
                )));
            }
            words.push(topic_word(value).ok_or_else(|| {
                Error::mismatch(format!(
                    "type '{}' cannot be used as a topic filter",
                    param.ty
                ))
            })?);
        }
        topics.push(Some(words));
    }

    Ok(topics)
}

/// Encode one filter value as a 32-byte topic word.
///
/// Value types occupy the topic directly; string/bytes are stored as
/// their keccak hash. Composite values have no chain-side topic encoding
/// and are rejected by the caller.
fn topic_word(value: &DynSolValue) -> Option<B256> {
    match value {
        DynSolValue::Bool(_)
        | DynSolValue::Int(..)
        | DynSolValue::Uint(..)
        | DynSolValue::Address(_)
        | DynSolValue::FixedBytes(..)
        | DynSolValue::Function(_) => {
            let word = value.abi_encode();
            debug_assert_eq!(word.len(), 32);
            Some(B256::from_slice(&word))
        }
        DynSolValue::String(s) => Some(keccak256(s.as_bytes())),
        DynSolValue::Bytes(b) => Some(keccak256(b)),
        DynSolValue::Array(_) | DynSolValue::FixedArray(_) | DynSolValue::Tuple(_) => None,
    }
}

fn display_name(name: &str, index: usize) -> String {
    if name.trim().is_empty() {
        format!("arg{index}")
    } else {
        name.to_string()
    }
}
