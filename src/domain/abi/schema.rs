//! Parsed contract schema with name and topic indices

use std::collections::HashMap;

use alloy_json_abi::{Event, Function, JsonAbi};
use alloy_primitives::B256;

use crate::error::{Error, Result};

/// An immutable, queryable description of a contract's callable methods
/// and events.
///
/// Built once from an ABI JSON document and shared read-only (typically
/// behind an `Arc`) by every operation issued against a contract. Name
/// lookups resolve against maps constructed at parse time; for overloaded
/// names the first declaration wins and later overloads are unreachable
/// through the string-keyed API.
#[derive(Debug, Clone)]
pub struct Schema {
    abi: JsonAbi,
    functions: HashMap<String, Function>,
    events: HashMap<String, Event>,
    events_by_topic: HashMap<B256, String>,
}

impl Schema {
    /// Parse a schema from ABI JSON.
    ///
    /// Accepts either a raw ABI array or a build artifact object with an
    /// `"abi"` field (Foundry/Hardhat output).
    pub fn parse(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|err| Error::mismatch(format!("invalid ABI JSON: {err}")))?;

        let abi_value = if value.is_array() {
            value
        } else if let Some(abi) = value.get("abi") {
            abi.clone()
        } else {
            return Err(Error::mismatch(
                "ABI JSON is neither an array nor an object with an \"abi\" field",
            ));
        };

        let abi: JsonAbi = serde_json::from_value(abi_value)
            .map_err(|err| Error::mismatch(format!("invalid ABI JSON: {err}")))?;

        Ok(Self::from_abi(abi))
    }

    /// Build a schema from an already-parsed ABI.
    pub fn from_abi(abi: JsonAbi) -> Self {
        let mut functions = HashMap::new();
        let mut events = HashMap::new();
        let mut events_by_topic = HashMap::new();

        for function in abi.functions() {
            functions
                .entry(function.name.clone())
                .or_insert_with(|| function.clone());
        }

        for event in abi.events() {
            if !event.anonymous {
                events_by_topic
                    .entry(event.selector())
                    .or_insert_with(|| event.name.clone());
            }
            events
                .entry(event.name.clone())
                .or_insert_with(|| event.clone());
        }

        Self {
            abi,
            functions,
            events,
            events_by_topic,
        }
    }

    /// Look up a callable method by name.
    pub fn function(&self, name: &str) -> Result<&Function> {
        self.functions
            .get(name)
            .ok_or_else(|| Error::mismatch(format!("unknown method '{name}'")))
    }

    /// Look up an event by name.
    pub fn event(&self, name: &str) -> Result<&Event> {
        self.events
            .get(name)
            .ok_or_else(|| Error::mismatch(format!("unknown event '{name}'")))
    }

    /// Resolve a log's signature topic to the event it was emitted as.
    pub fn event_by_topic(&self, topic: B256) -> Option<&Event> {
        self.events_by_topic
            .get(&topic)
            .and_then(|name| self.events.get(name))
    }

    /// The underlying parsed ABI.
    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    /// Names of all callable methods.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Names of all declared events.
    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERC20_ABI: &str = r#"[
        {"type":"function","name":"balanceOf","inputs":[{"name":"owner","type":"address"}],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"},
        {"type":"function","name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"name":"","type":"bool"}],"stateMutability":"nonpayable"},
        {"type":"event","name":"Transfer","inputs":[{"name":"from","type":"address","indexed":true},{"name":"to","type":"address","indexed":true},{"name":"value","type":"uint256","indexed":false}],"anonymous":false}
    ]"#;

    #[test]
    fn test_parse_raw_array() {
        let schema = Schema::parse(ERC20_ABI).unwrap();
        assert!(schema.function("balanceOf").is_ok());
        assert!(schema.function("transfer").is_ok());
        assert!(schema.event("Transfer").is_ok());
        assert!(schema.function("mint").is_err());
    }

    #[test]
    fn test_parse_artifact_object() {
        let artifact = format!(r#"{{"contractName":"Token","abi":{ERC20_ABI}}}"#);
        let schema = Schema::parse(&artifact).unwrap();
        assert!(schema.function("transfer").is_ok());
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        assert!(Schema::parse("42").is_err());
        assert!(Schema::parse(r#"{"no_abi_here":true}"#).is_err());
        assert!(Schema::parse("not json").is_err());
    }

    #[test]
    fn test_topic_index() {
        let schema = Schema::parse(ERC20_ABI).unwrap();
        let transfer = schema.event("Transfer").unwrap();
        let found = schema.event_by_topic(transfer.selector()).unwrap();
        assert_eq!(found.name, "Transfer");

        assert!(schema.event_by_topic(B256::ZERO).is_none());
    }

    #[test]
    fn test_unknown_lookups_are_schema_mismatch() {
        let schema = Schema::parse(ERC20_ABI).unwrap();
        assert!(matches!(
            schema.function("nope"),
            Err(crate::error::Error::SchemaMismatch { .. })
        ));
        assert!(matches!(
            schema.event("Nope"),
            Err(crate::error::Error::SchemaMismatch { .. })
        ));
    }
}
