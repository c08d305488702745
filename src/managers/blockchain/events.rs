//! Decoding of `AgentActionRequest` occurrences.
//!
//! The streaming client does not deliver event payloads in a single shape:
//! depending on the node and the subscription path, the same logical event
//! can arrive as a payload wrapping a `log` sub-object, as a bare RPC log
//! with `topics`/`data`, or as positional arguments the client has already
//! decoded. [`RawOccurrence`] names the three shapes explicitly and
//! [`decode_occurrence`] normalizes all of them into one canonical record.

use alloy::{
    primitives::{Address, B256, U256},
    rpc::types::Log,
    sol_types::SolEvent,
};
use serde_json::Value;

use super::contracts::AgentLaunchpad;

/// Canonical action-request record, identical regardless of the wire shape
/// the occurrence arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequestEvent {
    pub hash: B256,
    pub agent_address: Address,
    pub action_id: U256,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<B256>,
    pub block_hash: Option<B256>,
}

#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    #[error("occurrence payload is neither an object nor an argument array")]
    UnsupportedShape,

    #[error("malformed log payload: {0}")]
    MalformedLog(String),

    #[error("event decode failed: {0}")]
    Abi(#[from] alloy::sol_types::Error),

    #[error("missing or malformed field '{0}' in pre-decoded arguments")]
    MalformedArgument(&'static str),
}

/// A single raw occurrence as surfaced by the node client.
#[derive(Debug, Clone)]
pub enum RawOccurrence {
    /// Client event payload wrapping a `log` sub-object.
    LogWrapped(Box<Log>),
    /// A bare RPC log carrying `topics` + `data`.
    BareLog(Box<Log>),
    /// Arguments the client already decoded; no log wrapper present.
    PreDecoded(PreDecodedArgs),
}

/// Already-decoded event arguments, with whatever block metadata the
/// surrounding payload carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreDecodedArgs {
    pub hash: B256,
    pub agent_address: Address,
    pub action_id: U256,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<B256>,
    pub block_hash: Option<B256>,
}

impl RawOccurrence {
    /// Discriminate the wire shape of a raw JSON payload: a `log` field
    /// marks the wrapped shape, a `topics` field a bare log, anything else
    /// is treated as already-decoded arguments.
    pub fn classify(value: Value) -> Result<Self, EventDecodeError> {
        match value {
            Value::Object(mut fields) => {
                if let Some(log_value) = fields.remove("log") {
                    let log: Log = serde_json::from_value(log_value)
                        .map_err(|e| EventDecodeError::MalformedLog(e.to_string()))?;
                    Ok(RawOccurrence::LogWrapped(Box::new(log)))
                } else if fields.contains_key("topics") {
                    let log: Log = serde_json::from_value(Value::Object(fields))
                        .map_err(|e| EventDecodeError::MalformedLog(e.to_string()))?;
                    Ok(RawOccurrence::BareLog(Box::new(log)))
                } else {
                    PreDecodedArgs::from_object(&fields).map(RawOccurrence::PreDecoded)
                }
            }
            Value::Array(items) => PreDecodedArgs::from_array(&items).map(RawOccurrence::PreDecoded),
            _ => Err(EventDecodeError::UnsupportedShape),
        }
    }

    /// Wrap a typed log received straight from the subscription stream.
    pub fn from_subscription_log(log: Log) -> Self {
        RawOccurrence::BareLog(Box::new(log))
    }
}

/// Normalize one raw occurrence into the canonical record.
pub fn decode_occurrence(raw: RawOccurrence) -> Result<ActionRequestEvent, EventDecodeError> {
    match raw {
        RawOccurrence::LogWrapped(log) | RawOccurrence::BareLog(log) => decode_request_log(&log),
        RawOccurrence::PreDecoded(args) => Ok(args.into_event()),
    }
}

fn decode_request_log(log: &Log) -> Result<ActionRequestEvent, EventDecodeError> {
    let decoded = AgentLaunchpad::AgentActionRequest::decode_log(log.as_ref())?;

    Ok(ActionRequestEvent {
        hash: decoded.data.hash,
        agent_address: decoded.data.agentAddress,
        action_id: decoded.data.actionId,
        block_number: log.block_number,
        transaction_hash: log.transaction_hash,
        block_hash: log.block_hash,
    })
}

impl PreDecodedArgs {
    fn into_event(self) -> ActionRequestEvent {
        ActionRequestEvent {
            hash: self.hash,
            agent_address: self.agent_address,
            action_id: self.action_id,
            block_number: self.block_number,
            transaction_hash: self.transaction_hash,
            block_hash: self.block_hash,
        }
    }

    fn from_object(fields: &serde_json::Map<String, Value>) -> Result<Self, EventDecodeError> {
        Ok(Self {
            hash: parse_b256(fields.get("hash"), "hash")?,
            agent_address: parse_address(fields.get("agentAddress"), "agentAddress")?,
            action_id: parse_uint(fields.get("actionId"), "actionId")?,
            block_number: parse_optional_block_number(fields.get("blockNumber"))?,
            transaction_hash: parse_optional_b256(fields.get("transactionHash"), "transactionHash")?,
            block_hash: parse_optional_b256(fields.get("blockHash"), "blockHash")?,
        })
    }

    fn from_array(items: &[Value]) -> Result<Self, EventDecodeError> {
        if items.len() < 3 {
            return Err(EventDecodeError::MalformedArgument("actionId"));
        }

        Ok(Self {
            hash: parse_b256(items.first(), "hash")?,
            agent_address: parse_address(items.get(1), "agentAddress")?,
            action_id: parse_uint(items.get(2), "actionId")?,
            block_number: None,
            transaction_hash: None,
            block_hash: None,
        })
    }
}

fn parse_b256(value: Option<&Value>, field: &'static str) -> Result<B256, EventDecodeError> {
    value
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<B256>().ok())
        .ok_or(EventDecodeError::MalformedArgument(field))
}

fn parse_optional_b256(
    value: Option<&Value>,
    field: &'static str,
) -> Result<Option<B256>, EventDecodeError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(_) => parse_b256(value, field).map(Some),
    }
}

fn parse_address(value: Option<&Value>, field: &'static str) -> Result<Address, EventDecodeError> {
    value
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Address>().ok())
        .ok_or(EventDecodeError::MalformedArgument(field))
}

fn parse_uint(value: Option<&Value>, field: &'static str) -> Result<U256, EventDecodeError> {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .map(U256::from)
            .ok_or(EventDecodeError::MalformedArgument(field)),
        Some(Value::String(s)) => s
            .parse::<U256>()
            .map_err(|_| EventDecodeError::MalformedArgument(field)),
        _ => Err(EventDecodeError::MalformedArgument(field)),
    }
}

fn parse_optional_block_number(value: Option<&Value>) -> Result<Option<u64>, EventDecodeError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or(EventDecodeError::MalformedArgument("blockNumber")),
        Some(Value::String(s)) => {
            let digits = s.strip_prefix("0x").unwrap_or(s);
            let radix = if s.starts_with("0x") { 16 } else { 10 };
            u64::from_str_radix(digits, radix)
                .map(Some)
                .map_err(|_| EventDecodeError::MalformedArgument("blockNumber"))
        }
        Some(_) => Err(EventDecodeError::MalformedArgument("blockNumber")),
    }
}
