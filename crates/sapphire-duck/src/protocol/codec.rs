//! JSON-RPC Message Codec
//!
//! Turns framed lines into typed [`Message`]s and back. Validation is done
//! against the raw JSON object so that an id can still be recovered from a
//! message whose envelope is broken.

use serde::Serialize;
use serde_json::{Map, Value};

use super::types::{
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, Message, RequestId,
    JSONRPC_VERSION,
};

/// Codec failure
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The line is not valid JSON
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Valid JSON, but not a valid JSON-RPC 2.0 envelope
    #[error("Invalid request: {reason}")]
    Envelope {
        id: Option<RequestId>,
        reason: String,
    },
}

impl CodecError {
    fn envelope(id: Option<RequestId>, reason: impl Into<String>) -> Self {
        CodecError::Envelope {
            id,
            reason: reason.into(),
        }
    }

    /// Id of the offending message, when one could be read
    pub fn recoverable_id(&self) -> Option<&RequestId> {
        match self {
            CodecError::Parse(_) => None,
            CodecError::Envelope { id, .. } => id.as_ref(),
        }
    }

    /// Error response for the peer. `None` when no id is recoverable, in
    /// which case the message can only be logged and dropped.
    pub fn to_response(&self) -> Option<JsonRpcResponse> {
        match self {
            CodecError::Parse(_) => None,
            CodecError::Envelope { id: None, .. } => None,
            CodecError::Envelope {
                id: Some(id),
                reason,
            } => Some(JsonRpcResponse::error(
                Some(id.clone()),
                JsonRpcError::invalid_request(&format!("Invalid request: {}", reason)),
            )),
        }
    }
}

/// Parse one framed line
pub fn decode(line: &str) -> Result<Message, CodecError> {
    let value: Value = serde_json::from_str(line)?;
    let Value::Object(object) = value else {
        return Err(CodecError::envelope(None, "message must be a JSON object"));
    };

    let raw_id = object.get("id").cloned();
    let id = raw_id.as_ref().and_then(RequestId::from_value);

    match object.get("jsonrpc") {
        Some(Value::String(version)) if version == JSONRPC_VERSION => {}
        _ => return Err(CodecError::envelope(id, "jsonrpc must be \"2.0\"")),
    }

    let has_result = object.contains_key("result");
    let has_error = object.contains_key("error");

    if let Some(method) = object.get("method") {
        let Some(method) = method.as_str() else {
            return Err(CodecError::envelope(id, "method must be a string"));
        };
        if has_result || has_error {
            return Err(CodecError::envelope(id, "request must not carry result or error"));
        }
        let params = decode_params(&object, &id)?;

        return match raw_id {
            None => Ok(Message::Notification(JsonRpcNotification {
                jsonrpc: JSONRPC_VERSION.to_string(),
                method: method.to_string(),
                params,
            })),
            Some(_) => match id {
                Some(id) => Ok(Message::Request(JsonRpcRequest {
                    jsonrpc: JSONRPC_VERSION.to_string(),
                    id,
                    method: method.to_string(),
                    params,
                })),
                None => Err(CodecError::envelope(None, "id must be a string or a number")),
            },
        };
    }

    if has_result || has_error {
        return decode_response(object, id, raw_id.as_ref());
    }

    Err(CodecError::envelope(id, "missing method"))
}

fn decode_params(object: &Map<String, Value>, id: &Option<RequestId>) -> Result<Option<Value>, CodecError> {
    match object.get("params") {
        None | Some(Value::Null) => Ok(None),
        Some(params @ (Value::Object(_) | Value::Array(_))) => Ok(Some(params.clone())),
        Some(_) => Err(CodecError::envelope(
            id.clone(),
            "params must be an object or an array",
        )),
    }
}

fn decode_response(
    mut object: Map<String, Value>,
    id: Option<RequestId>,
    raw_id: Option<&Value>,
) -> Result<Message, CodecError> {
    if object.contains_key("result") && object.contains_key("error") {
        return Err(CodecError::envelope(
            id,
            "response must not carry both result and error",
        ));
    }
    match raw_id {
        Some(Value::Null) | None => {}
        Some(_) if id.is_some() => {}
        Some(_) => return Err(CodecError::envelope(None, "id must be a string or a number")),
    }

    if let Some(result) = object.remove("result") {
        let Some(id) = id else {
            return Err(CodecError::envelope(None, "successful response must carry an id"));
        };
        return Ok(Message::Response(JsonRpcResponse::success(id, result)));
    }

    let error = object.remove("error").unwrap_or(Value::Null);
    let error: JsonRpcError = serde_json::from_value(error)
        .map_err(|e| CodecError::envelope(id.clone(), format!("malformed error object: {}", e)))?;
    Ok(Message::Response(JsonRpcResponse::error(id, error)))
}

/// Serialize a value as a single JSON line body (no terminator)
pub fn encode<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

/// Serialize any wire message
pub fn encode_message(message: &Message) -> Result<String, serde_json::Error> {
    match message {
        Message::Request(request) => encode(request),
        Message::Notification(notification) => encode(notification),
        Message::Response(response) => encode(response),
    }
}
