//! RPC channel envelopes.
//!
//! The RPC socket carries JSON-RPC 2.0 style objects, one per line.
//!
//! # Envelope Kinds
//!
//! | Kind | Shape | Direction |
//! |------|-------|-----------|
//! | Request | `{"jsonrpc","id","method","params"}` | Both |
//! | Response | `{"jsonrpc","id","result"}` or `{"jsonrpc","id","error"}` | Both |
//! | Notification | `{"jsonrpc","method","params"}` | Browser → local |
//!
//! Classification on decode looks only at which keys are present: a
//! `method` makes it a request (with a non-null `id`) or a notification,
//! otherwise an `id` makes it a response.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::identifiers::CallId;

// ============================================================================
// Constants
// ============================================================================

/// Value of the `jsonrpc` member on every outbound envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Error code for a method the responder does not implement.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Error code for an error member that is not a `{code, message}` object.
pub const INTERNAL_ERROR: i64 = -32603;

// ============================================================================
// RpcError
// ============================================================================

/// Error object carried by an error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code.
    pub code: i64,

    /// Human readable message.
    #[serde(default)]
    pub message: String,

    /// Additional error data.
    #[serde(default)]
    pub data: Option<Value>,
}

impl RpcError {
    /// Reads an `error` member, keeping a malformed one as an
    /// [`INTERNAL_ERROR`] whose message is the raw JSON.
    #[must_use]
    pub fn from_payload(payload: Value) -> Self {
        match Self::deserialize(&payload) {
            Ok(error) => error,
            Err(_) => Self {
                code: INTERNAL_ERROR,
                message: payload.to_string(),
                data: Some(payload),
            },
        }
    }
}

// ============================================================================
// Envelope Types
// ============================================================================

/// A request, in either direction.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    /// Correlation id; numeric for requests issued by this crate.
    pub id: Value,
    /// Method name.
    pub method: String,
    /// Parameters, `null` when there are none.
    pub params: Value,
}

/// A response to a request.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    /// Id of the request being answered.
    pub id: Value,
    /// Result value or error object.
    pub outcome: std::result::Result<Value, RpcError>,
}

impl RpcResponse {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            outcome: Ok(result),
        }
    }

    /// Creates an error response.
    #[inline]
    #[must_use]
    pub fn failure(id: Value, error: RpcError) -> Self {
        Self {
            id,
            outcome: Err(error),
        }
    }

    /// Returns the call id if the response answers one of ours.
    #[inline]
    #[must_use]
    pub fn call_id(&self) -> Option<CallId> {
        CallId::from_value(&self.id)
    }

    /// Converts the response into the crate result for `method`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Request`] if the peer answered with an error object.
    pub fn into_result(self, method: &str) -> Result<Value> {
        self.outcome
            .map_err(|e| Error::request(method, e.code, e.message, e.data))
    }
}

/// A message that expects no reply.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcNotification {
    /// Method (signal) name.
    pub method: String,
    /// Parameters, `null` when there are none.
    pub params: Value,
}

// ============================================================================
// RpcEnvelope
// ============================================================================

/// One message on the RPC channel.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcEnvelope {
    /// Request expecting a response.
    Request(RpcRequest),
    /// Response to an earlier request.
    Response(RpcResponse),
    /// Fire-and-forget message.
    Notification(RpcNotification),
}

impl RpcEnvelope {
    /// Creates a request envelope for one of our calls.
    #[must_use]
    pub fn request(id: CallId, method: impl Into<String>, params: Value) -> Self {
        Self::Request(RpcRequest {
            id: json!(id.as_u64()),
            method: method.into(),
            params,
        })
    }

    /// Creates a notification envelope.
    #[must_use]
    pub fn notification(method: impl Into<String>, params: Value) -> Self {
        Self::Notification(RpcNotification {
            method: method.into(),
            params,
        })
    }

    /// Serializes the envelope to JSON bytes, without a frame delimiter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let value = match self {
            Self::Request(req) => json!({
                "jsonrpc": JSONRPC_VERSION,
                "id": req.id,
                "method": req.method,
                "params": req.params,
            }),
            Self::Response(resp) => match &resp.outcome {
                Ok(result) => json!({
                    "jsonrpc": JSONRPC_VERSION,
                    "id": resp.id,
                    "result": result,
                }),
                Err(error) => json!({
                    "jsonrpc": JSONRPC_VERSION,
                    "id": resp.id,
                    "error": error,
                }),
            },
            Self::Notification(note) => json!({
                "jsonrpc": JSONRPC_VERSION,
                "method": note.method,
                "params": note.params,
            }),
        };

        Ok(serde_json::to_vec(&value)?)
    }

    /// Parses and classifies one envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] on malformed JSON, a non-object value, or
    /// an object that is neither a request, response nor notification.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| Error::decode(e.to_string()))?;

        let Value::Object(mut object) = value else {
            return Err(Error::decode("envelope is not a JSON object"));
        };

        let id = object.remove("id").filter(|id| !id.is_null());

        if let Some(method) = object.remove("method") {
            let Value::String(method) = method else {
                return Err(Error::decode("method is not a string"));
            };
            let params = object.remove("params").unwrap_or(Value::Null);

            return Ok(match id {
                Some(id) => Self::Request(RpcRequest { id, method, params }),
                None => Self::Notification(RpcNotification { method, params }),
            });
        }

        let Some(id) = id else {
            return Err(Error::decode("envelope has neither method nor id"));
        };

        Ok(Self::Response(Self::decode_response(id, object)))
    }

    fn decode_response(id: Value, mut object: Map<String, Value>) -> RpcResponse {
        match object.remove("error").filter(|e| !e.is_null()) {
            Some(error) => RpcResponse::failure(id, RpcError::from_payload(error)),
            None => RpcResponse::success(id, object.remove("result").unwrap_or(Value::Null)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
