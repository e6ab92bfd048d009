use crate::{
    wire::{RpcResponse, JSONRPC_VERSION},
    RelayError,
};

/// Longest body prefix quoted in error messages.
const BODY_EXCERPT_LIMIT: usize = 256;

/// Cuts `body` to at most [`BODY_EXCERPT_LIMIT`] bytes on a char boundary.
pub(crate) fn body_excerpt(body: &str) -> String {
    if body.len() <= BODY_EXCERPT_LIMIT {
        return body.to_owned();
    }
    let mut end = BODY_EXCERPT_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes)", &body[..end], body.len())
}

/// Decodes a JSON-RPC response body correlated with `expected_id`.
pub(crate) fn decode_response(body: &str, expected_id: u64) -> Result<serde_json::Value, RelayError> {
    let response = serde_json::from_str::<RpcResponse>(body).map_err(|err| {
        RelayError::Decode(format!(
            "invalid JSON-RPC response: {err}; body: {}",
            body_excerpt(body)
        ))
    })?;

    if response.jsonrpc != JSONRPC_VERSION {
        return Err(RelayError::Decode(format!(
            "unsupported jsonrpc version '{}'",
            response.jsonrpc
        )));
    }

    // A null id is only legal on errors the server could not correlate.
    match response.id.as_ref() {
        Some(serde_json::Value::Null) | None => {
            if response.error.is_none() {
                return Err(RelayError::Decode(format!(
                    "response without id for request {expected_id}"
                )));
            }
        }
        Some(id) => {
            if *id != serde_json::Value::from(expected_id) {
                return Err(RelayError::Decode(format!(
                    "response id mismatch: expected {expected_id}, got {id}"
                )));
            }
        }
    }

    if let Some(error) = response.error {
        return Err(RelayError::Rpc {
            code: error.code,
            message: error.message,
            data: error.data,
        });
    }

    response.result.ok_or_else(|| {
        RelayError::Decode(format!(
            "response {expected_id} carries neither result nor error"
        ))
    })
}
