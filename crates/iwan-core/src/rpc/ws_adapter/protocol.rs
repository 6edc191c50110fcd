use serde_json::Value;

use crate::error::{CoreError, RpcError};
use crate::types::REQUEST_ID;

/// Decode a response frame into the call's `result`.
///
/// A non-null `error` member wins over `result`. A `result` of `null` is a
/// valid result; a response with neither member is a protocol error.
pub(super) fn decode_response(body: &str) -> Result<Value, CoreError> {
    let decoded: Value = serde_json::from_str(body).map_err(|e| {
        RpcError::InvalidResponse(format!("decode JSON-RPC response: {e}; body={body}"))
    })?;
    let Value::Object(mut response) = decoded else {
        return Err(RpcError::InvalidResponse(format!(
            "JSON-RPC response is not an object: {body}"
        ))
        .into());
    };

    if let Some(id) = response.get("id") {
        check_response_id(id)?;
    }

    match response.remove("error") {
        Some(Value::Null) | None => {}
        Some(err) => return Err(parse_jsonrpc_error(err)),
    }

    response.remove("result").ok_or_else(|| {
        RpcError::InvalidResponse(format!(
            "JSON-RPC response has neither `result` nor `error`: {body}"
        ))
        .into()
    })
}

/// Turn an `error` payload into a `ServerError`, keeping the server's
/// message verbatim.
///
/// The usual shape is `{"code": <int>?, "message": <string>}`. A bare string
/// becomes the message; any other shape is rendered as raw JSON.
pub(super) fn parse_jsonrpc_error(err: Value) -> CoreError {
    #[derive(serde::Deserialize)]
    struct JsonRpcError {
        code: Option<i64>,
        message: String,
    }

    let (code, message) = match err {
        Value::String(message) => (None, message),
        other => match serde_json::from_value::<JsonRpcError>(other.clone()) {
            Ok(parsed) => (parsed.code, parsed.message),
            Err(_) => (None, other.to_string()),
        },
    };
    CoreError::Rpc(RpcError::ServerError { code, message })
}

fn check_response_id(id: &Value) -> Result<(), CoreError> {
    let matches = match id {
        Value::Null => true,
        Value::Number(n) => n.as_u64() == Some(REQUEST_ID),
        Value::String(s) => s.parse::<u64>().ok() == Some(REQUEST_ID),
        _ => false,
    };
    if matches {
        Ok(())
    } else {
        Err(RpcError::InvalidResponse(format!("unexpected response id: {id}")).into())
    }
}
