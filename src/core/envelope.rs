//! Response Envelope
//!
//! Every platform endpoint answers HTTP 200 with JSON that may carry an
//! `errcode`/`errmsg` pair. Failures live in that envelope, not in the HTTP
//! status line.

use serde_json::Value;

use crate::error::{ResponseError, WechatError, WechatResult};

/// Decode a response body into its payload.
///
/// Empty body and malformed JSON are hard failures. A nonzero `errcode`
/// becomes a structured upstream error. On success the envelope keys are
/// stripped so callers see only the payload.
pub fn parse_payload(body: &str) -> WechatResult<Value> {
    if body.trim().is_empty() {
        return Err(WechatError::EmptyResponse);
    }

    let mut json: Value =
        serde_json::from_str(body).map_err(|e| ResponseError::InvalidJson {
            message: e.to_string(),
        })?;

    if let Some(code) = json.get("errcode").and_then(Value::as_i64) {
        if code != 0 {
            let message = json
                .get("errmsg")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(WechatError::Upstream { code, message });
        }
    }

    if let Some(object) = json.as_object_mut() {
        object.remove("errcode");
        object.remove("errmsg");
    }

    Ok(json)
}
