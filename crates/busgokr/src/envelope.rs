//! Response envelope decoding
//!
//! Every bus.go.kr response wraps its payload as
//! `{ "error": { "errorCode": "0000", "errorMessage": "..." }, "resultList": [...] }`.
//! HTTP 200 says nothing about success; only the embedded status code does.

use serde::Deserialize;
use serde_json::Value;

use crate::error::BusError;

/// Status code the service reports on success
pub const SUCCESS_CODE: &str = "0000";

/// Status block of an envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiStatus {
    /// Numeric status code
    pub code: i32,
    /// Status message as reported upstream
    pub message: String,
}

impl From<ApiStatus> for BusError {
    fn from(status: ApiStatus) -> Self {
        Self::Api {
            code: status.code,
            message: status.message,
        }
    }
}

/// Classified envelope contents
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Success without any result rows
    Empty,
    /// Success with at least one raw result object, in upstream order
    Results(Vec<Value>),
}

impl Decoded {
    /// Return the rows, or the caller's not-found error when there are none
    ///
    /// # Errors
    ///
    /// Returns the error built by `not_found` for an empty result.
    pub fn or_not_found(
        self,
        not_found: impl FnOnce() -> BusError,
    ) -> Result<Vec<Value>, BusError> {
        match self {
            Self::Results(rows) => Ok(rows),
            Self::Empty => Err(not_found()),
        }
    }

    /// Return the rows, treating an empty result as an empty sequence
    #[must_use]
    pub fn into_rows(self) -> Vec<Value> {
        match self {
            Self::Results(rows) => rows,
            Self::Empty => Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    error: Option<RawStatus>,
    #[serde(default)]
    result_list: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatus {
    error_code: Option<Value>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Classify a decoded JSON body
///
/// # Errors
///
/// Returns `Api` for a non-success status code and `MalformedResponse` when
/// the envelope has no readable status block.
pub fn decode(body: Value) -> Result<Decoded, BusError> {
    let raw: RawEnvelope = serde_json::from_value(body)
        .map_err(|e| BusError::MalformedResponse(format!("invalid envelope: {e}")))?;

    let status = raw
        .error
        .ok_or_else(|| BusError::MalformedResponse("envelope has no error block".to_string()))?;

    let code = match status.error_code {
        Some(Value::String(code)) => code,
        Some(Value::Number(code)) => code.to_string(),
        _ => {
            return Err(BusError::MalformedResponse(
                "envelope has no errorCode".to_string(),
            ));
        }
    };

    if code != SUCCESS_CODE {
        let numeric = code.trim().parse::<i32>().map_err(|_| {
            BusError::MalformedResponse(format!("non-numeric errorCode: {code}"))
        })?;
        return Err(ApiStatus {
            code: numeric,
            message: status.error_message.unwrap_or_default(),
        }
        .into());
    }

    match raw.result_list {
        Some(Value::Array(rows)) if !rows.is_empty() => Ok(Decoded::Results(rows)),
        Some(row @ Value::Object(_)) => Ok(Decoded::Results(vec![row])),
        _ => Ok(Decoded::Empty),
    }
}
