//! Structured arithmetic commands
//!
//! A structured message is a JSON object `{"command": string, "a": number, "b": number}`.
//! [`process_command`] evaluates it and returns the serialized [`CommandResponse`].
//! Domain failures (unknown command, division by zero, non-finite result) are
//! reported in the response's `error` field; only undecodable payloads produce a [`ParseError`].

use serde::{ Deserialize, Serialize };
use std::str::FromStr;
use thiserror::Error;

/// Error message for a zero divisor
pub const DIVISION_BY_ZERO: &str = "division by zero";
/// Error message for a result that overflows to infinity or is not a number
pub const RESULT_OUT_OF_RANGE: &str = "result out of range";

/// Decoded structured request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandRequest {
    /// Command name
    pub command: String,
    /// Left operand
    pub a: f64,
    /// Right operand
    pub b: f64,
}

/// Structured response sent back to the client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Result of the operation, zero when `error` is set
    pub result: f64,
    /// Echo of the requested command
    pub command: String,
    /// Human-readable error, omitted from the wire when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The payload could not be decoded into a [`CommandRequest`]
#[derive(Error, Debug)]
#[error("invalid JSON: {0}")]
pub struct ParseError(#[from] pub serde_json::Error);

/// Supported operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Operation::Add),
            "subtract" => Ok(Operation::Subtract),
            "multiply" => Ok(Operation::Multiply),
            "divide" => Ok(Operation::Divide),
            other => Err(format!("unknown command: {}", other)),
        }
    }
}

impl Operation {
    /// Apply the operation, returning a domain error message for undefined results
    pub fn apply(self, a: f64, b: f64) -> Result<f64, String> {
        let result = match self {
            Operation::Add => a + b,
            Operation::Subtract => a - b,
            Operation::Multiply => a * b,
            Operation::Divide => {
                if b == 0.0 {
                    return Err(DIVISION_BY_ZERO.to_string());
                }
                a / b
            }
        };

        // JSON has no representation for infinities or NaN
        if result.is_finite() { Ok(result) } else { Err(RESULT_OUT_OF_RANGE.to_string()) }
    }
}

/// Evaluate a decoded request
pub fn execute(request: &CommandRequest) -> CommandResponse {
    let mut response = CommandResponse {
        command: request.command.clone(),
        ..Default::default()
    };

    let outcome = request.command
        .parse::<Operation>()
        .and_then(|op| op.apply(request.a, request.b));

    match outcome {
        Ok(result) => {
            response.result = result;
        }
        Err(message) => {
            response.error = Some(message);
        }
    }

    response
}

/// Decode, evaluate and re-encode a structured payload
pub fn process_command(payload: &[u8]) -> Result<Vec<u8>, ParseError> {
    let request: CommandRequest = serde_json::from_slice(payload)?;
    let response = execute(&request);
    Ok(serde_json::to_vec(&response)?)
}

/// Structured reply sent in place of a response when the payload could not be parsed
pub fn parse_error_payload(err: &ParseError) -> String {
    serde_json::json!({ "error": err.to_string() }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn run(payload: &str) -> CommandResponse {
        let bytes = process_command(payload.as_bytes()).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_add_response_has_no_error_key() {
        let bytes = process_command(br#"{"command":"add","a":2,"b":3}"#).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["result"], 5.0);
        assert_eq!(value["command"], "add");
        assert!(value.get("error").is_none());
        insta::assert_snapshot!(String::from_utf8(bytes).unwrap(), @r#"{"result":5.0,"command":"add"}"#);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(run(r#"{"command":"subtract","a":2,"b":3}"#).result, -1.0);
        assert_eq!(run(r#"{"command":"multiply","a":2.5,"b":4}"#).result, 10.0);
        assert_eq!(run(r#"{"command":"divide","a":9,"b":2}"#).result, 4.5);
    }

    #[test]
    fn test_division_by_zero() {
        let response = run(r#"{"command":"divide","a":1,"b":0}"#);
        assert_eq!(response.result, 0.0);
        assert_eq!(response.command, "divide");
        assert_eq!(response.error.as_deref(), Some("division by zero"));
    }

    #[test]
    fn test_unknown_command() {
        let response = run(r#"{"command":"foo","a":1,"b":1}"#);
        assert_eq!(response.result, 0.0);
        assert_eq!(response.command, "foo");
        assert!(response.error.unwrap().contains("foo"));
    }

    #[test]
    fn test_command_match_is_case_sensitive() {
        let response = run(r#"{"command":"ADD","a":1,"b":1}"#);
        assert_eq!(response.error.as_deref(), Some("unknown command: ADD"));
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let response = run(r#"{"command":"add","a":7}"#);
        assert_eq!(response.result, 7.0);
        assert!(response.error.is_none());

        let response = run("{}");
        assert_eq!(response.command, "");
        assert_eq!(response.error.as_deref(), Some("unknown command: "));
    }

    #[test]
    fn test_malformed_payload_is_parse_error() {
        let err = process_command(b"{not json").unwrap_err();
        assert!(err.to_string().starts_with("invalid JSON: "));

        let err = process_command(br#"{"command":"add","a":"two","b":3}"#).unwrap_err();
        assert!(err.to_string().starts_with("invalid JSON: "));
    }

    #[test]
    fn test_parse_error_payload_is_valid_json() {
        let err = process_command(b"{\"command\":").unwrap_err();
        let payload = parse_error_payload(&err);
        let value: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["error"], err.to_string());
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_overflow_is_domain_error() {
        for payload in [
            r#"{"command":"multiply","a":1e308,"b":10}"#,
            r#"{"command":"add","a":1.7e308,"b":1.7e308}"#,
            r#"{"command":"divide","a":1e308,"b":1e-308}"#,
        ] {
            let bytes = process_command(payload.as_bytes()).unwrap();
            let text = String::from_utf8(bytes).unwrap();
            assert!(!text.contains("null"), "non-finite result leaked: {}", text);

            let response: CommandResponse = serde_json::from_str(&text).unwrap();
            assert_eq!(response.result, 0.0);
            assert_eq!(response.error.as_deref(), Some(RESULT_OUT_OF_RANGE));
        }
    }

    #[test]
    fn test_apply_rejects_non_finite() {
        assert_eq!(Operation::Subtract.apply(-f64::MAX, f64::MAX), Err(RESULT_OUT_OF_RANGE.to_string()));
        assert_eq!(Operation::Divide.apply(1.0, 0.0), Err(DIVISION_BY_ZERO.to_string()));
        assert_eq!(Operation::Multiply.apply(f64::MAX, 1.0), Ok(f64::MAX));
    }

    #[test]
    fn test_every_reply_is_non_empty_json() {
        for payload in [
            r#"{"command":"add","a":1,"b":2}"#,
            r#"{"command":"divide","a":1,"b":0}"#,
            r#"{"command":"nope"}"#,
        ] {
            let bytes = process_command(payload.as_bytes()).unwrap();
            assert!(!bytes.is_empty());
            let value: Value = serde_json::from_slice(&bytes).unwrap();
            assert!(value["result"].is_number());
        }
    }
}
