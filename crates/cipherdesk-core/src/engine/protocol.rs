//! Newline-delimited JSON frames exchanged with an engine process.
//!
//! Request:  `{"id":1,"call":{"method":"Encrypt","params":{...}}}`
//! Response: `{"id":1,"ok":<value>}` or `{"id":1,"error":"<message>"}`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EngineError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum EngineRequest {
    Encrypt {
        file_path: String,
        key: String,
        algorithm: String,
    },
    Decrypt {
        file_path: String,
        key: String,
        algorithm: String,
    },
    GenerateRsaKeypair {
        bits: u32,
    },
    GenerateEcdhKeypair,
    ComputeEcdhSharedSecret {
        private_key: String,
        public_key: String,
    },
    ExportLogs,
    ClearLogs,
}

impl EngineRequest {
    /// Method name, safe to log (never includes key material).
    pub fn method(&self) -> &'static str {
        match self {
            EngineRequest::Encrypt { .. } => "Encrypt",
            EngineRequest::Decrypt { .. } => "Decrypt",
            EngineRequest::GenerateRsaKeypair { .. } => "GenerateRsaKeypair",
            EngineRequest::GenerateEcdhKeypair => "GenerateEcdhKeypair",
            EngineRequest::ComputeEcdhSharedSecret { .. } => "ComputeEcdhSharedSecret",
            EngineRequest::ExportLogs => "ExportLogs",
            EngineRequest::ClearLogs => "ClearLogs",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestFrame {
    pub id: u64,
    pub call: EngineRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFrame {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseFrame {
    pub fn into_result(self) -> Result<Value, EngineError> {
        match (self.error, self.ok) {
            (Some(message), _) => Err(EngineError::Rejected(message)),
            (None, Some(value)) => Ok(value),
            (None, None) => Ok(Value::Null),
        }
    }
}

pub fn encode_request(id: u64, call: EngineRequest) -> Result<String, EngineError> {
    let mut line = serde_json::to_string(&RequestFrame { id, call })
        .map_err(|e| EngineError::Protocol(format!("encode request: {e}")))?;
    line.push('\n');
    Ok(line)
}

pub fn decode_response(line: &str) -> Result<ResponseFrame, EngineError> {
    serde_json::from_str(line.trim_end())
        .map_err(|e| EngineError::Protocol(format!("decode response: {e}")))
}

pub fn expect_string(value: Value) -> Result<String, EngineError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(EngineError::Protocol(format!(
            "expected a string payload, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shape() {
        let line = encode_request(
            3,
            EngineRequest::Encrypt {
                file_path: "/tmp/a.txt".into(),
                key: "k".into(),
                algorithm: "aes-gcm".into(),
            },
        )
        .unwrap();
        assert!(line.ends_with('\n'));
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["call"]["method"], "Encrypt");
        assert_eq!(value["call"]["params"]["algorithm"], "aes-gcm");

        let unit = encode_request(4, EngineRequest::ExportLogs).unwrap();
        let value: Value = serde_json::from_str(&unit).unwrap();
        assert_eq!(value["call"]["method"], "ExportLogs");
    }

    #[test]
    fn error_frame_wins_over_payload() {
        let frame = decode_response(r#"{"id":1,"error":"bad key","ok":"x"}"#).unwrap();
        let err = frame.into_result().unwrap_err();
        assert!(matches!(err, EngineError::Rejected(m) if m == "bad key"));
    }

    #[test]
    fn null_payload_is_unit() {
        let frame = decode_response("{\"id\":9,\"ok\":null}\n").unwrap();
        assert_eq!(frame.id, 9);
        assert_eq!(frame.into_result().unwrap(), Value::Null);
    }

    #[test]
    fn garbage_is_a_protocol_error() {
        assert!(matches!(
            decode_response("not json"),
            Err(EngineError::Protocol(_))
        ));
        assert!(matches!(
            expect_string(serde_json::json!(12)),
            Err(EngineError::Protocol(_))
        ));
    }
}
