//! RSA key payload normalization.
//!
//! Accepted payload shapes:
//!
//! ```text
//! flat:   {"n": "..", "e": "..", "d": ".."}
//! nested: {"public": {"n": "..", "e": ".."}, "private": {"n": "..", "d": ".."}}
//! ```
//!
//! A payload is read as flat first; it is read as nested only when it has no
//! top-level modulus but carries a `public` or `private` object. The result
//! keeps `n` plus the exponent the operation needs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dispatch::Operation;
use crate::error::{KeyField, Outcome, OrchestratorError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct KeyParts {
    n: Option<String>,
    e: Option<String>,
    d: Option<String>,
}

impl KeyParts {
    fn read(object: &Map<String, Value>) -> Self {
        Self {
            n: component(object, "n"),
            e: component(object, "e"),
            d: component(object, "d"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RsaKeyShape {
    Flat(KeyParts),
    Nested { public: KeyParts, private: KeyParts },
}

impl RsaKeyShape {
    fn detect(object: &Map<String, Value>) -> Self {
        let flat = KeyParts::read(object);
        if flat.n.is_some() {
            return RsaKeyShape::Flat(flat);
        }
        let public = object.get("public").and_then(Value::as_object);
        let private = object.get("private").and_then(Value::as_object);
        if public.is_none() && private.is_none() {
            return RsaKeyShape::Flat(flat);
        }
        RsaKeyShape::Nested {
            public: public.map(KeyParts::read).unwrap_or_default(),
            private: private.map(KeyParts::read).unwrap_or_default(),
        }
    }

    fn into_parts(self) -> KeyParts {
        match self {
            RsaKeyShape::Flat(parts) => parts,
            RsaKeyShape::Nested { public, private } => KeyParts {
                n: public.n.or(private.n),
                e: public.e,
                d: private.d,
            },
        }
    }
}

/// Flat key carrying only what one operation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRsaKey {
    pub n: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

impl NormalizedRsaKey {
    pub fn to_json(&self) -> Outcome<String> {
        Ok(serde_json::to_string(self)?)
    }
}

pub fn normalize(payload: &str, operation: Operation) -> Outcome<NormalizedRsaKey> {
    if payload.trim().is_empty() {
        return Err(OrchestratorError::InvalidFormat("RSA key is required".into()));
    }
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| OrchestratorError::InvalidFormat(format!("RSA key is not valid JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| OrchestratorError::InvalidFormat("RSA key must be a JSON object".into()))?;

    let parts = RsaKeyShape::detect(object).into_parts();
    let n = parts.n.ok_or(OrchestratorError::MissingKeyField(KeyField::N))?;
    match operation {
        Operation::Encrypt => {
            let e = parts.e.ok_or(OrchestratorError::MissingKeyField(KeyField::E))?;
            Ok(NormalizedRsaKey { n, e: Some(e), d: None })
        }
        Operation::Decrypt => {
            let d = parts.d.ok_or(OrchestratorError::MissingKeyField(KeyField::D))?;
            Ok(NormalizedRsaKey { n, e: None, d: Some(d) })
        }
    }
}

fn component(object: &Map<String, Value>, field: &str) -> Option<String> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    const NESTED: &str = r#"{"public":{"n":"A","e":"B"},"private":{"n":"A","d":"C"}}"#;

    #[test]
    fn nested_payload_keeps_the_operation_fields() {
        let enc = normalize(NESTED, Operation::Encrypt).unwrap();
        assert_eq!(enc.to_json().unwrap(), r#"{"n":"A","e":"B"}"#);

        let dec = normalize(NESTED, Operation::Decrypt).unwrap();
        assert_eq!(dec.to_json().unwrap(), r#"{"n":"A","d":"C"}"#);
    }

    #[test]
    fn flat_payload_is_trimmed_to_the_operation_fields() {
        let payload = json!({"n": "A", "e": "B", "d": "C"}).to_string();
        let enc = normalize(&payload, Operation::Encrypt).unwrap();
        assert_eq!(enc, NormalizedRsaKey { n: "A".into(), e: Some("B".into()), d: None });
        let dec = normalize(&payload, Operation::Decrypt).unwrap();
        assert_eq!(dec, NormalizedRsaKey { n: "A".into(), e: None, d: Some("C".into()) });
    }

    #[test]
    fn empty_object_is_missing_the_modulus_in_both_modes() {
        for op in [Operation::Encrypt, Operation::Decrypt] {
            let err = normalize("{}", op).unwrap_err();
            assert_eq!(err, OrchestratorError::MissingKeyField(KeyField::N));
        }
    }

    #[test]
    fn missing_exponent_is_named() {
        let public_only = json!({"public": {"n": "A", "e": "B"}}).to_string();
        assert_eq!(
            normalize(&public_only, Operation::Decrypt).unwrap_err(),
            OrchestratorError::MissingKeyField(KeyField::D)
        );
        let private_only = json!({"private": {"n": "A", "d": "C"}}).to_string();
        assert_eq!(
            normalize(&private_only, Operation::Encrypt).unwrap_err(),
            OrchestratorError::MissingKeyField(KeyField::E)
        );
        // modulus taken from the private half when the public half lacks it
        let dec = normalize(&private_only, Operation::Decrypt).unwrap();
        assert_eq!(dec.n, "A");
    }

    #[test]
    fn blank_and_non_string_components_do_not_count() {
        let payload = json!({"n": "  ", "e": 65537}).to_string();
        assert_eq!(
            normalize(&payload, Operation::Encrypt).unwrap_err(),
            OrchestratorError::MissingKeyField(KeyField::N)
        );
    }

    #[test]
    fn unparseable_payloads_are_invalid_format() {
        for payload in ["", "   ", "not json", "[1,2]", "\"n\""] {
            let err = normalize(payload, Operation::Encrypt).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidFormat, "payload {payload:?}");
        }
    }
}
