//! Request/decision wire envelopes and the forbidden-field guard.
//!
//! Grounded in `wasm_vrf_worker/src/lib.rs::find_forbidden_near_secret` (a
//! recursive JSON scanner rejecting a named secret key anywhere in a
//! payload) and `wasm_signer_worker/src/error.rs::SECRET_STRING_FIELDS` (the
//! exhaustive list of field names a secret could hide under). Both are
//! generalized here into one guard run against the full forbidden set named
//! in `spec.md` §3.

use crate::error::{ConfirmError, ConfirmResult};
use intent_digest::ActionParams;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field names that must never appear anywhere in a request payload or a
/// decision envelope, at any nesting depth.
pub const FORBIDDEN_FIELDS: &[&str] =
    &["prfOutput", "wrapKeySeed", "wrapKeySalt", "vrf_sk", "prfKey"];

/// Recursively scan a JSON value for any forbidden key. Returns the first
/// offending field name found, depth-first.
pub fn find_forbidden_field(value: &Value) -> Option<&'static str> {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                if let Some(forbidden) = FORBIDDEN_FIELDS.iter().find(|f| **f == key) {
                    return Some(forbidden);
                }
                if let Some(found) = find_forbidden_field(val) {
                    return Some(found);
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(find_forbidden_field),
        _ => None,
    }
}

pub fn guard_forbidden_fields(value: &Value) -> ConfirmResult<()> {
    if let Some(field) = find_forbidden_field(value) {
        return Err(ConfirmError::InvalidRequest(format!(
            "payload must never contain `{}`",
            field
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SigningAuthMode {
    Webauthn,
    WarmSession,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxSigningRequest {
    pub receiver_id: String,
    pub actions: Vec<ActionParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcCall {
    pub contract_id: Option<String>,
    pub near_rpc_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RequestPayload {
    SignTransaction {
        /// Not in `spec.md`'s distilled payload list, but every downstream
        /// step (NEAR context, authenticator lookup, VRF challenge binding)
        /// needs it; the signer is unambiguous per batch since every tx in
        /// one `signTransaction` call shares a signer.
        near_account_id: String,
        tx_signing_requests: Vec<TxSigningRequest>,
        intent_digest: String,
        rpc_call: RpcCall,
        signing_auth_mode: SigningAuthMode,
    },
    SignNep413Message {
        near_account_id: String,
        message: String,
        recipient: String,
        contract_id: Option<String>,
        near_rpc_url: Option<String>,
        signing_auth_mode: SigningAuthMode,
    },
    RegisterAccount {
        near_account_id: String,
        device_number: Option<u32>,
        rpc_call: RpcCall,
    },
    LinkDevice {
        near_account_id: String,
        device_number: Option<u32>,
        rpc_call: RpcCall,
    },
    DecryptPrivateKeyWithPrf {
        near_account_id: String,
        public_key: String,
    },
    ShowSecurePrivateKeyUi {
        near_account_id: String,
        public_key: String,
        private_key: String,
        variant: Option<String>,
        theme: Option<String>,
    },
}

/// The validated request envelope, schema version 2 per `spec.md` §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    pub schema_version: u32,
    pub request_id: String,
    #[serde(flatten)]
    pub payload: RequestPayload,
    pub summary: Value,
    pub confirmation_config: Option<crate::config::ConfirmationConfigOverride>,
    pub intent_digest: Option<String>,
}

impl RequestEnvelope {
    /// Validate schema version and run the forbidden-field guard over the
    /// full envelope (payload + summary), per step 1 of `spec.md` §4.3.
    pub fn validate(&self) -> ConfirmResult<()> {
        if self.schema_version != 2 {
            return Err(ConfirmError::InvalidRequest(format!(
                "unsupported schemaVersion {}",
                self.schema_version
            )));
        }
        if self.request_id.trim().is_empty() {
            return Err(ConfirmError::InvalidRequest("requestId must not be empty".into()));
        }
        let whole = serde_json::to_value(self)
            .map_err(|e| ConfirmError::InvalidRequest(format!("unserializable request: {}", e)))?;
        guard_forbidden_fields(&whole)
    }
}

/// The decision envelope returned to the host. `credential`/`vrf_challenge`/
/// `transaction_context` carry whatever is appropriate for the flow; all
/// secret fields from `FORBIDDEN_FIELDS` are guaranteed absent by
/// [`DecisionEnvelope::finalize`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionEnvelope {
    pub request_id: String,
    pub intent_digest: Option<String>,
    pub confirmed: bool,
    pub credential: Option<Value>,
    pub vrf_challenge: Option<Value>,
    pub transaction_context: Option<Value>,
    pub error: Option<String>,
}

impl DecisionEnvelope {
    pub fn confirmed(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            intent_digest: None,
            confirmed: true,
            credential: None,
            vrf_challenge: None,
            transaction_context: None,
            error: None,
        }
    }

    pub fn rejected(request_id: impl Into<String>, error: &ConfirmError) -> Self {
        Self {
            request_id: request_id.into(),
            intent_digest: None,
            confirmed: false,
            credential: None,
            vrf_challenge: None,
            transaction_context: None,
            error: Some(error.code().to_string()),
        }
    }

    /// Strip any forbidden field that might have been attached to
    /// `credential`/`vrf_challenge`/`transaction_context` before a response
    /// ever leaves the orchestrator. Defense in depth on top of the
    /// provider contracts, which should never attach these in the first
    /// place.
    pub fn finalize(mut self) -> ConfirmResult<Self> {
        for slot in [&mut self.credential, &mut self.vrf_challenge, &mut self.transaction_context] {
            if let Some(value) = slot {
                if let Some(field) = find_forbidden_field(value) {
                    return Err(ConfirmError::InvalidRequest(format!(
                        "response must never contain `{}`",
                        field
                    )));
                }
            }
        }
        debug_assert!(self.confirmed == self.error.is_none());
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_top_level_forbidden_field() {
        let v = json!({"wrapKeySeed": "abc"});
        assert_eq!(find_forbidden_field(&v), Some("wrapKeySeed"));
    }

    #[test]
    fn finds_nested_forbidden_field() {
        let v = json!({"outer": {"inner": [{"vrf_sk": "x"}]}});
        assert_eq!(find_forbidden_field(&v), Some("vrf_sk"));
    }

    #[test]
    fn clean_payload_passes() {
        let v = json!({"receiverId": "a.near", "actions": [{"action_type": "Transfer"}]});
        assert_eq!(find_forbidden_field(&v), None);
    }

    #[test]
    fn decision_finalize_rejects_leaked_secret() {
        let mut decision = DecisionEnvelope::confirmed("r1");
        decision.credential = Some(json!({"prfOutput": "leak"}));
        assert!(decision.finalize().is_err());
    }

    #[test]
    fn decision_finalize_passes_clean_payload() {
        let decision = DecisionEnvelope::confirmed("r1");
        assert!(decision.finalize().is_ok());
    }
}
