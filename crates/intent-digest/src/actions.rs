use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::IntentDigestError;

/// The action kinds a signing request's intent digest can bind to, matching
/// `wasm_signer_worker::actions::ActionParams` one-for-one. Field shapes are
/// the digest-relevant subset only — `access_key`/`args` are carried as
/// opaque JSON strings exactly as the signer worker receives them, so the
/// digest is sensitive to their exact byte content without this crate having
/// to understand NEAR access-key or function-call-arg internals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action_type")]
pub enum ActionParams {
    CreateAccount,
    DeployContract {
        code: Vec<u8>,
    },
    FunctionCall {
        method_name: String,
        args: String,
        gas: String,
        deposit: String,
    },
    Transfer {
        deposit: String,
    },
    Stake {
        stake: String,
        public_key: String,
    },
    AddKey {
        public_key: String,
        access_key: String,
    },
    DeleteKey {
        public_key: String,
    },
    DeleteAccount {
        beneficiary_id: String,
    },
    SignedDelegate {
        delegate_action_hash_b58: String,
        signature_b58: String,
    },
    DeployGlobalContract {
        code: Vec<u8>,
        deploy_mode: String,
    },
    UseGlobalContract {
        account_id: Option<String>,
        code_hash: Option<String>,
    },
}

impl ActionParams {
    fn kind(&self) -> &'static str {
        match self {
            ActionParams::CreateAccount => "CreateAccount",
            ActionParams::DeployContract { .. } => "DeployContract",
            ActionParams::FunctionCall { .. } => "FunctionCall",
            ActionParams::Transfer { .. } => "Transfer",
            ActionParams::Stake { .. } => "Stake",
            ActionParams::AddKey { .. } => "AddKey",
            ActionParams::DeleteKey { .. } => "DeleteKey",
            ActionParams::DeleteAccount { .. } => "DeleteAccount",
            ActionParams::SignedDelegate { .. } => "SignedDelegate",
            ActionParams::DeployGlobalContract { .. } => "DeployGlobalContract",
            ActionParams::UseGlobalContract { .. } => "UseGlobalContract",
        }
    }

    /// Validate invariants that would make an action ambiguous or malformed
    /// for digesting (mirrors `ActionParams::to_action`'s validation in the
    /// signer worker, without needing the signer's NEAR-action types).
    pub fn validate(&self) -> Result<(), IntentDigestError> {
        match self {
            ActionParams::DeployContract { code } | ActionParams::DeployGlobalContract { code, .. }
                if code.is_empty() =>
            {
                Err(IntentDigestError::InvalidAction(
                    "contract code cannot be empty".into(),
                ))
            }
            ActionParams::FunctionCall { method_name, .. } if method_name.is_empty() => Err(
                IntentDigestError::InvalidAction("method name cannot be empty".into()),
            ),
            ActionParams::Transfer { deposit } if deposit.is_empty() => Err(
                IntentDigestError::InvalidAction("transfer deposit cannot be empty".into()),
            ),
            ActionParams::UseGlobalContract {
                account_id,
                code_hash,
            } => match (account_id, code_hash) {
                (Some(_), None) | (None, Some(_)) => Ok(()),
                _ => Err(IntentDigestError::InvalidAction(
                    "UseGlobalContract requires exactly one of account_id or code_hash".into(),
                )),
            },
            _ => Ok(()),
        }
    }

    /// Rewrite this action into the canonical digest-relevant JSON shape,
    /// the Rust equivalent of the source's `orderActionForDigest`: only the
    /// fields that bind user intent are included, keyed by a fixed set per
    /// action kind so two differently-constructed-but-equivalent action
    /// objects always hash the same way.
    pub fn order_for_digest(&self) -> Value {
        let kind = self.kind();
        match self {
            ActionParams::CreateAccount => json!({ "action_type": kind }),
            ActionParams::DeployContract { code } => {
                json!({ "action_type": kind, "code": code })
            }
            ActionParams::FunctionCall {
                method_name,
                args,
                gas,
                deposit,
            } => json!({
                "action_type": kind,
                "method_name": method_name,
                "args": args,
                "gas": gas,
                "deposit": deposit,
            }),
            ActionParams::Transfer { deposit } => {
                json!({ "action_type": kind, "deposit": deposit })
            }
            ActionParams::Stake { stake, public_key } => json!({
                "action_type": kind,
                "stake": stake,
                "public_key": public_key,
            }),
            ActionParams::AddKey {
                public_key,
                access_key,
            } => json!({
                "action_type": kind,
                "public_key": public_key,
                "access_key": access_key,
            }),
            ActionParams::DeleteKey { public_key } => {
                json!({ "action_type": kind, "public_key": public_key })
            }
            ActionParams::DeleteAccount { beneficiary_id } => json!({
                "action_type": kind,
                "beneficiary_id": beneficiary_id,
            }),
            ActionParams::SignedDelegate {
                delegate_action_hash_b58,
                signature_b58,
            } => json!({
                "action_type": kind,
                "delegate_action_hash": delegate_action_hash_b58,
                "signature": signature_b58,
            }),
            ActionParams::DeployGlobalContract { code, deploy_mode } => json!({
                "action_type": kind,
                "code": code,
                "deploy_mode": deploy_mode,
            }),
            ActionParams::UseGlobalContract {
                account_id,
                code_hash,
            } => json!({
                "action_type": kind,
                "account_id": account_id,
                "code_hash": code_hash,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn use_global_contract_requires_exactly_one_field() {
        let both = ActionParams::UseGlobalContract {
            account_id: Some("a.near".into()),
            code_hash: Some("abc".into()),
        };
        assert!(both.validate().is_err());

        let neither = ActionParams::UseGlobalContract {
            account_id: None,
            code_hash: None,
        };
        assert!(neither.validate().is_err());

        let one = ActionParams::UseGlobalContract {
            account_id: Some("a.near".into()),
            code_hash: None,
        };
        assert!(one.validate().is_ok());
    }

    #[test]
    fn ordered_digest_shape_is_stable_across_rust_struct_field_order() {
        let transfer = ActionParams::Transfer {
            deposit: "1".into(),
        };
        let value = transfer.order_for_digest();
        assert_eq!(value["action_type"], "Transfer");
        assert_eq!(value["deposit"], "1");
    }
}
