//! Component D: intent digesting.
//!
//! A deterministic, domain-separated SHA-256/base64url hash over canonical
//! JSON, binding UI-visible intent to WebAuthn challenges (via the VRF
//! challenge input) and to signed payloads (re-checked by the signer before
//! it produces a signature). A mismatch anywhere is `INTENT_DIGEST_MISMATCH`.

mod actions;
mod canonical;
mod error;

pub use actions::ActionParams;
pub use canonical::{canonical_json_string, canonicalize};
pub use error::IntentDigestError;

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// One transaction's digest-relevant fields: `{receiverId, actions}`.
/// Nonces and other per-tx metadata are intentionally excluded — see
/// `spec.md` §4.4.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxIntentInput {
    pub receiver_id: String,
    pub actions: Vec<ActionParams>,
}

fn base64_url_sha256(domain: &str, payload: Value) -> String {
    let tagged = json!({ "domain": domain, "payload": payload });
    let canonical = canonical_json_string(&tagged);
    let digest = Sha256::digest(canonical.as_bytes());
    Base64UrlUnpadded::encode_string(&digest)
}

/// Hash canonical JSON directly, with no domain wrapper. Used only for the
/// tx digest, whose exact value is pinned by `spec.md` §8 to
/// `base64url(sha256(canonicalJson([{receiverId,actions}])))` — the `[...]`
/// shape already can't collide with the other variants' tagged objects, so
/// no domain tag is mixed in here.
fn base64_url_sha256_untagged(payload: &Value) -> String {
    let canonical = canonical_json_string(payload);
    let digest = Sha256::digest(canonical.as_bytes());
    Base64UrlUnpadded::encode_string(&digest)
}

/// Digest a batch of transaction signing requests. Binds only
/// `{receiverId, actions}` per tx — nonces, gas-estimation metadata, and
/// signer auth mode never affect this digest. Action field order within each
/// action is fixed by [`ActionParams::order_for_digest`]; action order within
/// a tx and tx order within the batch are both hash-significant.
pub fn compute_ui_intent_digest_from_txs(
    tx_inputs: &[TxIntentInput],
) -> Result<String, IntentDigestError> {
    if tx_inputs.is_empty() {
        return Err(IntentDigestError::EmptyTxBatch);
    }

    let mut txs = Vec::with_capacity(tx_inputs.len());
    for tx in tx_inputs {
        for action in &tx.actions {
            action.validate()?;
        }
        let ordered_actions: Vec<Value> =
            tx.actions.iter().map(ActionParams::order_for_digest).collect();
        txs.push(json!({
            "receiverId": tx.receiver_id,
            "actions": ordered_actions,
        }));
    }

    Ok(base64_url_sha256_untagged(&Value::Array(txs)))
}

/// Digest a NEP-413 off-chain message intent. This is the UI/VRF binding
/// digest, distinct from the NEP-413 signing hash the signer itself computes
/// over the borsh-serialized payload.
pub fn compute_ui_intent_digest_from_nep413(
    account_id: &str,
    recipient: &str,
    message: &str,
) -> String {
    base64_url_sha256(
        "ui-intent:sign-nep413:v1",
        json!({
            "accountId": account_id,
            "recipient": recipient,
            "message": message,
        }),
    )
}

/// Digest binding a login/unlock intent, used by `registerAccount` /
/// `linkDevice` flows to fold a stable login context into the VRF challenge.
pub fn compute_login_intent_digest(account_id: &str, rp_id: &str) -> String {
    base64_url_sha256(
        "ui-intent:login:v1",
        json!({
            "accountId": account_id,
            "rpId": rp_id,
        }),
    )
}

/// Digest binding a threshold Ed25519 keygen ceremony's intent (participant
/// set + threshold), used when registration bootstraps a threshold signer
/// instead of a local one.
pub fn compute_threshold_ed25519_keygen_intent_digest(
    account_id: &str,
    participant_ids: &[String],
    threshold: u32,
) -> String {
    let mut sorted_participants = participant_ids.to_vec();
    sorted_participants.sort();
    base64_url_sha256(
        "ui-intent:threshold-ed25519-keygen:v1",
        json!({
            "accountId": account_id,
            "participantIds": sorted_participants,
            "threshold": threshold,
        }),
    )
}
