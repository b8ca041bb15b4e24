//! Wire types for VRF keypair custody and challenge generation, ported from
//! `wasm_vrf_worker::types` with `JsValue` fields dropped (no wasm_bindgen
//! boundary here) and `near_sdk`-flavored names de-identified.

use serde::{Deserialize, Serialize};

/// Bincode-serialized form of an in-memory VRF keypair, used only as the
/// plaintext payload that gets AEAD-wrapped for storage. Never leaves the
/// process boundary unwrapped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VRFKeypairData {
    pub keypair_bytes: Vec<u8>,
    pub public_key_base64: String,
}

/// A VRF keypair wrapped for storage: ChaCha20-Poly1305 ciphertext plus the
/// nonce. The wrapping key itself is re-derived deterministically from
/// PRF.first on unlock, so no salt needs to travel with the ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedVRFKeypair {
    #[serde(rename = "encryptedVrfDataB64u")]
    pub encrypted_vrf_data_b64u: String,
    #[serde(rename = "chacha20NonceB64u")]
    pub chacha20_nonce_b64u: String,
}

/// Inputs the VRF challenge is bound to, per `spec.md` §4: the caller, the
/// relying party, a NEAR block the challenge must be fresh against, and the
/// intent digest produced by Component D for the specific operation being
/// confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VRFInputData {
    pub user_id: String,
    pub rp_id: String,
    pub block_height: String,
    pub block_hash: String,
    pub intent_digest: String,
    /// Digest of any additional session policy (TTL, max uses) applied to
    /// this challenge; all-zero when no policy overlay is present.
    pub session_policy_digest_b64u: Option<String>,
}

/// A generated VRF challenge: the hashed/domain-separated input, the VRF
/// output and proof over it, and the public key the proof verifies against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VRFChallengeData {
    pub vrf_input_b64u: String,
    pub vrf_output_b64u: String,
    pub vrf_proof_b64u: String,
    pub vrf_public_key_b64u: String,
    pub user_id: String,
    pub rp_id: String,
    pub block_height: String,
    pub block_hash: String,
}

/// Returned after generating a brand-new VRF keypair during registration
/// bootstrap: the plaintext keypair (so the host can immediately request a
/// first challenge) and the encrypted-at-rest form to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVrfKeypairBootstrapResponse {
    pub vrf_public_key_b64u: String,
    pub vrf_challenge: Option<VRFChallengeData>,
    pub encrypted_vrf_keypair: Option<EncryptedVRFKeypair>,
}

/// Returned by deterministic re-derivation of a VRF keypair from PRF output
/// (account recovery / device link), optionally bundled with a fresh
/// challenge and the re-encrypted-at-rest form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeterministicVrfKeypairResponse {
    pub vrf_public_key_b64u: String,
    pub vrf_challenge: Option<VRFChallengeData>,
    pub encrypted_vrf_keypair: Option<EncryptedVRFKeypair>,
    /// Present only when the caller also cooperatively locked the derived
    /// keypair with a Shamir-3-pass relay server (see
    /// [`crate::manager::VRFKeyManager::shamir3_pass_encrypt_current_vrf_keypair`]).
    pub server_encrypted_vrf_keypair: Option<ShamirLockedVrfKeypair>,
}

/// The client-persistable output of the registration half of the
/// Shamir-3-pass protocol: ciphertext of the VRF keypair under a KEK only
/// the client and a named relay server can jointly reconstruct, keyed by
/// `serverKeyId` on the relay side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShamirLockedVrfKeypair {
    pub server_key_id: String,
    pub ciphertext_b64u: String,
    pub kek_s_b64u: String,
}

/// Returned by a deterministic re-encryption (e.g. re-salting on a new
/// device link), never exposing the secret key to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedVrfKeypairResponse {
    pub vrf_public_key_b64u: String,
    pub encrypted_vrf_keypair: EncryptedVRFKeypair,
}

/// A minted ephemeral signing-session handle returned to the host. Carries
/// no secret material: the `WrapKeySeed` itself goes to the signer channel
/// directly and is never serialized into this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningSessionHandle {
    pub session_id: String,
    pub wrap_key_salt_b64u: String,
    pub expires_at_ms: u64,
    pub remaining_uses: u32,
}

/// Status of a previously minted session, per the state machine in
/// `spec.md` §4 (`active` / `exhausted` / `expired` / `not_found`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Exhausted,
    Expired,
    NotFound,
}
