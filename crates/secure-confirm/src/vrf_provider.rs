//! Thin async wrapper around [`vrf_session::VRFKeyManager`] +
//! [`vrf_session::SigningSessionRegistry`], giving the orchestrator a
//! single-writer handle onto Component B — mirroring `spec.md` §5's "VRF
//! session registry... mutation is serialized on the VRF worker" by
//! serializing access behind one `tokio::sync::Mutex`, the native analog of
//! the teacher's isolated worker context plus its thread_local state.

use crate::providers::NearProvider;
use std::sync::Arc;
use tokio::sync::Mutex;
use vrf_session::{
    EncryptedVRFKeypair, SessionStatus, SigningSessionRegistry, VRFChallengeData, VRFInputData,
    VRFKeyManager, VrfResult, VrfSessionError, VrfSessionPolicy, WrapKeySeedChannel,
};

pub struct VrfProvider {
    manager: Mutex<VRFKeyManager>,
    sessions: Mutex<SigningSessionRegistry>,
}

impl VrfProvider {
    pub fn new() -> Self {
        Self {
            manager: Mutex::new(VRFKeyManager::new(None, None, None, None)),
            sessions: Mutex::new(SigningSessionRegistry::new()),
        }
    }

    pub async fn generate_vrf_keypair_bootstrap(
        &self,
        account_id: &str,
        input: Option<VRFInputData>,
    ) -> VrfResult<(String, Option<VRFChallengeData>, Option<EncryptedVRFKeypair>)> {
        let mut mgr = self.manager.lock().await;
        let resp = mgr.generate_vrf_keypair_bootstrap(account_id, input)?;
        Ok((resp.vrf_public_key_b64u, resp.vrf_challenge, resp.encrypted_vrf_keypair))
    }

    pub async fn encrypt_with_prf(
        &self,
        expected_public_key_b64u: &str,
        prf_key: &[u8],
    ) -> VrfResult<EncryptedVRFKeypair> {
        let mgr = self.manager.lock().await;
        Ok(mgr.encrypt_vrf_keypair_with_prf(expected_public_key_b64u, prf_key)?.encrypted_vrf_keypair)
    }

    pub async fn unlock(&self, account_id: &str, encrypted: EncryptedVRFKeypair, prf_key: &[u8]) -> VrfResult<()> {
        let mut mgr = self.manager.lock().await;
        mgr.unlock_vrf_keypair(account_id, encrypted, prf_key)
    }

    pub async fn generate_challenge(&self, input: VRFInputData) -> VrfResult<VRFChallengeData> {
        let mgr = self.manager.lock().await;
        mgr.generate_vrf_challenge(input)
    }

    pub async fn is_unlocked(&self) -> bool {
        self.manager.lock().await.session_active
    }

    /// True only when a keypair is unlocked and bound to `account_id`. Used
    /// by the signing flow so a session unlocked for a different account can
    /// never authorize this one (`VRF_SESSION_MISMATCH`).
    pub async fn is_bound_to(&self, account_id: &str) -> bool {
        self.manager.lock().await.is_bound_to(account_id)
    }

    /// Component B's session-minting operation: derive the `WrapKeySeed`,
    /// deliver it to the signer channel, and register the session. Never
    /// returns the seed to the caller. When `contract_id`/`near_rpc_url` are
    /// both present, invokes on-chain `verify_authentication_response` for
    /// the bound account before minting.
    pub async fn mint_session_keys_and_send_to_signer(
        &self,
        session_id: String,
        prf_first_auth: &[u8],
        wrap_key_salt_b64u: Option<String>,
        policy: VrfSessionPolicy,
        channel: Box<dyn WrapKeySeedChannel>,
        contract_id: Option<String>,
        near_rpc_url: Option<String>,
        near: &Arc<dyn NearProvider>,
    ) -> VrfResult<vrf_session::SigningSessionHandle> {
        let mgr = self.manager.lock().await;
        let wrap_key_seed = mgr.derive_wrap_key_seed(prf_first_auth)?;
        let account_id = mgr.bound_account_id().map(|s| s.to_string());
        drop(mgr);

        if let (Some(contract_id), Some(near_rpc_url), Some(account_id)) =
            (&contract_id, &near_rpc_url, &account_id)
        {
            near.verify_authentication_response(account_id, contract_id, near_rpc_url)
                .await
                .map_err(VrfSessionError::ContractVerificationFailed)?;
        }

        let salt = match wrap_key_salt_b64u {
            Some(s) => s,
            None => vrf_session::utils::generate_wrap_key_salt_b64u()
                .map_err(|e| VrfSessionError::InvalidFormat(e))?,
        };

        let mut sessions = self.sessions.lock().await;
        sessions.mint(session_id, &wrap_key_seed, salt, policy, channel)
    }

    pub async fn dispense_session_key(
        &self,
        session_id: &str,
        uses: u32,
    ) -> VrfResult<vrf_session::SigningSessionHandle> {
        let mut sessions = self.sessions.lock().await;
        sessions.dispense(session_id, uses)
    }

    pub async fn session_status(&self, session_id: &str) -> SessionStatus {
        self.sessions.lock().await.status(session_id)
    }

    pub async fn clear_session(&self, session_id: &str) {
        self.sessions.lock().await.clear(session_id);
    }
}

impl Default for VrfProvider {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedVrfProvider = Arc<VrfProvider>;
