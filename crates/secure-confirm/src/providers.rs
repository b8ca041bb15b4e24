//! External collaborator interfaces, per `spec.md` §6. Everything the
//! orchestrator needs from the UI, NEAR RPC, WebAuthn authenticator, and
//! signer worker is pinned here as a narrow `async_trait`. No implementation
//! lives in this workspace — a host binds real transports to these.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vrf_session::{VRFChallengeData, WrapKeySeedChannel};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservedNonce {
    pub public_key: String,
    pub nonce: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionContext {
    pub near_public_key: String,
    pub access_key_info: Value,
    pub next_nonce: u64,
    pub tx_block_height: String,
    pub tx_block_hash: String,
}

#[derive(Debug, Clone)]
pub struct NearContextRequest {
    pub account_id: String,
    pub tx_count: u32,
    pub reserve_nonces: bool,
}

#[derive(Debug, Clone)]
pub struct NearContextResult {
    pub transaction_context: TransactionContext,
    pub reserved_nonces: Vec<ReservedNonce>,
}

/// Access to NEAR RPC: fetching signing context and releasing any nonces
/// reserved for a request that didn't end up using them.
#[async_trait]
pub trait NearProvider: Send + Sync {
    async fn fetch_near_context(
        &self,
        request: NearContextRequest,
    ) -> Result<NearContextResult, String>;

    async fn release_reserved_nonces(&self, nonces: &[ReservedNonce]);

    /// On-chain `verify_authentication_response` call, run before minting a
    /// signing session when the request carries both `contractId` and
    /// `nearRpcUrl` (`spec.md` §4.2 mint step (i)). Hosts without a contract
    /// that exposes this view method can leave the default no-op in place;
    /// hosts that do should override it to reject a stale or forged
    /// assertion before a `WrapKeySeed` ever reaches the signer.
    async fn verify_authentication_response(
        &self,
        _account_id: &str,
        _contract_id: &str,
        _near_rpc_url: &str,
    ) -> Result<(), String> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CollectAuthenticationParams {
    pub account_id: String,
    /// `None` for flows with no VRF binding at all (`decryptPrivateKeyWithPrf`
    /// uses a plain app-chosen WebAuthn challenge, not a VRF one).
    pub vrf_challenge: Option<VRFChallengeData>,
    pub allow_credential_ids: Vec<String>,
    pub include_second_prf_output: bool,
}

#[derive(Debug, Clone)]
pub struct CreateRegistrationParams {
    pub account_id: String,
    pub challenge: VRFChallengeData,
    pub device_number: u32,
}

/// WebAuthn authenticator collection. `InvalidStateError`/`NotAllowedError`/
/// `AbortError` and similar platform exceptions are surfaced as
/// [`WebAuthnError`] so the orchestrator can classify user-cancel vs.
/// duplicate-credential vs. fatal without inspecting raw platform strings.
#[async_trait]
pub trait WebAuthnCollector: Send + Sync {
    async fn collect_authentication_credential_with_prf(
        &self,
        params: CollectAuthenticationParams,
    ) -> Result<prf_helpers::NormalizedCredential, WebAuthnError>;

    async fn create_registration_credential(
        &self,
        params: CreateRegistrationParams,
    ) -> Result<prf_helpers::NormalizedCredential, WebAuthnError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebAuthnError {
    /// TouchID/FaceID or UI-level cancellation.
    UserCancelled,
    /// A credential already exists for this authenticator/account pairing.
    DuplicateCredential,
    Other(String),
}

#[derive(Debug, Clone)]
pub struct RenderConfirmUiParams {
    pub request_id: String,
    pub config: crate::config::ConfirmationConfig,
    pub summary: Value,
    pub vrf_challenge: Option<VRFChallengeData>,
}

#[derive(Debug, Clone)]
pub struct RenderConfirmUiResult {
    pub confirmed: bool,
    pub handle: ConfirmUiHandle,
}

/// A scoped handle to a mounted confirmation UI element. Guaranteed to be
/// closed exactly once by [`crate::confirm_session::ConfirmSession`]'s
/// cleanup, on every exit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmUiHandle(pub u64);

#[async_trait]
pub trait UiRenderer: Send + Sync {
    async fn render_confirm_ui(&self, params: RenderConfirmUiParams) -> RenderConfirmUiResult;
    async fn update(&self, handle: ConfirmUiHandle, partial: Value);
    async fn close(&self, handle: ConfirmUiHandle, confirmed: bool);
}

/// The host's connection to the signer worker. `open_wrap_key_seed_channel`
/// hands back a one-shot delivery channel scoped to a single session id; the
/// orchestrator passes it straight to [`vrf_session::SigningSessionRegistry`]
/// and never reads the seed it carries.
pub trait SignerChannel: Send + Sync {
    fn open_wrap_key_seed_channel(&self, session_id: &str) -> Box<dyn WrapKeySeedChannel>;
}

/// Per-account passkey bookkeeping: which device each `(accountId,
/// deviceNumber)` pair's encrypted key vault entry belongs to, and which
/// credential is bound to the currently active VRF keypair.
#[async_trait]
pub trait AuthenticatorStore: Send + Sync {
    async fn allow_credential_ids(&self, account_id: &str) -> Vec<String>;
    async fn device_credential_id(&self, account_id: &str, device_number: u32) -> Option<String>;
    async fn wrap_key_salt(&self, account_id: &str, device_number: u32) -> Option<String>;
    async fn active_vrf_device_number(&self, account_id: &str) -> Option<u32>;

    /// Optional registration preflight (teacher: `handle_check_can_register_user.rs`),
    /// run before reserving a nonce for an account that can't register
    /// anyway. Default accepts every account id: hosts without an on-chain
    /// registration gate can skip implementing this.
    async fn can_register_user(&self, _account_id: &str) -> bool {
        true
    }
}
