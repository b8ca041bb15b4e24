//! End-to-end coverage of `Orchestrator::handle` against the concrete
//! scenarios this core's wire contract is built around: happy-path signing,
//! warm-session dispense, user cancellation, duplicate-credential retry on
//! registration, intent digest mismatch, and the forbidden-field guard.
//! Every external collaborator is a hand-rolled recording mock; nothing here
//! touches real WebAuthn, NEAR RPC, or a real signer process.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use intent_digest::ActionParams;
use prf_helpers::{base64_url_encode, ClientExtensionResults, NormalizedCredential, PrfExtension, PrfResults};
use secure_confirm::config::RuntimeSafetyRules;
use secure_confirm::envelope::{RequestPayload, RpcCall, SigningAuthMode, TxSigningRequest};
use secure_confirm::providers::{
    AuthenticatorStore, CollectAuthenticationParams, ConfirmUiHandle, CreateRegistrationParams,
    NearContextRequest, NearContextResult, NearProvider, RenderConfirmUiParams, RenderConfirmUiResult,
    ReservedNonce, SignerChannel, TransactionContext, UiRenderer, WebAuthnCollector, WebAuthnError,
};
use secure_confirm::{Orchestrator, RequestEnvelope, VrfProvider};
use vrf_session::utils::generate_wrap_key_salt_b64u;
use vrf_session::{VrfSessionPolicy, WrapKeySeedChannel};

fn all_zero_block_hash() -> String {
    "1".repeat(32)
}

fn fixed_context() -> NearContextResult {
    NearContextResult {
        transaction_context: TransactionContext {
            near_public_key: "ed25519:pubkey".into(),
            access_key_info: json!({ "nonce": 41 }),
            next_nonce: 42,
            tx_block_height: "100".into(),
            tx_block_hash: all_zero_block_hash(),
        },
        reserved_nonces: vec![ReservedNonce { public_key: "ed25519:pubkey".into(), nonce: 42 }],
    }
}

struct MockNearProvider {
    ctx: NearContextResult,
    fetch_calls: AtomicU32,
    released: Mutex<Vec<Vec<ReservedNonce>>>,
}

impl MockNearProvider {
    fn new(ctx: NearContextResult) -> Self {
        Self { ctx, fetch_calls: AtomicU32::new(0), released: Mutex::new(vec![]) }
    }
}

#[async_trait]
impl NearProvider for MockNearProvider {
    async fn fetch_near_context(&self, _request: NearContextRequest) -> Result<NearContextResult, String> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.ctx.clone())
    }

    async fn release_reserved_nonces(&self, nonces: &[ReservedNonce]) {
        self.released.lock().unwrap().push(nonces.to_vec());
    }
}

struct MockUiRenderer {
    confirmed: bool,
    renders: AtomicU32,
    closes: Mutex<Vec<(ConfirmUiHandle, bool)>>,
}

impl MockUiRenderer {
    fn new(confirmed: bool) -> Self {
        Self { confirmed, renders: AtomicU32::new(0), closes: Mutex::new(vec![]) }
    }
}

#[async_trait]
impl UiRenderer for MockUiRenderer {
    async fn render_confirm_ui(&self, _params: RenderConfirmUiParams) -> RenderConfirmUiResult {
        self.renders.fetch_add(1, Ordering::SeqCst);
        RenderConfirmUiResult { confirmed: self.confirmed, handle: ConfirmUiHandle(1) }
    }

    async fn update(&self, _handle: ConfirmUiHandle, _partial: serde_json::Value) {}

    async fn close(&self, handle: ConfirmUiHandle, confirmed: bool) {
        self.closes.lock().unwrap().push((handle, confirmed));
    }
}

struct MockAuthenticatorStore {
    credential_id: String,
    wrap_key_salt: String,
    device_number: u32,
}

#[async_trait]
impl AuthenticatorStore for MockAuthenticatorStore {
    async fn allow_credential_ids(&self, _account_id: &str) -> Vec<String> {
        vec![self.credential_id.clone()]
    }

    async fn device_credential_id(&self, _account_id: &str, device_number: u32) -> Option<String> {
        (device_number == self.device_number).then(|| self.credential_id.clone())
    }

    async fn wrap_key_salt(&self, _account_id: &str, device_number: u32) -> Option<String> {
        (device_number == self.device_number).then(|| self.wrap_key_salt.clone())
    }

    async fn active_vrf_device_number(&self, _account_id: &str) -> Option<u32> {
        Some(self.device_number)
    }
}

enum AuthOutcome {
    Succeed,
    Cancel,
}

struct MockWebAuthnCollector {
    auth_outcome: AuthOutcome,
    credential_id: String,
    prf_first_b64u: String,
    auth_calls: AtomicU32,
    register_calls: AtomicU32,
    register_duplicate_on_first_call: bool,
}

impl MockWebAuthnCollector {
    fn credential(&self, include_second: bool) -> NormalizedCredential {
        NormalizedCredential {
            id: self.credential_id.clone(),
            raw_id: self.credential_id.clone(),
            transports: vec![],
            client_extension_results: ClientExtensionResults {
                prf: Some(PrfExtension {
                    results: Some(PrfResults {
                        first: Some(self.prf_first_b64u.clone()),
                        second: include_second.then(|| self.prf_first_b64u.clone()),
                    }),
                }),
            },
        }
    }
}

#[async_trait]
impl WebAuthnCollector for MockWebAuthnCollector {
    async fn collect_authentication_credential_with_prf(
        &self,
        params: CollectAuthenticationParams,
    ) -> Result<NormalizedCredential, WebAuthnError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        match self.auth_outcome {
            AuthOutcome::Cancel => Err(WebAuthnError::UserCancelled),
            AuthOutcome::Succeed => Ok(self.credential(params.include_second_prf_output)),
        }
    }

    async fn create_registration_credential(
        &self,
        _params: CreateRegistrationParams,
    ) -> Result<NormalizedCredential, WebAuthnError> {
        let call_number = self.register_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.register_duplicate_on_first_call && call_number == 1 {
            return Err(WebAuthnError::DuplicateCredential);
        }
        Ok(self.credential(true))
    }
}

struct RecordingWrapKeySeedChannel {
    delivered: Arc<Mutex<Option<[u8; 32]>>>,
}

impl WrapKeySeedChannel for RecordingWrapKeySeedChannel {
    fn send_wrap_key_seed(&self, seed: &[u8; 32]) -> vrf_session::VrfResult<()> {
        *self.delivered.lock().unwrap() = Some(*seed);
        Ok(())
    }
}

struct MockSignerChannel {
    delivered: Arc<Mutex<Option<[u8; 32]>>>,
    open_calls: AtomicU32,
}

impl MockSignerChannel {
    fn new() -> Self {
        Self { delivered: Arc::new(Mutex::new(None)), open_calls: AtomicU32::new(0) }
    }
}

impl SignerChannel for MockSignerChannel {
    fn open_wrap_key_seed_channel(&self, _session_id: &str) -> Box<dyn WrapKeySeedChannel> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        Box::new(RecordingWrapKeySeedChannel { delivered: self.delivered.clone() })
    }
}

fn transfer_tx(receiver: &str, deposit: &str) -> TxSigningRequest {
    TxSigningRequest {
        receiver_id: receiver.into(),
        actions: vec![ActionParams::Transfer { deposit: deposit.into() }],
    }
}

fn sign_transaction_digest(receiver: &str, deposit: &str) -> String {
    intent_digest::compute_ui_intent_digest_from_txs(&[intent_digest::TxIntentInput {
        receiver_id: receiver.into(),
        actions: vec![ActionParams::Transfer { deposit: deposit.into() }],
    }])
    .unwrap()
}

fn sign_transaction_envelope(request_id: &str, intent_digest: String, mode: SigningAuthMode) -> RequestEnvelope {
    RequestEnvelope {
        schema_version: 2,
        request_id: request_id.into(),
        payload: RequestPayload::SignTransaction {
            near_account_id: "alice.near".into(),
            tx_signing_requests: vec![transfer_tx("bob.near", "1")],
            intent_digest,
            rpc_call: RpcCall { contract_id: None, near_rpc_url: None },
            signing_auth_mode: mode,
        },
        summary: json!({ "kind": "transfer", "to": "bob.near" }),
        confirmation_config: None,
        intent_digest: None,
    }
}

fn register_account_envelope(request_id: &str, device_number: Option<u32>) -> RequestEnvelope {
    RequestEnvelope {
        schema_version: 2,
        request_id: request_id.into(),
        payload: RequestPayload::RegisterAccount {
            near_account_id: "alice.near".into(),
            device_number,
            rpc_call: RpcCall { contract_id: None, near_rpc_url: None },
        },
        summary: json!({ "kind": "register", "accountId": "alice.near" }),
        confirmation_config: None,
        intent_digest: None,
    }
}

#[tokio::test]
async fn scenario_1_happy_path_sign_with_webauthn() {
    let vrf = Arc::new(VrfProvider::new());
    vrf.generate_vrf_keypair_bootstrap("alice.near", None).await.unwrap();

    let near = Arc::new(MockNearProvider::new(fixed_context()));
    let ui = Arc::new(MockUiRenderer::new(true));
    let authenticators = Arc::new(MockAuthenticatorStore {
        credential_id: "cred-1".into(),
        wrap_key_salt: generate_wrap_key_salt_b64u().unwrap(),
        device_number: 1,
    });
    let webauthn = Arc::new(MockWebAuthnCollector {
        auth_outcome: AuthOutcome::Succeed,
        credential_id: "cred-1".into(),
        prf_first_b64u: base64_url_encode(&[9u8; 32]),
        auth_calls: AtomicU32::new(0),
        register_calls: AtomicU32::new(0),
        register_duplicate_on_first_call: false,
    });
    let signer = Arc::new(MockSignerChannel::new());

    let orchestrator = Orchestrator {
        rp_id: "example.com".into(),
        near: near.clone(),
        vrf: vrf.clone(),
        webauthn: webauthn.clone(),
        ui: ui.clone(),
        authenticators: authenticators.clone(),
        signer: signer.clone(),
    };

    let digest = sign_transaction_digest("bob.near", "1");
    let envelope = sign_transaction_envelope("req-1", digest.clone(), SigningAuthMode::Webauthn);

    let decision = orchestrator
        .handle(envelope, None, RuntimeSafetyRules::default())
        .await;

    assert!(decision.confirmed, "decision should be confirmed: {:?}", decision.error);
    assert_eq!(decision.intent_digest, Some(digest));
    assert!(decision.transaction_context.is_some());
    assert!(decision.credential.is_some());
    assert_eq!(webauthn.auth_calls.load(Ordering::SeqCst), 1);
    assert_eq!(signer.open_calls.load(Ordering::SeqCst), 1);
    assert!(signer.delivered.lock().unwrap().is_some());
}

#[tokio::test]
async fn scenario_2_warm_session_skips_webauthn_ceremony() {
    let vrf = Arc::new(VrfProvider::new());
    vrf.generate_vrf_keypair_bootstrap("alice.near", None).await.unwrap();

    let near: Arc<dyn NearProvider> = Arc::new(MockNearProvider::new(fixed_context()));

    let mint_signer = Arc::new(MockSignerChannel::new());
    let mint_channel = mint_signer.open_wrap_key_seed_channel("req-2");
    let salt = generate_wrap_key_salt_b64u().unwrap();
    vrf.mint_session_keys_and_send_to_signer(
        "req-2".into(),
        &[3u8; 32],
        Some(salt),
        VrfSessionPolicy::default(),
        mint_channel,
        None,
        None,
        &near,
    )
    .await
    .unwrap();
    let ui = Arc::new(MockUiRenderer::new(true));
    let authenticators = Arc::new(MockAuthenticatorStore {
        credential_id: "cred-1".into(),
        wrap_key_salt: "unused".into(),
        device_number: 1,
    });
    let webauthn = Arc::new(MockWebAuthnCollector {
        auth_outcome: AuthOutcome::Cancel,
        credential_id: "cred-1".into(),
        prf_first_b64u: base64_url_encode(&[9u8; 32]),
        auth_calls: AtomicU32::new(0),
        register_calls: AtomicU32::new(0),
        register_duplicate_on_first_call: false,
    });
    let signer = Arc::new(MockSignerChannel::new());

    let orchestrator = Orchestrator {
        rp_id: "example.com".into(),
        near: near.clone(),
        vrf: vrf.clone(),
        webauthn: webauthn.clone(),
        ui: ui.clone(),
        authenticators: authenticators.clone(),
        signer: signer.clone(),
    };

    let digest = sign_transaction_digest("bob.near", "1");
    let envelope = sign_transaction_envelope("req-2", digest, SigningAuthMode::WarmSession);

    let decision = orchestrator
        .handle(envelope, None, RuntimeSafetyRules::default())
        .await;

    assert!(decision.confirmed, "decision should be confirmed: {:?}", decision.error);
    assert!(decision.credential.is_none(), "warm session never collects a credential");
    assert!(decision.transaction_context.is_some());
    assert_eq!(webauthn.auth_calls.load(Ordering::SeqCst), 0, "no WebAuthn ceremony for a warm session");
    assert_eq!(
        vrf.session_status("req-2").await,
        vrf_session::SessionStatus::Active,
        "one dispense out of the default max uses leaves the session active"
    );
}

#[tokio::test]
async fn scenario_3_user_cancel_releases_nonce_and_closes_ui_once() {
    let vrf = Arc::new(VrfProvider::new());
    let near = Arc::new(MockNearProvider::new(fixed_context()));
    let ui = Arc::new(MockUiRenderer::new(false));
    let authenticators = Arc::new(MockAuthenticatorStore {
        credential_id: "cred-1".into(),
        wrap_key_salt: "salt".into(),
        device_number: 1,
    });
    let webauthn = Arc::new(MockWebAuthnCollector {
        auth_outcome: AuthOutcome::Succeed,
        credential_id: "cred-1".into(),
        prf_first_b64u: base64_url_encode(&[9u8; 32]),
        auth_calls: AtomicU32::new(0),
        register_calls: AtomicU32::new(0),
        register_duplicate_on_first_call: false,
    });
    let signer = Arc::new(MockSignerChannel::new());

    let orchestrator = Orchestrator {
        rp_id: "example.com".into(),
        near: near.clone(),
        vrf,
        webauthn: webauthn.clone(),
        ui: ui.clone(),
        authenticators,
        signer,
    };

    let envelope = register_account_envelope("req-3", None);
    let decision = orchestrator
        .handle(envelope, None, RuntimeSafetyRules::default())
        .await;

    assert!(!decision.confirmed);
    assert_eq!(decision.error.as_deref(), Some("USER_CANCELLED"));
    assert_eq!(near.released.lock().unwrap().len(), 1, "reserved nonce must be released on cancel");
    assert_eq!(ui.closes.lock().unwrap().len(), 1, "UI handle must be closed exactly once");
    assert_eq!(ui.closes.lock().unwrap()[0].1, false);
    assert_eq!(webauthn.register_calls.load(Ordering::SeqCst), 0, "cancel happens before any credential is created");
}

#[tokio::test]
async fn scenario_4_duplicate_credential_retries_with_bumped_device_number() {
    let vrf = Arc::new(VrfProvider::new());
    let near = Arc::new(MockNearProvider::new(fixed_context()));
    let ui = Arc::new(MockUiRenderer::new(true));
    let authenticators = Arc::new(MockAuthenticatorStore {
        credential_id: "cred-1".into(),
        wrap_key_salt: "salt".into(),
        device_number: 1,
    });
    let webauthn = Arc::new(MockWebAuthnCollector {
        auth_outcome: AuthOutcome::Succeed,
        credential_id: "cred-1".into(),
        prf_first_b64u: base64_url_encode(&[9u8; 32]),
        auth_calls: AtomicU32::new(0),
        register_calls: AtomicU32::new(0),
        register_duplicate_on_first_call: true,
    });
    let signer = Arc::new(MockSignerChannel::new());

    let orchestrator = Orchestrator {
        rp_id: "example.com".into(),
        near,
        vrf,
        webauthn: webauthn.clone(),
        ui,
        authenticators,
        signer,
    };

    let envelope = register_account_envelope("req-4", None);
    let decision = orchestrator
        .handle(envelope, None, RuntimeSafetyRules::default())
        .await;

    assert!(decision.confirmed, "retry with a bumped device number should succeed: {:?}", decision.error);
    assert_eq!(webauthn.register_calls.load(Ordering::SeqCst), 2, "exactly one retry after the duplicate");
}

#[tokio::test]
async fn scenario_5_intent_digest_mismatch_short_circuits_before_any_rpc() {
    let vrf = Arc::new(VrfProvider::new());
    let near = Arc::new(MockNearProvider::new(fixed_context()));
    let ui = Arc::new(MockUiRenderer::new(true));
    let authenticators = Arc::new(MockAuthenticatorStore {
        credential_id: "cred-1".into(),
        wrap_key_salt: "salt".into(),
        device_number: 1,
    });
    let webauthn = Arc::new(MockWebAuthnCollector {
        auth_outcome: AuthOutcome::Succeed,
        credential_id: "cred-1".into(),
        prf_first_b64u: base64_url_encode(&[9u8; 32]),
        auth_calls: AtomicU32::new(0),
        register_calls: AtomicU32::new(0),
        register_duplicate_on_first_call: false,
    });
    let signer = Arc::new(MockSignerChannel::new());

    let orchestrator = Orchestrator {
        rp_id: "example.com".into(),
        near: near.clone(),
        vrf,
        webauthn,
        ui: ui.clone(),
        authenticators,
        signer,
    };

    let envelope = sign_transaction_envelope("req-5", "not-the-real-digest".into(), SigningAuthMode::Webauthn);
    let decision = orchestrator
        .handle(envelope, None, RuntimeSafetyRules::default())
        .await;

    assert!(!decision.confirmed);
    assert_eq!(decision.error.as_deref(), Some("INTENT_DIGEST_MISMATCH"));
    assert_eq!(near.fetch_calls.load(Ordering::SeqCst), 0, "no NEAR RPC before the digest check");
    assert_eq!(ui.renders.load(Ordering::SeqCst), 0, "no UI before the digest check");
}

#[tokio::test]
async fn scenario_6_forbidden_field_rejects_before_any_side_effect() {
    let vrf = Arc::new(VrfProvider::new());
    let near = Arc::new(MockNearProvider::new(fixed_context()));
    let ui = Arc::new(MockUiRenderer::new(true));
    let authenticators = Arc::new(MockAuthenticatorStore {
        credential_id: "cred-1".into(),
        wrap_key_salt: "salt".into(),
        device_number: 1,
    });
    let webauthn = Arc::new(MockWebAuthnCollector {
        auth_outcome: AuthOutcome::Succeed,
        credential_id: "cred-1".into(),
        prf_first_b64u: base64_url_encode(&[9u8; 32]),
        auth_calls: AtomicU32::new(0),
        register_calls: AtomicU32::new(0),
        register_duplicate_on_first_call: false,
    });
    let signer = Arc::new(MockSignerChannel::new());

    let orchestrator = Orchestrator {
        rp_id: "example.com".into(),
        near: near.clone(),
        vrf,
        webauthn,
        ui: ui.clone(),
        authenticators,
        signer,
    };

    let mut envelope = register_account_envelope("req-6", None);
    envelope.summary = json!({ "wrapKeySeed": "leak-attempt" });
    let decision = orchestrator
        .handle(envelope, None, RuntimeSafetyRules::default())
        .await;

    assert!(!decision.confirmed);
    assert_eq!(decision.error.as_deref(), Some("INVALID_REQUEST"));
    assert_eq!(near.fetch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(ui.renders.load(Ordering::SeqCst), 0);
}
