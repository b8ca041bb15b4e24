//! `RegisterAccount` / `LinkDevice`, per `spec.md` §4.3.1. Grounded in the
//! teacher's `handle_check_can_register_user.rs` (preflight, supplemented
//! here per `SPEC_FULL.md` §5) and its device-link retry-on-duplicate rule.

use super::jit_retry;
use crate::confirm_session::ConfirmSession;
use crate::config::ConfirmationConfig;
use crate::envelope::DecisionEnvelope;
use crate::error::{ConfirmError, ConfirmResult};
use crate::providers::{
    AuthenticatorStore, CreateRegistrationParams, NearContextRequest, NearProvider,
    RenderConfirmUiParams, UiRenderer, WebAuthnCollector, WebAuthnError,
};
use crate::vrf_provider::VrfProvider;
use serde_json::{json, Value};
use std::sync::Arc;
use vrf_session::VRFInputData;

pub struct RegistrationRequest {
    pub request_id: String,
    pub account_id: String,
    pub device_number: Option<u32>,
    pub rp_id: String,
    pub summary: Value,
    pub config: ConfirmationConfig,
}

pub struct RegistrationFlow {
    pub near: Arc<dyn NearProvider>,
    pub vrf: Arc<VrfProvider>,
    pub webauthn: Arc<dyn WebAuthnCollector>,
    pub ui: Arc<dyn UiRenderer>,
    pub authenticators: Arc<dyn AuthenticatorStore>,
}

impl RegistrationFlow {
    pub async fn run(&self, req: RegistrationRequest) -> DecisionEnvelope {
        let mut session =
            ConfirmSession::new(req.request_id.clone(), self.near.clone(), self.ui.clone());

        match self.run_inner(&req, &mut session).await {
            Ok(decision) => session.finish(decision).await,
            Err(e) => session.finish(DecisionEnvelope::rejected(&req.request_id, &e)).await,
        }
    }

    async fn run_inner(
        &self,
        req: &RegistrationRequest,
        session: &mut ConfirmSession,
    ) -> ConfirmResult<DecisionEnvelope> {
        if !self.authenticators.can_register_user(&req.account_id).await {
            return Err(ConfirmError::InvalidRequest(format!(
                "{} is not eligible to register",
                req.account_id
            )));
        }

        let ctx = self
            .near
            .fetch_near_context(NearContextRequest {
                account_id: req.account_id.clone(),
                tx_count: 0,
                reserve_nonces: true,
            })
            .await
            .map_err(ConfirmError::NearRpcFailed)?;
        session.set_reserved_nonces(ctx.reserved_nonces.clone());

        let login_digest =
            intent_digest::compute_login_intent_digest(&req.account_id, &req.rp_id);

        let (_vrf_public_key_b64u, mut vrf_challenge, _encrypted) = self
            .vrf
            .generate_vrf_keypair_bootstrap(&req.account_id, Some(VRFInputData {
                user_id: req.account_id.clone(),
                rp_id: req.rp_id.clone(),
                block_height: ctx.transaction_context.tx_block_height.clone(),
                block_hash: ctx.transaction_context.tx_block_hash.clone(),
                intent_digest: login_digest.clone(),
                session_policy_digest_b64u: None,
            }))
            .await
            .map_err(|e| ConfirmError::ConfirmationFailed(e.to_string()))?;

        let render = self
            .ui
            .render_confirm_ui(RenderConfirmUiParams {
                request_id: req.request_id.clone(),
                config: req.config,
                summary: req.summary.clone(),
                vrf_challenge: vrf_challenge.clone(),
            })
            .await;
        session.set_ui_handle(render.handle);

        if !render.confirmed {
            return Err(ConfirmError::UserCancelled);
        }

        // Step 4: best-effort JIT refresh against the latest block.
        let refreshed = jit_retry(|_attempt| async {
            self.near
                .fetch_near_context(NearContextRequest {
                    account_id: req.account_id.clone(),
                    tx_count: 0,
                    reserve_nonces: false,
                })
                .await
        })
        .await;
        if let Ok(fresh_ctx) = refreshed {
            if let Ok(refreshed_challenge) = self
                .vrf
                .generate_challenge(VRFInputData {
                    user_id: req.account_id.clone(),
                    rp_id: req.rp_id.clone(),
                    block_height: fresh_ctx.transaction_context.tx_block_height.clone(),
                    block_hash: fresh_ctx.transaction_context.tx_block_hash.clone(),
                    intent_digest: login_digest.clone(),
                    session_policy_digest_b64u: None,
                })
                .await
            {
                vrf_challenge = Some(refreshed_challenge);
                self.ui
                    .update(render.handle, json!({ "vrfChallenge": vrf_challenge }))
                    .await;
            }
        }

        // Step 5: create the registration credential, retrying once with a
        // bumped device number on a duplicate-credential error.
        let first_device_number = req.device_number.unwrap_or(1);
        let credential = match self
            .create_registration_credential(req, first_device_number, vrf_challenge.clone())
            .await
        {
            Ok(cred) => cred,
            Err(WebAuthnError::DuplicateCredential) => {
                let retry_device_number =
                    if req.device_number.is_none() { 2 } else { first_device_number + 1 };
                self.create_registration_credential(req, retry_device_number, vrf_challenge.clone())
                    .await
                    .map_err(|e| ConfirmError::ConfirmationFailed(format!("{:?}", e)))?
            }
            Err(WebAuthnError::UserCancelled) => return Err(ConfirmError::UserCancelled),
            Err(WebAuthnError::Other(msg)) => return Err(ConfirmError::ConfirmationFailed(msg)),
        };

        if credential.client_extension_results.prf.is_none() {
            return Err(ConfirmError::PrfUnsupported);
        }
        // Presence is required; the outputs themselves are persisted by the
        // caller and never placed on the decision envelope.
        let _ = prf_helpers::extract_dual_prf_outputs(&credential)?;

        let mut decision = DecisionEnvelope::confirmed(&req.request_id);
        decision.intent_digest = Some(login_digest);
        decision.credential = Some(serde_json::to_value(&credential).map_err(|e| {
            ConfirmError::ConfirmationFailed(format!("credential serialization failed: {}", e))
        })?);
        decision.vrf_challenge = vrf_challenge.map(|c| serde_json::to_value(c).unwrap());
        decision.transaction_context =
            Some(serde_json::to_value(&ctx.transaction_context).unwrap());

        decision.finalize()
    }

    async fn create_registration_credential(
        &self,
        req: &RegistrationRequest,
        device_number: u32,
        vrf_challenge: Option<vrf_session::VRFChallengeData>,
    ) -> Result<prf_helpers::NormalizedCredential, WebAuthnError> {
        let challenge = vrf_challenge
            .ok_or_else(|| WebAuthnError::Other("no VRF challenge available".into()))?;
        self.webauthn
            .create_registration_credential(CreateRegistrationParams {
                account_id: req.account_id.clone(),
                challenge,
                device_number,
            })
            .await
    }
}
