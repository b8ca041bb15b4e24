//! `signTransaction` / `signNep413Message`, per `spec.md` §4.3.2. The
//! `warmSession` vs. `webauthn` branch mirrors the teacher's
//! `handle_confirm_and_prepare_signing_session.rs::warm_session_available` +
//! `inject_signing_auth_mode_if_missing`.

use super::jit_retry;
use crate::confirm_session::ConfirmSession;
use crate::config::ConfirmationConfig;
use crate::envelope::{DecisionEnvelope, SigningAuthMode};
use crate::error::{ConfirmError, ConfirmResult};
use crate::providers::{
    AuthenticatorStore, CollectAuthenticationParams, NearContextRequest, NearProvider,
    RenderConfirmUiParams, SignerChannel, UiRenderer, WebAuthnCollector, WebAuthnError,
};
use crate::vrf_provider::VrfProvider;
use serde_json::{json, Value};
use std::sync::Arc;
use vrf_session::{SessionStatus, VRFInputData, VrfSessionPolicy};

pub struct SigningRequest {
    pub request_id: String,
    pub account_id: String,
    pub rp_id: String,
    pub tx_count: u32,
    pub intent_digest: String,
    /// Per-request on-chain verification target (`spec.md` §4.3.2 step 7:
    /// "SIGN_TRANSACTION uses `payload.rpcCall`; SIGN_NEP413 may override or
    /// fall back to defaults"). Both must be present for
    /// `verify_authentication_response` to run before minting.
    pub contract_id: Option<String>,
    pub near_rpc_url: Option<String>,
    pub signing_auth_mode: SigningAuthMode,
    pub summary: Value,
    pub config: ConfirmationConfig,
}

pub struct SigningFlow {
    pub near: Arc<dyn NearProvider>,
    pub vrf: Arc<VrfProvider>,
    pub webauthn: Arc<dyn WebAuthnCollector>,
    pub ui: Arc<dyn UiRenderer>,
    pub authenticators: Arc<dyn AuthenticatorStore>,
    pub signer: Arc<dyn SignerChannel>,
}

impl SigningFlow {
    pub async fn run(&self, req: SigningRequest) -> DecisionEnvelope {
        let mut session =
            ConfirmSession::new(req.request_id.clone(), self.near.clone(), self.ui.clone());

        match self.run_inner(&req, &mut session).await {
            Ok(decision) => session.finish(decision).await,
            Err(e) => session.finish(DecisionEnvelope::rejected(&req.request_id, &e)).await,
        }
    }

    async fn run_inner(
        &self,
        req: &SigningRequest,
        session: &mut ConfirmSession,
    ) -> ConfirmResult<DecisionEnvelope> {
        let ctx = self
            .near
            .fetch_near_context(NearContextRequest {
                account_id: req.account_id.clone(),
                tx_count: req.tx_count,
                reserve_nonces: true,
            })
            .await
            .map_err(ConfirmError::NearRpcFailed)?;
        session.set_reserved_nonces(ctx.reserved_nonces.clone());

        let mut vrf_challenge = if req.signing_auth_mode == SigningAuthMode::Webauthn {
            Some(
                self.vrf
                    .generate_challenge(VRFInputData {
                        user_id: req.account_id.clone(),
                        rp_id: req.rp_id.clone(),
                        block_height: ctx.transaction_context.tx_block_height.clone(),
                        block_hash: ctx.transaction_context.tx_block_hash.clone(),
                        intent_digest: req.intent_digest.clone(),
                        session_policy_digest_b64u: None,
                    })
                    .await
                    .map_err(|e| ConfirmError::ConfirmationFailed(e.to_string()))?,
            )
        } else {
            None
        };

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

        // Step 3: JIT-refresh challenge + tx context.
        let refreshed_ctx = jit_retry(|_attempt| async {
            self.near
                .fetch_near_context(NearContextRequest {
                    account_id: req.account_id.clone(),
                    tx_count: req.tx_count,
                    reserve_nonces: false,
                })
                .await
        })
        .await
        .unwrap_or(ctx);

        if req.signing_auth_mode == SigningAuthMode::Webauthn {
            if let Ok(refreshed_challenge) = self
                .vrf
                .generate_challenge(VRFInputData {
                    user_id: req.account_id.clone(),
                    rp_id: req.rp_id.clone(),
                    block_height: refreshed_ctx.transaction_context.tx_block_height.clone(),
                    block_hash: refreshed_ctx.transaction_context.tx_block_hash.clone(),
                    intent_digest: req.intent_digest.clone(),
                    session_policy_digest_b64u: None,
                })
                .await
            {
                vrf_challenge = Some(refreshed_challenge);
            }
            self.ui
                .update(render.handle, json!({ "vrfChallenge": vrf_challenge }))
                .await;
        }

        let mut decision = DecisionEnvelope::confirmed(&req.request_id);
        decision.intent_digest = Some(req.intent_digest.clone());
        decision.transaction_context =
            Some(serde_json::to_value(&refreshed_ctx.transaction_context).unwrap());

        if req.signing_auth_mode == SigningAuthMode::WarmSession {
            // Step 4: warm session dispense, no WebAuthn ceremony. The
            // session is keyed by this request's own id, minted by an
            // earlier confirmation.
            self.dispense_warm_session(&req.request_id, req.tx_count.max(1)).await?;
            decision.vrf_challenge = vrf_challenge.map(|c| serde_json::to_value(c).unwrap());
            return decision.finalize();
        }

        // Steps 5-7: webauthn path.
        let allow_ids = self.authenticators.allow_credential_ids(&req.account_id).await;
        let credential = self
            .webauthn
            .collect_authentication_credential_with_prf(CollectAuthenticationParams {
                account_id: req.account_id.clone(),
                vrf_challenge: vrf_challenge.clone(),
                allow_credential_ids: allow_ids,
                include_second_prf_output: false,
            })
            .await
            .map_err(|e| match e {
                WebAuthnError::UserCancelled => ConfirmError::UserCancelled,
                WebAuthnError::DuplicateCredential => {
                    ConfirmError::ConfirmationFailed("unexpected duplicate-credential error".into())
                }
                WebAuthnError::Other(msg) => ConfirmError::ConfirmationFailed(msg),
            })?;

        let active_device = self.authenticators.active_vrf_device_number(&req.account_id).await;
        if let Some(device_number) = active_device {
            let expected_id = self
                .authenticators
                .device_credential_id(&req.account_id, device_number)
                .await;
            if expected_id.as_deref() != Some(credential.id.as_str()) {
                return Err(ConfirmError::WrongPasskey);
            }
        }

        if !self.vrf.is_bound_to(&req.account_id).await {
            return Err(ConfirmError::VrfSessionMismatch);
        }

        let device_number = active_device
            .ok_or_else(|| ConfirmError::VrfSessionMismatch)?;
        let wrap_key_salt = self
            .authenticators
            .wrap_key_salt(&req.account_id, device_number)
            .await
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ConfirmError::ConfirmationFailed("no wrapKeySalt on key vault entry".into())
            })?;

        let prf_first_b64u = prf_helpers::extract_prf_first(&credential)?;
        let prf_first = vrf_session::utils::base64_url_decode(&prf_first_b64u)
            .map_err(|e| ConfirmError::ConfirmationFailed(format!("malformed PRF.first: {}", e)))?;
        let channel = self.signer.open_wrap_key_seed_channel(&req.request_id);
        self.vrf
            .mint_session_keys_and_send_to_signer(
                req.request_id.clone(),
                &prf_first,
                Some(wrap_key_salt),
                VrfSessionPolicy::default(),
                channel,
                req.contract_id.clone(),
                req.near_rpc_url.clone(),
                &self.near,
            )
            .await
            .map_err(ConfirmError::from)?;

        let sanitized_credential = prf_helpers::remove_prf_output_guard(&credential);
        decision.credential = Some(serde_json::to_value(&sanitized_credential).unwrap());
        decision.vrf_challenge = vrf_challenge.map(|c| serde_json::to_value(c).unwrap());

        decision.finalize()
    }

    async fn dispense_warm_session(&self, session_id: &str, uses: u32) -> ConfirmResult<()> {
        match self.vrf.session_status(session_id).await {
            SessionStatus::Active => {}
            SessionStatus::Exhausted => return Err(ConfirmError::SessionExhausted(session_id.to_string())),
            SessionStatus::Expired => return Err(ConfirmError::SessionExpired(session_id.to_string())),
            SessionStatus::NotFound => return Err(ConfirmError::SessionNotFound(session_id.to_string())),
        }

        // The warm path never sees PRF.first again; dispensing re-sends the
        // seed captured when the session was minted.
        self.vrf
            .dispense_session_key(session_id, uses)
            .await
            .map_err(ConfirmError::from)?;
        Ok(())
    }
}
