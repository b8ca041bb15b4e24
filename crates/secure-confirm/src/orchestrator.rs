//! Single dispatch entry point, per `spec.md` §4.2's three numbered steps:
//! validate, resolve confirmation config, dispatch to a per-type flow.
//! Grounded in the teacher's `lib.rs::handle_message` top-level `match` over
//! message kind, generalized from a `wasm_bindgen` message handler into a
//! plain async method any host (native, or wasm via its own glue) can call.

use crate::config::{resolve_confirmation_config, RuntimeSafetyRules};
use crate::envelope::{DecisionEnvelope, RequestEnvelope, RequestPayload};
use crate::error::ConfirmError;
use crate::flows::local_only::{
    DecryptPrivateKeyRequest, LocalOnlyFlow, ShowSecurePrivateKeyUiRequest,
};
use crate::flows::registration::{RegistrationFlow, RegistrationRequest};
use crate::flows::signing::{SigningFlow, SigningRequest};
use crate::providers::{AuthenticatorStore, NearProvider, SignerChannel, UiRenderer, WebAuthnCollector};
use crate::vrf_provider::VrfProvider;
use intent_digest::TxIntentInput;
use std::sync::Arc;

/// Every external collaborator the orchestrator needs, bound once by the
/// host and shared across requests. `rp_id` is this orchestrator instance's
/// relying-party id — one orchestrator serves one origin.
pub struct Orchestrator {
    pub rp_id: String,
    pub near: Arc<dyn NearProvider>,
    pub vrf: Arc<VrfProvider>,
    pub webauthn: Arc<dyn WebAuthnCollector>,
    pub ui: Arc<dyn UiRenderer>,
    pub authenticators: Arc<dyn AuthenticatorStore>,
    pub signer: Arc<dyn SignerChannel>,
}

impl Orchestrator {
    /// Handle one request end to end. `user_preferences`/`rules` are host
    /// state the orchestrator itself never stores (per-user preferences
    /// persistence and user-agent/iframe detection are the host's job).
    pub async fn handle(
        &self,
        envelope: RequestEnvelope,
        user_preferences: Option<crate::config::ConfirmationConfigOverride>,
        rules: RuntimeSafetyRules,
    ) -> DecisionEnvelope {
        if let Err(e) = envelope.validate() {
            return DecisionEnvelope::rejected(&envelope.request_id, &e);
        }

        let config = resolve_confirmation_config(envelope.confirmation_config, user_preferences, rules);

        match envelope.payload {
            RequestPayload::RegisterAccount { near_account_id, device_number, .. } => {
                self.registration_flow()
                    .run(RegistrationRequest {
                        request_id: envelope.request_id,
                        account_id: near_account_id,
                        device_number,
                        rp_id: self.rp_id.clone(),
                        summary: envelope.summary,
                        config,
                    })
                    .await
            }
            RequestPayload::LinkDevice { near_account_id, device_number, .. } => {
                self.registration_flow()
                    .run(RegistrationRequest {
                        request_id: envelope.request_id,
                        account_id: near_account_id,
                        device_number,
                        rp_id: self.rp_id.clone(),
                        summary: envelope.summary,
                        config,
                    })
                    .await
            }
            RequestPayload::SignTransaction {
                near_account_id,
                tx_signing_requests,
                intent_digest,
                rpc_call,
                signing_auth_mode,
            } => {
                let tx_inputs: Vec<TxIntentInput> = tx_signing_requests
                    .iter()
                    .map(|tx| TxIntentInput {
                        receiver_id: tx.receiver_id.clone(),
                        actions: tx.actions.clone(),
                    })
                    .collect();
                let recomputed = match intent_digest::compute_ui_intent_digest_from_txs(&tx_inputs) {
                    Ok(d) => d,
                    Err(e) => {
                        return DecisionEnvelope::rejected(&envelope.request_id, &ConfirmError::from(e))
                    }
                };
                if recomputed != intent_digest {
                    return DecisionEnvelope::rejected(
                        &envelope.request_id,
                        &ConfirmError::IntentDigestMismatch,
                    );
                }

                self.signing_flow()
                    .run(SigningRequest {
                        request_id: envelope.request_id,
                        account_id: near_account_id,
                        rp_id: self.rp_id.clone(),
                        tx_count: tx_signing_requests.len() as u32,
                        intent_digest: recomputed,
                        contract_id: rpc_call.contract_id,
                        near_rpc_url: rpc_call.near_rpc_url,
                        signing_auth_mode,
                        summary: envelope.summary,
                        config,
                    })
                    .await
            }
            RequestPayload::SignNep413Message {
                near_account_id,
                message,
                recipient,
                contract_id,
                near_rpc_url,
                signing_auth_mode,
            } => {
                let recomputed = intent_digest::compute_ui_intent_digest_from_nep413(
                    &near_account_id,
                    &recipient,
                    &message,
                );

                self.signing_flow()
                    .run(SigningRequest {
                        request_id: envelope.request_id,
                        account_id: near_account_id,
                        rp_id: self.rp_id.clone(),
                        tx_count: 1,
                        intent_digest: recomputed,
                        contract_id,
                        near_rpc_url,
                        signing_auth_mode,
                        summary: envelope.summary,
                        config,
                    })
                    .await
            }
            RequestPayload::DecryptPrivateKeyWithPrf { near_account_id, public_key } => {
                self.local_only_flow()
                    .decrypt_private_key_with_prf(DecryptPrivateKeyRequest {
                        request_id: envelope.request_id,
                        account_id: near_account_id,
                        public_key,
                        summary: envelope.summary,
                        config,
                    })
                    .await
            }
            RequestPayload::ShowSecurePrivateKeyUi { near_account_id, public_key, variant, theme, .. } => {
                crate::flows::local_only::show_secure_private_key_ui(
                    &self.ui,
                    ShowSecurePrivateKeyUiRequest {
                        request_id: envelope.request_id,
                        account_id: near_account_id,
                        public_key,
                        variant,
                        theme,
                    },
                )
                .await
            }
        }
    }

    fn registration_flow(&self) -> RegistrationFlow {
        RegistrationFlow {
            near: self.near.clone(),
            vrf: self.vrf.clone(),
            webauthn: self.webauthn.clone(),
            ui: self.ui.clone(),
            authenticators: self.authenticators.clone(),
        }
    }

    fn signing_flow(&self) -> SigningFlow {
        SigningFlow {
            near: self.near.clone(),
            vrf: self.vrf.clone(),
            webauthn: self.webauthn.clone(),
            ui: self.ui.clone(),
            authenticators: self.authenticators.clone(),
            signer: self.signer.clone(),
        }
    }

    fn local_only_flow(&self) -> LocalOnlyFlow {
        LocalOnlyFlow {
            webauthn: self.webauthn.clone(),
            ui: self.ui.clone(),
            authenticators: self.authenticators.clone(),
        }
    }
}
