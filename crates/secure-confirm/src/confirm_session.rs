//! `ConfirmSession`: the per-request cleanup coordinator described in
//! `spec.md` §4.3 and §4.3.4 — reserved-nonce release on non-confirmation,
//! UI-handle close exactly once, single response per `requestId`. Grounded
//! in the teacher's "one response per worker message" discipline in
//! `wasm_vrf_worker/src/lib.rs::handle_message`, generalized here into an
//! explicit resource rather than a dispatch function's local bookkeeping.

use crate::envelope::DecisionEnvelope;
use crate::providers::{ConfirmUiHandle, NearProvider, ReservedNonce, UiRenderer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Owns the resources a single request's lifecycle may need to release:
/// reserved nonces and a UI handle. Cleanup is idempotent — calling it twice
/// releases nonces and closes the UI at most once.
pub struct ConfirmSession {
    request_id: String,
    near: Arc<dyn NearProvider>,
    ui: Arc<dyn UiRenderer>,
    reserved_nonces: Vec<ReservedNonce>,
    ui_handle: Option<ConfirmUiHandle>,
    responded: AtomicBool,
    cleaned_up: AtomicBool,
}

impl ConfirmSession {
    pub fn new(request_id: impl Into<String>, near: Arc<dyn NearProvider>, ui: Arc<dyn UiRenderer>) -> Self {
        Self {
            request_id: request_id.into(),
            near,
            ui,
            reserved_nonces: Vec::new(),
            ui_handle: None,
            responded: AtomicBool::new(false),
            cleaned_up: AtomicBool::new(false),
        }
    }

    pub fn set_reserved_nonces(&mut self, nonces: Vec<ReservedNonce>) {
        self.reserved_nonces = nonces;
    }

    pub fn set_ui_handle(&mut self, handle: ConfirmUiHandle) {
        self.ui_handle = Some(handle);
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Release reserved nonces (iff the decision is non-confirmation) and
    /// close the UI handle (unconditionally, on every terminal path),
    /// exactly once regardless of how many times this is called.
    pub async fn cleanup(&self, decision_confirmed: bool) {
        if self.cleaned_up.swap(true, Ordering::SeqCst) {
            return;
        }
        if !decision_confirmed && !self.reserved_nonces.is_empty() {
            self.near.release_reserved_nonces(&self.reserved_nonces).await;
        }
        if let Some(handle) = self.ui_handle {
            self.ui.close(handle, decision_confirmed).await;
        }
    }

    /// Run cleanup per `decision.confirmed` and assert this is the first
    /// (and only) response emitted for this `requestId`.
    pub async fn finish(&self, decision: DecisionEnvelope) -> DecisionEnvelope {
        self.cleanup(decision.confirmed).await;
        if self.responded.swap(true, Ordering::SeqCst) {
            log::error!(
                "request {} produced more than one decision - dropping the duplicate",
                self.request_id
            );
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{
        CollectAuthenticationParams, CreateRegistrationParams, NearContextRequest, NearContextResult,
        RenderConfirmUiParams, RenderConfirmUiResult, WebAuthnError,
    };
    use std::sync::Mutex;

    struct RecordingNear {
        released: Mutex<Vec<Vec<ReservedNonce>>>,
    }

    #[async_trait::async_trait]
    impl NearProvider for RecordingNear {
        async fn fetch_near_context(&self, _r: NearContextRequest) -> Result<NearContextResult, String> {
            unimplemented!()
        }
        async fn release_reserved_nonces(&self, nonces: &[ReservedNonce]) {
            self.released.lock().unwrap().push(nonces.to_vec());
        }
    }

    struct RecordingUi {
        closes: Mutex<Vec<(ConfirmUiHandle, bool)>>,
    }

    #[async_trait::async_trait]
    impl UiRenderer for RecordingUi {
        async fn render_confirm_ui(&self, _p: RenderConfirmUiParams) -> RenderConfirmUiResult {
            unimplemented!()
        }
        async fn update(&self, _handle: ConfirmUiHandle, _partial: serde_json::Value) {}
        async fn close(&self, handle: ConfirmUiHandle, confirmed: bool) {
            self.closes.lock().unwrap().push((handle, confirmed));
        }
    }

    fn nonce() -> ReservedNonce {
        ReservedNonce { public_key: "ed25519:abc".into(), nonce: 1 }
    }

    #[tokio::test]
    async fn cleanup_releases_nonces_only_on_non_confirmation() {
        let near = Arc::new(RecordingNear { released: Mutex::new(vec![]) });
        let ui = Arc::new(RecordingUi { closes: Mutex::new(vec![]) });
        let mut session = ConfirmSession::new("r1", near.clone(), ui.clone());
        session.set_reserved_nonces(vec![nonce()]);
        session.set_ui_handle(ConfirmUiHandle(1));

        session.cleanup(true).await;
        assert!(near.released.lock().unwrap().is_empty());
        assert_eq!(ui.closes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cleanup_releases_nonces_on_rejection() {
        let near = Arc::new(RecordingNear { released: Mutex::new(vec![]) });
        let ui = Arc::new(RecordingUi { closes: Mutex::new(vec![]) });
        let mut session = ConfirmSession::new("r1", near.clone(), ui.clone());
        session.set_reserved_nonces(vec![nonce()]);
        session.set_ui_handle(ConfirmUiHandle(1));

        session.cleanup(false).await;
        assert_eq!(near.released.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cleanup_is_idempotent() {
        let near = Arc::new(RecordingNear { released: Mutex::new(vec![]) });
        let ui = Arc::new(RecordingUi { closes: Mutex::new(vec![]) });
        let mut session = ConfirmSession::new("r1", near.clone(), ui.clone());
        session.set_reserved_nonces(vec![nonce()]);
        session.set_ui_handle(ConfirmUiHandle(1));

        session.cleanup(false).await;
        session.cleanup(false).await;
        assert_eq!(near.released.lock().unwrap().len(), 1);
        assert_eq!(ui.closes.lock().unwrap().len(), 1);
    }
}
