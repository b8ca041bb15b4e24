//! Error taxonomy for the orchestrator, per `spec.md` §7. Unlike the
//! hand-rolled `Display` enums in `vrf-session`/`prf-helpers` (ported
//! directly from the teacher's worker-side error types), this one is new to
//! this core, so it follows the `thiserror`-based convention used for
//! application-level error enums elsewhere in the retrieval pack.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfirmError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("NEAR RPC failed: {0}")]
    NearRpcFailed(String),
    #[error("user cancelled")]
    UserCancelled,
    #[error("platform did not expose PRF for this credential")]
    PrfUnsupported,
    #[error("PRF results present but empty")]
    PrfMissing,
    #[error("chosen credential does not match the current device")]
    WrongPasskey,
    #[error("VRF session inactive or bound to another account")]
    VrfSessionMismatch,
    #[error("VRF unlock failed: {0}")]
    VrfUnlockFailed(String),
    #[error("session expired: {0}")]
    SessionExpired(String),
    #[error("session exhausted: {0}")]
    SessionExhausted(String),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("intent digest mismatch")]
    IntentDigestMismatch,
    #[error("confirmation failed: {0}")]
    ConfirmationFailed(String),
}

impl ConfirmError {
    /// The stable string code surfaced in the decision envelope's `error`
    /// field, matching `spec.md` §7's kind names exactly.
    pub fn code(&self) -> &'static str {
        match self {
            ConfirmError::InvalidRequest(_) => "INVALID_REQUEST",
            ConfirmError::NearRpcFailed(_) => "NEAR_RPC_FAILED",
            ConfirmError::UserCancelled => "USER_CANCELLED",
            ConfirmError::PrfUnsupported => "PRF_UNSUPPORTED",
            ConfirmError::PrfMissing => "PRF_MISSING",
            ConfirmError::WrongPasskey => "WRONG_PASSKEY",
            ConfirmError::VrfSessionMismatch => "VRF_SESSION_MISMATCH",
            ConfirmError::VrfUnlockFailed(_) => "VRF_UNLOCK_FAILED",
            ConfirmError::SessionExpired(_) => "SESSION_EXPIRED",
            ConfirmError::SessionExhausted(_) => "SESSION_EXHAUSTED",
            ConfirmError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            ConfirmError::IntentDigestMismatch => "INTENT_DIGEST_MISMATCH",
            ConfirmError::ConfirmationFailed(_) => "CONFIRMATION_FAILED",
        }
    }
}

impl From<vrf_session::VrfSessionError> for ConfirmError {
    fn from(e: vrf_session::VrfSessionError) -> Self {
        use vrf_session::VrfSessionError as V;
        match e {
            V::SessionExpired(id) => ConfirmError::SessionExpired(id),
            V::SessionExhausted(id) => ConfirmError::SessionExhausted(id),
            V::SessionNotFound(id) => ConfirmError::SessionNotFound(id),
            V::ContractVerificationFailed(msg) => ConfirmError::ConfirmationFailed(msg),
            other => ConfirmError::VrfUnlockFailed(other.to_string()),
        }
    }
}

impl From<prf_helpers::PrfError> for ConfirmError {
    fn from(e: prf_helpers::PrfError) -> Self {
        match e {
            prf_helpers::PrfError::PrfUnsupported => ConfirmError::PrfUnsupported,
            prf_helpers::PrfError::PrfMissing => ConfirmError::PrfMissing,
        }
    }
}

impl From<intent_digest::IntentDigestError> for ConfirmError {
    fn from(e: intent_digest::IntentDigestError) -> Self {
        ConfirmError::InvalidRequest(e.to_string())
    }
}

pub type ConfirmResult<T> = Result<T, ConfirmError>;
