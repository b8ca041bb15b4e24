use std::fmt;

/// Error taxonomy for the VRF session manager.
///
/// Mirrors the structure of `wasm_vrf_worker::errors::VrfWorkerError` in the
/// teacher (manual enums + hand-written `Display`, no `thiserror`), extended
/// with the signing-session states the source's worker split across several
/// handler files (`SessionExpired`, `SessionExhausted`, `SessionNotFound`).
#[derive(Debug, Clone)]
pub enum VrfSessionError {
    /// No VRF keypair is currently loaded in memory.
    NoVrfKeypair,
    /// A VRF keypair is loaded but the manager has not been unlocked/bound
    /// to the account it is being used for.
    VrfNotUnlocked,
    /// PRF output supplied for unlock/derivation was empty.
    EmptyPrfOutput,
    HkdfDerivationFailed(&'static str),
    AeadEncryptionFailed(String),
    AeadDecryptionFailed(String),
    InvalidIvLength { expected: usize, actual: usize },
    SerializationFailed(String),
    PublicKeyMismatch { expected: String, actual: String },
    InvalidBlockHeight(String),
    InvalidFormat(String),
    SessionNotFound(String),
    SessionExpired(String),
    SessionExhausted(String),
    SessionPortNotAttached(String),
    Shamir3Pass(String),
    ContractVerificationFailed(String),
}

impl fmt::Display for VrfSessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VrfSessionError::NoVrfKeypair => {
                write!(f, "no VRF keypair in memory - please generate a keypair first")
            }
            VrfSessionError::VrfNotUnlocked => {
                write!(f, "VRF keypair not unlocked - please login first")
            }
            VrfSessionError::EmptyPrfOutput => write!(f, "PRF output cannot be empty"),
            VrfSessionError::HkdfDerivationFailed(step) => {
                write!(f, "HKDF derivation failed: {}", step)
            }
            VrfSessionError::AeadEncryptionFailed(msg) => write!(f, "encryption failed: {}", msg),
            VrfSessionError::AeadDecryptionFailed(msg) => {
                write!(f, "failed to decrypt VRF keypair: {}", msg)
            }
            VrfSessionError::InvalidIvLength { expected, actual } => write!(
                f,
                "invalid IV length for ChaCha20Poly1305: expected {} bytes, got {}",
                expected, actual
            ),
            VrfSessionError::SerializationFailed(msg) => write!(f, "serialization error: {}", msg),
            VrfSessionError::PublicKeyMismatch { expected, actual } => write!(
                f,
                "VRF public key mismatch - expected: {}..., actual: {}...",
                &expected[..DISPLAY_TRUNCATE.min(expected.len())],
                &actual[..DISPLAY_TRUNCATE.min(actual.len())]
            ),
            VrfSessionError::InvalidBlockHeight(msg) => write!(f, "invalid block height: {}", msg),
            VrfSessionError::InvalidFormat(msg) => write!(f, "invalid format: {}", msg),
            VrfSessionError::SessionNotFound(id) => write!(f, "session not found: {}", id),
            VrfSessionError::SessionExpired(id) => write!(f, "session expired: {}", id),
            VrfSessionError::SessionExhausted(id) => write!(f, "session exhausted: {}", id),
            VrfSessionError::SessionPortNotAttached(id) => {
                write!(f, "no wrap-key-seed channel attached for session: {}", id)
            }
            VrfSessionError::Shamir3Pass(msg) => write!(f, "Shamir3Pass error: {}", msg),
            VrfSessionError::ContractVerificationFailed(msg) => {
                write!(f, "verify_authentication_response failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for VrfSessionError {}

const DISPLAY_TRUNCATE: usize = crate::config::DISPLAY_TRUNCATE_LENGTH;

pub type VrfResult<T> = Result<T, VrfSessionError>;
