//! Credential normalization and dual-PRF extraction.
//!
//! This is Component A of the secure-confirmation/VRF core: it has no notion
//! of VRF sessions or confirmation flows, only of turning a raw authenticator
//! response into structured-clone-safe data and pulling PRF outputs out of it.

mod credential;
mod error;
mod salt;

pub use credential::{
    base64_url_encode, extract_dual_prf_outputs, extract_prf_first, normalize_credential,
    remove_prf_output_guard, ClientExtensionResults, DualPrfOutput, NormalizedCredential,
    PrfExtension, PrfResults,
};
pub use error::PrfError;
pub use salt::{chacha20_salt, ed25519_salt};
