//! Component B of the secure-confirmation/VRF core: VRF keypair custody,
//! challenge generation bound to `{userId, rpId, blockHeight, blockHash,
//! intentDigest}`, and the ephemeral signing-session state machine that
//! hands a `WrapKeySeed` to a signer without ever returning it to the host.

pub mod channel;
pub mod config;
pub mod error;
pub mod manager;
pub mod session;
pub mod shamir3pass;
pub mod types;
pub mod utils;

pub use channel::{MpscWrapKeySeedChannel, WrapKeySeedChannel};
pub use error::{VrfResult, VrfSessionError};
pub use manager::{SecureVRFKeyPair, VRFKeyManager};
pub use session::{SigningSessionRegistry, VrfSessionPolicy};
pub use types::*;
