//! Component C of the secure-confirmation/VRF core: validates a request
//! envelope, resolves its confirmation UI policy, and dispatches to the
//! registration, signing, or local-only flow that drives NEAR context
//! fetch, VRF challenge/session minting, WebAuthn collection, and UI
//! confirmation to a single decision envelope.

pub mod config;
pub mod confirm_session;
pub mod envelope;
pub mod error;
pub mod flows;
pub mod orchestrator;
pub mod providers;
pub mod vrf_provider;

pub use config::{ConfirmationConfig, ConfirmationConfigOverride, RuntimeSafetyRules};
pub use envelope::{DecisionEnvelope, RequestEnvelope, RequestPayload};
pub use error::{ConfirmError, ConfirmResult};
pub use orchestrator::Orchestrator;
pub use vrf_provider::{SharedVrfProvider, VrfProvider};
