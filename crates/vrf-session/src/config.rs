//! Configuration constants for the VRF session manager.
//!
//! Centralized here, as in the teacher's `wasm_vrf_worker::config`, so a
//! domain separator or HKDF info string only needs to change in one place.

/// Log level recommended for this crate's `env_logger` init in binaries that
/// embed it directly (library consumers are free to configure their own).
pub const CURRENT_LOG_LEVEL: log::Level = log::Level::Info;

// === CRYPTOGRAPHIC CONSTANTS ===

/// Domain separator mixed into every VRF challenge input, so VRF outputs
/// from this core can never be replayed against an unrelated protocol.
pub const VRF_DOMAIN_SEPARATOR: &[u8] = b"secure_confirm_vrf_session_v1";

/// HKDF info for deriving the ChaCha20 key that wraps a VRF keypair at rest,
/// from PRF.first.
pub const HKDF_CHACHA20_KEY_INFO: &[u8] = b"vrf-chacha20-key";

/// HKDF info for deterministically deriving a VRF secret key from PRF output
/// during registration/recovery.
pub const HKDF_VRF_KEYPAIR_INFO: &[u8] = b"secure-confirm:v1:vrf-sk";

/// HKDF info for deriving `K_pass_auth` from PRF.first during session
/// minting.
pub const VRF_WRAP_PASS_INFO: &[u8] = b"vrf-wrap-pass";

/// HKDF info for deriving the final `WrapKeySeed` from `K_pass_auth || vrf_sk`.
pub const NEAR_WRAP_SEED_INFO: &[u8] = b"near-wrap-seed";

// === ENCRYPTION PARAMETERS ===

pub const CHACHA20_KEY_SIZE: usize = 32;
pub const CHACHA20_NONCE_SIZE: usize = 12;
pub const VRF_SEED_SIZE: usize = 32;
pub const WRAP_KEY_SEED_SIZE: usize = 32;

/// HKDF info for deriving the AEAD key that wraps a Shamir-3-pass KEK.
pub const SHAMIR_AEAD_HKDF_INFO: &[u8] = b"secure-confirm-shamir3pass-kek-to-aead-key-v1";

// === SHAMIR 3-PASS CONFIGURATION ===

pub const SHAMIR_MIN_PRIME_BITS: usize = 256;
pub const SHAMIR_REJECTION_SAMPLING_MAX_ATTEMPTS: u32 = 10;
pub const SHAMIR_RANDOM_BYTES_OVERHEAD: usize = 64;
pub const DEFAULT_SHAMIR_P_B64U: &str = "3N5w46AIGjGT2v5Vua_TMD5Ywfa9U2F7-WzW8SNDsIM";

// === VRF SESSION DEFAULTS ===
//
// Resolves the open question in `spec.md` §9(1): TTL and remaining-uses
// defaults are policy, not protocol, so they are plain `pub const`s a host
// can override per call via `VrfSessionPolicy`.

/// Default signing-session TTL: how long a minted WrapKeySeed session may be
/// reused without a fresh WebAuthn ceremony.
pub const VRF_SESSION_DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;

/// Default maximum number of dispenses ("uses") per minted session.
pub const VRF_SESSION_DEFAULT_MAX_USES: u32 = 5;

pub const DISPLAY_TRUNCATE_LENGTH: usize = 20;
