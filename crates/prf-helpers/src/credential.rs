use base64ct::{Base64UrlUnpadded, Encoding};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::PrfError;

/// Dual PRF output extracted from a WebAuthn credential, base64url-encoded.
///
/// `chacha20_prf_output` seeds VRF-keypair-at-rest encryption; `ed25519_prf_output`
/// seeds the signer's Ed25519 key derivation. Never serialize this type across
/// a host boundary — it is exactly one of the forbidden request/decision fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualPrfOutput {
    pub chacha20_prf_output: String,
    pub ed25519_prf_output: String,
}

/// `prf.results.{first,second}` as delivered by the authenticator, both
/// base64url-encoded by the WebAuthn collector before reaching this core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrfResults {
    #[serde(default)]
    pub first: Option<String>,
    #[serde(default)]
    pub second: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrfExtension {
    #[serde(default)]
    pub results: Option<PrfResults>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientExtensionResults {
    #[serde(default)]
    pub prf: Option<PrfExtension>,
}

/// A structured-clone-safe, cross-boundary-transmissible credential. Binary
/// fields are base64url strings; `transports` defaults to empty when the
/// authenticator/platform omits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedCredential {
    pub id: String,
    pub raw_id: String,
    #[serde(default)]
    pub transports: Vec<String>,
    pub client_extension_results: ClientExtensionResults,
}

/// Normalize a raw authenticator response into the structured-clone-safe shape
/// used across the request/decision envelopes. `transports` defaults to `[]`
/// when the platform does not report it.
pub fn normalize_credential(
    id: String,
    raw_id: String,
    transports: Option<Vec<String>>,
    client_extension_results: ClientExtensionResults,
) -> NormalizedCredential {
    NormalizedCredential {
        id,
        raw_id,
        transports: transports.unwrap_or_default(),
        client_extension_results,
    }
}

/// Extract the dual PRF output from a credential's extension results.
///
/// Fails with [`PrfError::PrfUnsupported`] when the `prf` extension object is
/// absent entirely, and with [`PrfError::PrfMissing`] when `prf.results` is
/// present but both `first` and `second` are absent — a hard failure, since a
/// PRF-capable authenticator always returns at least `first`.
pub fn extract_dual_prf_outputs(
    credential: &NormalizedCredential,
) -> Result<DualPrfOutput, PrfError> {
    let prf = credential
        .client_extension_results
        .prf
        .as_ref()
        .ok_or(PrfError::PrfUnsupported)?;

    let results = prf.results.as_ref().ok_or(PrfError::PrfUnsupported)?;

    match (&results.first, &results.second) {
        (None, None) => Err(PrfError::PrfMissing),
        (first, second) => {
            debug!(
                "extracted PRF outputs (first={}, second={})",
                first.is_some(),
                second.is_some()
            );
            Ok(DualPrfOutput {
                chacha20_prf_output: first.clone().unwrap_or_default(),
                ed25519_prf_output: second.clone().unwrap_or_default(),
            })
        }
    }
}

/// Extract PRF.first alone, for flows (unlock, warm-session mint) that only
/// need the ChaCha20 wrapping key and never touch PRF.second.
pub fn extract_prf_first(credential: &NormalizedCredential) -> Result<String, PrfError> {
    let prf = credential
        .client_extension_results
        .prf
        .as_ref()
        .ok_or(PrfError::PrfUnsupported)?;
    let results = prf.results.as_ref().ok_or(PrfError::PrfUnsupported)?;
    results.first.clone().ok_or(PrfError::PrfMissing)
}

/// Shallow-clone a credential with PRF extension results blanked. Used to
/// sanitize a credential before it leaves the VRF boundary (e.g. into a
/// decision envelope the host thread can see).
pub fn remove_prf_output_guard(credential: &NormalizedCredential) -> NormalizedCredential {
    let mut sanitized = credential.clone();
    sanitized.client_extension_results = ClientExtensionResults { prf: None };
    sanitized
}

/// base64url-encode raw bytes (used by callers constructing synthetic
/// credentials in tests, and by the salt module).
pub fn base64_url_encode(bytes: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred_with_prf(first: Option<&str>, second: Option<&str>) -> NormalizedCredential {
        NormalizedCredential {
            id: "cred-1".into(),
            raw_id: "cred-1".into(),
            transports: vec![],
            client_extension_results: ClientExtensionResults {
                prf: Some(PrfExtension {
                    results: Some(PrfResults {
                        first: first.map(str::to_string),
                        second: second.map(str::to_string),
                    }),
                }),
            },
        }
    }

    #[test]
    fn extracts_dual_prf_when_both_present() {
        let cred = cred_with_prf(Some("aaaa"), Some("bbbb"));
        let out = extract_dual_prf_outputs(&cred).unwrap();
        assert_eq!(out.chacha20_prf_output, "aaaa");
        assert_eq!(out.ed25519_prf_output, "bbbb");
    }

    #[test]
    fn missing_when_both_prf_fields_absent() {
        let cred = cred_with_prf(None, None);
        assert_eq!(extract_dual_prf_outputs(&cred), Err(PrfError::PrfMissing));
    }

    #[test]
    fn unsupported_when_extension_absent() {
        let cred = NormalizedCredential {
            id: "cred-1".into(),
            raw_id: "cred-1".into(),
            transports: vec![],
            client_extension_results: ClientExtensionResults { prf: None },
        };
        assert_eq!(
            extract_dual_prf_outputs(&cred),
            Err(PrfError::PrfUnsupported)
        );
    }

    #[test]
    fn transports_default_to_empty() {
        let cred = normalize_credential(
            "id".into(),
            "raw".into(),
            None,
            ClientExtensionResults::default(),
        );
        assert!(cred.transports.is_empty());
    }

    #[test]
    fn guard_blanks_prf_but_keeps_identity() {
        let cred = cred_with_prf(Some("aaaa"), Some("bbbb"));
        let sanitized = remove_prf_output_guard(&cred);
        assert_eq!(sanitized.id, cred.id);
        assert!(sanitized.client_extension_results.prf.is_none());
    }
}
