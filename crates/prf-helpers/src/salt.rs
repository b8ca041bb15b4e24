/// Deterministic per-account HKDF salts.
///
/// Domain-separated so the ChaCha20 (VRF-at-rest) and Ed25519 (signing key)
/// derivations never share salt material for the same account, even though
/// both ultimately derive from the same PRF output.
const CHACHA20_SALT_PREFIX: &str = "chacha20-salt:";
const ED25519_SALT_PREFIX: &str = "ed25519-salt:";
const SALT_LEN: usize = 32;

fn fixed_len_salt(prefix: &str, account_id: &str) -> [u8; SALT_LEN] {
    let mut s = String::with_capacity(prefix.len() + account_id.len());
    s.push_str(prefix);
    s.push_str(account_id);
    let bytes = s.as_bytes();

    let mut out = [0u8; SALT_LEN];
    let n = bytes.len().min(SALT_LEN);
    out[..n].copy_from_slice(&bytes[..n]);
    // Right-padded with zero bytes when shorter than SALT_LEN; truncated
    // (not hashed) when longer, matching the spec's "right-padded/truncated
    // to 32 bytes" wording exactly.
    out
}

/// HKDF salt for deriving the ChaCha20-Poly1305 key that wraps the VRF
/// keypair at rest.
pub fn chacha20_salt(account_id: &str) -> [u8; SALT_LEN] {
    fixed_len_salt(CHACHA20_SALT_PREFIX, account_id)
}

/// HKDF salt for deriving Ed25519 signing-key material.
pub fn ed25519_salt(account_id: &str) -> [u8; SALT_LEN] {
    fixed_len_salt(ED25519_SALT_PREFIX, account_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salts_are_deterministic_and_domain_separated() {
        let a = chacha20_salt("alice.near");
        let b = ed25519_salt("alice.near");
        assert_ne!(a, b);
        assert_eq!(a, chacha20_salt("alice.near"));
    }

    #[test]
    fn short_account_ids_are_zero_padded() {
        let salt = chacha20_salt("a");
        assert_eq!(&salt[..CHACHA20_SALT_PREFIX.len() + 1], b"chacha20-salt:a");
        assert_eq!(salt[CHACHA20_SALT_PREFIX.len() + 1], 0);
    }

    #[test]
    fn long_account_ids_are_truncated_to_32_bytes() {
        let long_id = "a".repeat(64);
        let salt = chacha20_salt(&long_id);
        assert_eq!(salt.len(), SALT_LEN);
    }
}
