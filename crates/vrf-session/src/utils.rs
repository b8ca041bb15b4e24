use crate::error::VrfSessionError;
use base64ct::{Base64UrlUnpadded, Encoding};
use getrandom::getrandom;

pub fn base64_url_encode(bytes: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(bytes)
}

pub fn base64_url_decode(s: &str) -> Result<Vec<u8>, String> {
    Base64UrlUnpadded::decode_vec(s).map_err(|e| format!("base64 decode error: {}", e))
}

/// Random 32-byte salt for wrapping a `WrapKeySeed` into a KEK when the
/// caller didn't supply one already.
pub fn generate_wrap_key_salt_b64u() -> Result<String, String> {
    let mut bytes = [0u8; 32];
    getrandom(&mut bytes).map_err(|e| format!("failed to generate wrapKeySalt: {}", e))?;
    Ok(base64_url_encode(&bytes))
}

pub fn parse_block_height(block_height: &str) -> Result<u64, VrfSessionError> {
    block_height
        .parse()
        .map_err(|_| VrfSessionError::InvalidBlockHeight(block_height.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_round_trips() {
        let data = b"hello world";
        let encoded = base64_url_encode(data);
        assert_eq!(base64_url_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn parse_block_height_rejects_non_numeric() {
        assert!(parse_block_height("not-a-number").is_err());
    }

    #[test]
    fn parse_block_height_accepts_numeric() {
        assert_eq!(parse_block_height("12345").unwrap(), 12345);
    }

    #[test]
    fn wrap_key_salt_is_32_bytes() {
        let salt = generate_wrap_key_salt_b64u().unwrap();
        let bytes = base64_url_decode(&salt).unwrap();
        assert_eq!(bytes.len(), 32);
    }
}
