//! Access-token minting

use rand::rngs::OsRng;
use rand::RngCore;

use toolgate_core::GatewayError;

/// Mint a fresh 16-byte hex access token.
///
/// Returns an error when the OS entropy source fails; callers decide how
/// fatal that is (create treats it as fatal, import logs and continues).
pub fn mint_access_token() -> Result<String, GatewayError> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| GatewayError::internal(format!("token generation failed: {}", e)))?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape_and_uniqueness() {
        let a = mint_access_token().unwrap();
        let b = mint_access_token().unwrap();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
