//! Cryptographic operations for endpoint secrets and payload signing.
//!
//! - AES-256-GCM encryption/decryption for endpoint secrets at rest
//! - HMAC payload signatures (SHA-1 / SHA-256 / SHA-512, per endpoint)

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use hookline_db::models::SignatureAlgorithm;

use crate::error::WebhookError;

/// Nonce size for AES-GCM (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;

// ---------------------------------------------------------------------------
// AES-256-GCM encryption/decryption (for secrets at rest)
// ---------------------------------------------------------------------------

/// Encrypt a plaintext secret to a base64-encoded string for storage.
///
/// Format: base64(nonce || ciphertext || auth_tag)
pub fn encrypt_secret(plaintext: &str, key: &[u8]) -> Result<String, WebhookError> {
    if key.len() != 32 {
        return Err(WebhookError::EncryptionFailed(format!(
            "Invalid key length: expected 32 bytes, got {}",
            key.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| WebhookError::EncryptionFailed(e.to_string()))?;

    use rand::rngs::OsRng;
    use rand::RngCore;
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| WebhookError::EncryptionFailed(e.to_string()))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(&result))
}

/// Decrypt a base64-encoded secret back to plaintext.
pub fn decrypt_secret(encoded: &str, key: &[u8]) -> Result<String, WebhookError> {
    if key.len() != 32 {
        return Err(WebhookError::EncryptionFailed(format!(
            "Invalid key length: expected 32 bytes, got {}",
            key.len()
        )));
    }

    let encrypted = BASE64
        .decode(encoded)
        .map_err(|e| WebhookError::EncryptionFailed(format!("Base64 decode failed: {e}")))?;

    if encrypted.len() < NONCE_SIZE + 1 {
        return Err(WebhookError::EncryptionFailed(
            "Invalid encrypted data format".to_string(),
        ));
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| WebhookError::EncryptionFailed(e.to_string()))?;

    let nonce = Nonce::from_slice(&encrypted[..NONCE_SIZE]);
    let ciphertext = &encrypted[NONCE_SIZE..];

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| WebhookError::EncryptionFailed(e.to_string()))?;

    String::from_utf8(plaintext).map_err(|e| WebhookError::EncryptionFailed(e.to_string()))
}

// ---------------------------------------------------------------------------
// HMAC payload signing
// ---------------------------------------------------------------------------

fn hmac_hex<D>(secret: &str, body: &[u8]) -> String
where
    D: Mac + KeyInit,
{
    let mut mac =
        <D as Mac>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Compute the hex HMAC digest of an outbound body with the endpoint's
/// configured algorithm.
///
/// The digest covers the exact body bytes sent over the wire;
/// `serde_json` serializes object keys in sorted order, so the body is
/// already a canonical serialization.
#[must_use]
pub fn compute_signature(algorithm: SignatureAlgorithm, secret: &str, body: &[u8]) -> String {
    match algorithm {
        SignatureAlgorithm::Sha1 => hmac_hex::<Hmac<Sha1>>(secret, body),
        SignatureAlgorithm::Sha256 => hmac_hex::<Hmac<Sha256>>(secret, body),
        SignatureAlgorithm::Sha512 => hmac_hex::<Hmac<Sha512>>(secret, body),
    }
}

/// Build the `X-Webhook-Signature` header value: `"<algo>=<hex>"`.
#[must_use]
pub fn signature_header(algorithm: SignatureAlgorithm, secret: &str, body: &[u8]) -> String {
    format!("{algorithm}={}", compute_signature(algorithm, secret, body))
}

/// Verify a `"<algo>=<hex>"` signature header against a body, using
/// constant-time comparison. Unknown algorithm prefixes fail.
#[must_use]
pub fn verify_signature_header(header: &str, secret: &str, body: &[u8]) -> bool {
    let Some((algo, hex_digest)) = header.split_once('=') else {
        return false;
    };
    let Ok(algorithm) = algo.parse::<SignatureAlgorithm>() else {
        return false;
    };
    let computed = compute_signature(algorithm, secret, body);
    constant_time_eq(hex_digest.as_bytes(), computed.as_bytes())
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; 32] {
        [0x42u8; 32]
    }

    // --- AES-GCM tests ---

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key();
        let plaintext = "whsec_billing_endpoint_12345";

        let encrypted = encrypt_secret(plaintext, &key).expect("encryption failed");
        let decrypted = decrypt_secret(&encrypted, &key).expect("decryption failed");

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_different_encryptions_produce_different_ciphertext() {
        let key = test_key();
        let enc1 = encrypt_secret("same-secret", &key).expect("encryption failed");
        let enc2 = encrypt_secret("same-secret", &key).expect("encryption failed");

        // Random nonce makes ciphertexts differ
        assert_ne!(enc1, enc2);
        assert_eq!(
            decrypt_secret(&enc1, &key).unwrap(),
            decrypt_secret(&enc2, &key).unwrap()
        );
    }

    #[test]
    fn test_invalid_key_length() {
        let short_key = [0u8; 16];
        let result = encrypt_secret("test", &short_key);
        assert!(result.is_err());
    }

    #[test]
    fn test_decrypt_with_wrong_key() {
        let encrypted = encrypt_secret("secret", &[0x42u8; 32]).expect("encryption failed");
        assert!(decrypt_secret(&encrypted, &[0x43u8; 32]).is_err());
    }

    #[test]
    fn test_decrypt_invalid_base64() {
        assert!(decrypt_secret("not-valid-base64!!!", &test_key()).is_err());
    }

    // --- HMAC tests ---

    #[test]
    fn test_signature_deterministic() {
        let sig1 = compute_signature(SignatureAlgorithm::Sha256, "secret", b"payload");
        let sig2 = compute_signature(SignatureAlgorithm::Sha256, "secret", b"payload");
        assert_eq!(sig1, sig2);
    }

    #[test]
    fn test_signature_changes_with_secret_and_body() {
        let base = compute_signature(SignatureAlgorithm::Sha256, "secret", b"payload");
        assert_ne!(
            base,
            compute_signature(SignatureAlgorithm::Sha256, "other", b"payload")
        );
        assert_ne!(
            base,
            compute_signature(SignatureAlgorithm::Sha256, "secret", b"payload2")
        );
    }

    #[test]
    fn test_digest_lengths_per_algorithm() {
        // SHA-1 = 20 bytes, SHA-256 = 32, SHA-512 = 64; hex doubles
        assert_eq!(
            compute_signature(SignatureAlgorithm::Sha1, "s", b"b").len(),
            40
        );
        assert_eq!(
            compute_signature(SignatureAlgorithm::Sha256, "s", b"b").len(),
            64
        );
        assert_eq!(
            compute_signature(SignatureAlgorithm::Sha512, "s", b"b").len(),
            128
        );
    }

    #[test]
    fn test_header_format() {
        let header = signature_header(SignatureAlgorithm::Sha256, "secret", b"body");
        assert!(header.starts_with("sha256="));
        assert!(header[7..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_verify_header_roundtrip() {
        for algorithm in [
            SignatureAlgorithm::Sha1,
            SignatureAlgorithm::Sha256,
            SignatureAlgorithm::Sha512,
        ] {
            let header = signature_header(algorithm, "secret", b"body");
            assert!(verify_signature_header(&header, "secret", b"body"));
            assert!(!verify_signature_header(&header, "wrong", b"body"));
            assert!(!verify_signature_header(&header, "secret", b"tampered"));
        }
    }

    #[test]
    fn test_verify_rejects_malformed_header() {
        assert!(!verify_signature_header("no-equals-sign", "secret", b"body"));
        assert!(!verify_signature_header("md5=abcdef", "secret", b"body"));
    }
}
