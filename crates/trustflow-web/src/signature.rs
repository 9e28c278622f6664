//! GitHub-style HMAC verification (spec.md §6.6).
//!
//! Grounded on `crypto/hmac.go`'s `VerifyGitHubSignature`: the header
//! carries `"sha256=" + hex(hmac_sha256(secret, body))`; comparison must
//! be constant-time. `hmac::Mac::verify_slice` provides that directly
//! instead of the teacher's manual `hmac.Equal` over the full prefixed
//! string.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SIG_PREFIX: &str = "sha256=";

/// Checks `header_val` (the raw `X-Hub-Signature-256` header) against
/// `hmac_sha256(secret, body)`.
pub fn verify_github_signature(secret: &[u8], body: &[u8], header_val: &str) -> bool {
    let Some(hex_sig) = header_val.strip_prefix(SIG_PREFIX) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&sig_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::Mac;

    fn sign(secret: &[u8], body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_a_correctly_signed_body() {
        let header = sign(b"secret", b"payload");
        assert!(verify_github_signature(b"secret", b"payload", &header));
    }

    #[test]
    fn rejects_a_tampered_body() {
        let header = sign(b"secret", b"payload");
        assert!(!verify_github_signature(b"secret", b"tampered", &header));
    }

    #[test]
    fn rejects_a_missing_prefix() {
        assert!(!verify_github_signature(b"secret", b"payload", "deadbeef"));
    }

    #[test]
    fn rejects_non_hex_signature() {
        assert!(!verify_github_signature(b"secret", b"payload", "sha256=not-hex"));
    }
}
