//! Login assertion signature tests.
//!
//! Verifies the HMAC-SHA256 scheme shared with the identity gateway: a hex
//! signature over `"{openId}.{timestamp}"` that the login endpoint
//! recomputes and compares before trusting the asserted identity.

use folio_api::auth::verify_assertion;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute a signature the same way the identity gateway does.
fn sign(secret: &str, open_id: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", open_id, timestamp).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[test]
fn test_signature_format() {
    let sig = sign("my-secret", "user-abc", 1_724_371_200);

    // Hex portion must be 64 characters (256 bits = 32 bytes = 64 hex chars)
    assert_eq!(sig.len(), 64);
    assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_signature_deterministic() {
    let secret = "test-secret";
    let open_id = "user-abc";
    let timestamp = 1_724_371_200;

    // Same input, same output
    let sig1 = sign(secret, open_id, timestamp);
    let sig2 = sign(secret, open_id, timestamp);
    assert_eq!(sig1, sig2);

    // Different identity, different signature
    let sig3 = sign(secret, "user-xyz", timestamp);
    assert_ne!(sig1, sig3);

    // Different timestamp, different signature
    let sig4 = sign(secret, open_id, timestamp + 1);
    assert_ne!(sig1, sig4);

    // Different secret, different signature
    let sig5 = sign("other-secret", open_id, timestamp);
    assert_ne!(sig1, sig5);
}

#[test]
fn test_verify_assertion_accepts_gateway_signature() {
    let secret = "test-secret";
    let open_id = "user-abc";
    let timestamp = 1_724_371_200;

    let sig = sign(secret, open_id, timestamp);
    assert!(verify_assertion(secret, open_id, timestamp, &sig));
}

#[test]
fn test_verify_assertion_rejects_tampering() {
    let secret = "test-secret";
    let open_id = "user-abc";
    let timestamp = 1_724_371_200;
    let sig = sign(secret, open_id, timestamp);

    // Signed for a different user
    assert!(!verify_assertion(secret, "user-xyz", timestamp, &sig));

    // Replayed with a shifted timestamp
    assert!(!verify_assertion(secret, open_id, timestamp + 60, &sig));

    // Verified under the wrong secret
    assert!(!verify_assertion("other-secret", open_id, timestamp, &sig));
}

#[test]
fn test_verify_assertion_rejects_malformed_signatures() {
    let secret = "test-secret";
    let open_id = "user-abc";
    let timestamp = 1_724_371_200;
    let sig = sign(secret, open_id, timestamp);

    // Truncated hex
    assert!(!verify_assertion(secret, open_id, timestamp, &sig[..32]));

    // Not hex at all
    assert!(!verify_assertion(secret, open_id, timestamp, "not-a-signature"));

    // Empty
    assert!(!verify_assertion(secret, open_id, timestamp, ""));
}

#[test]
fn test_verify_assertion_accepts_uppercase_hex() {
    // Gateways that hex-encode in uppercase still verify
    let secret = "test-secret";
    let open_id = "user-abc";
    let timestamp = 1_724_371_200;

    let sig = sign(secret, open_id, timestamp).to_uppercase();
    assert!(verify_assertion(secret, open_id, timestamp, &sig));
}
