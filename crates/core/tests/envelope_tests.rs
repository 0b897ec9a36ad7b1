use ed25519_dalek::{Signer, SigningKey};
use mesh_core::envelope;

fn test_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

#[test]
fn canonical_bytes_match_golden_vector() {
    // Whole-number outputs render as bare integers, the way the worker
    // clients' default JSON formatters emit them.
    let bytes = envelope::signable_bytes("tsk123", "worker-a", 4.0);
    assert_eq!(bytes, br#"{"id":"tsk123","worker":"worker-a","output":4}"#);

    let negative = envelope::signable_bytes("tsk123", "worker-a", -16.0);
    assert_eq!(negative, br#"{"id":"tsk123","worker":"worker-a","output":-16}"#);
}

#[test]
fn fractional_outputs_keep_the_decimal_point() {
    let bytes = envelope::signable_bytes("tsk123", "worker-a", 4.5);
    assert_eq!(bytes, br#"{"id":"tsk123","worker":"worker-a","output":4.5}"#);

    let long = envelope::signable_bytes("t", "w", 0.30000000000000004);
    assert_eq!(long, br#"{"id":"t","worker":"w","output":0.30000000000000004}"#);
}

#[test]
fn canonical_bytes_are_stable_for_equal_inputs() {
    let a = envelope::signable_bytes("t", "w", 0.1);
    let b = envelope::signable_bytes("t", "w", 0.1);
    assert_eq!(a, b);
}

#[test]
fn signed_envelope_verifies() {
    let key = test_key(7);
    let message = envelope::signable_bytes("t1", "w1", 9.0);
    let signature = key.sign(&message).to_bytes();
    assert!(envelope::verify(
        key.verifying_key().as_bytes(),
        &message,
        &signature
    ));
}

#[test]
fn tampered_message_fails() {
    let key = test_key(7);
    let message = envelope::signable_bytes("t1", "w1", 9.0);
    let signature = key.sign(&message).to_bytes();
    let other = envelope::signable_bytes("t1", "w1", 10.0);
    assert!(!envelope::verify(
        key.verifying_key().as_bytes(),
        &other,
        &signature
    ));
}

#[test]
fn wrong_key_fails() {
    let signer = test_key(7);
    let imposter = test_key(8);
    let message = envelope::signable_bytes("t1", "w1", 9.0);
    let signature = signer.sign(&message).to_bytes();
    assert!(!envelope::verify(
        imposter.verifying_key().as_bytes(),
        &message,
        &signature
    ));
}

#[test]
fn wrong_length_key_or_signature_fails() {
    let key = test_key(3);
    let message = envelope::signable_bytes("t", "w", 1.0);
    let signature = key.sign(&message).to_bytes();

    assert!(!envelope::verify(&[0u8; 31], &message, &signature));
    assert!(!envelope::verify(&[0u8; 33], &message, &signature));
    assert!(!envelope::verify(
        key.verifying_key().as_bytes(),
        &message,
        &signature[..63]
    ));
    assert!(!envelope::verify(
        key.verifying_key().as_bytes(),
        &message,
        &[]
    ));
}
