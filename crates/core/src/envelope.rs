use ed25519_dalek::{Signature, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use serde::{Serialize, Serializer};

/// The canonical byte layout a worker signs: the JSON object
/// `{"id":..,"worker":..,"output":..}` with keys in exactly that order and
/// no extraneous whitespace. Whole-number outputs render without a decimal
/// point, as the default JSON formatters of the worker clients emit them.
/// The layout is part of the wire contract; reordering keys or changing
/// the numeric formatting breaks verification.
#[derive(Serialize)]
struct SignedPayload<'a> {
    id: &'a str,
    worker: &'a str,
    #[serde(serialize_with = "compact_float")]
    output: f64,
}

/// Integral values up to 2^53 are exact in a double and serialize as bare
/// integers; everything else keeps the shortest float form.
fn compact_float<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

pub fn signable_bytes(task_id: &str, worker_id: &str, output: f64) -> Vec<u8> {
    let payload = SignedPayload {
        id: task_id,
        worker: worker_id,
        output,
    };
    serde_json::to_vec(&payload).expect("signable_bytes: json encoding failed")
}

/// Detached verification. False when the key is not exactly 32 bytes, the
/// signature is not exactly 64 bytes, or the Ed25519 equation fails.
pub fn verify(pub_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Ok(key_bytes) = <&[u8; PUBLIC_KEY_LENGTH]>::try_from(pub_key) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(key_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = <&[u8; SIGNATURE_LENGTH]>::try_from(signature) else {
        return false;
    };
    let sig = Signature::from_bytes(sig_bytes);
    key.verify(message, &sig).is_ok()
}
