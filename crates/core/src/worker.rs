use serde::{Deserialize, Serialize};

use crate::ids::WorkerId;

/// Trust granted to a worker on first registration.
pub const INITIAL_TRUST: i64 = 10;

/// Registry row for a worker. Re-registration replaces the key and the
/// capability set but never the accumulated trust or token balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerProfile {
    pub id: WorkerId,
    /// Base64-encoded Ed25519 public key, stored verbatim as registered.
    pub pub_key: String,
    pub capabilities: Vec<String>,
    pub trust: i64,
    pub token: u64,
}

impl WorkerProfile {
    pub fn new(id: WorkerId, pub_key: String, capabilities: Vec<String>) -> Self {
        Self {
            id,
            pub_key,
            capabilities,
            trust: INITIAL_TRUST,
            token: 0,
        }
    }
}
