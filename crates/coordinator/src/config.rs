use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

use mesh_core::quorum::VotePolicy;

/// Runtime configuration, populated from the environment in `main`. The
/// defaults reproduce the historical coordinator behavior exactly.
pub struct CoordinatorConfig {
    pub listen_addr: SocketAddr,
    /// How result outputs are compared during the vote.
    pub vote_policy: VotePolicy,
    /// Verify submissions against the registry's key for the named worker
    /// instead of the key carried by the submission itself.
    pub require_registered_key: bool,
    /// Debit trust on signature-valid submissions that do not complete a
    /// quorum.
    pub minority_penalty: bool,
    pub seer_model_path: PathBuf,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
            vote_policy: VotePolicy::default(),
            require_registered_key: false,
            minority_penalty: true,
            seer_model_path: PathBuf::from("data/seer_model.json"),
        }
    }
}

/// Accepts the bare `:port` form by binding every interface.
pub fn parse_listen_addr(raw: &str) -> Result<SocketAddr, AddrParseError> {
    match raw.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}").parse(),
        None => raw.parse(),
    }
}
