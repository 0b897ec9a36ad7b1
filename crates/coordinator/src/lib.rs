pub mod api;
pub mod config;
pub mod seer;
pub mod store;

use std::sync::Arc;

use crate::config::CoordinatorConfig;
use crate::seer::MortalityModel;
use crate::store::Store;

pub struct AppState {
    pub store: Store,
    pub config: CoordinatorConfig,
    pub seer: MortalityModel,
}

/// In-memory coordinator for tests: no snapshot file, default policies,
/// built-in seer model.
pub fn setup_test_coordinator() -> Arc<AppState> {
    Arc::new(AppState {
        store: Store::in_memory(),
        config: CoordinatorConfig::default(),
        seer: MortalityModel::default(),
    })
}
