use std::sync::Arc;

use coordinator::api;
use coordinator::config::{parse_listen_addr, CoordinatorConfig};
use coordinator::seer::MortalityModel;
use coordinator::store::{self, Store};
use coordinator::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("coordinator=info")),
        )
        .init();

    let listen_addr = parse_listen_addr(
        &std::env::var("COORDINATOR_ADDR").unwrap_or_else(|_| ":8081".to_string()),
    )?;

    let defaults = CoordinatorConfig::default();
    let config = CoordinatorConfig {
        listen_addr,
        vote_policy: mesh_core::quorum::VotePolicy {
            decimals: std::env::var("VOTE_DECIMALS")
                .ok()
                .and_then(|raw| raw.parse().ok()),
        },
        require_registered_key: env_flag("REQUIRE_REGISTERED_KEY", defaults.require_registered_key),
        minority_penalty: env_flag("MINORITY_PENALTY", defaults.minority_penalty),
        seer_model_path: std::env::var("SEER_MODEL_PATH")
            .map(Into::into)
            .unwrap_or(defaults.seer_model_path),
    };

    let seer = MortalityModel::load(&config.seer_model_path);
    let store = Store::open(store::snapshot_path());

    let state = Arc::new(AppState {
        store,
        config,
        seer,
    });

    let app = api::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.config.listen_addr).await?;
    tracing::info!(addr = %state.config.listen_addr, "coordinator listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => value == "1" || value.eq_ignore_ascii_case("true"),
        Err(_) => default,
    }
}
