pub mod config;
pub mod routes;

use anyhow::Result;
use config::ServerConfig;
use rootfind_core::persistence::{CalculationStore, JsonLinesStore, MemoryStore};
use routes::{routes, AppState};
use std::sync::Arc;

/// Runs the HTTP API until the process is stopped.
///
/// # Example
/// ```no_run
/// use rootfind_server::{config::ServerConfig, run_server};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     run_server(ServerConfig::from_env()?).await
/// }
/// ```
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let store: Arc<dyn CalculationStore> = match &config.store_path {
        Some(path) => {
            println!("Saving calculations to {}", path.display());
            Arc::new(JsonLinesStore::new(path))
        }
        None => {
            let store = MemoryStore::new();
            println!(
                "ROOTFIND_STORE not set; keeping the last {} calculations in memory",
                store.limit()
            );
            Arc::new(store)
        }
    };
    let state = AppState {
        store,
        max_iterations: config.max_iterations,
    };

    let address = config.address();
    println!("Server running on http://{address}");
    warp::serve(routes(state)).run(address).await;
    Ok(())
}
