//! Shared helpers for MyDiet Core integration tests.

use std::net::SocketAddr;
use std::path::Path;

use mydiet_core::{AppState, config::Config, server};
use tokio::net::TcpListener;

/// Builds a config pointing at `trainer_url` with its database under `dir`.
pub fn test_config(trainer_url: &str, dir: &Path) -> Config {
    let mut config = Config::default();
    config.server.address = "127.0.0.1:0".parse().unwrap();
    config.trainer.base_url = Some(trainer_url.to_string());
    config.storage.database_path = dir.join("metrics.db");
    config
}

/// Starts the gateway on an ephemeral port and returns its base URL.
///
/// The server runs until the test's runtime shuts down.
pub async fn start_test_server(config: &Config) -> String {
    let state = AppState::from_config(config).expect("Failed to build app state");
    let app = server::router(state, &config.server);
    let listener = TcpListener::bind(config.server.address).await.expect("Failed to bind");
    let addr: SocketAddr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        server::serve(listener, app, std::future::pending()).await.expect("Server failed to run");
    });

    format!("http://{addr}")
}
