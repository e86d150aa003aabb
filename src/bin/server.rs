use log::{error, info, warn};
use std::net::SocketAddr;

use bearer_guard::config::ServerConfig;
use bearer_guard::routes::routes;
use bearer_guard::state::AppState;

#[tokio::main]
async fn main() {
    // Initialize env
    match dotenvy::dotenv() {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    // Initialize logging
    env_logger::init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, access_ttl={}s, refresh_ttl={}s",
        config.host,
        config.port,
        config.access_ttl.as_secs(),
        config.refresh_ttl.as_secs()
    );

    let state = match AppState::from_config(&config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    };

    if config.seed_demo_users {
        info!("Demo accounts: admin / john / guest (password: secret)");
    }

    // Build the server address
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting Bearer Guard server on {}", addr);

    warp::serve(routes(state)).run(addr).await;
}
