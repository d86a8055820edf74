use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, web, App, HttpServer};
use stacks_gate::StacksApiClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gate_server::{
    config::ServerConfig, cors::build_cors, metrics::register_metrics, routes, state::AppState,
    HttpGenerator,
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    let port = config.port;
    let allowed_origins = config.allowed_origins.clone();
    let rate_limit_rpm = config.rate_limit_rpm;

    tracing::info!("Starting stacks-gate on port {}", port);
    tracing::info!(
        "Testnet contract: {} via {}",
        config.gate.testnet.contract.identifier(),
        config.gate.testnet.api_url
    );
    tracing::info!(
        "Mainnet contract: {} via {}",
        config.gate.mainnet.contract.identifier(),
        config.gate.mainnet.api_url
    );
    tracing::info!("Resource generator: {}", config.generator_url);

    register_metrics();

    let state = match AppState::from_config(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize upstream clients: {}", e);
            std::process::exit(1);
        }
    };
    let state_data = web::Data::new(state);

    let governor_conf = match GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm)
        .finish()
    {
        Some(conf) => conf,
        None => {
            tracing::error!("Invalid rate limit: {} requests per minute", rate_limit_rpm);
            std::process::exit(1);
        }
    };

    HttpServer::new(move || {
        App::new()
            .app_data(state_data.clone())
            .wrap(Logger::default())
            .wrap(build_cors(&allowed_origins))
            .wrap(Governor::new(&governor_conf))
            .configure(routes::configure::<StacksApiClient, HttpGenerator>)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
