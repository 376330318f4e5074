use actix_web::{web, App, HttpServer};
use clap::Parser;
use heritage_ai::api::{middleware::ApiKeyAuth, routes};
use heritage_ai::cli::{commands::{Cli, Commands}, run_cli};
use heritage_ai::config::AppConfig;
use heritage_ai::gateway::Gateway;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if !matches!(cli.command, Commands::Serve) {
        if let Err(e) = run_cli(cli.command, &cli.config).await {
            error!("{}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    info!("Starting heritage AI gateway...");

    let config = match AppConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if config.auth.api_keys.is_empty() {
        warn!("No API keys configured, every /ai request will be rejected");
    }

    let gateway = match Gateway::from_config(&config) {
        Ok(g) => web::Data::new(g),
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    if !gateway.status().available {
        warn!("Running in degraded mode: AI generation endpoints will return 503");
    }

    let host = config.server.host.clone();
    let port = config.server.port;

    info!("Server listening on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config.clone()))
            .app_data(gateway.clone())
            .service(routes::health)
            .wrap(ApiKeyAuth)
            .configure(routes::configure)
    })
    .bind((host, port))?
    .run()
    .await
}
