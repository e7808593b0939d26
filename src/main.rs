//! Harmonia - music streaming catalog server with AI playlist generation

#![allow(dead_code)]

mod api;
mod config;
mod core;
mod db;
mod models;
mod plugins;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Harmonia - music catalog server
#[derive(Parser, Debug)]
#[command(name = "harmonia")]
#[command(version = "0.3.0")]
#[command(about = "Music streaming catalog server with AI playlist generation")]
struct Args {
    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 2770)]
    port: u16,

    /// Enable debug mode
    #[arg(long)]
    debug: bool,

    /// Path to config directory
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::new(format!("{},sqlx=warn", log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    info!("Harmonia v0.3.0 starting...");

    let paths = config::Paths::init(args.config)?;
    info!("Config directory: {:?}", paths.config_dir());

    run_server(args.host, args.port).await
}

async fn run_server(host: String, port: u16) -> Result<()> {
    // Load settings so a fresh install writes its defaults to disk
    let config = config::ServerConfig::global();
    {
        let cfg = config.read();
        if cfg.resolve_api_key().is_none() {
            tracing::warn!(
                "No Gemini API key configured. \
                 Set geminiApiKey in settings.json or the GEMINI_API_KEY env var; \
                 AI playlist generation will return 503 until then."
            );
        }
        if cfg.server_id.is_empty() {
            drop(cfg);
            let mut cfg = config.write();
            cfg.server_id = uuid::Uuid::new_v4().to_string();
            cfg.save()?;
        }
    }

    // Setup database
    info!("Setting up database...");
    db::setup_sqlite().await?;
    db::run_migrations().await?;

    // Start the server
    let addr = format!("{}:{}", host, port);
    info!("Server listening on http://{}", addr);

    use actix_cors::Cors;
    use actix_web::{middleware, App, HttpServer};

    HttpServer::new(|| {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(api::configure)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
