//! Mapes demo server.
//!
//! Loads configuration, registers a few demo routes plus the configured
//! static mounts, and serves until SIGINT/SIGTERM.

use std::path::PathBuf;

use axum::http::StatusCode;
use clap::Parser;
use serde_json::json;

use mapes::config::{load_config, validate_config, ConfigError, MapesConfig};
use mapes::observability::{init_logging, init_metrics};
use mapes::{from_fn_named, HttpServer, Router};

#[derive(Parser, Debug)]
#[command(name = "mapes")]
#[command(about = "Minimal HTTP router demo server", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Do not print the startup banner.
    #[arg(long)]
    no_banner: bool,
}

fn load(cli: &Cli) -> Result<MapesConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MapesConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    if cli.no_banner {
        config.server.banner = false;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn demo_router(config: &MapesConfig) -> Router {
    let router = Router::new();

    router.get(
        "/",
        |ctx| Box::pin(async move { ctx.string(StatusCode::OK, "Hello world") }),
        &[],
    );
    router.get(
        "/hello/:name/from/:addr",
        |ctx| {
            Box::pin(async move {
                let body = json!({
                    "name": ctx.param("name"),
                    "addr": ctx.param("addr"),
                });
                ctx.json(StatusCode::OK, &body)
            })
        },
        &[],
    );

    let timing = from_fn_named("timing", |ctx, next| {
        Box::pin(async move {
            let start = std::time::Instant::now();
            let result = next.run(ctx).await;
            tracing::debug!(
                path = %ctx.path(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "API request handled"
            );
            result
        })
    });
    let mut api = router.group("/api");
    api.use_middleware(timing);
    api.get(
        "/users/:id",
        |ctx| {
            Box::pin(async move {
                let id = ctx.param("id").unwrap_or_default().to_string();
                ctx.json(StatusCode::OK, &json!({ "id": id }))
            })
        },
        &[],
    );
    api.post(
        "/echo",
        |ctx| {
            Box::pin(async move {
                let body: serde_json::Value = ctx.bind().await?;
                ctx.json(StatusCode::CREATED, &body)
            })
        },
        &[],
    );

    for mount in &config.static_mounts {
        tracing::info!(prefix = %mount.prefix, root = %mount.root, "Static mount registered");
        router.static_files(&mount.prefix, &mount.root, &[]);
    }

    router
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    init_logging(&config.observability);
    tracing::info!("mapes v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        static_mounts = config.static_mounts.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        init_metrics(addr)?;
    }

    let router = demo_router(&config);
    HttpServer::new(config, &router).start().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
