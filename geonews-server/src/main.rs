use std::sync::Arc;

use clap::Parser;
use geonews_core::{GeoNewsConfig, MemoryCache, ResultCache};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use geonews_server::http::{start_http_server, HttpState};
use geonews_server::subsystems::seed::seed_store;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "geonews.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (API keys in development)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match GeoNewsConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    // Open the store
    let pool = match geonews_core::db::create_pool(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to open database {}: {}", config.database.url, e);
            std::process::exit(1);
        }
    };
    geonews_core::db::init_schema(&pool).await?;

    if args.health {
        match geonews_core::db::health_check(&pool).await {
            Ok(v) => println!("✅ SQLite connected: {}", v),
            Err(e) => {
                println!("❌ SQLite connection failed: {}", e);
                std::process::exit(1);
            }
        }
        println!("✅ GeoNews DB health check passed");
        return Ok(());
    }

    seed_store(&pool, &config.seed).await;

    let llm = match geonews_core::create_backend(&config.llm) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::warn!("LLM backend unavailable, using keyword fallbacks: {}", e);
            None
        }
    };
    if llm.is_none() {
        tracing::info!("Running without an LLM backend");
    }

    let cache = match geonews_core::create_cache(&config.cache).await {
        Ok(Some(cache)) => Some(cache),
        Ok(None) => {
            tracing::info!("Trending cache disabled");
            None
        }
        Err(e) => {
            tracing::warn!(url = %config.cache.url, "Redis cache unavailable, using in-process cache: {}", e);
            Some(Arc::new(MemoryCache::new()) as Arc<dyn ResultCache>)
        }
    };

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    tracing::info!(name = %config.service.name, "Starting GeoNews");
    let state = Arc::new(HttpState::new(pool, config, llm, cache));
    start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
