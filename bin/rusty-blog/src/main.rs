//! # Rusty-Blog Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use rb_api::{configure_routes, middleware, AppState};
use rb_config::{LoggingSettings, Settings};
use rb_core::service::BlogService;
use rb_core::traits::{BlogRepo, FeedCache, NoopFeedCache};
use secrecy::ExposeSecret;
use tracing_subscriber::EnvFilter;

// Storage and cache backends are chosen by cargo feature
#[cfg(feature = "db-sqlite")]
use rb_db_sqlite::SqliteBlogRepo;

#[cfg(feature = "cache-memory")]
use rb_cache_memory::MemoryFeedCache;

fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(feature = "db-sqlite")]
async fn build_repo(settings: &Settings) -> anyhow::Result<Arc<dyn BlogRepo>> {
    let repo = SqliteBlogRepo::connect(
        settings.database.url.expose_secret(),
        settings.database.max_connections,
    )
    .await?;
    Ok(Arc::new(repo))
}

#[cfg(not(feature = "db-sqlite"))]
async fn build_repo(_settings: &Settings) -> anyhow::Result<Arc<dyn BlogRepo>> {
    anyhow::bail!("no storage backend compiled in; enable the `db-sqlite` feature")
}

#[cfg(feature = "cache-memory")]
fn build_cache(settings: &Settings) -> Arc<dyn FeedCache> {
    if !settings.cache.enabled {
        return Arc::new(NoopFeedCache);
    }
    Arc::new(MemoryFeedCache::new(settings.cache.ttl))
}

#[cfg(not(feature = "cache-memory"))]
fn build_cache(settings: &Settings) -> Arc<dyn FeedCache> {
    if settings.cache.enabled {
        tracing::warn!("feed cache enabled but no cache backend compiled in");
    }
    Arc::new(NoopFeedCache)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config_file = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = rb_config::load(config_file.as_deref())?;
    init_tracing(&settings.logging);

    // 1. Initialize Database Implementation
    let repo = build_repo(&settings).await?;

    // 2. Initialize the global feed cache; it lives exactly as long as the process
    let cache = build_cache(&settings);

    // 3. Wrap in AppState
    let state = web::Data::new(AppState {
        blog: BlogService::new(repo, cache),
        identity_header: settings.auth.identity_header.clone(),
        login_url: settings.auth.login_url.clone(),
    });

    let (host, port) = settings.bind_addr();
    tracing::info!(%host, port, "🚀 Rusty-Blog starting");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::normalize_path())
            .wrap(middleware::cors_policy())
            .wrap(middleware::standard_middleware())
            .configure(configure_routes)
    })
    .bind((host, port))?
    .run()
    .await?;

    tracing::info!("Rusty-Blog stopped");
    Ok(())
}
