use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use ibdash_core::{
    dashboard::{DashboardService, DashboardServiceTrait},
    refresh::{RefreshStores, RefreshSupervisor, TerminalFactory},
    status::StatusReporter,
    watchlist::{AddSymbolOutcome, WatchlistService},
};
use ibdash_storage_sqlite::{
    db, CacheRepository, PriceRepository, StatusRepository, WatchlistRepository,
};
use ibdash_terminal::{IbTerminalClient, TerminalClient};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub dashboard_service: Arc<dyn DashboardServiceTrait>,
    /// Live status of the refresh loop in this process.
    pub status_reporter: Arc<StatusReporter>,
    pub refresh_stores: RefreshStores,
    pub db_path: String,
    pub stale_after: Duration,
}

pub fn init_tracing() {
    let log_format = std::env::var("IBDASH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone());

    let watchlist_repository = Arc::new(WatchlistRepository::new(pool.clone(), writer.clone()));
    let price_repository = Arc::new(PriceRepository::new(pool.clone(), writer.clone()));
    let cache_repository = Arc::new(CacheRepository::new(pool.clone(), writer.clone()));
    let status_repository = Arc::new(StatusRepository::new(pool.clone(), writer.clone()));

    let watchlist_service = Arc::new(WatchlistService::new(watchlist_repository.clone()));
    let dashboard_service: Arc<dyn DashboardServiceTrait> = Arc::new(DashboardService::new(
        watchlist_service,
        cache_repository.clone(),
        status_repository.clone(),
    ));
    let status_reporter = Arc::new(StatusReporter::new(status_repository));

    seed_watchlist(dashboard_service.as_ref(), &config.seed_symbols).await;

    Ok(Arc::new(AppState {
        dashboard_service,
        status_reporter,
        refresh_stores: RefreshStores {
            watchlist: watchlist_repository,
            prices: price_repository,
            caches: cache_repository,
        },
        db_path,
        stale_after: config.stale_after,
    }))
}

/// Adds the configured seed symbols. Symbols already present are left alone.
async fn seed_watchlist(dashboard_service: &dyn DashboardServiceTrait, symbols: &[String]) {
    for symbol in symbols {
        match dashboard_service.add_symbol(symbol, None).await {
            Ok(AddSymbolOutcome::Added) => tracing::info!("Seeded watchlist with {}", symbol),
            Ok(AddSymbolOutcome::AlreadyPresent) => {}
            Err(e) => tracing::warn!("Skipping seed symbol '{}': {}", symbol, e),
        }
    }
}

/// Wires the refresh supervisor to the store and a terminal client factory.
pub fn build_supervisor(state: &AppState, config: &Config) -> RefreshSupervisor {
    let settings = config.client_settings();
    let terminal_factory: TerminalFactory = Arc::new(move || {
        Box::new(IbTerminalClient::new(settings.clone())) as Box<dyn TerminalClient>
    });

    RefreshSupervisor::new(
        config.supervisor_config(),
        config.refresh_config(),
        state.refresh_stores.clone(),
        state.status_reporter.clone(),
        terminal_factory,
    )
}
