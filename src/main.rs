use bricklens::orchestration::{BatchRefreshJob, RefreshPipeline, ValuationTrigger};
use bricklens::provider::{CachingLocalityProvider, HttpLocalityProvider, LocalityPriceProvider};
use bricklens::store::{ChangeHistoryRecorder, ValuationStore};
use bricklens::{api, config::Config, db::init_db, Repository};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    // Initialize database and dependencies
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
    let recorder = ChangeHistoryRecorder::new(repo.clone());
    let store = Arc::new(ValuationStore::new(repo.clone(), recorder.clone()));

    let http_provider = Arc::new(HttpLocalityProvider::new(
        config.locality_api_url.clone(),
        Duration::from_millis(config.provider_timeout_ms),
    ));
    let provider: Arc<dyn LocalityPriceProvider> = Arc::new(CachingLocalityProvider::new(
        http_provider,
        Duration::from_secs(config.price_cache_ttl_secs),
    ));

    let pipeline = Arc::new(RefreshPipeline::new(
        repo.clone(),
        provider,
        store.clone(),
    ));
    let trigger = ValuationTrigger::new(pipeline.clone(), config.trigger_max_concurrency);
    let batch = Arc::new(BatchRefreshJob::new(repo.clone(), pipeline.clone()));

    // Create router
    let app = api::create_router(api::AppState {
        repo,
        store,
        recorder,
        pipeline,
        trigger,
        batch,
        config,
    });

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
