use anyhow::Context;
use docfill_server::storage::Storage;
use docfill_server::{app, db, AppConfig, AppState};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docfill_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let storage = Storage::new(&config.storage_root);
    storage
        .init()
        .with_context(|| format!("cannot create storage at {}", config.storage_root.display()))?;

    let pool = db::init_pool(&config.database_path)
        .with_context(|| format!("cannot open database {}", config.database_path.display()))?;
    db::run_migrations(&pool).context("database migration failed")?;

    match &config.ghostscript {
        Some(gs) => info!("PDF repair enabled with {}", gs.program().display()),
        None => info!("PDF repair disabled (DOCFILL_GHOSTSCRIPT not set)"),
    }
    match &config.erp {
        Some(erp) => info!("ERPNext at {}", erp.base_url),
        None => info!("ERPNext not configured, serving demo data"),
    }

    let bind = config.bind;
    let state = AppState::new(pool, storage, config).context("cannot build application state")?;
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("cannot bind {bind}"))?;

    info!("docfill listening on http://{bind}");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
