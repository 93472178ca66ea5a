//! # Pinboard Binary
//!
//! Assembles a session from compile-time features, loads the user's boards
//! and pins, and optionally runs one search: `pinboard [query]`.

mod settings;

#[cfg(any(feature = "db-sqlite", feature = "storage-local"))]
use std::sync::Arc;

use pb_core::traits::Gateway;
use pb_gateway_memory::MemoryGateway;
use pb_store::{BoardStore, SearchSession};

// Feature-gated imports: each plugin is compiled in only when selected
#[cfg(feature = "db-sqlite")]
use pb_db_sqlite::SqliteGateway;

#[cfg(feature = "storage-local")]
use pb_storage_local::LocalFileStorage;

use settings::Settings;

#[cfg_attr(
    not(any(feature = "db-sqlite", feature = "storage-local")),
    allow(unused_variables)
)]
async fn build_gateway(settings: &Settings) -> anyhow::Result<Gateway> {
    // Anything not compiled in falls back to process memory.
    let gateway = MemoryGateway::new().gateway();

    #[cfg(feature = "db-sqlite")]
    let gateway = {
        let db = Arc::new(SqliteGateway::new(&settings.database_url).await?);
        db.gateway(Arc::clone(&gateway.storage))
    };

    #[cfg(feature = "storage-local")]
    let gateway = Gateway {
        storage: Arc::new(LocalFileStorage::new(
            settings.upload_root.clone(),
            settings.url_prefix.clone(),
        )),
        ..gateway
    };

    Ok(gateway)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::load()?;
    let gateway = build_gateway(&settings).await?;
    let store = BoardStore::new(gateway, settings.session_user(), settings.store_config());

    store.load_user_data().await?;
    for summary in store.boards().await {
        log::info!(
            "board {:?}: {} pins",
            summary.board.name,
            summary.pin_count
        );
    }

    if let Some(query) = std::env::args().nth(1) {
        let mut search = SearchSession::new();
        let results = search.perform_search(&query, &store.snapshot().await);
        println!("{}", serde_json::to_string_pretty(results)?);
    }

    Ok(())
}
