use mimalloc::MiMalloc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use vault_probe::config::Config;
use vault_probe::db::sqlite::VaultStorage;
use vault_probe::error::ProbeError;
use vault_probe::locate::Locator;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &vault_probe::config::CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        app_ids = ?cfg.app_ids,
        db_filename = %cfg.db_filename,
        user_id = %cfg.user_id,
        seed_drive_id = %cfg.seed_drive_id.as_deref().unwrap_or("<none>"),
        "vault probe starting"
    );

    let locator = Locator::from_config(cfg);
    let db_path = match locator.resolve()? {
        Some(path) => path,
        None => {
            warn!("database not found in any candidate location");
            for location in locator.searched_locations() {
                warn!(location = %location, "searched");
            }
            return Ok(());
        }
    };
    info!(path = %db_path.display(), "database found");

    // The store is never created here; absence is the locator's verdict.
    let connect_opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(false);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(connect_opts)
        .await?;
    let storage = VaultStorage::new(pool);

    let outcome = run_checks(&storage, cfg).await;

    // Release the connection regardless of how the checks went.
    storage.pool().close().await;

    if let Err(e) = outcome {
        error!(error = %e, "probe failed");
    }
    Ok(())
}

async fn run_checks(storage: &VaultStorage, cfg: &Config) -> Result<(), ProbeError> {
    let report = vault_probe::report::schema_report(storage, cfg.sample_limit).await?;
    let missing = report.missing_tables();
    if missing.is_empty() {
        info!("all expected tables present");
    } else {
        warn!(missing = ?missing, present = ?report.all_tables, "expected tables absent");
    }
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(drive_id) = cfg.seed_drive_id.as_deref() {
        let verdict =
            vault_probe::verify::verify_round_trip(storage, cfg, drive_id, chrono::Utc::now())
                .await;
        if verdict.passed() {
            info!(drive_id, "round-trip verification passed");
        } else {
            warn!(drive_id, "round-trip verification failed");
        }
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    }
    Ok(())
}
