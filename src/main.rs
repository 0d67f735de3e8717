use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use voucher_ledger::{
    config::{database, ledger},
    core::{SystemClock, brand},
    errors::Result,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load config.toml, falling back to defaults
    let config = ledger::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    let offset = config.ledger.display_offset()?;
    info!(
        display_offset = %offset,
        max_audit_take = config.ledger.max_audit_take,
        "Configuration loaded"
    );

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    // 5. Seed configured brands that are missing
    let clock = SystemClock;
    for seed in &config.brands {
        if brand::get_brand_by_name(&db, &seed.name).await?.is_none() {
            brand::create_brand(&db, &clock, seed.name.clone()).await?;
            info!(brand = %seed.name, "Seeded brand");
        }
    }

    info!("Voucher ledger ready");
    Ok(())
}
