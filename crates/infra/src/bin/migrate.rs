//! Applies the ledger schema to `STOCKPOST_DATABASE_URL`.

use anyhow::{Context, bail};
use tracing::info;

use stockpost_infra::{PgDatabase, StockpostConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockpost_observability::init();

    let config = StockpostConfig::from_env().context("loading configuration")?;
    let Some(url) = config.database_url.as_deref() else {
        bail!("STOCKPOST_DATABASE_URL must be set to run migrations");
    };

    let db = PgDatabase::connect(url).await.context("connecting to postgres")?;
    db.migrate().await.context("applying 0001_ledger.sql")?;

    info!("schema up to date");
    Ok(())
}
