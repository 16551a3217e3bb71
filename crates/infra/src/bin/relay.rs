//! Relays committed outbox notifications to Redis pub/sub.
//!
//! Reads the same `STOCKPOST_*` variables as the write path and polls the
//! outbox until the process is stopped.

use std::time::Duration;

use anyhow::{Context, bail};
use tracing::{info, warn};

use stockpost_infra::event_bus::RedisPubSubEventBus;
use stockpost_infra::{OutboxRelay, PgDatabase, StockpostConfig};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockpost_observability::init();

    let config = StockpostConfig::from_env().context("loading configuration")?;
    let Some(url) = config.database_url.as_deref() else {
        bail!("STOCKPOST_DATABASE_URL must be set to relay the outbox");
    };
    let Some(bus) = RedisPubSubEventBus::from_config(&config).context("opening redis client")?
    else {
        bail!("STOCKPOST_REDIS_URL must be set to relay the outbox");
    };

    let db = PgDatabase::connect(url).await.context("connecting to postgres")?;
    let relay = OutboxRelay::new(bus, config.outbox_batch);
    info!(channel = relay.bus().channel(), batch = config.outbox_batch, "outbox relay started");

    loop {
        match relay.flush(&db).await {
            Ok(0) => {}
            Ok(delivered) => info!(delivered, "notifications relayed"),
            Err(err) => warn!(error = %err, "outbox relay failed; retrying"),
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
