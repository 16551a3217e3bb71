//! Redis pub/sub bus for notification envelopes.
//!
//! Pub/sub drops messages while no subscriber is connected. The outbox only
//! marks a message delivered once `PUBLISH` succeeded, so durability ends at
//! Redis; subscribers that need every message should read the outbox table.

use std::sync::mpsc;
use std::thread;

use redis::Commands;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, warn};

use stockpost_events::{EventBus, NotificationEnvelope, Subscription};

use crate::config::StockpostConfig;

#[derive(Debug, Error)]
pub enum RedisBusError {
    #[error("redis: {0}")]
    Redis(String),
    #[error("serialize: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone)]
pub struct RedisPubSubEventBus {
    client: redis::Client,
    channel: String,
}

impl RedisPubSubEventBus {
    pub fn new(redis_url: impl AsRef<str>, channel: impl Into<String>) -> Result<Self, RedisBusError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;
        Ok(Self {
            client,
            channel: channel.into(),
        })
    }

    /// Bus for `STOCKPOST_REDIS_URL` on `STOCKPOST_NOTIFY_CHANNEL`.
    ///
    /// `Ok(None)` when no Redis URL is configured. Opening the client only
    /// parses the URL; the first connection is made on publish.
    pub fn from_config(config: &StockpostConfig) -> Result<Option<Self>, RedisBusError> {
        config
            .redis_url
            .as_deref()
            .map(|url| Self::new(url, config.notify_channel.clone()))
            .transpose()
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl EventBus<NotificationEnvelope<JsonValue>> for RedisPubSubEventBus {
    type Error = RedisBusError;

    fn publish(&self, message: NotificationEnvelope<JsonValue>) -> Result<(), Self::Error> {
        let payload = serde_json::to_string(&message)
            .map_err(|e| RedisBusError::Serialize(e.to_string()))?;

        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;

        let receivers: i64 = conn
            .publish(&self.channel, payload)
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;

        debug!(
            channel = %self.channel,
            event_type = message.event_type(),
            receivers,
            "notification published"
        );
        Ok(())
    }

    fn subscribe(&self) -> Subscription<NotificationEnvelope<JsonValue>> {
        let (tx, rx) = mpsc::channel();

        let client = self.client.clone();
        let channel = self.channel.clone();

        thread::spawn(move || {
            let mut conn = match client.get_connection() {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "redis subscriber could not connect");
                    return;
                }
            };

            let mut pubsub = conn.as_pubsub();
            if let Err(e) = pubsub.subscribe(&channel) {
                warn!(error = %e, channel = %channel, "redis subscribe failed");
                return;
            }

            loop {
                let msg = match pubsub.get_message() {
                    Ok(m) => m,
                    Err(_) => return,
                };

                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };

                let envelope: NotificationEnvelope<JsonValue> = match serde_json::from_str(&payload) {
                    Ok(e) => e,
                    Err(e) => {
                        warn!(error = %e, "dropping undecodable notification");
                        continue;
                    }
                };

                if tx.send(envelope).is_err() {
                    return;
                }
            }
        });

        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_redis_url_means_no_bus() {
        let bus = RedisPubSubEventBus::from_config(&StockpostConfig::default()).unwrap();
        assert!(bus.is_none());
    }

    #[test]
    fn bus_publishes_on_the_configured_channel() {
        let config = StockpostConfig {
            redis_url: Some("redis://127.0.0.1:6379/0".to_string()),
            notify_channel: "ledger.events".to_string(),
            ..StockpostConfig::default()
        };
        let bus = RedisPubSubEventBus::from_config(&config).unwrap().unwrap();
        assert_eq!(bus.channel(), "ledger.events");
    }

    #[test]
    fn malformed_redis_url_is_rejected() {
        let config = StockpostConfig {
            redis_url: Some("not a redis url".to_string()),
            ..StockpostConfig::default()
        };
        let err = RedisPubSubEventBus::from_config(&config).unwrap_err();
        assert!(matches!(err, RedisBusError::Redis(_)));
    }
}
