//! Post-commit notifications and the bus that distributes them.
//!
//! The write path never publishes directly: notifications are staged in a
//! transactional outbox and relayed onto an [`EventBus`] after commit.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod notification;
pub mod tenant;

pub use bus::{EventBus, Subscription};
pub use envelope::NotificationEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use notification::{LedgerNotification, OrderCreated, StockUpdated};
pub use tenant::TenantScoped;
