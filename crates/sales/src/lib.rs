//! Sales Orders domain module.
//!
//! Business rules for recording sales orders and choosing the warehouse that
//! fulfils each line, implemented as deterministic domain logic (no IO).

pub mod allocation;
pub mod order;

pub use allocation::choose_source;
pub use order::{Order, OrderLine, OrderLineRequest, OrderRequest, SalesOrderStatus};
