//! Postgres backend over a `sqlx` transaction.
//!
//! ## Locking
//!
//! `lock_stock` first inserts a zero row for the key (`ON CONFLICT DO NOTHING`)
//! and then reads it `FOR UPDATE`, so even the first write to a key takes a row
//! lock. Two scopes adjusting one key therefore run one after the other
//! instead of losing an update. The key's unique constraint is declared
//! `NULLS NOT DISTINCT`, which makes "no batch" a single key value.
//!
//! ## Error mapping
//!
//! | SQLSTATE | StoreError | Scenario |
//! |----------|------------|----------|
//! | `40001`  | `Conflict` | serialization failure |
//! | `40P01`  | `Conflict` | deadlock detected |
//! | `23505`  | `Conflict` | concurrent creation of the same batch/account |
//! | other    | `Query`    | constraint or syntax errors |
//!
//! Pool/IO failures map to `Unavailable`, undecodable rows to `Corrupt`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use stockpost_accounting::{Account, AccountKind, JournalEntry};
use stockpost_core::{
    AccountId, BatchId, ProductVariantId, TenantId, WarehouseId,
};
use stockpost_inventory::{Batch, Movement, StockKey, StockRecord};
use stockpost_sales::Order;

use crate::error::StoreError;
use crate::outbox::OutboxMessage;
use crate::uow::{Database, UnitOfWork};

/// Schema applied by the `stockpost-migrate` binary.
pub const MIGRATION_0001: &str = include_str!("../migrations/0001_ledger.sql");

#[derive(Debug, Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled schema. Statements are idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(MIGRATION_0001)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    /// Chart-of-accounts seeding hook.
    #[instrument(skip(self, account), fields(tenant_id = %account.tenant_id, code = %account.code), err)]
    pub async fn provision_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, tenant_id, code, name, kind, parent_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(account.tenant_id.as_uuid())
        .bind(&account.code)
        .bind(&account.name)
        .bind(account.kind.as_str())
        .bind(account.parent_id.map(Uuid::from))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("provision_account", e))?;
        Ok(())
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl std::fmt::Debug for PgUnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgUnitOfWork").finish_non_exhaustive()
    }
}

const STOCK_COLUMNS: &str = "tenant_id, warehouse_id, variant_id, batch_id, quantity, updated_at";

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn lock_stock(
        &mut self,
        tenant_id: TenantId,
        key: StockKey,
    ) -> Result<Option<StockRecord>, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO stock_records (tenant_id, warehouse_id, variant_id, batch_id, quantity)
            VALUES ($1, $2, $3, $4, 0)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(key.warehouse_id.as_uuid())
        .bind(key.variant_id.as_uuid())
        .bind(key.batch_id.map(Uuid::from))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_stock.seed", e))?;

        let row = sqlx::query(&format!(
            r#"
            SELECT {STOCK_COLUMNS}
            FROM stock_records
            WHERE tenant_id = $1 AND warehouse_id = $2 AND variant_id = $3
              AND batch_id IS NOT DISTINCT FROM $4
            FOR UPDATE
            "#
        ))
        .bind(tenant_id.as_uuid())
        .bind(key.warehouse_id.as_uuid())
        .bind(key.variant_id.as_uuid())
        .bind(key.batch_id.map(Uuid::from))
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_stock", e))?;

        row.as_ref().map(stock_from_row).transpose()
    }

    async fn save_stock(&mut self, record: &StockRecord) -> Result<(), StoreError> {
        let key = record.key;
        let updated = sqlx::query(
            r#"
            UPDATE stock_records
            SET quantity = $5, updated_at = $6
            WHERE tenant_id = $1 AND warehouse_id = $2 AND variant_id = $3
              AND batch_id IS NOT DISTINCT FROM $4
            "#,
        )
        .bind(record.tenant_id.as_uuid())
        .bind(key.warehouse_id.as_uuid())
        .bind(key.variant_id.as_uuid())
        .bind(key.batch_id.map(Uuid::from))
        .bind(record.quantity)
        .bind(record.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("save_stock", e))?;

        if updated.rows_affected() == 0 {
            sqlx::query(&format!(
                "INSERT INTO stock_records ({STOCK_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
            ))
            .bind(record.tenant_id.as_uuid())
            .bind(key.warehouse_id.as_uuid())
            .bind(key.variant_id.as_uuid())
            .bind(key.batch_id.map(Uuid::from))
            .bind(record.quantity)
            .bind(record.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("save_stock.insert", e))?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, variant_id = %variant_id), err)]
    async fn lock_variant_stock(
        &mut self,
        tenant_id: TenantId,
        variant_id: ProductVariantId,
    ) -> Result<Vec<StockRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {STOCK_COLUMNS}
            FROM stock_records
            WHERE tenant_id = $1 AND variant_id = $2
            ORDER BY quantity DESC, warehouse_id ASC, batch_id ASC NULLS FIRST
            FOR UPDATE
            "#
        ))
        .bind(tenant_id.as_uuid())
        .bind(variant_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_variant_stock", e))?;

        rows.iter().map(stock_from_row).collect()
    }

    async fn find_batch(
        &mut self,
        tenant_id: TenantId,
        variant_id: ProductVariantId,
        code: &str,
    ) -> Result<Option<Batch>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, variant_id, code, manufactured_on, expires_on, created_at
            FROM batches
            WHERE tenant_id = $1 AND variant_id = $2 AND code = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(variant_id.as_uuid())
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_batch", e))?;

        row.as_ref().map(batch_from_row).transpose()
    }

    async fn insert_batch(&mut self, batch: &Batch) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO batches (id, tenant_id, variant_id, code, manufactured_on, expires_on, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(batch.id.as_uuid())
        .bind(batch.tenant_id.as_uuid())
        .bind(batch.variant_id.as_uuid())
        .bind(&batch.code)
        .bind(batch.manufactured_on)
        .bind(batch.expires_on)
        .bind(batch.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_batch", e))?;
        Ok(())
    }

    #[instrument(skip(self, movement), fields(tenant_id = %movement.tenant_id, code = %movement.code), err)]
    async fn insert_movement(&mut self, movement: &Movement) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO movements (
                id, tenant_id, code, movement_type, status,
                from_warehouse_id, to_warehouse_id, reference, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(movement.id.as_uuid())
        .bind(movement.tenant_id.as_uuid())
        .bind(&movement.code)
        .bind(movement.movement_type.as_str())
        .bind(movement.status.as_str())
        .bind(movement.from_warehouse_id.map(Uuid::from))
        .bind(movement.to_warehouse_id.map(Uuid::from))
        .bind(&movement.reference)
        .bind(movement.created_by.as_uuid())
        .bind(movement.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_movement", e))?;

        for (idx, item) in movement.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO movement_items (movement_id, line_no, variant_id, quantity, batch_id)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(movement.id.as_uuid())
            .bind(int4("movement line number", idx + 1)?)
            .bind(item.variant_id.as_uuid())
            .bind(item.quantity)
            .bind(item.batch_id.map(Uuid::from))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_movement_item", e))?;
        }
        Ok(())
    }

    async fn find_account(
        &mut self,
        tenant_id: TenantId,
        account_id: AccountId,
    ) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            "SELECT id, tenant_id, code, name, kind, parent_id FROM accounts WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id.as_uuid())
        .bind(account_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_account", e))?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_account_by_code(
        &mut self,
        tenant_id: TenantId,
        code: &str,
    ) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(
            "SELECT id, tenant_id, code, name, kind, parent_id FROM accounts WHERE tenant_id = $1 AND code = $2",
        )
        .bind(tenant_id.as_uuid())
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_account_by_code", e))?;

        row.as_ref().map(account_from_row).transpose()
    }

    #[instrument(skip(self, entry), fields(tenant_id = %entry.tenant_id, journal_entry_id = %entry.id), err)]
    async fn insert_journal_entry(&mut self, entry: &JournalEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO journal_entries (
                id, tenant_id, entry_date, reference, description, status, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.tenant_id.as_uuid())
        .bind(entry.date)
        .bind(&entry.reference)
        .bind(&entry.description)
        .bind(entry.status.as_str())
        .bind(entry.created_by.as_uuid())
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_journal_entry", e))?;

        for (idx, line) in entry.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO journal_entry_lines (entry_id, line_no, account_id, debit, credit, description)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(entry.id.as_uuid())
            .bind(int4("journal line number", idx + 1)?)
            .bind(line.account_id.as_uuid())
            .bind(line.debit)
            .bind(line.credit)
            .bind(&line.description)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_journal_entry_line", e))?;
        }
        Ok(())
    }

    #[instrument(skip(self, order), fields(tenant_id = %order.tenant_id, code = %order.code), err)]
    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, tenant_id, code, status, customer_email, total_amount, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.tenant_id.as_uuid())
        .bind(&order.code)
        .bind(order.status.as_str())
        .bind(&order.customer_email)
        .bind(order.total_amount)
        .bind(order.created_by.as_uuid())
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for line in &order.lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (
                    order_id, line_no, variant_id, warehouse_id, batch_id, quantity, unit_price
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(int4("order line number", line.line_no)?)
            .bind(line.variant_id.as_uuid())
            .bind(line.warehouse_id.as_uuid())
            .bind(line.batch_id.map(Uuid::from))
            .bind(line.quantity)
            .bind(line.unit_price)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_line", e))?;
        }
        Ok(())
    }

    async fn enqueue(&mut self, message: &OutboxMessage) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO outbox (id, tenant_id, event_type, event_version, occurred_at, payload)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id)
        .bind(message.tenant_id.as_uuid())
        .bind(&message.event_type)
        .bind(int4("event version", message.event_version)?)
        .bind(message.occurred_at)
        .bind(&message.payload)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("enqueue", e))?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

#[async_trait]
impl Database for PgDatabase {
    type Uow = PgUnitOfWork;

    async fn begin(&self) -> Result<Self::Uow, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(PgUnitOfWork { tx })
    }

    async fn pending_outbox(&self, limit: usize) -> Result<Vec<OutboxMessage>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, event_type, event_version, occurred_at, payload, delivered_at
            FROM outbox
            WHERE delivered_at IS NULL
            ORDER BY occurred_at ASC, id ASC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("pending_outbox", e))?;

        rows.iter().map(outbox_from_row).collect()
    }

    async fn mark_delivered(&self, ids: &[Uuid]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("UPDATE outbox SET delivered_at = NOW() WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("mark_delivered", e))?;
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            let msg = format!("{operation}: {} (SQLSTATE {code})", db_err.message());
            match code.as_str() {
                "40001" | "40P01" | "23505" => StoreError::Conflict(msg),
                _ => StoreError::Query(msg),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("{operation}: {err}"))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Corrupt(format!("{operation}: {err}"))
        }
        other => StoreError::Query(format!("{operation}: {other}")),
    }
}

fn corrupt(what: &str) -> impl FnOnce(sqlx::Error) -> StoreError + '_ {
    move |e| StoreError::Corrupt(format!("failed to decode {what} row: {e}"))
}

fn stock_from_row(row: &PgRow) -> Result<StockRecord, StoreError> {
    let decode = || -> Result<StockRecord, sqlx::Error> {
        let batch_id: Option<Uuid> = row.try_get("batch_id")?;
        Ok(StockRecord {
            tenant_id: TenantId::from_uuid(row.try_get("tenant_id")?),
            key: StockKey::new(
                WarehouseId::from_uuid(row.try_get("warehouse_id")?),
                ProductVariantId::from_uuid(row.try_get("variant_id")?),
                batch_id.map(BatchId::from_uuid),
            ),
            quantity: row.try_get::<Decimal, _>("quantity")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    };
    decode().map_err(corrupt("stock"))
}

fn batch_from_row(row: &PgRow) -> Result<Batch, StoreError> {
    let decode = || -> Result<Batch, sqlx::Error> {
        Ok(Batch {
            id: BatchId::from_uuid(row.try_get("id")?),
            tenant_id: TenantId::from_uuid(row.try_get("tenant_id")?),
            variant_id: ProductVariantId::from_uuid(row.try_get("variant_id")?),
            code: row.try_get("code")?,
            manufactured_on: row.try_get::<Option<NaiveDate>, _>("manufactured_on")?,
            expires_on: row.try_get::<Option<NaiveDate>, _>("expires_on")?,
            created_at: row.try_get("created_at")?,
        })
    };
    decode().map_err(corrupt("batch"))
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    let kind: String = row.try_get("kind").map_err(corrupt("account"))?;
    let kind = kind
        .parse::<AccountKind>()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
    let decode = || -> Result<Account, sqlx::Error> {
        let parent_id: Option<Uuid> = row.try_get("parent_id")?;
        Ok(Account {
            id: AccountId::from_uuid(row.try_get("id")?),
            tenant_id: TenantId::from_uuid(row.try_get("tenant_id")?),
            code: row.try_get("code")?,
            name: row.try_get("name")?,
            kind,
            parent_id: parent_id.map(AccountId::from_uuid),
        })
    };
    decode().map_err(corrupt("account"))
}

/// Narrow a line number or version to the `INTEGER` column type.
fn int4<T: TryInto<i32>>(what: &str, value: T) -> Result<i32, StoreError> {
    value
        .try_into()
        .map_err(|_| StoreError::Query(format!("{what} does not fit an INTEGER column")))
}

fn outbox_from_row(row: &PgRow) -> Result<OutboxMessage, StoreError> {
    let decode = || -> Result<OutboxMessage, sqlx::Error> {
        let version: i32 = row.try_get("event_version")?;
        Ok(OutboxMessage {
            id: row.try_get("id")?,
            tenant_id: TenantId::from_uuid(row.try_get("tenant_id")?),
            event_type: row.try_get("event_type")?,
            event_version: u32::try_from(version).map_err(|_| {
                sqlx::Error::Decode(format!("negative event_version {version}").into())
            })?,
            occurred_at: row.try_get("occurred_at")?,
            payload: row.try_get("payload")?,
            delivered_at: row.try_get("delivered_at")?,
        })
    };
    decode().map_err(corrupt("outbox"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_columns_reject_values_that_would_truncate() {
        assert_eq!(int4("order line number", 7u32).unwrap(), 7);
        assert_eq!(int4("movement line number", 10_000usize).unwrap(), 10_000);

        let err = int4("order line number", u32::MAX).unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
        let err = int4("movement line number", usize::MAX).unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
    }
}
