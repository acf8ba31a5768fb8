//! Persistence for logistics items and their stock transaction log.
//!
//! Every balance change runs inside one transaction that locks the item
//! row (`SELECT ... FOR UPDATE`), computes the new balance with
//! [`next_balance`], updates the item and appends the log entry. Two
//! concurrent OUT movements on one item therefore serialize, and a
//! refused movement rolls back without touching the balance.
//!
//! The `current_stock >= 0` and `quantity > 0` checks in the schema are a
//! second line; the ledger rule refuses those movements first.

use chrono::{DateTime, Utc};
use relief_ledger::{next_balance, verify_balance};
use relief_types::{
    Actor, BalanceCheck, ItemId, LogisticsItem, LogisticsTransaction, Page, PostId, SortOrder,
    TransactionId, TransactionPage,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::codec::{
    count_from_db, direction_from_db, direction_to_db, item_type_from_db, item_type_to_db,
};
use crate::error::{DbError, is_foreign_key_violation};

const ITEM_COLUMNS: &str = "id, posko_id, item_name, unit, item_type, current_stock, created_at";

const TRANSACTION_COLUMNS: &str = "id, item_id, direction, quantity, recorded_at, note, recorded_by";

/// Operations on the `logistics_items` and `logistics_transactions` tables.
pub struct LogisticsStore<'a> {
    pool: &'a PgPool,
}

impl<'a> LogisticsStore<'a> {
    /// Create a new logistics store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an item and its optional opening transaction atomically.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the post does not exist, or
    /// [`DbError::Ledger`] if the opening transaction is refused.
    pub async fn insert_item(
        &self,
        item: &LogisticsItem,
        opening: Option<LogisticsTransaction>,
    ) -> Result<LogisticsItem, DbError> {
        let stock = match &opening {
            Some(tx) => next_balance(item.id, 0, tx.direction, tx.quantity)?,
            None => 0,
        };

        let mut tx = self.pool.begin().await?;
        let sql = format!(
            r"INSERT INTO logistics_items (id, posko_id, item_name, unit, item_type, current_stock, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7)
              RETURNING {ITEM_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(item.id.into_inner())
            .bind(item.posko_id.into_inner())
            .bind(&item.item_name)
            .bind(&item.unit)
            .bind(item_type_to_db(item.item_type))
            .bind(stock)
            .bind(item.created_at)
            .fetch_one(&mut *tx)
            .await;

        let row = match inserted {
            Ok(row) => row,
            Err(err) if is_foreign_key_violation(&err) => {
                return Err(DbError::not_found("post", item.posko_id));
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(opening) = &opening {
            append_transaction(&mut tx, opening).await?;
        }

        tx.commit().await?;
        row.into_domain()
    }

    /// Look up an item by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_item(&self, item_id: ItemId) -> Result<Option<LogisticsItem>, DbError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM logistics_items WHERE id = $1");
        sqlx::query_as::<_, ItemRow>(&sql)
            .bind(item_id.into_inner())
            .fetch_optional(self.pool)
            .await?
            .map(ItemRow::into_domain)
            .transpose()
    }

    /// Items held at a post, in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list_items(&self, post_id: PostId) -> Result<Vec<LogisticsItem>, DbError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM logistics_items WHERE posko_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, ItemRow>(&sql)
            .bind(post_id.into_inner())
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(ItemRow::into_domain)
            .collect()
    }

    /// Append a movement and move the balance in one transaction.
    ///
    /// Returns the stored transaction and the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for an unknown item, or
    /// [`DbError::Ledger`] if the movement is refused. On error nothing is
    /// written.
    pub async fn record(
        &self,
        movement: LogisticsTransaction,
    ) -> Result<(LogisticsTransaction, i64), DbError> {
        let mut tx = self.pool.begin().await?;
        let item_id = movement.item_id;

        let current: i64 = sqlx::query_scalar(
            r"SELECT current_stock FROM logistics_items WHERE id = $1 FOR UPDATE",
        )
        .bind(item_id.into_inner())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("item", item_id))?;

        let balance = next_balance(item_id, current, movement.direction, movement.quantity)?;

        sqlx::query(r"UPDATE logistics_items SET current_stock = $2 WHERE id = $1")
            .bind(item_id.into_inner())
            .bind(balance)
            .execute(&mut *tx)
            .await?;
        let stored = append_transaction(&mut tx, &movement).await?;

        tx.commit().await?;
        Ok((stored, balance))
    }

    /// One page of an item's log, ordered by `(recorded_at, id)`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for an unknown item.
    pub async fn page_transactions(
        &self,
        item_id: ItemId,
        page: &Page,
    ) -> Result<TransactionPage, DbError> {
        let exists: bool =
            sqlx::query_scalar(r"SELECT EXISTS (SELECT 1 FROM logistics_items WHERE id = $1)")
                .bind(item_id.into_inner())
                .fetch_one(self.pool)
                .await?;
        if !exists {
            return Err(DbError::not_found("item", item_id));
        }

        let total: i64 = sqlx::query_scalar(
            r"SELECT COUNT(*) FROM logistics_transactions WHERE item_id = $1",
        )
        .bind(item_id.into_inner())
        .fetch_one(self.pool)
        .await?;

        let order = match page.order {
            SortOrder::OldestFirst => "ASC",
            SortOrder::NewestFirst => "DESC",
        };
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM logistics_transactions WHERE item_id = $1 \
             ORDER BY recorded_at {order}, id {order} LIMIT $2 OFFSET $3"
        );
        let transactions = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(item_id.into_inner())
            .bind(i64::from(page.limit))
            .bind(i64::try_from(page.offset).unwrap_or(i64::MAX))
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(TransactionRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        let total = count_from_db(total);
        Ok(TransactionPage {
            transactions,
            total,
            next_offset: page.next_offset(total),
        })
    }

    /// Replay an item's log against its balance under a share lock.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for an unknown item.
    pub async fn verify_item(&self, item_id: ItemId) -> Result<BalanceCheck, DbError> {
        let mut tx = self.pool.begin().await?;

        let recorded: i64 = sqlx::query_scalar(
            r"SELECT current_stock FROM logistics_items WHERE id = $1 FOR SHARE",
        )
        .bind(item_id.into_inner())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("item", item_id))?;

        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM logistics_transactions WHERE item_id = $1 ORDER BY recorded_at, id"
        );
        let entries = sqlx::query_as::<_, TransactionRow>(&sql)
            .bind(item_id.into_inner())
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(TransactionRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        tx.commit().await?;
        Ok(verify_balance(recorded, &entries))
    }

    /// Delete an item and its log; returns the number of log entries removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for an unknown item.
    pub async fn delete_item(&self, item_id: ItemId) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<Uuid> =
            sqlx::query_scalar(r"SELECT id FROM logistics_items WHERE id = $1 FOR UPDATE")
                .bind(item_id.into_inner())
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(DbError::not_found("item", item_id));
        }

        let deleted = sqlx::query(r"DELETE FROM logistics_transactions WHERE item_id = $1")
            .bind(item_id.into_inner())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query(r"DELETE FROM logistics_items WHERE id = $1")
            .bind(item_id.into_inner())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted)
    }
}

async fn append_transaction(
    conn: &mut PgConnection,
    movement: &LogisticsTransaction,
) -> Result<LogisticsTransaction, DbError> {
    let sql = format!(
        r"INSERT INTO logistics_transactions (id, item_id, direction, quantity, recorded_at, note, recorded_by)
          VALUES ($1, $2, $3, $4, $5, $6, $7)
          RETURNING {TRANSACTION_COLUMNS}"
    );
    sqlx::query_as::<_, TransactionRow>(&sql)
        .bind(movement.id.into_inner())
        .bind(movement.item_id.into_inner())
        .bind(direction_to_db(movement.direction))
        .bind(movement.quantity)
        .bind(movement.timestamp)
        .bind(movement.note.as_deref())
        .bind(movement.recorded_by.as_str())
        .fetch_one(&mut *conn)
        .await?
        .into_domain()
}

/// A row from the `logistics_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    posko_id: Uuid,
    item_name: String,
    unit: String,
    item_type: String,
    current_stock: i64,
    created_at: DateTime<Utc>,
}

impl ItemRow {
    fn into_domain(self) -> Result<LogisticsItem, DbError> {
        Ok(LogisticsItem {
            id: ItemId::from(self.id),
            posko_id: PostId::from(self.posko_id),
            item_name: self.item_name,
            unit: self.unit,
            item_type: item_type_from_db(&self.item_type)?,
            current_stock: self.current_stock,
            created_at: self.created_at,
        })
    }
}

/// A row from the `logistics_transactions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    item_id: Uuid,
    direction: String,
    quantity: i64,
    recorded_at: DateTime<Utc>,
    note: Option<String>,
    recorded_by: String,
}

impl TransactionRow {
    fn into_domain(self) -> Result<LogisticsTransaction, DbError> {
        Ok(LogisticsTransaction {
            id: TransactionId::from(self.id),
            item_id: ItemId::from(self.item_id),
            direction: direction_from_db(&self.direction)?,
            quantity: self.quantity,
            timestamp: self.recorded_at,
            note: self.note,
            recorded_by: Actor(self.recorded_by),
        })
    }
}
