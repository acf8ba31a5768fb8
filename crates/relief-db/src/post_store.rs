//! Persistence for relief posts and their explicit deletion cascade.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use relief_types::{
    Actor, EventId, PostDeletion, PostId, PostUpdate, ReliefPost, ResidentCondition,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::codec::{capacity_from_db, condition_to_db, count_from_db};
use crate::error::DbError;
use crate::locks::lock_active_event;

const POST_COLUMNS: &str = "id, event_id, name, location, capacity, pic_name, pic_phone, photo, map_link, created_by, created_at, updated_at";

/// Operations on the `relief_posts` table.
pub struct PostStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PostStore<'a> {
    /// Create a new post store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a post after checking, under lock, that its event is active.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] or [`DbError::EventNotActive`] for the
    /// parent event, or [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, post: &ReliefPost) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        lock_active_event(&mut tx, post.event_id).await?;

        sqlx::query(
            r"INSERT INTO relief_posts (id, event_id, name, location, capacity, pic_name, pic_phone, photo, map_link, created_by, created_at, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(post.id.into_inner())
        .bind(post.event_id.into_inner())
        .bind(&post.name)
        .bind(&post.location)
        .bind(i64::from(post.capacity))
        .bind(&post.pic_name)
        .bind(&post.pic_phone)
        .bind(post.photo.as_deref())
        .bind(post.map_link.as_deref())
        .bind(post.created_by.as_str())
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Look up a post by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, post_id: PostId) -> Result<Option<ReliefPost>, DbError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM relief_posts WHERE id = $1");
        sqlx::query_as::<_, PostRow>(&sql)
            .bind(post_id.into_inner())
            .fetch_optional(self.pool)
            .await?
            .map(PostRow::into_domain)
            .transpose()
    }

    /// Posts serving an event, in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self, event_id: EventId) -> Result<Vec<ReliefPost>, DbError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM relief_posts WHERE event_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, PostRow>(&sql)
            .bind(event_id.into_inner())
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(PostRow::into_domain)
            .collect()
    }

    /// Apply a partial update. A rename refreshes the mirrored location of
    /// linked residents in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for the post or
    /// [`DbError::EventNotActive`] if its event is resolved.
    pub async fn update(
        &self,
        post_id: PostId,
        update: &PostUpdate,
        at: DateTime<Utc>,
    ) -> Result<ReliefPost, DbError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {POST_COLUMNS} FROM relief_posts WHERE id = $1 FOR UPDATE");
        let mut post = sqlx::query_as::<_, PostRow>(&sql)
            .bind(post_id.into_inner())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("post", post_id))?
            .into_domain()?;
        lock_active_event(&mut tx, post.event_id).await?;

        let renamed = update.name.as_ref().is_some_and(|name| *name != post.name);
        update.apply_to(&mut post);
        post.updated_at = at;

        sqlx::query(
            r"UPDATE relief_posts
              SET name = $2, location = $3, capacity = $4, pic_name = $5, pic_phone = $6,
                  photo = $7, map_link = $8, updated_at = $9
              WHERE id = $1",
        )
        .bind(post_id.into_inner())
        .bind(&post.name)
        .bind(&post.location)
        .bind(i64::from(post.capacity))
        .bind(&post.pic_name)
        .bind(&post.pic_phone)
        .bind(post.photo.as_deref())
        .bind(post.map_link.as_deref())
        .bind(at)
        .execute(&mut *tx)
        .await?;

        if renamed {
            let refreshed = sqlx::query(
                r"UPDATE affected_residents SET current_location = $2, updated_at = $3 WHERE posko_id = $1",
            )
            .bind(post_id.into_inner())
            .bind(&post.name)
            .bind(at)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            tracing::debug!(post_id = %post_id, refreshed, "Mirrored post rename into residents");
        }

        tx.commit().await?;
        Ok(post)
    }

    /// Delete a post: detach its residents, delete its items and their
    /// transactions, then the post itself, all in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the post does not exist.
    pub async fn delete_cascade(
        &self,
        post_id: PostId,
        at: DateTime<Utc>,
    ) -> Result<PostDeletion, DbError> {
        let mut tx = self.pool.begin().await?;
        let id = post_id.into_inner();

        let name: String =
            sqlx::query_scalar(r"SELECT name FROM relief_posts WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| DbError::not_found("post", post_id))?;

        let detached_residents = sqlx::query(
            r"UPDATE affected_residents
              SET posko_id = NULL, current_location = $2, updated_at = $3
              WHERE posko_id = $1",
        )
        .bind(id)
        .bind(&name)
        .bind(at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let deleted_transactions = sqlx::query(
            r"DELETE FROM logistics_transactions
              WHERE item_id IN (SELECT id FROM logistics_items WHERE posko_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let deleted_items = sqlx::query(r"DELETE FROM logistics_items WHERE posko_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query(r"DELETE FROM relief_posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(PostDeletion {
            post_id,
            detached_residents,
            deleted_items,
            deleted_transactions,
        })
    }

    /// Residents currently sheltered at a post.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn occupancy(&self, post_id: PostId) -> Result<u32, DbError> {
        let count: i64 = sqlx::query_scalar(
            r"SELECT COUNT(*) FROM affected_residents
              WHERE posko_id = $1 AND condition IN ($2, $3)",
        )
        .bind(post_id.into_inner())
        .bind(condition_to_db(ResidentCondition::Displaced))
        .bind(condition_to_db(ResidentCondition::Injured))
        .fetch_one(self.pool)
        .await?;
        Ok(clamp_occupancy(count))
    }

    /// Occupancy of every post serving an event (zero-filled).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn occupancy_by_post(
        &self,
        event_id: EventId,
    ) -> Result<BTreeMap<PostId, u32>, DbError> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            r"SELECT p.id, COUNT(r.id)
              FROM relief_posts p
              LEFT JOIN affected_residents r
                ON r.posko_id = p.id AND r.condition IN ($2, $3)
              WHERE p.event_id = $1
              GROUP BY p.id",
        )
        .bind(event_id.into_inner())
        .bind(condition_to_db(ResidentCondition::Displaced))
        .bind(condition_to_db(ResidentCondition::Injured))
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (PostId::from(id), clamp_occupancy(count)))
            .collect())
    }
}

fn clamp_occupancy(count: i64) -> u32 {
    u32::try_from(count_from_db(count)).unwrap_or(u32::MAX)
}

/// A row from the `relief_posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    event_id: Uuid,
    name: String,
    location: String,
    capacity: i64,
    pic_name: String,
    pic_phone: String,
    photo: Option<String>,
    map_link: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PostRow {
    fn into_domain(self) -> Result<ReliefPost, DbError> {
        Ok(ReliefPost {
            id: PostId::from(self.id),
            event_id: EventId::from(self.event_id),
            name: self.name,
            location: self.location,
            capacity: capacity_from_db(self.capacity)?,
            pic_name: self.pic_name,
            pic_phone: self.pic_phone,
            photo: self.photo,
            map_link: self.map_link,
            created_by: Actor(self.created_by),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
