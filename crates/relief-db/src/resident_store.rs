//! Persistence for affected residents.
//!
//! Registry-linked residents are keyed by `(event_id, external_id)`
//! through the partial unique index `affected_residents_registry_key`.
//! Registration is a single `INSERT ... ON CONFLICT ... DO UPDATE`, so two
//! operators registering the same person at once still produce one row.
//!
//! `current_location` is mirrored from the post name inside the same
//! statement that sets `posko_id`.

use chrono::{DateTime, Utc};
use relief_types::{
    Actor, AffectedResident, ConditionCounts, EventId, PostId, ResidentCondition, ResidentFilter,
    ResidentId, ResidentIdentity,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::codec::{
    age_to_db, condition_from_db, condition_to_db, count_from_db, gender_from_db, gender_to_db,
    special_need_from_db, special_need_to_db,
};
use crate::error::DbError;
use crate::locks::{lock_active_event, lock_post_for_event};
use crate::params::{ConditionChange, RegistryRegistration};

const RESIDENT_COLUMNS: &str = "id, event_id, external_id, full_name, age, gender, address, condition, special_needs, posko_id, current_location, notes, registered_by, updated_by, created_at, updated_at";

/// Operations on the `affected_residents` table.
pub struct ResidentStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ResidentStore<'a> {
    /// Create a new resident store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update a registry-linked resident by natural key.
    ///
    /// On conflict the condition and post are overwritten, while omitted
    /// notes and special needs keep their stored values. Returns the row
    /// and whether it was newly inserted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`], [`DbError::EventNotActive`] or
    /// [`DbError::PostNotInEvent`] when a precondition fails.
    pub async fn upsert_registry(
        &self,
        reg: &RegistryRegistration,
    ) -> Result<(AffectedResident, bool), DbError> {
        let mut tx = self.pool.begin().await?;
        lock_active_event(&mut tx, reg.event_id).await?;
        lock_post_for_event(&mut tx, reg.posko_id, reg.event_id).await?;

        let sql = format!(
            r"INSERT INTO affected_residents
                (id, event_id, external_id, condition, special_needs, posko_id, current_location,
                 notes, registered_by, updated_by, created_at, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6,
                      COALESCE((SELECT name FROM relief_posts WHERE id = $6), $7),
                      COALESCE($8, ''), $9, $9, $10, $10)
              ON CONFLICT (event_id, external_id) WHERE external_id IS NOT NULL DO UPDATE SET
                condition = EXCLUDED.condition,
                posko_id = EXCLUDED.posko_id,
                special_needs = COALESCE(EXCLUDED.special_needs, affected_residents.special_needs),
                notes = COALESCE($8, affected_residents.notes),
                current_location = CASE
                    WHEN EXCLUDED.posko_id IS NULL THEN affected_residents.current_location
                    ELSE EXCLUDED.current_location
                END,
                updated_by = EXCLUDED.updated_by,
                updated_at = EXCLUDED.updated_at
              RETURNING {RESIDENT_COLUMNS}, (xmax = 0) AS inserted"
        );
        let row = sqlx::query_as::<_, UpsertRow>(&sql)
            .bind(reg.id.into_inner())
            .bind(reg.event_id.into_inner())
            .bind(&reg.external_id)
            .bind(condition_to_db(reg.condition))
            .bind(reg.special_needs.map(special_need_to_db))
            .bind(reg.posko_id.map(PostId::into_inner))
            .bind(&reg.home_location)
            .bind(reg.notes.as_deref())
            .bind(reg.actor.as_str())
            .bind(reg.at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((row.resident.into_domain()?, row.inserted))
    }

    /// Insert a manually identified resident.
    ///
    /// # Errors
    ///
    /// Same preconditions as [`Self::upsert_registry`]; returns
    /// [`DbError::Decode`] if the record is not a manual identity.
    pub async fn insert_manual(
        &self,
        resident: &AffectedResident,
    ) -> Result<AffectedResident, DbError> {
        let ResidentIdentity::Manual {
            name,
            age,
            gender,
            address,
        } = &resident.identity
        else {
            return Err(DbError::Decode(String::from(
                "manual insert requires a manual identity",
            )));
        };
        let age = age_to_db(*age)?;

        let mut tx = self.pool.begin().await?;
        lock_active_event(&mut tx, resident.event_id).await?;
        lock_post_for_event(&mut tx, resident.posko_id, resident.event_id).await?;

        let sql = format!(
            r"INSERT INTO affected_residents
                (id, event_id, full_name, age, gender, address, condition, special_needs, posko_id,
                 current_location, notes, registered_by, updated_by, created_at, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
                      COALESCE((SELECT name FROM relief_posts WHERE id = $9), $10),
                      $11, $12, $13, $14, $15)
              RETURNING {RESIDENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ResidentRow>(&sql)
            .bind(resident.id.into_inner())
            .bind(resident.event_id.into_inner())
            .bind(name)
            .bind(age)
            .bind(gender_to_db(*gender))
            .bind(address)
            .bind(condition_to_db(resident.condition))
            .bind(resident.special_needs.map(special_need_to_db))
            .bind(resident.posko_id.map(PostId::into_inner))
            .bind(&resident.current_location)
            .bind(&resident.notes)
            .bind(resident.registered_by.as_str())
            .bind(resident.updated_by.as_str())
            .bind(resident.created_at)
            .bind(resident.updated_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        row.into_domain()
    }

    /// Look up a resident by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, resident_id: ResidentId) -> Result<Option<AffectedResident>, DbError> {
        let sql = format!("SELECT {RESIDENT_COLUMNS} FROM affected_residents WHERE id = $1");
        sqlx::query_as::<_, ResidentRow>(&sql)
            .bind(resident_id.into_inner())
            .fetch_optional(self.pool)
            .await?
            .map(ResidentRow::into_domain)
            .transpose()
    }

    /// Residents of an event matching `filter`, least recently updated first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(
        &self,
        event_id: EventId,
        filter: &ResidentFilter,
    ) -> Result<Vec<AffectedResident>, DbError> {
        let sql = format!(
            r"SELECT {RESIDENT_COLUMNS} FROM affected_residents
              WHERE event_id = $1
                AND ($2::TEXT IS NULL OR condition = $2)
                AND ($3::UUID IS NULL OR posko_id = $3)
                AND ($4::TIMESTAMPTZ IS NULL OR updated_at >= $4)
              ORDER BY updated_at, id"
        );
        sqlx::query_as::<_, ResidentRow>(&sql)
            .bind(event_id.into_inner())
            .bind(filter.condition.map(condition_to_db))
            .bind(filter.posko_id.map(PostId::into_inner))
            .bind(filter.updated_since)
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(ResidentRow::into_domain)
            .collect()
    }

    /// Change a resident's condition and post link.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] for the resident or post, or
    /// [`DbError::PostNotInEvent`].
    pub async fn update_condition(
        &self,
        change: &ConditionChange,
    ) -> Result<AffectedResident, DbError> {
        let mut tx = self.pool.begin().await?;

        let event_id: Uuid =
            sqlx::query_scalar(r"SELECT event_id FROM affected_residents WHERE id = $1 FOR UPDATE")
                .bind(change.resident_id.into_inner())
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| DbError::not_found("resident", change.resident_id))?;
        lock_post_for_event(&mut tx, change.posko_id, EventId::from(event_id)).await?;

        let sql = format!(
            r"UPDATE affected_residents
              SET condition = $2,
                  posko_id = $3,
                  current_location = COALESCE(
                      (SELECT name FROM relief_posts WHERE id = $3),
                      current_location
                  ),
                  updated_by = $4,
                  updated_at = $5
              WHERE id = $1
              RETURNING {RESIDENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ResidentRow>(&sql)
            .bind(change.resident_id.into_inner())
            .bind(condition_to_db(change.condition))
            .bind(change.posko_id.map(PostId::into_inner))
            .bind(change.actor.as_str())
            .bind(change.at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        row.into_domain()
    }

    /// Set the free-text location of a resident not linked to a post.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] or [`DbError::ResidentLinked`].
    pub async fn update_location(
        &self,
        resident_id: ResidentId,
        location: &str,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<AffectedResident, DbError> {
        let sql = format!(
            r"UPDATE affected_residents
              SET current_location = $2, updated_by = $3, updated_at = $4
              WHERE id = $1 AND posko_id IS NULL
              RETURNING {RESIDENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ResidentRow>(&sql)
            .bind(resident_id.into_inner())
            .bind(location)
            .bind(actor.as_str())
            .bind(at)
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(row) => row.into_domain(),
            None if self.get(resident_id).await?.is_some() => {
                Err(DbError::ResidentLinked { resident_id })
            }
            None => Err(DbError::not_found("resident", resident_id)),
        }
    }

    /// Hard-delete a resident.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no row was deleted.
    pub async fn delete(&self, resident_id: ResidentId) -> Result<(), DbError> {
        let deleted = sqlx::query(r"DELETE FROM affected_residents WHERE id = $1")
            .bind(resident_id.into_inner())
            .execute(self.pool)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(DbError::not_found("resident", resident_id));
        }
        Ok(())
    }

    /// Resident counts per condition for an event (zero-filled).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Decode`] for an unknown stored condition.
    pub async fn counts_by_condition(&self, event_id: EventId) -> Result<ConditionCounts, DbError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r"SELECT condition, COUNT(*) FROM affected_residents WHERE event_id = $1 GROUP BY condition",
        )
        .bind(event_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        let mut counts: ConditionCounts =
            ResidentCondition::ALL.into_iter().map(|c| (c, 0)).collect();
        for (condition, count) in rows {
            counts.insert(condition_from_db(&condition)?, count_from_db(count));
        }
        Ok(counts)
    }
}

/// A row from the `affected_residents` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ResidentRow {
    id: Uuid,
    event_id: Uuid,
    external_id: Option<String>,
    full_name: Option<String>,
    age: Option<i32>,
    gender: Option<String>,
    address: Option<String>,
    condition: String,
    special_needs: Option<String>,
    posko_id: Option<Uuid>,
    current_location: String,
    notes: String,
    registered_by: String,
    updated_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A resident row returned by the upsert, with its insert flag.
#[derive(Debug, Clone, sqlx::FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    resident: ResidentRow,
    inserted: bool,
}

impl ResidentRow {
    fn into_domain(self) -> Result<AffectedResident, DbError> {
        let identity = match (
            self.external_id,
            self.full_name,
            self.age,
            self.gender,
            self.address,
        ) {
            (Some(external_id), None, None, None, None) => {
                ResidentIdentity::RegistryLinked { external_id }
            }
            (None, Some(name), Some(age), Some(gender), Some(address)) => {
                ResidentIdentity::Manual {
                    name,
                    age: u32::try_from(age)
                        .map_err(|e| DbError::Decode(format!("age out of range: {age} ({e})")))?,
                    gender: gender_from_db(&gender)?,
                    address,
                }
            }
            _ => {
                return Err(DbError::Decode(format!(
                    "resident {} has an ambiguous identity",
                    self.id
                )));
            }
        };

        Ok(AffectedResident {
            id: ResidentId::from(self.id),
            event_id: EventId::from(self.event_id),
            identity,
            condition: condition_from_db(&self.condition)?,
            special_needs: self
                .special_needs
                .as_deref()
                .map(special_need_from_db)
                .transpose()?,
            posko_id: self.posko_id.map(PostId::from),
            current_location: self.current_location,
            notes: self.notes,
            registered_by: Actor(self.registered_by),
            updated_by: Actor(self.updated_by),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
