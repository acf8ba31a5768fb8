//! Persistence for damage reports.

use chrono::{DateTime, Utc};
use relief_types::{
    Actor, DamageReport, DamageSeverity, EventId, ReportId, ReportStatus, SeverityCounts,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::codec::{
    count_from_db, damage_type_from_db, damage_type_to_db, report_status_from_db,
    report_status_to_db, severity_from_db, severity_to_db,
};
use crate::error::{DbError, is_foreign_key_violation};

const REPORT_COLUMNS: &str = "id, event_id, title, description, damage_type, severity, location, status, photo, reported_by, created_at, updated_at";

/// Operations on the `damage_reports` table.
pub struct DamageStore<'a> {
    pool: &'a PgPool,
}

impl<'a> DamageStore<'a> {
    /// Create a new damage report store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a damage report.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the event does not exist.
    pub async fn insert(&self, report: &DamageReport) -> Result<(), DbError> {
        let result = sqlx::query(
            r"INSERT INTO damage_reports (id, event_id, title, description, damage_type, severity, location, status, photo, reported_by, created_at, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(report.id.into_inner())
        .bind(report.event_id.into_inner())
        .bind(&report.title)
        .bind(&report.description)
        .bind(damage_type_to_db(report.damage_type))
        .bind(severity_to_db(report.severity))
        .bind(&report.location)
        .bind(report_status_to_db(report.status))
        .bind(report.photo.as_deref())
        .bind(report.reported_by.as_str())
        .bind(report.created_at)
        .bind(report.updated_at)
        .execute(self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_foreign_key_violation(&err) => {
                Err(DbError::not_found("event", report.event_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Look up a report by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, report_id: ReportId) -> Result<Option<DamageReport>, DbError> {
        let sql = format!("SELECT {REPORT_COLUMNS} FROM damage_reports WHERE id = $1");
        sqlx::query_as::<_, ReportRow>(&sql)
            .bind(report_id.into_inner())
            .fetch_optional(self.pool)
            .await?
            .map(ReportRow::into_domain)
            .transpose()
    }

    /// Reports of an event, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self, event_id: EventId) -> Result<Vec<DamageReport>, DbError> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM damage_reports WHERE event_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, ReportRow>(&sql)
            .bind(event_id.into_inner())
            .fetch_all(self.pool)
            .await?
            .into_iter()
            .map(ReportRow::into_domain)
            .collect()
    }

    /// Overwrite a report's status.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the report does not exist.
    pub async fn update_status(
        &self,
        report_id: ReportId,
        status: ReportStatus,
        at: DateTime<Utc>,
    ) -> Result<DamageReport, DbError> {
        let sql = format!(
            "UPDATE damage_reports SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {REPORT_COLUMNS}"
        );
        sqlx::query_as::<_, ReportRow>(&sql)
            .bind(report_id.into_inner())
            .bind(report_status_to_db(status))
            .bind(at)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("damage report", report_id))?
            .into_domain()
    }

    /// Report counts per severity for an event (zero-filled).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn counts_by_severity(&self, event_id: EventId) -> Result<SeverityCounts, DbError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r"SELECT severity, COUNT(*) FROM damage_reports WHERE event_id = $1 GROUP BY severity",
        )
        .bind(event_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        let mut counts: SeverityCounts = DamageSeverity::ALL.into_iter().map(|s| (s, 0)).collect();
        for (severity, count) in rows {
            counts.insert(severity_from_db(&severity)?, count_from_db(count));
        }
        Ok(counts)
    }
}

/// A row from the `damage_reports` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ReportRow {
    id: Uuid,
    event_id: Uuid,
    title: String,
    description: String,
    damage_type: String,
    severity: String,
    location: String,
    status: String,
    photo: Option<String>,
    reported_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReportRow {
    fn into_domain(self) -> Result<DamageReport, DbError> {
        Ok(DamageReport {
            id: ReportId::from(self.id),
            event_id: EventId::from(self.event_id),
            title: self.title,
            description: self.description,
            damage_type: damage_type_from_db(&self.damage_type)?,
            severity: severity_from_db(&self.severity)?,
            location: self.location,
            status: report_status_from_db(&self.status)?,
            photo: self.photo,
            reported_by: Actor(self.reported_by),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
