//! The persistent tier of the two-tier cache.
//!
//! Stands in for a document-store container named `eol_cache`, partition
//! key `cache_key`, using `sqlx` over SQLite (see DESIGN.md for the
//! rationale). Queries are written with the query builder (not the
//! `query!` macro) so the crate compiles without a live `DATABASE_URL` at
//! build time.

use super::{CacheEntry, CacheStats};
use crate::database::{DatabaseConnection, DatabaseError};
use crate::domain_types::EolEnvelope;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

/// The persistent cache tier, wrapping a `SQLite` connection pool.
pub struct PersistentTier {
    pool: SqlitePool,
}

impl PersistentTier {
    /// Wrap an already-initialized database connection.
    #[must_use]
    pub fn new(connection: &DatabaseConnection) -> Self {
        Self {
            pool: connection.pool().clone(),
        }
    }

    /// Query the single row for a cache key, if live or expired (the caller
    /// decides whether an expired row should be lazily deleted).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored row's JSON payload
    /// cannot be deserialized.
    pub async fn query_best(&self, key: &str) -> Result<Option<CacheEntry>, DatabaseError> {
        let row = sqlx::query(
            "SELECT cache_key, agent_name, software_name, version, response_data, \
             confidence_level, created_at, expires_at, source_url, verified, \
             verification_status, marked_as_failed \
             FROM eol_cache WHERE cache_key = ? \
             ORDER BY verified DESC, confidence_level DESC LIMIT 1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_entry).transpose()
    }

    /// Upsert a row by `cache_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn upsert(&self, entry: &CacheEntry) -> Result<(), DatabaseError> {
        let response_json = serde_json::to_string(&entry.response_data)?;

        sqlx::query(
            "INSERT INTO eol_cache \
             (cache_key, agent_name, software_name, version, response_data, \
              confidence_level, created_at, expires_at, source_url, verified, \
              verification_status, marked_as_failed) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(cache_key) DO UPDATE SET \
               agent_name = excluded.agent_name, \
               software_name = excluded.software_name, \
               version = excluded.version, \
               response_data = excluded.response_data, \
               confidence_level = excluded.confidence_level, \
               created_at = excluded.created_at, \
               expires_at = excluded.expires_at, \
               source_url = excluded.source_url, \
               verified = excluded.verified, \
               verification_status = excluded.verification_status, \
               marked_as_failed = excluded.marked_as_failed",
        )
        .bind(&entry.id)
        .bind(&entry.agent_name)
        .bind(&entry.software_name)
        .bind(&entry.version)
        .bind(response_json)
        .bind(entry.confidence_level)
        .bind(entry.created_at.timestamp())
        .bind(entry.expires_at.timestamp())
        .bind(&entry.source_url)
        .bind(entry.verified)
        .bind(&entry.verification_status)
        .bind(entry.marked_as_failed)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete a single row by cache key (best-effort lazy-delete-on-expiry).
    ///
    /// # Errors
    ///
    /// Returns an error if the delete statement fails.
    pub async fn delete(&self, key: &str) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM eol_cache WHERE cache_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Mass deletion by optional software/agent filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete statement fails.
    pub async fn purge(
        &self,
        software: Option<&str>,
        agent: Option<&str>,
    ) -> Result<u64, DatabaseError> {
        let result = match (software, agent) {
            (Some(software), Some(agent)) => {
                sqlx::query(
                    "DELETE FROM eol_cache WHERE lower(software_name) LIKE ? AND lower(agent_name) = ?",
                )
                .bind(format!("%{}%", software.to_lowercase()))
                .bind(agent.to_lowercase())
                .execute(&self.pool)
                .await?
            }
            (Some(software), None) => {
                sqlx::query("DELETE FROM eol_cache WHERE lower(software_name) LIKE ?")
                    .bind(format!("%{}%", software.to_lowercase()))
                    .execute(&self.pool)
                    .await?
            }
            (None, Some(agent)) => {
                sqlx::query("DELETE FROM eol_cache WHERE lower(agent_name) = ?")
                    .bind(agent.to_lowercase())
                    .execute(&self.pool)
                    .await?
            }
            (None, None) => {
                sqlx::query("DELETE FROM eol_cache")
                    .execute(&self.pool)
                    .await?
            }
        };
        Ok(result.rows_affected())
    }

    /// Aggregate counters across the whole table.
    ///
    /// # Errors
    ///
    /// Returns an error if either aggregate query fails.
    pub async fn stats(&self) -> Result<CacheStats, DatabaseError> {
        let now = Utc::now().timestamp();

        let totals = sqlx::query(
            "SELECT COUNT(*) AS total, \
             SUM(CASE WHEN expires_at > ? AND marked_as_failed = 0 THEN 1 ELSE 0 END) AS active \
             FROM eol_cache",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let total: i64 = totals.try_get("total")?;
        let active: i64 = totals.try_get::<Option<i64>, _>("active")?.unwrap_or(0);

        let per_agent_rows = sqlx::query("SELECT agent_name, COUNT(*) AS count FROM eol_cache GROUP BY agent_name")
            .fetch_all(&self.pool)
            .await?;

        let mut per_agent_counts = HashMap::new();
        for row in per_agent_rows {
            let agent: String = row.try_get("agent_name")?;
            let count: i64 = row.try_get("count")?;
            per_agent_counts.insert(agent, count.max(0) as u64);
        }

        Ok(CacheStats {
            total: total.max(0) as u64,
            active: active.max(0) as u64,
            expired: (total - active).max(0) as u64,
            per_agent_counts,
        })
    }

    fn row_to_entry(row: sqlx::sqlite::SqliteRow) -> Result<CacheEntry, DatabaseError> {
        let response_json: String = row.try_get("response_data")?;
        let response_data: EolEnvelope = serde_json::from_str(&response_json)?;
        let created_at: i64 = row.try_get("created_at")?;
        let expires_at: i64 = row.try_get("expires_at")?;

        Ok(CacheEntry {
            id: row.try_get("cache_key")?,
            agent_name: row.try_get("agent_name")?,
            software_name: row.try_get("software_name")?,
            version: row.try_get("version")?,
            response_data,
            confidence_level: row.try_get("confidence_level")?,
            created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
            expires_at: DateTime::from_timestamp(expires_at, 0).unwrap_or_else(Utc::now),
            source_url: row.try_get("source_url")?,
            verified: row.try_get("verified")?,
            verification_status: row.try_get("verification_status")?,
            marked_as_failed: row.try_get("marked_as_failed")?,
        })
    }
}
