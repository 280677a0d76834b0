//! `name_cache` key/value memo
//!
//! Values are stored as JSON text. A row with `expires_at` in the past is a
//! miss; rows without `expires_at` never expire.

use std::time::Duration;

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Pool, Sqlite};

use crate::error::AppResult;

#[derive(Clone)]
pub struct NameCacheRepository {
    pool: Pool<Sqlite>,
}

fn expiry(ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|d| Utc::now().timestamp() + d.as_secs() as i64)
}

impl NameCacheRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Cached value, or None when missing, expired or of another shape
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT value FROM name_cache WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(key)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await?;

        let Some((raw,)) = row else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding unreadable cache entry");
                Ok(None)
            }
        }
    }

    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Duration>) -> AppResult<()> {
        let raw = serde_json::to_string(value)?;
        sqlx::query("INSERT OR REPLACE INTO name_cache (key, value, expires_at) VALUES (?, ?, ?)")
            .bind(key)
            .bind(raw)
            .bind(expiry(ttl))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Write several entries in one transaction
    pub async fn set_many<T: Serialize>(&self, entries: &[(String, T)], ttl: Option<Duration>) -> AppResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let expires_at = expiry(ttl);
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            sqlx::query("INSERT OR REPLACE INTO name_cache (key, value, expires_at) VALUES (?, ?, ?)")
                .bind(key)
                .bind(serde_json::to_string(value)?)
                .bind(expires_at)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Delete expired rows, returning how many were removed
    pub async fn purge_expired(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM name_cache WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_pool;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = NameCacheRepository::new(test_pool().await);
        cache.set("wd-p27:Q1", &vec!["Q17".to_string()], None).await.unwrap();
        let got: Option<Vec<String>> = cache.get("wd-p27:Q1").await.unwrap();
        assert_eq!(got, Some(vec!["Q17".to_string()]));

        let missing: Option<Vec<String>> = cache.get("wd-p27:Q2").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = NameCacheRepository::new(test_pool().await);
        cache
            .set("nlk|9788937462788", &json!({"author": "x"}), Some(Duration::ZERO))
            .await
            .unwrap();
        let got: Option<serde_json::Value> = cache.get("nlk|9788937462788").await.unwrap();
        assert!(got.is_none());
        assert_eq!(cache.purge_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_many_and_replace() {
        let cache = NameCacheRepository::new(test_pool().await);
        let entries = vec![
            ("wikidata|가".to_string(), json!({"native": ["A"]})),
            ("wikidata|나".to_string(), json!({"native": []})),
        ];
        cache.set_many(&entries, None).await.unwrap();
        cache.set("wikidata|가", &json!({"native": ["B"]}), None).await.unwrap();

        let a: Option<serde_json::Value> = cache.get("wikidata|가").await.unwrap();
        assert_eq!(a, Some(json!({"native": ["B"]})));
        let b: Option<serde_json::Value> = cache.get("wikidata|나").await.unwrap();
        assert!(b.is_some());
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_a_miss() {
        let cache = NameCacheRepository::new(test_pool().await);
        cache.set("k", "text", None).await.unwrap();
        let got: Option<Vec<String>> = cache.get("k").await.unwrap();
        assert!(got.is_none());
    }
}
