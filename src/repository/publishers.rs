//! Publisher directory, imprint map and region codes

use sqlx::{Pool, Sqlite, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::publisher::{
        CreateImprint, CreatePublisher, CreateRegion, ImportReport, Imprint, Publisher, Region,
        RegistryImport,
    },
    text::publisher::{normalize_publisher_name, normalize_stage2},
};

/// Stage-two key of a raw name
fn stage2_key(name: &str) -> String {
    normalize_stage2(&normalize_publisher_name(name))
}

fn unique_violation(e: sqlx::Error, what: &str) -> AppError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => AppError::Conflict(format!("{} already exists", what)),
        _ => AppError::Database(e),
    }
}

#[derive(Clone)]
pub struct PublishersRepository {
    pool: Pool<Sqlite>,
}

impl PublishersRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // LOOKUPS
    // =========================================================================

    /// First publisher whose normalised name equals `normalized`
    pub async fn find_by_normalized_name(&self, normalized: &str) -> AppResult<Option<Publisher>> {
        if normalized.is_empty() {
            return Ok(None);
        }
        let publisher = sqlx::query_as::<_, Publisher>(
            "SELECT id, name, normalized_name, address, phone FROM publishers WHERE normalized_name = ? ORDER BY id LIMIT 1",
        )
        .bind(normalized)
        .fetch_optional(&self.pool)
        .await?;
        Ok(publisher)
    }

    /// First publisher matching on the looser stage-two key
    pub async fn find_by_stage2(&self, name: &str) -> AppResult<Option<Publisher>> {
        let key = stage2_key(name);
        if key.is_empty() {
            return Ok(None);
        }
        let publishers = self.list_publishers(None).await?;
        Ok(publishers.into_iter().find(|p| stage2_key(&p.name) == key))
    }

    /// Parent publisher name of an imprint, matched on the normalised imprint
    pub async fn publisher_for_imprint(&self, normalized: &str) -> AppResult<Option<String>> {
        if normalized.is_empty() {
            return Ok(None);
        }
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT publisher_name FROM imprints WHERE normalized_imprint = ? ORDER BY id LIMIT 1",
        )
        .bind(normalized)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(name,)| name))
    }

    /// Parent publisher of an imprint matched on the stage-two key
    pub async fn publisher_for_imprint_stage2(&self, name: &str) -> AppResult<Option<String>> {
        let key = stage2_key(name);
        if key.is_empty() {
            return Ok(None);
        }
        let imprints = self.list_imprints().await?;
        Ok(imprints
            .into_iter()
            .find(|i| stage2_key(&i.imprint_name) == key)
            .map(|i| i.publisher_name))
    }

    // =========================================================================
    // PUBLISHERS
    // =========================================================================

    pub async fn list_publishers(&self, q: Option<&str>) -> AppResult<Vec<Publisher>> {
        let publishers = match q.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => {
                sqlx::query_as::<_, Publisher>(
                    "SELECT id, name, normalized_name, address, phone FROM publishers \
                     WHERE name LIKE ? OR normalized_name LIKE ? ORDER BY name",
                )
                .bind(format!("%{}%", q))
                .bind(format!("%{}%", normalize_publisher_name(q)))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Publisher>(
                    "SELECT id, name, normalized_name, address, phone FROM publishers ORDER BY name",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(publishers)
    }

    pub async fn create_publisher(&self, data: &CreatePublisher) -> AppResult<Publisher> {
        let publisher = sqlx::query_as::<_, Publisher>(
            r#"
            INSERT INTO publishers (name, normalized_name, address, phone)
            VALUES (?, ?, ?, ?)
            RETURNING id, name, normalized_name, address, phone
            "#,
        )
        .bind(data.name.trim())
        .bind(normalize_publisher_name(&data.name))
        .bind(data.address.trim())
        .bind(data.phone.as_deref().map(str::trim))
        .fetch_one(&self.pool)
        .await?;
        Ok(publisher)
    }

    pub async fn delete_publisher(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM publishers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Publisher {} not found", id)));
        }
        Ok(())
    }

    // =========================================================================
    // REGIONS
    // =========================================================================

    pub async fn list_regions(&self) -> AppResult<Vec<Region>> {
        let regions = sqlx::query_as::<_, Region>("SELECT id, region, country_code FROM regions ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(regions)
    }

    pub async fn create_region(&self, data: &CreateRegion) -> AppResult<Region> {
        sqlx::query_as::<_, Region>(
            "INSERT INTO regions (region, country_code) VALUES (?, ?) RETURNING id, region, country_code",
        )
        .bind(data.region.trim())
        .bind(data.country_code.trim().to_lowercase())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, &format!("Region '{}'", data.region.trim())))
    }

    pub async fn delete_region(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM regions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Region {} not found", id)));
        }
        Ok(())
    }

    // =========================================================================
    // IMPRINTS
    // =========================================================================

    pub async fn list_imprints(&self) -> AppResult<Vec<Imprint>> {
        let imprints = sqlx::query_as::<_, Imprint>(
            "SELECT id, publisher_name, imprint_name, normalized_imprint FROM imprints ORDER BY publisher_name, imprint_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(imprints)
    }

    pub async fn create_imprint(&self, data: &CreateImprint) -> AppResult<Imprint> {
        let (publisher, imprint) = data.resolve()?;
        let imprint = sqlx::query_as::<_, Imprint>(
            r#"
            INSERT INTO imprints (publisher_name, imprint_name, normalized_imprint)
            VALUES (?, ?, ?)
            RETURNING id, publisher_name, imprint_name, normalized_imprint
            "#,
        )
        .bind(&publisher)
        .bind(&imprint)
        .bind(normalize_publisher_name(&imprint))
        .fetch_one(&self.pool)
        .await?;
        Ok(imprint)
    }

    pub async fn delete_imprint(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM imprints WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Imprint {} not found", id)));
        }
        Ok(())
    }

    // =========================================================================
    // IMPORT
    // =========================================================================

    /// Upsert a registry bundle in one transaction
    ///
    /// Publishers are keyed on their normalised name, regions on the region
    /// name and imprints on (publisher, normalised imprint).
    pub async fn import(&self, bundle: &RegistryImport) -> AppResult<ImportReport> {
        let mut report = ImportReport::default();
        let mut tx = self.pool.begin().await?;

        for publisher in &bundle.publishers {
            upsert_publisher(&mut tx, publisher).await?;
            report.publishers += 1;
        }

        for region in &bundle.regions {
            sqlx::query(
                r#"
                INSERT INTO regions (region, country_code) VALUES (?, ?)
                ON CONFLICT(region) DO UPDATE SET country_code = excluded.country_code
                "#,
            )
            .bind(region.region.trim())
            .bind(region.country_code.trim().to_lowercase())
            .execute(&mut *tx)
            .await?;
            report.regions += 1;
        }

        for entry in &bundle.imprints {
            let (publisher, imprint) = entry.resolve()?;
            let normalized = normalize_publisher_name(&imprint);
            let exists: Option<(i64,)> = sqlx::query_as(
                "SELECT id FROM imprints WHERE publisher_name = ? AND normalized_imprint = ?",
            )
            .bind(&publisher)
            .bind(&normalized)
            .fetch_optional(&mut *tx)
            .await?;
            if exists.is_some() {
                continue;
            }
            sqlx::query("INSERT INTO imprints (publisher_name, imprint_name, normalized_imprint) VALUES (?, ?, ?)")
                .bind(&publisher)
                .bind(&imprint)
                .bind(&normalized)
                .execute(&mut *tx)
                .await?;
            report.imprints += 1;
        }

        tx.commit().await?;
        tracing::info!(
            publishers = report.publishers,
            regions = report.regions,
            imprints = report.imprints,
            "Registry import committed"
        );
        Ok(report)
    }
}

async fn upsert_publisher(tx: &mut Transaction<'_, Sqlite>, data: &CreatePublisher) -> AppResult<()> {
    let normalized = normalize_publisher_name(&data.name);
    let phone = data.phone.as_deref().map(str::trim);
    let updated = sqlx::query(
        "UPDATE publishers SET name = ?, address = ?, phone = COALESCE(?, phone) WHERE normalized_name = ?",
    )
    .bind(data.name.trim())
    .bind(data.address.trim())
    .bind(phone)
    .bind(&normalized)
    .execute(&mut **tx)
    .await?;
    if updated.rows_affected() == 0 {
        sqlx::query("INSERT INTO publishers (name, normalized_name, address, phone) VALUES (?, ?, ?, ?)")
            .bind(data.name.trim())
            .bind(&normalized)
            .bind(data.address.trim())
            .bind(phone)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}
