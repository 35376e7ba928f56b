use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use tempo_core::collaborators::{CollaboratorError, ServiceCatalog};
use tempo_core::domain::service::{ServiceId, ServiceOffering};

use super::RepositoryError;
use crate::DbPool;

pub struct SqlServiceCatalog {
    pool: DbPool,
}

impl SqlServiceCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Every offering, including retired ones.
    pub async fn list_all(&self) -> Result<Vec<ServiceOffering>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, description, base_price, category, active
             FROM service_offering
             ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(service_from_row).collect()
    }

    pub async fn list_active(&self) -> Result<Vec<ServiceOffering>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, description, base_price, category, active
             FROM service_offering
             WHERE active = 1
             ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(service_from_row).collect()
    }

    pub async fn upsert(&self, service: &ServiceOffering) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO service_offering (id, name, description, base_price, category, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                base_price = excluded.base_price,
                category = excluded.category,
                active = excluded.active",
        )
        .bind(&service.id.0)
        .bind(&service.name)
        .bind(&service.description)
        .bind(service.base_price.to_string())
        .bind(&service.category)
        .bind(service.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn service_from_row(row: &SqliteRow) -> Result<ServiceOffering, RepositoryError> {
    let id: String = row.get("id");
    let raw_price: String = row.get("base_price");
    let base_price = Decimal::from_str(&raw_price).map_err(|error| {
        RepositoryError::Decode(format!("service `{id}` has invalid base_price `{raw_price}`: {error}"))
    })?;

    Ok(ServiceOffering {
        id: ServiceId(id),
        name: row.get("name"),
        description: row.get("description"),
        base_price,
        category: row.get("category"),
        active: row.get("active"),
    })
}

#[async_trait::async_trait]
impl ServiceCatalog for SqlServiceCatalog {
    async fn list(&self) -> Result<Vec<ServiceOffering>, CollaboratorError> {
        self.list_active().await.map_err(|error| error.into_collaborator("service catalog"))
    }
}
