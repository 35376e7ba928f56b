use chrono::{DateTime, Utc};
use sqlx::Row;

use tempo_core::collaborators::{ClientDirectory, CollaboratorError};
use tempo_core::domain::client::{Client, ClientId, NewClient};

use super::RepositoryError;
use crate::DbPool;

const COLLABORATOR: &str = "client directory";

pub struct SqlClientDirectory {
    pool: DbPool,
}

impl SqlClientDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, email, company, phone, created_at, updated_at
             FROM client
             ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Client {
                id: ClientId(row.get("id")),
                name: row.get("name"),
                email: row.get("email"),
                company: row.get("company"),
                phone: row.get("phone"),
                created_at: row.get::<Option<DateTime<Utc>>, _>("created_at"),
                updated_at: row.get::<Option<DateTime<Utc>>, _>("updated_at"),
            })
            .collect())
    }

    /// Inserts or replaces a client under its existing id.
    pub async fn upsert(&self, client: &Client) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO client (id, name, email, company, phone, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                company = excluded.company,
                phone = excluded.phone,
                updated_at = excluded.updated_at",
        )
        .bind(&client.id.0)
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.company)
        .bind(&client.phone)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ClientDirectory for SqlClientDirectory {
    async fn list(&self) -> Result<Vec<Client>, CollaboratorError> {
        self.list_clients().await.map_err(|error| error.into_collaborator(COLLABORATOR))
    }

    async fn create(&self, client: NewClient) -> Result<Client, CollaboratorError> {
        client.validate().map_err(|error| CollaboratorError::rejected(COLLABORATOR, error))?;

        let created = client.into_client(ClientId::generate(), Utc::now());
        self.upsert(&created).await.map_err(|error| error.into_collaborator(COLLABORATOR))?;
        Ok(created)
    }
}
