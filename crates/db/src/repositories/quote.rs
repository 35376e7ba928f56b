use chrono::Utc;
use sqlx::Row;

use tempo_core::collaborators::{CollaboratorError, QuoteStore};
use tempo_core::domain::quote::{Quote, QuoteId, QuoteStatus};
use tempo_core::engine::QuoteEngine;

use super::RepositoryError;
use crate::DbPool;

const COLLABORATOR: &str = "quote store";

/// Quotes are stored whole as a JSON payload. Status, client and timestamps
/// are copied into their own columns for querying.
pub struct SqlQuoteStore {
    pool: DbPool,
    engine: QuoteEngine,
}

impl SqlQuoteStore {
    pub fn new(pool: DbPool, engine: QuoteEngine) -> Self {
        Self { pool, engine }
    }

    pub async fn insert(&self, quote: &Quote) -> Result<(), RepositoryError> {
        let payload = serde_json::to_string(quote)?;
        sqlx::query(
            "INSERT INTO quote (id, status, client_id, payload_json, created_at, updated_at, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&quote.id.0)
        .bind(quote.status.as_str())
        .bind(quote.client.as_ref().map(|client| client.id.0.as_str()))
        .bind(payload)
        .bind(quote.created_at)
        .bind(quote.updated_at)
        .bind(quote.sent_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Replaces the stored quote; returns `false` when no row has that id.
    pub async fn update(&self, quote: &Quote) -> Result<bool, RepositoryError> {
        let payload = serde_json::to_string(quote)?;
        let result = sqlx::query(
            "UPDATE quote
             SET status = ?2, client_id = ?3, payload_json = ?4, updated_at = ?5, sent_at = ?6
             WHERE id = ?1",
        )
        .bind(&quote.id.0)
        .bind(quote.status.as_str())
        .bind(quote.client.as_ref().map(|client| client.id.0.as_str()))
        .bind(payload)
        .bind(quote.updated_at)
        .bind(quote.sent_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(&self, id: &QuoteId) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query("SELECT payload_json FROM quote WHERE id = ?1")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            let payload: String = row.get("payload_json");
            serde_json::from_str::<Quote>(&payload).map_err(RepositoryError::from)
        })
        .transpose()
    }

    pub async fn list_by_status(&self, status: QuoteStatus) -> Result<Vec<Quote>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT payload_json FROM quote WHERE status = ?1 ORDER BY created_at, rowid",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let payload: String = row.get("payload_json");
                serde_json::from_str::<Quote>(&payload).map_err(RepositoryError::from)
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl QuoteStore for SqlQuoteStore {
    async fn create(&self) -> Result<Quote, CollaboratorError> {
        let quote = self.engine.create_quote();
        self.insert(&quote).await.map_err(|error| error.into_collaborator(COLLABORATOR))?;
        Ok(quote)
    }

    async fn save(&self, mut quote: Quote) -> Result<Quote, CollaboratorError> {
        quote.updated_at = Utc::now().max(quote.created_at);
        let updated =
            self.update(&quote).await.map_err(|error| error.into_collaborator(COLLABORATOR))?;
        if !updated {
            return Err(CollaboratorError::NotFound { entity: "quote", id: quote.id.0 });
        }
        Ok(quote)
    }

    async fn find(&self, id: &QuoteId) -> Result<Option<Quote>, CollaboratorError> {
        self.find_by_id(id).await.map_err(|error| error.into_collaborator(COLLABORATOR))
    }
}
