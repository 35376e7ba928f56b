use thiserror::Error;

use tempo_core::collaborators::CollaboratorError;

pub mod client;
pub mod memory;
pub mod quote;
pub mod service;

pub use client::SqlClientDirectory;
pub use memory::{InMemoryClientDirectory, InMemoryQuoteStore, InMemoryServiceCatalog};
pub use quote::SqlQuoteStore;
pub use service::SqlServiceCatalog;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl RepositoryError {
    pub fn into_collaborator(self, collaborator: &'static str) -> CollaboratorError {
        CollaboratorError::unavailable(collaborator, self)
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}
