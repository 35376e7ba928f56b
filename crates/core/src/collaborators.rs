//! Narrow interfaces to the systems a quote session talks to.
//!
//! Implementations live next to their storage (`tempo-db`) or delivery
//! mechanism (`crate::delivery`); the session only ever sees these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::client::{Client, NewClient};
use crate::domain::quote::{Quote, QuoteId};
use crate::domain::service::ServiceOffering;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{collaborator} is unavailable: {message}")]
    Unavailable { collaborator: &'static str, message: String },
    #[error("{collaborator} rejected the request: {message}")]
    Rejected { collaborator: &'static str, message: String },
}

impl CollaboratorError {
    pub fn unavailable(collaborator: &'static str, message: impl ToString) -> Self {
        Self::Unavailable { collaborator, message: message.to_string() }
    }

    pub fn rejected(collaborator: &'static str, message: impl ToString) -> Self {
        Self::Rejected { collaborator, message: message.to_string() }
    }
}

#[async_trait]
pub trait ClientDirectory: Send + Sync {
    async fn list(&self) -> Result<Vec<Client>, CollaboratorError>;
    async fn create(&self, client: NewClient) -> Result<Client, CollaboratorError>;
}

#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Active offerings only.
    async fn list(&self) -> Result<Vec<ServiceOffering>, CollaboratorError>;
}

#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn create(&self) -> Result<Quote, CollaboratorError>;
    /// Replaces the stored copy and returns it with a refreshed `updated_at`.
    async fn save(&self, quote: Quote) -> Result<Quote, CollaboratorError>;
    async fn find(&self, id: &QuoteId) -> Result<Option<Quote>, CollaboratorError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendQuoteRequest {
    pub quote_id: QuoteId,
    pub recipient_email: String,
    pub recipient_name: String,
    pub message: String,
    pub attach_rendering: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub message_id: Option<String>,
}

impl SendOutcome {
    pub fn delivered(message_id: impl Into<String>) -> Self {
        Self { success: true, error: None, message_id: Some(message_id.into()) }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), message_id: None }
    }
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, request: SendQuoteRequest) -> Result<SendOutcome, CollaboratorError>;
}

#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Location the rendered quote can be fetched from.
    async fn render(&self, quote: &Quote) -> Result<String, CollaboratorError>;
    async fn download(&self, quote: &Quote) -> Result<(), CollaboratorError>;
}
