use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use tempo_core::collaborators::{ClientDirectory, CollaboratorError, QuoteStore, ServiceCatalog};
use tempo_core::domain::client::{Client, ClientId, NewClient};
use tempo_core::domain::quote::{Quote, QuoteId};
use tempo_core::domain::service::ServiceOffering;
use tempo_core::engine::QuoteEngine;

#[derive(Default)]
pub struct InMemoryClientDirectory {
    clients: RwLock<Vec<Client>>,
}

impl InMemoryClientDirectory {
    pub fn with_clients(clients: Vec<Client>) -> Self {
        Self { clients: RwLock::new(clients) }
    }
}

#[async_trait::async_trait]
impl ClientDirectory for InMemoryClientDirectory {
    async fn list(&self) -> Result<Vec<Client>, CollaboratorError> {
        let clients = self.clients.read().await;
        Ok(clients.clone())
    }

    async fn create(&self, client: NewClient) -> Result<Client, CollaboratorError> {
        client
            .validate()
            .map_err(|error| CollaboratorError::rejected("client directory", error))?;

        let created = client.into_client(ClientId::generate(), Utc::now());
        let mut clients = self.clients.write().await;
        clients.push(created.clone());
        Ok(created)
    }
}

#[derive(Default)]
pub struct InMemoryServiceCatalog {
    services: RwLock<Vec<ServiceOffering>>,
}

impl InMemoryServiceCatalog {
    pub fn with_services(services: Vec<ServiceOffering>) -> Self {
        Self { services: RwLock::new(services) }
    }
}

#[async_trait::async_trait]
impl ServiceCatalog for InMemoryServiceCatalog {
    async fn list(&self) -> Result<Vec<ServiceOffering>, CollaboratorError> {
        let services = self.services.read().await;
        Ok(services.iter().filter(|service| service.active).cloned().collect())
    }
}

/// Quote store backed by a map owned by the store value itself.
#[derive(Default)]
pub struct InMemoryQuoteStore {
    engine: QuoteEngine,
    quotes: RwLock<HashMap<QuoteId, Quote>>,
}

impl InMemoryQuoteStore {
    pub fn new(engine: QuoteEngine) -> Self {
        Self { engine, quotes: RwLock::new(HashMap::new()) }
    }

    pub async fn len(&self) -> usize {
        self.quotes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.quotes.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl QuoteStore for InMemoryQuoteStore {
    async fn create(&self) -> Result<Quote, CollaboratorError> {
        let quote = self.engine.create_quote();
        let mut quotes = self.quotes.write().await;
        quotes.insert(quote.id.clone(), quote.clone());
        Ok(quote)
    }

    async fn save(&self, mut quote: Quote) -> Result<Quote, CollaboratorError> {
        let mut quotes = self.quotes.write().await;
        if !quotes.contains_key(&quote.id) {
            return Err(CollaboratorError::NotFound { entity: "quote", id: quote.id.0 });
        }

        quote.updated_at = Utc::now().max(quote.created_at);
        quotes.insert(quote.id.clone(), quote.clone());
        Ok(quote)
    }

    async fn find(&self, id: &QuoteId) -> Result<Option<Quote>, CollaboratorError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use tempo_core::collaborators::{
        ClientDirectory, CollaboratorError, QuoteStore, ServiceCatalog,
    };
    use tempo_core::domain::client::NewClient;
    use tempo_core::domain::quote::QuoteId;
    use tempo_core::domain::service::{ServiceId, ServiceOffering};
    use tempo_core::engine::{QuoteEngine, QuoteSettings};

    use crate::repositories::{InMemoryClientDirectory, InMemoryQuoteStore, InMemoryServiceCatalog};

    #[tokio::test]
    async fn save_of_created_quote_keeps_id_and_orders_timestamps() {
        let store = InMemoryQuoteStore::default();
        let created = store.create().await.expect("create");

        let saved = store.save(created.clone()).await.expect("save");
        assert_eq!(saved.id, created.id);
        assert!(saved.updated_at >= saved.created_at);
        assert_eq!(store.find(&created.id).await.expect("find"), Some(saved));
    }

    #[tokio::test]
    async fn updated_at_never_precedes_created_at() {
        let store = InMemoryQuoteStore::default();
        let mut quote = store.create().await.expect("create");
        quote.created_at = Utc::now() + Duration::hours(1);

        let saved = store.save(quote.clone()).await.expect("save");
        assert_eq!(saved.updated_at, quote.created_at);
    }

    #[tokio::test]
    async fn saving_an_unknown_quote_is_not_found() {
        let store = InMemoryQuoteStore::default();
        let stray = QuoteEngine::default().create_quote();

        let error = store.save(stray.clone()).await.expect_err("unknown id");
        assert_eq!(error, CollaboratorError::NotFound { entity: "quote", id: stray.id.0 });
        assert!(store.is_empty().await);
        assert_eq!(store.find(&QuoteId("quote-missing".to_string())).await.expect("find"), None);
    }

    #[tokio::test]
    async fn store_creates_quotes_with_its_engine_settings() {
        let store = InMemoryQuoteStore::new(QuoteEngine::with_settings(QuoteSettings {
            validity_days: 7,
            currency: "EUR".to_string(),
        }));
        let quote = store.create().await.expect("create");

        assert_eq!(quote.valid_until - quote.created_at, Duration::days(7));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn catalog_lists_only_active_offerings() {
        let offering = |id: &str, active: bool| ServiceOffering {
            id: ServiceId(id.to_string()),
            name: format!("Service {id}"),
            description: String::new(),
            base_price: Decimal::new(100, 0),
            category: "Content".to_string(),
            active,
        };
        let catalog =
            InMemoryServiceCatalog::with_services(vec![offering("1", true), offering("2", false)]);

        let listed = catalog.list().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, ServiceId("1".to_string()));
    }

    #[tokio::test]
    async fn directory_assigns_ids_and_rejects_blank_fields() {
        let directory = InMemoryClientDirectory::default();
        let created = directory
            .create(NewClient {
                name: " Michael Chen ".to_string(),
                email: "m.chen@innovate.io".to_string(),
                company: "Innovate Digital".to_string(),
                phone: Some("+1 (555) 987-6543".to_string()),
            })
            .await
            .expect("create");

        assert!(created.id.0.starts_with("client-"));
        assert_eq!(created.name, "Michael Chen");
        assert_eq!(directory.list().await.expect("list"), vec![created]);

        let error = directory
            .create(NewClient {
                name: "Nameless".to_string(),
                email: " ".to_string(),
                company: "Nowhere".to_string(),
                phone: None,
            })
            .await
            .expect_err("blank email");
        assert!(matches!(error, CollaboratorError::Rejected { .. }));
    }
}
