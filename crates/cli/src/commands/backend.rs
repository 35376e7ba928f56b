use std::sync::Arc;

use tempo_core::collaborators::{ClientDirectory, NotificationSender, QuoteStore, ServiceCatalog};
use tempo_core::config::{AppConfig, StoreBackend};
use tempo_core::flows::Collaborators;
use tempo_core::{HtmlDocumentRenderer, QuoteEngine};
use tempo_db::{
    connect_with_config, migrations, DbPool, DemoDataset, InMemoryQuoteStore,
    SqlClientDirectory, SqlQuoteStore, SqlServiceCatalog,
};

use super::CommandFailure;

/// Collaborators wired for the configured store backend.
///
/// The memory backend serves the demo dataset and forgets quotes on exit.
/// The SQLite backend migrates on open so every command sees the current schema.
pub struct Backend {
    pub clients: Arc<dyn ClientDirectory>,
    pub catalog: Arc<dyn ServiceCatalog>,
    pool: Option<DbPool>,
    config: AppConfig,
}

impl Backend {
    pub async fn open(config: &AppConfig) -> Result<Self, CommandFailure> {
        match config.store.backend {
            StoreBackend::Memory => Ok(Self {
                clients: Arc::new(DemoDataset::client_directory()),
                catalog: Arc::new(DemoDataset::service_catalog()),
                pool: None,
                config: config.clone(),
            }),
            StoreBackend::Sqlite => {
                let pool = connect_with_config(&config.store)
                    .await
                    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
                migrations::run_pending(&pool)
                    .await
                    .map_err(|error| ("migration", error.to_string(), 5u8))?;

                Ok(Self {
                    clients: Arc::new(SqlClientDirectory::new(pool.clone())),
                    catalog: Arc::new(SqlServiceCatalog::new(pool.clone())),
                    pool: Some(pool),
                    config: config.clone(),
                })
            }
        }
    }

    pub fn collaborators(
        &self,
        sender: Arc<dyn NotificationSender>,
    ) -> Result<Collaborators, CommandFailure> {
        let engine = QuoteEngine::with_settings(self.config.quote_settings());
        let store: Arc<dyn QuoteStore> = match &self.pool {
            Some(pool) => Arc::new(SqlQuoteStore::new(pool.clone(), engine)),
            None => Arc::new(InMemoryQuoteStore::new(engine)),
        };

        let delivery = &self.config.delivery;
        let renderer =
            HtmlDocumentRenderer::new(&delivery.document_base_url, &delivery.output_dir)
                .map_err(|error| ("document_template", error.to_string(), 10u8))?
                .with_sender_name(&delivery.sender_name)
                .with_currency(&self.config.quotes.currency);

        Ok(Collaborators::new(
            self.clients.clone(),
            self.catalog.clone(),
            store,
            sender,
            Arc::new(renderer),
        ))
    }

    pub async fn close(self) {
        if let Some(pool) = self.pool {
            pool.close().await;
        }
    }
}
