use rust_decimal::Decimal;

use tempo_core::domain::client::{Client, ClientId};
use tempo_core::domain::service::{ServiceId, ServiceOffering};

use crate::connection::DbPool;
use crate::repositories::{
    InMemoryClientDirectory, InMemoryServiceCatalog, RepositoryError, SqlClientDirectory,
    SqlServiceCatalog,
};

struct ClientSeed {
    id: &'static str,
    name: &'static str,
    email: &'static str,
    company: &'static str,
    phone: &'static str,
}

struct ServiceSeed {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    base_price: i64,
    category: &'static str,
}

const CLIENT_SEEDS: &[ClientSeed] = &[
    ClientSeed {
        id: "1",
        name: "Sarah Johnson",
        email: "sarah@techcorp.com",
        company: "TechCorp Solutions",
        phone: "+1 (555) 123-4567",
    },
    ClientSeed {
        id: "2",
        name: "Michael Chen",
        email: "m.chen@innovate.io",
        company: "Innovate Digital",
        phone: "+1 (555) 987-6543",
    },
    ClientSeed {
        id: "3",
        name: "Emily Rodriguez",
        email: "emily@startupx.com",
        company: "StartupX",
        phone: "+1 (555) 456-7890",
    },
];

const SERVICE_SEEDS: &[ServiceSeed] = &[
    ServiceSeed {
        id: "1",
        name: "Brand Strategy Consultation",
        description: "Comprehensive brand positioning and strategy development",
        base_price: 5000,
        category: "Strategy",
    },
    ServiceSeed {
        id: "2",
        name: "Logo Design Package",
        description: "Complete logo design with 3 concepts and unlimited revisions",
        base_price: 2500,
        category: "Design",
    },
    ServiceSeed {
        id: "3",
        name: "Website Development",
        description: "Custom responsive website with CMS integration",
        base_price: 8000,
        category: "Development",
    },
    ServiceSeed {
        id: "4",
        name: "SEO Optimization",
        description: "3-month SEO campaign with keyword research and optimization",
        base_price: 3000,
        category: "Marketing",
    },
    ServiceSeed {
        id: "5",
        name: "Social Media Management",
        description: "Monthly social media content creation and management",
        base_price: 1500,
        category: "Marketing",
    },
    ServiceSeed {
        id: "6",
        name: "Content Writing",
        description: "Professional copywriting for web and marketing materials",
        base_price: 1200,
        category: "Content",
    },
];

/// Demo clients and service offerings used by `tempo seed` and by tests.
///
/// Ids are fixed so loading twice updates rows in place instead of duplicating them.
pub struct DemoDataset;

impl DemoDataset {
    pub fn clients() -> Vec<Client> {
        CLIENT_SEEDS
            .iter()
            .map(|seed| Client {
                id: ClientId(seed.id.to_string()),
                name: seed.name.to_string(),
                email: seed.email.to_string(),
                company: seed.company.to_string(),
                phone: Some(seed.phone.to_string()),
                created_at: None,
                updated_at: None,
            })
            .collect()
    }

    pub fn services() -> Vec<ServiceOffering> {
        SERVICE_SEEDS
            .iter()
            .map(|seed| ServiceOffering {
                id: ServiceId(seed.id.to_string()),
                name: seed.name.to_string(),
                description: seed.description.to_string(),
                base_price: Decimal::new(seed.base_price, 0),
                category: seed.category.to_string(),
                active: true,
            })
            .collect()
    }

    pub fn client_directory() -> InMemoryClientDirectory {
        InMemoryClientDirectory::with_clients(Self::clients())
    }

    pub fn service_catalog() -> InMemoryServiceCatalog {
        InMemoryServiceCatalog::with_services(Self::services())
    }

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let directory = SqlClientDirectory::new(pool.clone());
        let catalog = SqlServiceCatalog::new(pool.clone());

        let clients = Self::clients();
        for client in &clients {
            directory.upsert(client).await?;
        }

        let services = Self::services();
        for service in &services {
            catalog.upsert(service).await?;
        }

        tracing::info!(
            event_name = "db.fixtures.seeded",
            clients = clients.len(),
            services = services.len(),
            "demo dataset loaded"
        );

        Ok(SeedResult { clients_seeded: clients.len(), services_seeded: services.len() })
    }

    /// Checks every seeded row is present with the expected name and price.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for seed in CLIENT_SEEDS {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM client WHERE id = ?1 AND name = ?2 AND email = ?3)",
            )
            .bind(seed.id)
            .bind(seed.name)
            .bind(seed.email)
            .fetch_one(pool)
            .await?;
            checks.push((seed.name, present == 1));
        }

        let stored = SqlServiceCatalog::new(pool.clone()).list_all().await?;
        for seed in SERVICE_SEEDS {
            let present = stored.iter().any(|service| {
                service.id.0 == seed.id
                    && service.name == seed.name
                    && service.base_price == Decimal::new(seed.base_price, 0)
                    && service.active
            });
            checks.push((seed.name, present));
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedResult {
    pub clients_seeded: usize,
    pub services_seeded: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
