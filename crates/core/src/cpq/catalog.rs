use std::collections::BTreeSet;

use crate::domain::service::{ServiceId, ServiceOffering};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceFilter {
    pub search: Option<String>,
    /// `None` selects every category.
    pub category: Option<String>,
}

/// Read-only view over the offerings the catalog collaborator returned.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    services: Vec<ServiceOffering>,
}

impl Catalog {
    pub fn new(services: Vec<ServiceOffering>) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &[ServiceOffering] {
        &self.services
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn find(&self, service_id: &ServiceId) -> Option<&ServiceOffering> {
        self.services.iter().find(|service| &service.id == service_id)
    }

    pub fn active(&self) -> impl Iterator<Item = &ServiceOffering> {
        self.services.iter().filter(|service| service.active)
    }

    pub fn categories(&self) -> Vec<String> {
        self.services
            .iter()
            .map(|service| service.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn filter(&self, filter: &ServiceFilter) -> Vec<&ServiceOffering> {
        let needle = filter.search.as_deref().map(str::trim).unwrap_or_default().to_lowercase();

        self.services
            .iter()
            .filter(|service| {
                needle.is_empty()
                    || service.name.to_lowercase().contains(&needle)
                    || service.description.to_lowercase().contains(&needle)
            })
            .filter(|service| {
                filter.category.as_deref().map_or(true, |category| service.category == category)
            })
            .collect()
    }
}
