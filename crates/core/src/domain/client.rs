use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cpq::validation::ValidationIssue;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn generate() -> Self {
        Self(format!("client-{}", Uuid::new_v4()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub email: String,
    pub company: String,
    pub phone: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Directory input for a client that has not been assigned an id yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub company: String,
    pub phone: Option<String>,
}

impl NewClient {
    pub fn validate(&self) -> Result<(), DomainError> {
        let blank = [("name", &self.name), ("email", &self.email), ("company", &self.company)]
            .into_iter()
            .find(|(_, value)| value.trim().is_empty());

        match blank {
            Some((field, _)) => {
                Err(ValidationIssue::BlankClientField { field: field.to_owned() }.into())
            }
            None => Ok(()),
        }
    }

    pub fn into_client(self, id: ClientId, now: DateTime<Utc>) -> Client {
        Client {
            id,
            name: self.name.trim().to_owned(),
            email: self.email.trim().to_owned(),
            company: self.company.trim().to_owned(),
            phone: self.phone.filter(|phone| !phone.trim().is_empty()),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// Case-insensitive match on name, company or email. A blank term matches everything.
pub fn search_clients<'a>(clients: &'a [Client], term: &str) -> Vec<&'a Client> {
    let needle = term.trim().to_lowercase();
    clients
        .iter()
        .filter(|client| {
            needle.is_empty()
                || client.name.to_lowercase().contains(&needle)
                || client.company.to_lowercase().contains(&needle)
                || client.email.to_lowercase().contains(&needle)
        })
        .collect()
}
