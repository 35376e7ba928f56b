use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::client::Client;
use crate::domain::service::{ServiceId, ServiceOffering};
use crate::errors::{DomainError, TransitionBlocker};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

impl QuoteId {
    pub fn generate() -> Self {
        Self(format!("quote-{}", Uuid::new_v4()))
    }
}

impl std::fmt::Display for QuoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    Expired,
}

impl QuoteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteLineItem {
    pub service: ServiceOffering,
    pub quantity: u32,
    pub override_price: Option<Decimal>,
    pub notes: Option<String>,
}

impl QuoteLineItem {
    pub fn effective_price(&self) -> Decimal {
        self.override_price.unwrap_or(self.service.base_price)
    }

    /// `None` when the product does not fit in a `Decimal`.
    pub fn checked_line_total(&self) -> Option<Decimal> {
        self.effective_price().checked_mul(Decimal::from(self.quantity))
    }

    /// Saturates at `Decimal::MAX`; see [`Quote::checked_subtotal`].
    pub fn line_total(&self) -> Decimal {
        self.effective_price().saturating_mul(Decimal::from(self.quantity))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub client: Option<Client>,
    pub items: Vec<QuoteLineItem>,
    pub discount_pct: Decimal,
    pub notes: String,
    pub valid_until: DateTime<Utc>,
    pub status: QuoteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl Quote {
    pub fn position_of(&self, service_id: &ServiceId) -> Option<usize> {
        self.items.iter().position(|item| &item.service.id == service_id)
    }

    pub fn line_for(&self, service_id: &ServiceId) -> Option<&QuoteLineItem> {
        self.items.iter().find(|item| &item.service.id == service_id)
    }

    /// Sum of line totals, or `None` if any step overflows.
    pub fn checked_subtotal(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.checked_line_total()?))
    }

    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        matches!(
            (self.status, next),
            (QuoteStatus::Draft, QuoteStatus::Sent)
                | (QuoteStatus::Sent, QuoteStatus::Accepted)
                | (QuoteStatus::Sent, QuoteStatus::Rejected)
                | (QuoteStatus::Sent, QuoteStatus::Expired)
        )
    }

    /// Checks everything `transition_to(Sent)` needs, in reporting order.
    pub fn send_blocker(&self) -> Option<TransitionBlocker> {
        if !self.can_transition_to(QuoteStatus::Sent) {
            return Some(TransitionBlocker::WrongStatus(self.status));
        }
        if self.client.is_none() {
            return Some(TransitionBlocker::MissingClient);
        }
        if self.items.is_empty() {
            return Some(TransitionBlocker::NoLineItems);
        }
        None
    }

    pub fn transition_to(
        &mut self,
        next: QuoteStatus,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let blocker = match next {
            QuoteStatus::Sent => self.send_blocker(),
            _ if self.can_transition_to(next) => None,
            _ => Some(TransitionBlocker::WrongStatus(self.status)),
        };

        if let Some(blocker) = blocker {
            return Err(DomainError::InvalidTransition { from: self.status, to: next, blocker });
        }

        self.status = next;
        if next == QuoteStatus::Sent {
            self.sent_at = Some(now);
        }
        Ok(())
    }

    pub(crate) fn ensure_editable(&self) -> Result<(), DomainError> {
        match self.status {
            QuoteStatus::Draft => Ok(()),
            status => Err(DomainError::QuoteLocked { status }),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use crate::domain::client::{Client, ClientId};
    use crate::domain::service::{ServiceId, ServiceOffering};
    use crate::errors::{DomainError, TransitionBlocker};

    use super::{Quote, QuoteId, QuoteLineItem, QuoteStatus};

    fn quote(status: QuoteStatus) -> Quote {
        let now = Utc::now();
        Quote {
            id: QuoteId("quote-1".to_string()),
            client: Some(Client {
                id: ClientId("1".to_string()),
                name: "Sarah Johnson".to_string(),
                email: "sarah@techcorp.com".to_string(),
                company: "TechCorp Solutions".to_string(),
                phone: None,
                created_at: None,
                updated_at: None,
            }),
            items: vec![QuoteLineItem {
                service: ServiceOffering {
                    id: ServiceId("2".to_string()),
                    name: "Logo Design Package".to_string(),
                    description: "Complete logo design".to_string(),
                    base_price: Decimal::new(2500, 0),
                    category: "Design".to_string(),
                    active: true,
                },
                quantity: 2,
                override_price: None,
                notes: None,
            }],
            discount_pct: Decimal::ZERO,
            notes: String::new(),
            valid_until: now + Duration::days(30),
            status,
            created_at: now,
            updated_at: now,
            sent_at: None,
        }
    }

    #[test]
    fn effective_price_prefers_override_even_when_zero() {
        let mut item = quote(QuoteStatus::Draft).items.remove(0);
        assert_eq!(item.effective_price(), Decimal::new(2500, 0));

        item.override_price = Some(Decimal::ZERO);
        assert_eq!(item.effective_price(), Decimal::ZERO);
        assert_eq!(item.line_total(), Decimal::ZERO);
    }

    #[test]
    fn draft_to_sent_stamps_sent_at() {
        let mut quote = quote(QuoteStatus::Draft);
        let now = Utc::now();
        quote.transition_to(QuoteStatus::Sent, now).expect("draft -> sent");

        assert_eq!(quote.status, QuoteStatus::Sent);
        assert_eq!(quote.sent_at, Some(now));
    }

    #[test]
    fn terminal_states_are_only_reachable_from_sent() {
        let mut draft = quote(QuoteStatus::Draft);
        let error = draft
            .transition_to(QuoteStatus::Accepted, Utc::now())
            .expect_err("draft -> accepted should fail");
        assert_eq!(
            error,
            DomainError::InvalidTransition {
                from: QuoteStatus::Draft,
                to: QuoteStatus::Accepted,
                blocker: TransitionBlocker::WrongStatus(QuoteStatus::Draft),
            }
        );

        let mut sent = quote(QuoteStatus::Sent);
        sent.transition_to(QuoteStatus::Expired, Utc::now()).expect("sent -> expired");
        assert_eq!(sent.status, QuoteStatus::Expired);
        assert!(!sent.can_transition_to(QuoteStatus::Sent));
    }

    #[test]
    fn send_blocker_reports_status_before_missing_data() {
        let mut sent = quote(QuoteStatus::Sent);
        sent.client = None;
        sent.items.clear();
        assert_eq!(sent.send_blocker(), Some(TransitionBlocker::WrongStatus(QuoteStatus::Sent)));

        let mut draft = quote(QuoteStatus::Draft);
        draft.client = None;
        draft.items.clear();
        assert_eq!(draft.send_blocker(), Some(TransitionBlocker::MissingClient));
    }

    #[test]
    fn line_lookup_by_service_id() {
        let quote = quote(QuoteStatus::Draft);
        assert_eq!(quote.line_for(&ServiceId("2".to_string())).map(|item| item.quantity), Some(2));
        assert!(quote.line_for(&ServiceId("99".to_string())).is_none());
        assert_eq!(quote.position_of(&ServiceId("2".to_string())), Some(0));
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&QuoteStatus::Accepted).expect("serialize status");
        assert_eq!(json, "\"accepted\"");
        assert_eq!(QuoteStatus::Sent.as_str(), "sent");
    }
}
