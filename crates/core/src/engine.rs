//! Quote Engine: the pricing and lifecycle rules a quote goes through while it
//! is being built.
//!
//! Every edit takes the quote by `&mut` and either applies completely or
//! returns an error with the quote untouched. Bounds problems on positional
//! edits are treated as no-ops so UI callers never fail on a stale index.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::cpq::pricing::{DeterministicPricingEngine, PricingEngine, PricingResult};
use crate::cpq::validation::{self, discount_in_range, ValidationIssue};
use crate::cpq::QuoteCalculation;
use crate::domain::client::Client;
use crate::domain::quote::{Quote, QuoteId, QuoteLineItem, QuoteStatus};
use crate::domain::service::ServiceOffering;
use crate::errors::DomainError;
use crate::flows::states::WizardStep;

pub const DEFAULT_VALIDITY_DAYS: u32 = 30;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteSettings {
    pub validity_days: u32,
    pub currency: String,
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self { validity_days: DEFAULT_VALIDITY_DAYS, currency: "USD".to_string() }
    }
}

#[derive(Clone, Debug)]
pub struct QuoteEngine<P = DeterministicPricingEngine> {
    settings: QuoteSettings,
    pricing: P,
}

impl QuoteEngine<DeterministicPricingEngine> {
    pub fn with_settings(settings: QuoteSettings) -> Self {
        Self::new(settings, DeterministicPricingEngine)
    }
}

impl Default for QuoteEngine<DeterministicPricingEngine> {
    fn default() -> Self {
        Self::with_settings(QuoteSettings::default())
    }
}

impl<P> QuoteEngine<P>
where
    P: PricingEngine,
{
    pub fn new(settings: QuoteSettings, pricing: P) -> Self {
        Self { settings, pricing }
    }

    pub fn settings(&self) -> &QuoteSettings {
        &self.settings
    }

    pub fn create_quote(&self) -> Quote {
        self.create_quote_at(Utc::now())
    }

    pub fn create_quote_at(&self, now: DateTime<Utc>) -> Quote {
        Quote {
            id: QuoteId::generate(),
            client: None,
            items: Vec::new(),
            discount_pct: Decimal::ZERO,
            notes: String::new(),
            valid_until: now + Duration::days(i64::from(self.settings.validity_days)),
            status: QuoteStatus::Draft,
            created_at: now,
            updated_at: now,
            sent_at: None,
        }
    }

    pub fn set_client(&self, quote: &mut Quote, client: Client) -> Result<(), DomainError> {
        quote.ensure_editable()?;
        if client.id.0.trim().is_empty() {
            return Err(ValidationIssue::EmptyClientId.into());
        }
        quote.client = Some(client);
        Ok(())
    }

    /// Sets the absolute quantity for `service`. Zero or less removes its line.
    pub fn upsert_line_item(
        &self,
        quote: &mut Quote,
        service: &ServiceOffering,
        quantity: i32,
    ) -> Result<(), DomainError> {
        quote.ensure_editable()?;
        let position = quote.position_of(&service.id);
        let previous = quote.items.clone();

        match (position, u32::try_from(quantity)) {
            (Some(index), Ok(quantity)) if quantity > 0 => quote.items[index].quantity = quantity,
            (None, Ok(quantity)) if quantity > 0 => quote.items.push(QuoteLineItem {
                service: service.clone(),
                quantity,
                override_price: Some(service.base_price),
                notes: None,
            }),
            (Some(index), _) => {
                quote.items.remove(index);
            }
            (None, _) => {}
        }
        keep_priceable(quote, previous)
    }

    /// Applies a typed-in price override. Unparseable or negative input keeps
    /// the current price, as does a price that would push the subtotal past
    /// what a `Decimal` holds. Returns whether the override was applied.
    pub fn set_line_item_price(
        &self,
        quote: &mut Quote,
        index: usize,
        raw: &str,
    ) -> Result<bool, DomainError> {
        quote.ensure_editable()?;
        let Some(item) = quote.items.get_mut(index) else {
            return Ok(false);
        };

        let previous = item.override_price;
        match raw.trim().parse::<Decimal>() {
            Ok(price) if price >= Decimal::ZERO => item.override_price = Some(price),
            _ => return Ok(false),
        }

        if quote.checked_subtotal().is_none() {
            quote.items[index].override_price = previous;
            return Ok(false);
        }
        Ok(true)
    }

    pub fn set_line_item_quantity(
        &self,
        quote: &mut Quote,
        index: usize,
        quantity: i32,
    ) -> Result<(), DomainError> {
        quote.ensure_editable()?;
        if index >= quote.items.len() {
            return Ok(());
        }

        let previous = quote.items.clone();
        match u32::try_from(quantity) {
            Ok(quantity) if quantity > 0 => quote.items[index].quantity = quantity,
            _ => {
                quote.items.remove(index);
            }
        }
        keep_priceable(quote, previous)
    }

    pub fn set_line_item_notes(
        &self,
        quote: &mut Quote,
        index: usize,
        notes: Option<String>,
    ) -> Result<(), DomainError> {
        quote.ensure_editable()?;
        if let Some(item) = quote.items.get_mut(index) {
            item.notes = notes.filter(|notes| !notes.trim().is_empty());
        }
        Ok(())
    }

    pub fn remove_line_item(&self, quote: &mut Quote, index: usize) -> Result<(), DomainError> {
        quote.ensure_editable()?;
        if index < quote.items.len() {
            quote.items.remove(index);
        }
        Ok(())
    }

    /// Out-of-range values are rejected rather than clamped.
    pub fn set_discount(&self, quote: &mut Quote, percent: Decimal) -> Result<(), DomainError> {
        quote.ensure_editable()?;
        if !discount_in_range(percent) {
            return Err(DomainError::discount_out_of_range(percent));
        }
        quote.discount_pct = percent;
        Ok(())
    }

    pub fn set_notes(&self, quote: &mut Quote, notes: impl Into<String>) -> Result<(), DomainError> {
        quote.ensure_editable()?;
        quote.notes = notes.into();
        Ok(())
    }

    pub fn set_valid_until(
        &self,
        quote: &mut Quote,
        valid_until: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        quote.ensure_editable()?;
        quote.valid_until = valid_until;
        Ok(())
    }

    pub fn calculate(&self, quote: &Quote) -> QuoteCalculation {
        self.price(quote).calculation
    }

    pub fn price(&self, quote: &Quote) -> PricingResult {
        self.pricing.price(quote, &self.settings.currency)
    }

    pub fn validate(&self, quote: &Quote) -> Vec<ValidationIssue> {
        validation::validate(quote)
    }

    pub fn validate_for_step(&self, quote: &Quote, step: WizardStep) -> Vec<ValidationIssue> {
        validation::validate_for_step(quote, step)
    }

    pub fn mark_sent(&self, quote: &mut Quote) -> Result<(), DomainError> {
        self.mark_sent_at(quote, Utc::now())
    }

    pub fn mark_sent_at(&self, quote: &mut Quote, now: DateTime<Utc>) -> Result<(), DomainError> {
        quote.transition_to(QuoteStatus::Sent, now)
    }

    pub fn mark_accepted(&self, quote: &mut Quote) -> Result<(), DomainError> {
        quote.transition_to(QuoteStatus::Accepted, Utc::now())
    }

    pub fn mark_rejected(&self, quote: &mut Quote) -> Result<(), DomainError> {
        quote.transition_to(QuoteStatus::Rejected, Utc::now())
    }

    pub fn mark_expired(&self, quote: &mut Quote) -> Result<(), DomainError> {
        quote.transition_to(QuoteStatus::Expired, Utc::now())
    }
}

/// Restores `previous` if the edit left a subtotal that cannot be represented.
fn keep_priceable(quote: &mut Quote, previous: Vec<QuoteLineItem>) -> Result<(), DomainError> {
    if quote.checked_subtotal().is_some() {
        return Ok(());
    }
    quote.items = previous;
    Err(ValidationIssue::AmountTooLarge.into())
}
