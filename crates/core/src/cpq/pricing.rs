use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::quote::{Quote, QuoteId};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteCalculation {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
    pub item_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTrace {
    pub quote_id: QuoteId,
    pub currency: String,
    pub steps: Vec<PricingTraceStep>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub calculation: QuoteCalculation,
    pub trace: PricingTrace,
}

pub trait PricingEngine: Send + Sync {
    fn price(&self, quote: &Quote, currency: &str) -> PricingResult;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicPricingEngine;

impl PricingEngine for DeterministicPricingEngine {
    fn price(&self, quote: &Quote, currency: &str) -> PricingResult {
        price_quote_with_trace(quote, currency)
    }
}

/// Rounds a currency amount to cents, midpoint away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Never panics. Amounts that do not fit saturate at `Decimal::MAX`; the
/// engine refuses edits that would get there and `validate` reports them.
pub fn calculate(quote: &Quote) -> QuoteCalculation {
    let subtotal = quote
        .items
        .iter()
        .fold(Decimal::ZERO, |sum, item| sum.saturating_add(item.line_total()));
    let rate = quote.discount_pct / Decimal::ONE_HUNDRED;
    let discount_amount = round_money(subtotal.saturating_mul(rate));
    let item_count = quote.items.iter().map(|item| u64::from(item.quantity)).sum();

    QuoteCalculation {
        subtotal,
        discount_amount,
        total: subtotal.saturating_sub(discount_amount),
        item_count,
    }
}

pub fn price_quote_with_trace(quote: &Quote, currency: &str) -> PricingResult {
    let calculation = calculate(quote);

    PricingResult {
        trace: PricingTrace {
            quote_id: quote.id.clone(),
            currency: currency.to_string(),
            steps: vec![
                PricingTraceStep {
                    stage: "subtotal".to_string(),
                    detail: format!(
                        "sum(effective_price * quantity) over {} line(s)",
                        quote.items.len()
                    ),
                    amount: calculation.subtotal,
                },
                PricingTraceStep {
                    stage: "discount".to_string(),
                    detail: format!("subtotal * {}%", quote.discount_pct.normalize()),
                    amount: calculation.discount_amount,
                },
                PricingTraceStep {
                    stage: "total".to_string(),
                    detail: "subtotal - discount".to_string(),
                    amount: calculation.total,
                },
            ],
        },
        calculation,
    }
}
