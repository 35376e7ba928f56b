use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::quote::Quote;
use crate::flows::states::WizardStep;

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ValidationIssue {
    #[error("a client must be selected")]
    MissingClient,
    #[error("client id must not be blank")]
    EmptyClientId,
    #[error("client {field} must not be blank")]
    BlankClientField { field: String },
    #[error("at least one service must be added")]
    NoLineItems,
    #[error("quote amounts are too large to price")]
    AmountTooLarge,
    #[error("discount must be between 0 and 100, got {value}")]
    DiscountOutOfRange { value: Decimal },
    #[error("valid-until date {valid_until} must be after the quote was created ({created_at})")]
    ValidityNotInFuture { valid_until: DateTime<Utc>, created_at: DateTime<Utc> },
}

pub fn discount_in_range(value: Decimal) -> bool {
    (Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&value)
}

/// Every issue that would keep the quote from being sent as-is.
pub fn validate(quote: &Quote) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if quote.client.is_none() {
        issues.push(ValidationIssue::MissingClient);
    }
    if quote.items.is_empty() {
        issues.push(ValidationIssue::NoLineItems);
    }
    if quote.checked_subtotal().is_none() {
        issues.push(ValidationIssue::AmountTooLarge);
    }
    if !discount_in_range(quote.discount_pct) {
        issues.push(ValidationIssue::DiscountOutOfRange { value: quote.discount_pct });
    }
    if quote.valid_until <= quote.created_at {
        issues.push(ValidationIssue::ValidityNotInFuture {
            valid_until: quote.valid_until,
            created_at: quote.created_at,
        });
    }

    issues
}

/// Issues that block leaving `step` with a continue.
pub fn validate_for_step(quote: &Quote, step: WizardStep) -> Vec<ValidationIssue> {
    let issues = validate(quote);
    match step {
        WizardStep::Start | WizardStep::GenerateSend => Vec::new(),
        WizardStep::SelectClient => issues
            .into_iter()
            .filter(|issue| matches!(issue, ValidationIssue::MissingClient))
            .collect(),
        WizardStep::ChooseServices => issues
            .into_iter()
            .filter(|issue| {
                matches!(
                    issue,
                    ValidationIssue::MissingClient
                        | ValidationIssue::NoLineItems
                        | ValidationIssue::AmountTooLarge
                )
            })
            .collect(),
        WizardStep::ReviewCustomize => issues,
    }
}
