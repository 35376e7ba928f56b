pub mod catalog;
pub mod pricing;
pub mod validation;

pub use catalog::{Catalog, ServiceFilter};
pub use pricing::{
    calculate, DeterministicPricingEngine, PricingEngine, PricingResult, PricingTrace,
    PricingTraceStep, QuoteCalculation,
};
pub use validation::{validate, validate_for_step, ValidationIssue};
