use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    collaborators::CollaboratorError, cpq::validation::ValidationIssue,
    domain::quote::QuoteStatus, flows::FlowTransitionError,
};

/// The precondition that stopped a lifecycle transition.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TransitionBlocker {
    #[error("quote is {}", .0.as_str())]
    WrongStatus(QuoteStatus),
    #[error("no client selected")]
    MissingClient,
    #[error("quote has no line items")]
    NoLineItems,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid quote transition from {from:?} to {to:?}: {blocker}")]
    InvalidTransition { from: QuoteStatus, to: QuoteStatus, blocker: TransitionBlocker },
    #[error("quote is {} and can no longer be edited", .status.as_str())]
    QuoteLocked { status: QuoteStatus },
    #[error(transparent)]
    Validation(#[from] ValidationIssue),
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn discount_out_of_range(value: Decimal) -> Self {
        Self::Validation(ValidationIssue::DiscountOutOfRange { value })
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{collaborator} failure: {message}")]
    Collaborator { collaborator: &'static str, message: String },
}

impl From<CollaboratorError> for ApplicationError {
    fn from(value: CollaboratorError) -> Self {
        match value {
            CollaboratorError::NotFound { entity, id } => Self::NotFound { entity, id },
            CollaboratorError::Unavailable { collaborator, message }
            | CollaboratorError::Rejected { collaborator, message } => {
                Self::Collaborator { collaborator, message }
            }
        }
    }
}

impl From<FlowTransitionError> for ApplicationError {
    fn from(value: FlowTransitionError) -> Self {
        Self::Domain(DomainError::FlowTransition(value))
    }
}

impl ApplicationError {
    /// Classifies the error for whoever is driving the wizard, tagged with the request it broke.
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let kind = match &self {
            Self::Domain(DomainError::InvariantViolation(_)) => InterfaceErrorKind::Internal,
            Self::Domain(_) => InterfaceErrorKind::BadRequest,
            Self::NotFound { .. } => InterfaceErrorKind::NotFound,
            Self::Collaborator { .. } => InterfaceErrorKind::ServiceUnavailable,
        };
        InterfaceError { kind, message: self.to_string(), correlation_id: correlation_id.into() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterfaceErrorKind {
    BadRequest,
    NotFound,
    ServiceUnavailable,
    Internal,
}

impl InterfaceErrorKind {
    fn label(self) -> &'static str {
        match self {
            Self::BadRequest => "bad request",
            Self::NotFound => "not found",
            Self::ServiceUnavailable => "service unavailable",
            Self::Internal => "internal error",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{}: {message}", .kind.label())]
pub struct InterfaceError {
    pub kind: InterfaceErrorKind,
    pub message: String,
    pub correlation_id: String,
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self.kind {
            InterfaceErrorKind::BadRequest => "The quote cannot take that change.",
            InterfaceErrorKind::NotFound => "That client, service or quote does not exist.",
            InterfaceErrorKind::ServiceUnavailable => {
                "A backing service did not respond. Nothing was saved; try again."
            }
            InterfaceErrorKind::Internal => "Something went wrong while building the quote.",
        }
    }
}
