pub mod audit;
pub mod collaborators;
pub mod config;
pub mod cpq;
pub mod delivery;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod flows;

pub use audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
    TracingAuditSink,
};
pub use collaborators::{
    ClientDirectory, CollaboratorError, DocumentRenderer, NotificationSender, QuoteStore,
    SendOutcome, SendQuoteRequest, ServiceCatalog,
};
pub use cpq::{Catalog, QuoteCalculation, ServiceFilter, ValidationIssue};
pub use delivery::{default_email_message, HtmlDocumentRenderer, RecordingNotificationSender};
pub use domain::client::{search_clients, Client, ClientId, NewClient};
pub use domain::quote::{Quote, QuoteId, QuoteLineItem, QuoteStatus};
pub use domain::service::{ServiceId, ServiceOffering};
pub use engine::{QuoteEngine, QuoteSettings};
pub use errors::{
    ApplicationError, DomainError, InterfaceError, InterfaceErrorKind, TransitionBlocker,
};
pub use flows::{Collaborators, FlowEngine, QuoteSession, WizardStep};
