//! Wizard controller: owns one quote while it moves through the five steps
//! and sequences collaborator calls around Quote Engine edits.
//!
//! Collaborator results are staged and only committed once every call for a
//! transition has succeeded, so a failed save or send leaves both the quote
//! and the current step where they were.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink,
};
use crate::collaborators::{
    ClientDirectory, DocumentRenderer, NotificationSender, QuoteStore, SendOutcome,
    SendQuoteRequest, ServiceCatalog,
};
use crate::cpq::pricing::QuoteCalculation;
use crate::cpq::validation::ValidationIssue;
use crate::delivery::default_email_message;
use crate::domain::client::{Client, ClientId, NewClient};
use crate::domain::quote::{Quote, QuoteStatus};
use crate::domain::service::{ServiceId, ServiceOffering};
use crate::engine::QuoteEngine;
use crate::errors::{ApplicationError, DomainError};
use crate::flows::engine::{FlowEngine, FlowTransitionError, QuoteWizardFlow};
use crate::flows::states::{FlowAction, FlowEvent, TransitionOutcome, WizardStep};

/// Everything a session talks to, injected once at start.
#[derive(Clone)]
pub struct Collaborators {
    pub clients: Arc<dyn ClientDirectory>,
    pub catalog: Arc<dyn ServiceCatalog>,
    pub store: Arc<dyn QuoteStore>,
    pub sender: Arc<dyn NotificationSender>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub audit: Arc<dyn AuditSink>,
}

impl Collaborators {
    pub fn new(
        clients: Arc<dyn ClientDirectory>,
        catalog: Arc<dyn ServiceCatalog>,
        store: Arc<dyn QuoteStore>,
        sender: Arc<dyn NotificationSender>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self { clients, catalog, store, sender, renderer, audit: Arc::new(TracingAuditSink) }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }
}

#[derive(Default)]
struct StagedEffects {
    clients: Option<Vec<Client>>,
    services: Option<Vec<ServiceOffering>>,
    quote: Option<Quote>,
    document_url: Option<String>,
    reset: bool,
}

pub struct QuoteSession {
    engine: QuoteEngine,
    flow: FlowEngine<QuoteWizardFlow>,
    collaborators: Collaborators,
    audit: AuditContext,
    quote: Quote,
    step: WizardStep,
    clients: Vec<Client>,
    services: Vec<ServiceOffering>,
    document_url: Option<String>,
    last_message_id: Option<String>,
}

impl QuoteSession {
    /// Opens a session on a freshly created quote at the start screen.
    pub async fn start(
        engine: QuoteEngine,
        collaborators: Collaborators,
        audit: AuditContext,
    ) -> Result<Self, ApplicationError> {
        let quote = collaborators.store.create().await?;
        let audit = audit.for_quote(&quote.id);
        let flow = FlowEngine::default();

        info!(
            event_name = "quote.session_started",
            quote_id = %quote.id,
            correlation_id = %audit.correlation_id,
            "quote session started"
        );
        collaborators.audit.emit(AuditEvent::new(
            &audit,
            "quote.created",
            AuditCategory::Quote,
            AuditOutcome::Success,
        ));

        Ok(Self {
            engine,
            step: flow.initial_step(),
            flow,
            collaborators,
            audit,
            quote,
            clients: Vec::new(),
            services: Vec::new(),
            document_url: None,
            last_message_id: None,
        })
    }

    pub fn quote(&self) -> &Quote {
        &self.quote
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn services(&self) -> &[ServiceOffering] {
        &self.services
    }

    pub fn prepared_document_url(&self) -> Option<&str> {
        self.document_url.as_deref()
    }

    pub fn last_message_id(&self) -> Option<&str> {
        self.last_message_id.as_deref()
    }

    pub fn audit_context(&self) -> &AuditContext {
        &self.audit
    }

    pub async fn begin(&mut self) -> Result<TransitionOutcome, ApplicationError> {
        self.transition(FlowEvent::Begin).await
    }

    pub async fn advance(&mut self) -> Result<TransitionOutcome, ApplicationError> {
        self.transition(FlowEvent::Continue).await
    }

    pub async fn back(&mut self) -> Result<TransitionOutcome, ApplicationError> {
        self.transition(FlowEvent::Back).await
    }

    /// Abandons the current quote and returns to the start screen with a new draft.
    pub async fn start_new(&mut self) -> Result<TransitionOutcome, ApplicationError> {
        self.transition(FlowEvent::StartNew).await
    }

    pub fn select_client(&mut self, client_id: &ClientId) -> Result<(), ApplicationError> {
        let client = self
            .clients
            .iter()
            .find(|client| &client.id == client_id)
            .cloned()
            .ok_or_else(|| ApplicationError::NotFound {
                entity: "client",
                id: client_id.0.clone(),
            })?;
        self.engine.set_client(&mut self.quote, client)?;
        Ok(())
    }

    /// Adds a client to the directory and selects it for this quote.
    pub async fn create_client(&mut self, client: NewClient) -> Result<Client, ApplicationError> {
        client.validate()?;
        if self.quote.status != QuoteStatus::Draft {
            return Err(DomainError::QuoteLocked { status: self.quote.status }.into());
        }

        let created = self.collaborators.clients.create(client).await?;
        self.engine.set_client(&mut self.quote, created.clone())?;
        self.clients.push(created.clone());

        info!(
            event_name = "quote.client_created",
            quote_id = %self.quote.id,
            client_id = %created.id.0,
            correlation_id = %self.audit.correlation_id,
            "client created and selected"
        );
        Ok(created)
    }

    /// Sets the absolute quantity for a catalog service. Zero or less removes it.
    pub fn set_quantity(
        &mut self,
        service_id: &ServiceId,
        quantity: i32,
    ) -> Result<(), ApplicationError> {
        let service = self
            .services
            .iter()
            .find(|service| &service.id == service_id)
            .or_else(|| self.quote.line_for(service_id).map(|item| &item.service))
            .cloned()
            .ok_or_else(|| ApplicationError::NotFound {
                entity: "service",
                id: service_id.0.clone(),
            })?;
        self.engine.upsert_line_item(&mut self.quote, &service, quantity)?;
        Ok(())
    }

    pub fn set_item_price(&mut self, index: usize, raw: &str) -> Result<bool, ApplicationError> {
        Ok(self.engine.set_line_item_price(&mut self.quote, index, raw)?)
    }

    pub fn set_item_quantity(&mut self, index: usize, quantity: i32) -> Result<(), ApplicationError> {
        Ok(self.engine.set_line_item_quantity(&mut self.quote, index, quantity)?)
    }

    pub fn set_item_notes(
        &mut self,
        index: usize,
        notes: Option<String>,
    ) -> Result<(), ApplicationError> {
        Ok(self.engine.set_line_item_notes(&mut self.quote, index, notes)?)
    }

    pub fn remove_item(&mut self, index: usize) -> Result<(), ApplicationError> {
        Ok(self.engine.remove_line_item(&mut self.quote, index)?)
    }

    pub fn set_discount(&mut self, percent: Decimal) -> Result<(), ApplicationError> {
        Ok(self.engine.set_discount(&mut self.quote, percent)?)
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) -> Result<(), ApplicationError> {
        Ok(self.engine.set_notes(&mut self.quote, notes)?)
    }

    pub fn set_valid_until(&mut self, valid_until: DateTime<Utc>) -> Result<(), ApplicationError> {
        Ok(self.engine.set_valid_until(&mut self.quote, valid_until)?)
    }

    pub fn calculation(&self) -> QuoteCalculation {
        self.engine.calculate(&self.quote)
    }

    pub fn validation_issues(&self) -> Vec<ValidationIssue> {
        self.engine.validate(&self.quote)
    }

    /// Emails the quote, then marks it sent and saves it.
    ///
    /// `message` defaults to [`default_email_message`]. Nothing is committed
    /// unless the sender accepted the message and the store saved the result.
    /// Only available from the Generate & Send step, after review has passed.
    pub async fn send(&mut self, message: Option<String>) -> Result<SendOutcome, ApplicationError> {
        if self.step != WizardStep::GenerateSend {
            return Err(FlowTransitionError::InvalidTransition {
                step: self.step,
                event: FlowEvent::Continue,
            }
            .into());
        }
        if let Some(blocker) = self.quote.send_blocker() {
            return Err(DomainError::InvalidTransition {
                from: self.quote.status,
                to: QuoteStatus::Sent,
                blocker,
            }
            .into());
        }
        let Some(client) = self.quote.client.as_ref() else {
            return Err(ApplicationError::Domain(DomainError::InvariantViolation(
                "sendable quote has no client".to_owned(),
            )));
        };

        let request = SendQuoteRequest {
            quote_id: self.quote.id.clone(),
            recipient_email: client.email.clone(),
            recipient_name: client.name.clone(),
            message: message.unwrap_or_else(|| default_email_message(&self.quote)),
            attach_rendering: true,
        };

        let outcome = match self.collaborators.sender.send(request).await {
            Ok(outcome) if outcome.success => outcome,
            Ok(outcome) => {
                let message =
                    outcome.error.unwrap_or_else(|| "message was not accepted".to_owned());
                return Err(self.delivery_failed(message));
            }
            Err(error) => return Err(self.delivery_failed(error.to_string())),
        };

        let mut sent = self.quote.clone();
        self.engine.mark_sent(&mut sent)?;
        let saved = self.collaborators.store.save(sent).await.map_err(|error| {
            warn!(
                event_name = "quote.save_after_send_failed",
                quote_id = %self.quote.id,
                correlation_id = %self.audit.correlation_id,
                error = %error,
                "quote email went out but the sent status was not saved"
            );
            ApplicationError::from(error)
        })?;
        self.quote = saved;
        self.last_message_id = outcome.message_id.clone();

        info!(
            event_name = "quote.sent",
            quote_id = %self.quote.id,
            correlation_id = %self.audit.correlation_id,
            message_id = outcome.message_id.as_deref().unwrap_or_default(),
            "quote sent"
        );
        let mut event = AuditEvent::new(
            &self.audit,
            "quote.sent",
            AuditCategory::Quote,
            AuditOutcome::Success,
        );
        if let Some(message_id) = &outcome.message_id {
            event = event.with_detail("message_id", message_id.clone());
        }
        self.collaborators.audit.emit(event);

        Ok(outcome)
    }

    /// Renders the quote and remembers where the document can be fetched.
    pub async fn document_url(&mut self) -> Result<String, ApplicationError> {
        let url = self.collaborators.renderer.render(&self.quote).await?;
        self.document_url = Some(url.clone());
        Ok(url)
    }

    pub async fn download_document(&self) -> Result<(), ApplicationError> {
        self.collaborators.renderer.download(&self.quote).await?;
        self.collaborators.audit.emit(AuditEvent::new(
            &self.audit,
            "delivery.document_downloaded",
            AuditCategory::Delivery,
            AuditOutcome::Success,
        ));
        Ok(())
    }

    async fn transition(&mut self, event: FlowEvent) -> Result<TransitionOutcome, ApplicationError> {
        let context = self.flow.context_for(&self.quote, self.step);
        let outcome = self.flow.apply_with_audit(
            self.step,
            event,
            &context,
            self.collaborators.audit.as_ref(),
            &self.audit,
        )?;

        let staged = self.run_actions(&outcome.actions).await?;
        self.commit(staged);
        self.step = outcome.to;

        info!(
            event_name = "flow.step_changed",
            quote_id = %self.quote.id,
            correlation_id = %self.audit.correlation_id,
            from = ?outcome.from,
            to = ?outcome.to,
            "wizard step changed"
        );
        Ok(outcome)
    }

    async fn run_actions(&self, actions: &[FlowAction]) -> Result<StagedEffects, ApplicationError> {
        let mut staged = StagedEffects::default();
        for action in actions {
            match action {
                FlowAction::LoadClients => {
                    staged.clients = Some(self.collaborators.clients.list().await?);
                }
                FlowAction::LoadServices => {
                    staged.services = Some(self.collaborators.catalog.list().await?);
                }
                FlowAction::SaveQuote => {
                    let saved =
                        self.collaborators.store.save(self.quote.clone()).await.map_err(|error| {
                            self.collaborators.audit.emit(
                                AuditEvent::new(
                                    &self.audit,
                                    "quote.save_failed",
                                    AuditCategory::Persistence,
                                    AuditOutcome::Failed,
                                )
                                .with_detail("error", error.to_string()),
                            );
                            ApplicationError::from(error)
                        })?;
                    staged.quote = Some(saved);
                }
                FlowAction::PrepareDocument => {
                    let quote = staged.quote.as_ref().unwrap_or(&self.quote);
                    staged.document_url = Some(self.collaborators.renderer.render(quote).await?);
                }
                FlowAction::ResetQuote => {
                    staged.quote = Some(self.collaborators.store.create().await?);
                    staged.reset = true;
                }
            }
        }
        Ok(staged)
    }

    fn commit(&mut self, staged: StagedEffects) {
        if staged.reset {
            self.document_url = None;
            self.last_message_id = None;
        }
        if let Some(clients) = staged.clients {
            self.clients = clients;
        }
        if let Some(services) = staged.services {
            self.services = services;
        }
        if let Some(quote) = staged.quote {
            if staged.reset {
                self.audit = self.audit.for_quote(&quote.id);
            }
            self.quote = quote;
        }
        if let Some(url) = staged.document_url {
            self.document_url = Some(url);
        }
    }

    fn delivery_failed(&self, message: String) -> ApplicationError {
        warn!(
            event_name = "quote.send_failed",
            quote_id = %self.quote.id,
            correlation_id = %self.audit.correlation_id,
            error = %message,
            "quote email was not delivered"
        );
        self.collaborators.audit.emit(
            AuditEvent::new(
                &self.audit,
                "delivery.email_failed",
                AuditCategory::Delivery,
                AuditOutcome::Failed,
            )
            .with_detail("error", message.clone()),
        );
        ApplicationError::Collaborator { collaborator: "notification sender", message }
    }
}
