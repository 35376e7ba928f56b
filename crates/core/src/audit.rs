//! Structured record of what happened to a quote during a wizard session.
//!
//! Every event is scoped by an [`AuditContext`]. Sinks decide where events go:
//! the log stream by default, a buffer when a caller wants to inspect them.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::quote::QuoteId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Quote,
    Flow,
    Delivery,
    Persistence,
}

impl AuditCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Flow => "flow",
            Self::Delivery => "delivery",
            Self::Persistence => "persistence",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
}

impl AuditOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

/// Who is acting on which quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    pub quote_id: Option<QuoteId>,
    pub correlation_id: String,
    pub actor: String,
}

impl AuditContext {
    pub fn new(
        quote_id: Option<QuoteId>,
        correlation_id: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self { quote_id, correlation_id: correlation_id.into(), actor: actor.into() }
    }

    /// Same actor and correlation, now pointing at `quote_id`.
    pub fn for_quote(&self, quote_id: &QuoteId) -> Self {
        Self {
            quote_id: Some(quote_id.clone()),
            correlation_id: self.correlation_id.clone(),
            actor: self.actor.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub category: AuditCategory,
    pub outcome: AuditOutcome,
    pub context: AuditContext,
    pub details: BTreeMap<String, String>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        context: &AuditContext,
        event_type: impl Into<String>,
        category: AuditCategory,
        outcome: AuditOutcome,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            category,
            outcome,
            context: context.clone(),
            details: BTreeMap::new(),
            recorded_at: Utc::now(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn correlation_id(&self) -> &str {
        &self.context.correlation_id
    }

    pub fn quote_id(&self) -> Option<&QuoteId> {
        self.context.quote_id.as_ref()
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Writes each event to the log stream as an `audit.recorded` record.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let quote_id = event.quote_id().map(|id| id.0.as_str()).unwrap_or("-");
        let details = event
            .details
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(" ");

        match event.outcome {
            AuditOutcome::Failed => tracing::warn!(
                event_name = "audit.recorded",
                audit_event = %event.event_type,
                category = event.category.as_str(),
                outcome = event.outcome.as_str(),
                correlation_id = %event.context.correlation_id,
                actor = %event.context.actor,
                quote_id,
                details = %details,
                "audit event"
            ),
            _ => tracing::debug!(
                event_name = "audit.recorded",
                audit_event = %event.event_type,
                category = event.category.as_str(),
                outcome = event.outcome.as_str(),
                correlation_id = %event.context.correlation_id,
                actor = %event.context.actor,
                quote_id,
                details = %details,
                "audit event"
            ),
        }
    }
}

/// Keeps every event in order so callers can report or assert on them.
#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    recorded: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|event| event.event_type.clone())
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}

/// Hands each event to every sink in the list.
impl AuditSink for Vec<Arc<dyn AuditSink>> {
    fn emit(&self, event: AuditEvent) {
        if let Some((last, rest)) = self.split_last() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}
