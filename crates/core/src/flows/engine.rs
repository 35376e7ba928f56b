use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::cpq::validation::{validate_for_step, ValidationIssue};
use crate::domain::quote::{Quote, QuoteStatus};
use crate::flows::states::{FlowAction, FlowContext, FlowEvent, TransitionOutcome, WizardStep};

pub trait FlowDefinition {
    fn initial_step(&self) -> WizardStep;
    fn transition(
        &self,
        current: WizardStep,
        event: FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// The five-screen client → services → review → send wizard.
#[derive(Clone, Debug, Default)]
pub struct QuoteWizardFlow;

impl FlowDefinition for QuoteWizardFlow {
    fn initial_step(&self) -> WizardStep {
        WizardStep::Start
    }

    fn transition(
        &self,
        current: WizardStep,
        event: FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_wizard(current, event, context)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_step(&self) -> WizardStep {
        self.flow.initial_step()
    }

    /// Builds the context for leaving `step`, gating on the issues that step owns.
    pub fn context_for(&self, quote: &Quote, step: WizardStep) -> FlowContext {
        FlowContext { quote_status: quote.status, blocking_issues: validate_for_step(quote, step) }
    }

    pub fn apply(
        &self,
        current: WizardStep,
        event: FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: WizardStep,
        event: FlowEvent,
        context: &FlowContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        let record = match &result {
            Ok(outcome) => AuditEvent::new(
                audit,
                "flow.transition_applied",
                AuditCategory::Flow,
                AuditOutcome::Success,
            )
            .with_detail("from", outcome.from.title())
            .with_detail("to", outcome.to.title())
            .with_detail("event", format!("{:?}", outcome.event)),
            Err(error) => AuditEvent::new(
                audit,
                "flow.transition_rejected",
                AuditCategory::Flow,
                AuditOutcome::Rejected,
            )
            .with_detail("from", current.title())
            .with_detail("error", error.to_string()),
        };
        sink.emit(record);
        result
    }
}

impl Default for FlowEngine<QuoteWizardFlow> {
    fn default() -> Self {
        Self::new(QuoteWizardFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("cannot leave {step:?} until resolved: {issues:?}")]
    MissingRequirements { step: WizardStep, issues: Vec<ValidationIssue> },
    #[error("invalid transition from {step:?} using event {event:?}")]
    InvalidTransition { step: WizardStep, event: FlowEvent },
}

fn transition_wizard(
    current: WizardStep,
    event: FlowEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{LoadClients, LoadServices, PrepareDocument, ResetQuote, SaveQuote};
    use FlowEvent::{Back, Begin, Continue, StartNew};
    use WizardStep::{ChooseServices, GenerateSend, ReviewCustomize, SelectClient, Start};

    let gate = |next: WizardStep, actions: Vec<FlowAction>| {
        if context.blocking_issues.is_empty() {
            Ok((next, actions))
        } else {
            Err(FlowTransitionError::MissingRequirements {
                step: current,
                issues: context.blocking_issues.clone(),
            })
        }
    };

    let (to, actions) = match (current, event) {
        (_, StartNew) => (Start, vec![ResetQuote]),
        (Start, Begin) => (SelectClient, vec![LoadClients]),
        (SelectClient, Continue) => gate(ChooseServices, vec![SaveQuote, LoadServices])?,
        (ChooseServices, Continue) => gate(ReviewCustomize, vec![SaveQuote])?,
        (ReviewCustomize, Continue) => gate(GenerateSend, vec![SaveQuote, PrepareDocument])?,
        (SelectClient, Back) => (Start, Vec::new()),
        (ChooseServices, Back) => (SelectClient, Vec::new()),
        (ReviewCustomize, Back) => (ChooseServices, Vec::new()),
        (GenerateSend, Back) if context.quote_status == QuoteStatus::Draft => {
            (ReviewCustomize, Vec::new())
        }
        _ => return Err(FlowTransitionError::InvalidTransition { step: current, event }),
    };

    Ok(TransitionOutcome { from: current, to, event, actions })
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::cpq::validation::ValidationIssue;
    use crate::domain::quote::{QuoteId, QuoteStatus};
    use crate::engine::QuoteEngine;
    use crate::flows::engine::{FlowDefinition, FlowEngine, FlowTransitionError, QuoteWizardFlow};
    use crate::flows::states::{FlowAction, FlowContext, FlowEvent, WizardStep};

    #[test]
    fn wizard_happy_path_visits_every_step() {
        let engine = FlowEngine::new(QuoteWizardFlow);
        let context = FlowContext::default();
        let mut step = engine.initial_step();
        let mut visited = vec![step];

        let events =
            [FlowEvent::Begin, FlowEvent::Continue, FlowEvent::Continue, FlowEvent::Continue];
        for event in events {
            step = engine.apply(step, event, &context).expect("open gate").to;
            visited.push(step);
        }

        assert_eq!(visited, WizardStep::ALL.to_vec());
    }

    #[test]
    fn continue_saves_and_leaving_review_prepares_the_document() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(WizardStep::ReviewCustomize, FlowEvent::Continue, &FlowContext::default())
            .expect("review -> send");

        assert_eq!(outcome.to, WizardStep::GenerateSend);
        assert_eq!(outcome.actions, vec![FlowAction::SaveQuote, FlowAction::PrepareDocument]);
    }

    #[test]
    fn continue_is_gated_by_blocking_issues() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(
                WizardStep::SelectClient,
                FlowEvent::Continue,
                &FlowContext {
                    quote_status: QuoteStatus::Draft,
                    blocking_issues: vec![ValidationIssue::MissingClient],
                },
            )
            .expect_err("continue without client must fail");

        assert_eq!(
            error,
            FlowTransitionError::MissingRequirements {
                step: WizardStep::SelectClient,
                issues: vec![ValidationIssue::MissingClient],
            }
        );
    }

    #[test]
    fn context_for_uses_step_specific_gates() {
        let flow = FlowEngine::default();
        let quote = QuoteEngine::default().create_quote();

        let client_gate = flow.context_for(&quote, WizardStep::SelectClient);
        assert_eq!(client_gate.blocking_issues, vec![ValidationIssue::MissingClient]);
        assert!(flow.context_for(&quote, WizardStep::Start).blocking_issues.is_empty());
    }

    #[test]
    fn back_from_send_step_is_refused_once_sent() {
        let engine = FlowEngine::default();
        let draft = FlowContext::default();
        let sent = FlowContext { quote_status: QuoteStatus::Sent, blocking_issues: Vec::new() };

        let back = engine
            .apply(WizardStep::GenerateSend, FlowEvent::Back, &draft)
            .expect("draft may go back");
        assert_eq!(back.to, WizardStep::ReviewCustomize);

        let error = engine
            .apply(WizardStep::GenerateSend, FlowEvent::Back, &sent)
            .expect_err("sent quote stays on send step");
        assert!(matches!(error, FlowTransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn start_new_resets_from_any_step() {
        let engine = FlowEngine::default();
        for step in WizardStep::ALL {
            let outcome = engine
                .apply(step, FlowEvent::StartNew, &FlowContext::default())
                .expect("start new is always allowed");
            assert_eq!(outcome.to, WizardStep::Start);
            assert_eq!(outcome.actions, vec![FlowAction::ResetQuote]);
        }
    }

    #[test]
    fn invalid_transition_is_rejected() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(WizardStep::Start, FlowEvent::Continue, &FlowContext::default())
            .expect_err("start only accepts begin");

        assert_eq!(
            error,
            FlowTransitionError::InvalidTransition {
                step: WizardStep::Start,
                event: FlowEvent::Continue
            }
        );
        assert_eq!(QuoteWizardFlow.initial_step(), WizardStep::Start);
    }

    #[test]
    fn flow_transition_emits_audit_event() {
        let engine = FlowEngine::default();
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(Some(QuoteId("quote-9".to_owned())), "req-42", "wizard");

        let _ = engine
            .apply_with_audit(WizardStep::Start, FlowEvent::Begin, &FlowContext::default(), &sink, &audit)
            .expect("transition should succeed");
        let _ = engine.apply_with_audit(
            WizardStep::Start,
            FlowEvent::Back,
            &FlowContext::default(),
            &sink,
            &audit,
        );

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].correlation_id(), "req-42");
        assert_eq!(events[0].event_type, "flow.transition_applied");
        assert_eq!(events[1].event_type, "flow.transition_rejected");
    }
}
