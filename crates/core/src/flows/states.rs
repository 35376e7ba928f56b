use serde::{Deserialize, Serialize};

use crate::cpq::validation::ValidationIssue;
use crate::domain::quote::QuoteStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Start,
    SelectClient,
    ChooseServices,
    ReviewCustomize,
    GenerateSend,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::Start,
        WizardStep::SelectClient,
        WizardStep::ChooseServices,
        WizardStep::ReviewCustomize,
        WizardStep::GenerateSend,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Start => "Start Quote",
            Self::SelectClient => "Select Client",
            Self::ChooseServices => "Choose Services",
            Self::ReviewCustomize => "Review & Customize",
            Self::GenerateSend => "Generate & Send",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowEvent {
    Begin,
    Continue,
    Back,
    StartNew,
}

/// What the flow needs to know about the quote to decide a transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowContext {
    pub quote_status: QuoteStatus,
    pub blocking_issues: Vec<ValidationIssue>,
}

impl Default for FlowContext {
    fn default() -> Self {
        Self { quote_status: QuoteStatus::Draft, blocking_issues: Vec::new() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowAction {
    LoadClients,
    LoadServices,
    SaveQuote,
    PrepareDocument,
    ResetQuote,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: WizardStep,
    pub to: WizardStep,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
}
