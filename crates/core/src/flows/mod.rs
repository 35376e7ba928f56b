pub mod engine;
pub mod session;
pub mod states;

pub use engine::{FlowDefinition, FlowEngine, FlowTransitionError, QuoteWizardFlow};
pub use session::{Collaborators, QuoteSession};
pub use states::{FlowAction, FlowContext, FlowEvent, TransitionOutcome, WizardStep};
