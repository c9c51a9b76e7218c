pub mod engine;
pub mod states;

pub use engine::{FlowDefinition, FlowEngine, FlowTransitionError, IncidentFlow};
pub use states::{FlowContext, IncidentEvent, IncidentState, TransitionOutcome};
