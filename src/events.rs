use crate::api::Agent;
use crate::error::ApiError;
use crate::session::{RequestOutcome, RequestTicket};

/// Results delivered back to the UI loop from spawned network tasks
#[derive(Debug)]
pub enum AppEvent {
    /// Agent descriptor fetch finished
    AgentFetched(Result<Agent, ApiError>),

    /// A create-conversation or append-message call finished
    RequestFinished {
        ticket: RequestTicket,
        outcome: RequestOutcome,
    },
}
