//! Conversation controller: owns conversation identity and the message thread.
//!
//! Sending is split in two halves so a UI loop can run the network call on
//! another task: [`ChatSession::begin_send`] applies the optimistic update and
//! takes the request slot, [`ChatSession::complete`] applies the outcome and
//! releases it. [`ChatSession::send`] chains both for headless callers.

use crate::api::{AgentApi, CreatedConversation, Message};
use crate::error::{ApiError, SessionError};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Agent,
}

/// Delivery state of a locally constructed message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalStatus {
    Pending,
    Delivered,
    Failed,
}

/// Where a displayed message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Built on this side and shown before the service confirmed it
    Local { status: LocalStatus },
    /// Returned by the service
    Remote,
}

/// A message in the local thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub message: Message,
    pub provenance: Provenance,
}

impl ChatMessage {
    pub fn local(message: Message) -> Self {
        Self {
            message,
            provenance: Provenance::Local {
                status: LocalStatus::Pending,
            },
        }
    }

    pub fn remote(message: Message) -> Self {
        Self {
            message,
            provenance: Provenance::Remote,
        }
    }

    pub fn origin(&self) -> Origin {
        if self.message.is_system {
            Origin::Agent
        } else {
            Origin::User
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self.provenance,
            Provenance::Local {
                status: LocalStatus::Failed
            }
        )
    }
}

/// Network call the controller wants issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    CreateConversation { text: String },
    AppendMessage { conversation_id: String, text: String },
}

/// Successful result of an [`ApiRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResponse {
    Created(CreatedConversation),
    Appended(Message),
}

pub type RequestOutcome = Result<ApiResponse, ApiError>;

impl ApiRequest {
    pub async fn execute(&self, api: &dyn AgentApi) -> RequestOutcome {
        match self {
            ApiRequest::CreateConversation { text } => {
                api.create_conversation(text).await.map(ApiResponse::Created)
            }
            ApiRequest::AppendMessage {
                conversation_id,
                text,
            } => api
                .append_message(conversation_id, text)
                .await
                .map(ApiResponse::Appended),
        }
    }
}

/// Identifies one in-flight request and the optimistic message it carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    generation: u64,
    local_id: String,
}

/// Returned by [`ChatSession::begin_send`]: the call to make and the ticket to complete it with
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub ticket: RequestTicket,
    pub request: ApiRequest,
}

/// State of one chat with the agent
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    conversation_id: Option<String>,
    // Single request slot. Survives `clear` so at most one call is ever outstanding.
    in_flight: Option<RequestTicket>,
    generation: u64,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue a conversation created earlier; its past messages are not fetched
    pub fn with_conversation(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: Some(conversation_id.into()),
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// True while a request holds the slot; input should be disabled
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Apply the optimistic update for `text` and take the request slot.
    ///
    /// Returns `Ok(None)` for blank input, which changes nothing.
    pub fn begin_send(&mut self, text: &str) -> Result<Option<OutgoingRequest>, SessionError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        if self.in_flight.is_some() {
            return Err(SessionError::Busy);
        }

        let message = Message::user(text);
        let ticket = RequestTicket {
            generation: self.generation,
            local_id: message.id.clone(),
        };
        self.messages.push(ChatMessage::local(message));

        let request = match &self.conversation_id {
            None => ApiRequest::CreateConversation {
                text: text.to_string(),
            },
            Some(conversation_id) => ApiRequest::AppendMessage {
                conversation_id: conversation_id.clone(),
                text: text.to_string(),
            },
        };
        self.in_flight = Some(ticket.clone());

        Ok(Some(OutgoingRequest { ticket, request }))
    }

    /// Apply the outcome of a request started by [`begin_send`](Self::begin_send).
    ///
    /// Always releases the slot. Errors are handed back for the caller to
    /// report; nothing is rolled back. Outcomes for a thread that has since
    /// been cleared are dropped, though their errors are still returned.
    pub fn complete(
        &mut self,
        ticket: RequestTicket,
        outcome: RequestOutcome,
    ) -> Result<(), ApiError> {
        if self.in_flight.as_ref() == Some(&ticket) {
            self.in_flight = None;
        } else {
            tracing::warn!(
                local_id = %ticket.local_id,
                "completion does not match the in-flight request"
            );
        }

        if ticket.generation != self.generation {
            tracing::warn!(
                local_id = %ticket.local_id,
                "discarding response for a cleared conversation"
            );
            return outcome.map(|_| ());
        }

        match outcome {
            Ok(ApiResponse::Created(created)) => {
                self.mark_local(&ticket.local_id, LocalStatus::Delivered);
                match &self.conversation_id {
                    None => {
                        tracing::info!(conversation_id = %created.id, "conversation created");
                        self.conversation_id = Some(created.id);
                    }
                    Some(existing) => {
                        tracing::warn!(%existing, ignored = %created.id, "conversation already active");
                    }
                }
                self.messages
                    .extend(created.messages.into_iter().map(ChatMessage::remote));
                Ok(())
            }
            Ok(ApiResponse::Appended(message)) => {
                self.mark_local(&ticket.local_id, LocalStatus::Delivered);
                self.messages.push(ChatMessage::remote(message));
                Ok(())
            }
            Err(err) => {
                self.mark_local(&ticket.local_id, LocalStatus::Failed);
                Err(err)
            }
        }
    }

    /// Send `text` and wait for the service to answer
    pub async fn send(&mut self, api: &dyn AgentApi, text: &str) -> Result<(), SessionError> {
        let Some(outgoing) = self.begin_send(text)? else {
            return Ok(());
        };
        let outcome = outgoing.request.execute(api).await;
        self.complete(outgoing.ticket, outcome)?;
        Ok(())
    }

    /// Start over: empty thread, no conversation
    pub fn clear(&mut self) {
        self.messages.clear();
        self.conversation_id = None;
        self.generation += 1;
    }

    fn mark_local(&mut self, local_id: &str, status: LocalStatus) {
        if let Some(entry) = self
            .messages
            .iter_mut()
            .find(|m| m.message.id == local_id && matches!(m.provenance, Provenance::Local { .. }))
        {
            entry.provenance = Provenance::Local { status };
        }
    }
}
