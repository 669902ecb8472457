//! Terminal chat client for hosted conversational agents.
//!
//! [`session::ChatSession`] holds the conversation state machine,
//! [`api::HttpAgentClient`] talks to the agent service, and [`app`] drives
//! the ratatui front end.

pub mod agent;
pub mod api;
pub mod app;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod ui;

pub use agent::{AgentLoader, AgentState};
pub use api::{Agent, AgentApi, HttpAgentClient, Message};
pub use config::{ApiSettings, Config};
pub use error::{ApiError, ConfigError, SessionError};
pub use session::ChatSession;
