//! Terminal user interface

pub mod agent_view;
pub mod conversation;
pub mod markdown;
