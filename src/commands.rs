use crate::agent::{AgentLoader, AgentState};
use crate::api::HttpAgentClient;
use crate::config::Config;
use crate::session::{ChatMessage, ChatSession, Origin};
use crate::ui::conversation::history::format_timestamp;
use anyhow::{Context, Result, bail};
use chrono::Local;
use std::io::{self, Write};

fn client(config: &Config) -> Result<HttpAgentClient> {
    let settings = config.validate().context("Invalid configuration")?;
    HttpAgentClient::new(&settings).context("Failed to create HTTP client")
}

/// Print the agent descriptor
pub async fn show_agent(config: &Config) -> Result<()> {
    let client = client(config)?;
    let mut loader = AgentLoader::new(config.agent_title.clone());

    if let AgentState::Failed(detail) = loader.load(&client).await {
        bail!("Error loading agent: {detail}");
    }

    let title = loader.display_title().unwrap_or_default();
    if let Some(agent) = loader.agent() {
        println!("🤖 {}", title);
        println!("   🆔 Id: {}", agent.id);
        if let Some(avatar) = &agent.avatar_url {
            println!("   🖼  Avatar: {}", avatar);
        }
    }

    Ok(())
}

/// Send one message and print the resulting thread
pub async fn send_message(config: &Config, text: &str, conversation: Option<String>) -> Result<()> {
    let client = client(config)?;
    let mut session = match conversation {
        Some(id) => ChatSession::with_conversation(id),
        None => ChatSession::new(),
    };

    let result = session.send(&client, text).await;

    let mut stdout = io::stdout().lock();
    for message in session.messages() {
        write_message(&mut stdout, message)?;
    }
    if let Some(id) = session.conversation_id() {
        writeln!(stdout, "💬 Conversation: {}", id)?;
        writeln!(stdout, "   Continue with: agentchat send --conversation {} <TEXT>", id)?;
    }
    stdout.flush()?;

    result.context("Failed to send message")
}

/// Write one message as a header line plus its markdown source
pub fn write_message<W: Write>(out: &mut W, message: &ChatMessage) -> io::Result<()> {
    let who = match message.origin() {
        Origin::User => "👤 You",
        Origin::Agent => "🤖 Agent",
    };
    let when = format_timestamp(&message.message.date_created.with_timezone(&Local));
    let marker = if message.is_failed() { " (not delivered)" } else { "" };

    writeln!(out, "{} · {}{}", who, when, marker)?;
    for line in message.message.text.lines() {
        writeln!(out, "   {}", line)?;
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Message;
    use crate::session::{LocalStatus, Provenance};

    #[test]
    fn failed_messages_are_flagged() {
        let mut message = ChatMessage::local(Message::user("hello\nworld"));
        message.provenance = Provenance::Local {
            status: LocalStatus::Failed,
        };

        let mut out = Vec::new();
        write_message(&mut out, &message).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("👤 You · "));
        assert!(text.contains("(not delivered)"));
        assert!(text.contains("   hello\n   world\n"));
    }
}
