use crate::agent::{AgentLoader, AgentState};
use crate::api::AgentApi;
use crate::error::SessionError;
use crate::events::AppEvent;
use crate::session::{ChatSession, OutgoingRequest};
use crate::ui::agent_view::{AgentHeader, LoadErrorView, LoadingView};
use crate::ui::conversation::{ConversationComposer, ConversationHistory, SlashCommand, get_help_text};
use crate::ui::conversation::composer::ConversationResult;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};
use std::sync::Arc;
use tokio::sync::mpsc;

const PAGE_SCROLL: usize = 5;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Ties the agent loader, the chat session and the UI components together.
///
/// Network calls run on spawned tasks and report back through `AppEvent`s,
/// so all state here is only touched from the UI loop.
pub struct ConversationManager {
    api: Arc<dyn AgentApi>,
    agent: AgentLoader,
    session: ChatSession,
    history: ConversationHistory,
    composer: ConversationComposer,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    status: Option<String>,
    tick: usize,
}

impl ConversationManager {
    pub fn new(
        api: Arc<dyn AgentApi>,
        fallback_title: Option<String>,
        events_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            api,
            agent: AgentLoader::new(fallback_title),
            session: ChatSession::new(),
            history: ConversationHistory::new(),
            composer: ConversationComposer::new("Type your message..."),
            events_tx,
            status: None,
            tick: 0,
        }
    }

    /// Kick off the one-time agent fetch
    pub fn start(&self) {
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = api.fetch_agent().await;
            let _ = tx.send(AppEvent::AgentFetched(result));
        });
    }

    /// Apply a result delivered by a spawned task
    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::AgentFetched(result) => {
                self.agent.settle(result);
            }
            AppEvent::RequestFinished { ticket, outcome } => {
                match self.session.complete(ticket, outcome) {
                    Ok(()) => {
                        self.status = None;
                        self.composer.clear();
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "error sending message");
                        self.status = Some(format!("Message not sent: {err}"));
                    }
                }
                self.composer.set_disabled(self.session.is_busy());
                self.history.scroll_to_bottom();
            }
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if key.code == KeyCode::Esc || (ctrl && key.code == KeyCode::Char('c')) {
            return ConversationAction::Exit;
        }

        match self.agent.state() {
            AgentState::Loading => return ConversationAction::None,
            AgentState::Failed(_) => return ConversationAction::Exit,
            AgentState::Ready(_) => {}
        }

        match key.code {
            KeyCode::Char('l') if ctrl => {
                self.clear();
                return ConversationAction::None;
            }
            KeyCode::PageUp => {
                self.history.scroll_up(PAGE_SCROLL);
                return ConversationAction::None;
            }
            KeyCode::PageDown => {
                self.history.scroll_down(PAGE_SCROLL);
                return ConversationAction::None;
            }
            _ => {}
        }

        match self.composer.handle_key(key) {
            ConversationResult::Submitted(text) => {
                self.submit(&text);
                ConversationAction::None
            }
            ConversationResult::Command(command) => self.handle_slash_command(command),
            ConversationResult::None => ConversationAction::None,
        }
    }

    /// Handle pasted text
    pub fn handle_paste(&mut self, text: &str) {
        if self.agent.agent().is_some() {
            self.composer.insert_str(text);
        }
    }

    /// Send `text`: optimistic update now, network call on a task
    pub fn submit(&mut self, text: &str) {
        self.history.clear_notice();
        match self.session.begin_send(text) {
            Ok(Some(outgoing)) => {
                self.status = None;
                self.composer.set_disabled(true);
                self.history.scroll_to_bottom();
                self.spawn_request(outgoing);
            }
            Ok(None) => {}
            Err(SessionError::Busy) => {
                self.status = Some("Still waiting for the previous reply".to_string());
            }
            Err(err) => {
                tracing::error!(error = %err, "could not send message");
                self.status = Some(err.to_string());
            }
        }
    }

    fn spawn_request(&self, outgoing: OutgoingRequest) {
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        let OutgoingRequest { ticket, request } = outgoing;
        tokio::spawn(async move {
            let outcome = request.execute(api.as_ref()).await;
            let _ = tx.send(AppEvent::RequestFinished { ticket, outcome });
        });
    }

    /// Start a new chat
    pub fn clear(&mut self) {
        self.session.clear();
        self.history.clear_notice();
        self.history.scroll_to_bottom();
        self.composer.clear();
        self.status = None;
    }

    /// Advance animations
    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn agent_state(&self) -> &AgentState {
        self.agent.state()
    }

    pub fn is_input_disabled(&self) -> bool {
        self.composer.is_disabled()
    }

    /// Text currently in the composer
    pub fn input(&self) -> &str {
        self.composer.content()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Handle slash commands
    fn handle_slash_command(&mut self, command: SlashCommand) -> ConversationAction {
        match command {
            SlashCommand::New => {
                self.clear();
                ConversationAction::None
            }
            SlashCommand::Help => {
                self.history.set_notice(get_help_text());
                ConversationAction::None
            }
            SlashCommand::Quit => ConversationAction::Exit,
        }
    }

    fn status_line(&self) -> Line<'static> {
        if let Some(status) = &self.status {
            Line::from(vec![
                Span::styled("❌ ", Style::default().fg(Color::Red)),
                Span::styled(status.clone(), Style::default().fg(Color::Red)),
            ])
        } else if self.session.is_busy() {
            let dots = ".".repeat(self.tick % 4);
            Line::from(vec![Span::styled(
                format!("Agent is replying{dots}"),
                Style::default().fg(Color::Green),
            )])
        } else {
            Line::default()
        }
    }
}

impl Widget for &ConversationManager {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let agent = match self.agent.state() {
            AgentState::Loading => {
                LoadingView { tick: self.tick }.render(area, buf);
                return;
            }
            AgentState::Failed(detail) => {
                LoadErrorView { detail }.render(area, buf);
                return;
            }
            AgentState::Ready(agent) => agent,
        };
        let title = self.agent.display_title().unwrap_or_default();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(5),    // History
                Constraint::Length(1), // Status
                Constraint::Length(3), // Composer
            ])
            .split(area);

        AgentHeader {
            agent,
            title: &title,
        }
        .render(chunks[0], buf);
        self.history
            .view(self.session.messages())
            .render(chunks[1], buf);
        buf.set_line(chunks[2].x, chunks[2].y, &self.status_line(), chunks[2].width);
        (&self.composer).render(chunks[3], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HttpAgentClient;
    use crate::config::ApiSettings;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn manager_for(
        server: &MockServer,
    ) -> (ConversationManager, mpsc::UnboundedReceiver<AppEvent>) {
        let client = HttpAgentClient::new(&ApiSettings {
            api_url: server.uri(),
            agent_id: "a1".into(),
            api_key: "secret".into(),
            request_timeout: None,
        })
        .unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        (ConversationManager::new(Arc::new(client), None, tx), rx)
    }

    async fn pump(manager: &mut ConversationManager, rx: &mut mpsc::UnboundedReceiver<AppEvent>) {
        let event = rx.recv().await.expect("event");
        manager.handle_app_event(event);
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_and_send(manager: &mut ConversationManager, text: &str) {
        for c in text.chars() {
            manager.handle_key(key(KeyCode::Char(c)));
        }
        manager.handle_key(key(KeyCode::Enter));
    }

    fn screen(manager: &ConversationManager) -> String {
        let area = Rect::new(0, 0, 70, 20);
        let mut buf = Buffer::empty(area);
        manager.render(area, &mut buf);
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buf.get(x, y).symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn mount_agent(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/v1/agents/a1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": "a1", "title": "Concierge"}
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn agent_failure_shows_error_view_without_thread() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/agents/a1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (mut manager, mut rx) = manager_for(&server);
        assert!(screen(&manager).contains("Loading agent"));

        manager.start();
        pump(&mut manager, &mut rx).await;

        assert!(matches!(manager.agent_state(), AgentState::Failed(_)));
        let text = screen(&manager);
        assert!(text.contains("Error loading agent"));
        assert!(!text.contains("Conversation"));
        assert_eq!(manager.handle_key(key(KeyCode::Char('x'))), ConversationAction::Exit);
    }

    #[tokio::test]
    async fn input_is_disabled_until_the_reply_lands() {
        let server = MockServer::start().await;
        mount_agent(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/agents/a1/conversations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": "c1", "messages": []}
            })))
            .mount(&server)
            .await;

        let (mut manager, mut rx) = manager_for(&server);
        manager.start();
        pump(&mut manager, &mut rx).await;
        assert!(screen(&manager).contains("Concierge"));

        type_and_send(&mut manager, "Hello");
        assert_eq!(manager.session().messages().len(), 1);
        assert!(manager.is_input_disabled());

        // Typing while disabled goes nowhere
        type_and_send(&mut manager, "again");
        assert_eq!(manager.session().messages().len(), 1);
        assert_eq!(manager.input(), "Hello");

        pump(&mut manager, &mut rx).await;
        assert_eq!(manager.session().conversation_id(), Some("c1"));
        assert!(!manager.is_input_disabled());
        assert_eq!(manager.input(), "");
        assert!(screen(&manager).contains("Hello"));
    }

    #[tokio::test]
    async fn failed_send_keeps_message_and_re_enables_input() {
        let server = MockServer::start().await;
        mount_agent(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/agents/a1/conversations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": "c1"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/agents/a1/conversations/c1/messages"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (mut manager, mut rx) = manager_for(&server);
        manager.start();
        pump(&mut manager, &mut rx).await;

        type_and_send(&mut manager, "Hello");
        pump(&mut manager, &mut rx).await;
        type_and_send(&mut manager, "Are you there?");
        pump(&mut manager, &mut rx).await;

        let messages = manager.session().messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].is_failed());
        assert!(!manager.is_input_disabled());
        assert!(manager.status().is_some_and(|s| s.contains("503")));
        assert!(screen(&manager).contains("not delivered"));

        // The failed text stays in the composer; Enter sends it again
        assert_eq!(manager.input(), "Are you there?");
        manager.handle_key(key(KeyCode::Enter));
        pump(&mut manager, &mut rx).await;
        let messages = manager.session().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].message.text, "Are you there?");
        assert_eq!(manager.input(), "Are you there?");
    }

    #[tokio::test]
    async fn new_chat_command_and_shortcut_reset_the_thread() {
        let server = MockServer::start().await;
        mount_agent(&server).await;
        Mock::given(method("POST"))
            .and(path("/v1/agents/a1/conversations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": "c1"}
            })))
            .mount(&server)
            .await;

        let (mut manager, mut rx) = manager_for(&server);
        manager.start();
        pump(&mut manager, &mut rx).await;

        type_and_send(&mut manager, "Hello");
        pump(&mut manager, &mut rx).await;
        type_and_send(&mut manager, "/new");
        assert!(manager.session().messages().is_empty());
        assert_eq!(manager.session().conversation_id(), None);

        type_and_send(&mut manager, "Hello");
        pump(&mut manager, &mut rx).await;
        manager.handle_key(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::CONTROL));
        assert!(manager.session().messages().is_empty());
    }

    #[tokio::test]
    async fn help_and_quit_commands() {
        let server = MockServer::start().await;
        mount_agent(&server).await;

        let (mut manager, mut rx) = manager_for(&server);
        manager.start();
        pump(&mut manager, &mut rx).await;

        type_and_send(&mut manager, "/help");
        assert!(screen(&manager).contains("Available commands"));
        assert!(manager.session().messages().is_empty());

        for c in "/quit".chars() {
            manager.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(manager.handle_key(key(KeyCode::Enter)), ConversationAction::Exit);
    }
}
