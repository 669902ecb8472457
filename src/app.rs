//! Interactive terminal front end

use crate::api::HttpAgentClient;
use crate::config::Config;
use crate::events::AppEvent;
use crate::ui::conversation::{ConversationAction, ConversationManager};
use anyhow::{Context, Result};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const TICK_RATE: Duration = Duration::from_millis(150);

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Run the chat UI until the user quits
pub async fn run(config: &Config) -> Result<()> {
    let settings = config.validate().context("Invalid configuration")?;
    let client = HttpAgentClient::new(&settings).context("Failed to create HTTP client")?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut manager = ConversationManager::new(Arc::new(client), config.agent_title.clone(), tx);

    install_panic_hook();
    let mut terminal = setup_terminal().context("Failed to initialise terminal")?;
    let result = event_loop(&mut terminal, &mut manager, &mut rx).await;
    restore_terminal().context("Failed to restore terminal")?;
    terminal.show_cursor()?;

    tracing::info!("chat closed");
    result
}

async fn event_loop(
    terminal: &mut Tui,
    manager: &mut ConversationManager,
    rx: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    manager.start();

    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(TICK_RATE);

    loop {
        terminal.draw(|frame| frame.render_widget(&*manager, frame.size()))?;

        tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if manager.handle_key(key) == ConversationAction::Exit {
                        return Ok(());
                    }
                }
                Some(Ok(Event::Paste(text))) => manager.handle_paste(&text),
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err).context("Failed to read terminal event"),
                None => return Ok(()),
            },
            Some(event) = rx.recv() => manager.handle_app_event(event),
            _ = ticker.tick() => manager.on_tick(),
        }
    }
}

fn setup_terminal() -> io::Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableBracketedPaste)
}

/// Leave the alternate screen before the panic message prints
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        default_hook(info);
    }));
}
