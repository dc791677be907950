//! Interactive terminal chat
//!
//! Draws the timeline snapshot, an input box and a status line. Terminal
//! events are read on a dedicated thread and forwarded into the async loop.

use crate::backend::ChatBackend;
use crate::render;
use crate::runtime::{self, ChatHandle, SubmitError};
use crate::state_machine::TransitionError;
use crate::timeline::TimelineEntry;
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{DefaultTerminal, Frame};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const TICK: Duration = Duration::from_millis(300);
const INPUT_POLL: Duration = Duration::from_millis(100);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

const HELP: &str = "/reset restart  /clear empty  /thread id  /health probe  /exit quit";

/// Slash commands understood by the input box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Exit,
    Reset,
    Clear,
    Thread,
    Health,
    Help,
}

impl Command {
    /// Recognise a command line. Anything else is sent as a message.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "/exit" | "/quit" => Some(Command::Exit),
            "/reset" => Some(Command::Reset),
            "/clear" => Some(Command::Clear),
            "/thread" => Some(Command::Thread),
            "/health" => Some(Command::Health),
            "/help" => Some(Command::Help),
            _ => None,
        }
    }
}

struct App {
    handle: ChatHandle,
    backend: Arc<dyn ChatBackend>,
    input: String,
    status: String,
    /// Lines scrolled back from the newest content
    scroll_back: usize,
    tick: usize,
    should_quit: bool,
    status_tx: mpsc::UnboundedSender<String>,
}

/// Run the chat UI until the operator exits
pub async fn run(handle: ChatHandle, backend: Arc<dyn ChatBackend>) -> io::Result<()> {
    let mut terminal = ratatui::init();
    let (status_tx, status_rx) = mpsc::unbounded_channel();
    let mut app = App {
        handle,
        backend,
        input: String::new(),
        status: HELP.to_string(),
        scroll_back: 0,
        tick: 0,
        should_quit: false,
        status_tx,
    };

    let result = app.run(&mut terminal, status_rx).await;
    ratatui::restore();
    result
}

impl App {
    async fn run(
        &mut self,
        terminal: &mut DefaultTerminal,
        mut status_rx: mpsc::UnboundedReceiver<String>,
    ) -> io::Result<()> {
        let mut events = spawn_input_reader();
        let mut snapshots = self.handle.subscribe();
        let mut ticker = tokio::time::interval(TICK);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(event) = events.recv() => self.on_terminal_event(event).await,
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        tracing::error!("Conversation runtime stopped");
                        self.should_quit = true;
                    }
                }
                Some(status) = status_rx.recv() => self.status = status,
                _ = ticker.tick() => self.tick = self.tick.wrapping_add(1),
            }
        }

        Ok(())
    }

    async fn on_terminal_event(&mut self, event: TermEvent) {
        let TermEvent::Key(key) = event else {
            return;
        };
        if key.kind != KeyEventKind::Press {
            return;
        }
        self.on_key(key).await;
    }

    async fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => self.on_enter().await,
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            KeyCode::PageUp => self.scroll_back = self.scroll_back.saturating_add(5),
            KeyCode::PageDown => self.scroll_back = self.scroll_back.saturating_sub(5),
            _ => {}
        }
    }

    async fn on_enter(&mut self) {
        if let Some(command) = Command::parse(&self.input) {
            self.input.clear();
            self.run_command(command).await;
            return;
        }

        match self.handle.submit(self.input.clone()).await {
            Ok(()) => {
                self.input.clear();
                self.scroll_back = 0;
                self.status.clear();
            }
            // Keep the text so it can be sent once the reply is in
            Err(SubmitError::Rejected(TransitionError::Busy)) => {
                self.status = "Still waiting for the previous reply".to_string();
            }
            Err(SubmitError::Rejected(TransitionError::EmptyMessage)) => {}
            Err(e) => {
                tracing::error!(error = %e, "Submit failed");
                self.status = e.to_string();
            }
        }
    }

    async fn run_command(&mut self, command: Command) {
        match command {
            Command::Exit => self.should_quit = true,
            Command::Reset => self.reset(runtime::welcome_seed(), "Conversation reset").await,
            Command::Clear => self.reset(Vec::new(), "Timeline cleared").await,
            Command::Thread => {
                self.status = format!("Thread id: {}", self.handle.snapshot().thread_id);
            }
            Command::Health => {
                self.status = format!("Checking {} ...", self.backend.endpoint());
                let backend = Arc::clone(&self.backend);
                let status_tx = self.status_tx.clone();
                tokio::spawn(async move {
                    let status = match tokio::time::timeout(HEALTH_TIMEOUT, backend.health()).await
                    {
                        Ok(Ok(health)) if health.is_ok() => "Backend is healthy".to_string(),
                        Ok(Ok(health)) => format!("Backend status: {}", health.status),
                        Ok(Err(e)) => format!("Health check failed: {e}"),
                        Err(_) => "Health check timed out".to_string(),
                    };
                    let _ = status_tx.send(status);
                });
            }
            Command::Help => self.status = HELP.to_string(),
        }
    }

    async fn reset(&mut self, seed: Vec<TimelineEntry>, done: &str) {
        self.scroll_back = 0;
        self.status = match self.handle.reset(seed).await {
            Ok(()) => done.to_string(),
            Err(e) => e.to_string(),
        };
    }

    fn draw(&mut self, frame: &mut Frame) {
        let snapshot = self.handle.snapshot();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(frame.area());

        self.draw_timeline(frame, chunks[0], &snapshot.entries);

        let input_title = if snapshot.busy {
            " Waiting for reply "
        } else {
            " Message "
        };
        let input = Paragraph::new(self.input.as_str())
            .block(Block::default().borders(Borders::ALL).title(input_title));
        frame.render_widget(input, chunks[1]);

        let typed = u16::try_from(self.input.chars().count()).unwrap_or(u16::MAX);
        let max_x = chunks[1].right().saturating_sub(2);
        frame.set_cursor_position(Position::new(
            chunks[1].x.saturating_add(1).saturating_add(typed).min(max_x),
            chunks[1].y.saturating_add(1),
        ));

        let status = Paragraph::new(self.status.as_str())
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(status, chunks[2]);
    }

    fn draw_timeline(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        entries: &[TimelineEntry],
    ) {
        let inner_width = area.width.saturating_sub(2);
        let inner_height = usize::from(area.height.saturating_sub(2));
        let lines = render::timeline_lines(entries, inner_width, self.tick);

        let overflow = lines.len().saturating_sub(inner_height);
        self.scroll_back = self.scroll_back.min(overflow);
        let first = overflow - self.scroll_back;
        let visible: Vec<_> = lines.into_iter().skip(first).take(inner_height).collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" LumaWell ")
            .title_style(Style::default().add_modifier(Modifier::BOLD));
        frame.render_widget(Paragraph::new(visible).block(block), area);
    }
}

/// Forward crossterm events from a blocking reader thread
fn spawn_input_reader() -> mpsc::UnboundedReceiver<TermEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        while !tx.is_closed() {
            match event::poll(INPUT_POLL) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if tx.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Terminal read failed");
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Terminal poll failed");
                    break;
                }
            }
        }
    });
    rx
}
