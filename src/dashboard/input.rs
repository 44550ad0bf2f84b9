use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode, ClearType};
use crossterm::{cursor, execute, queue, style::Print};
use std::io::{stdout, Write};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    Start,
    Stop,
    RefreshBalances,
    ClearLogs,
    ToggleTheme,
    ResetStats,
    EditSettings,
    Up,
    Down,
    Increase,
    Decrease,
    Defaults,
    Confirm,
    /// Leaves the settings form, or quits when no form is open.
    Cancel,
    Quit,
}

pub fn command_for(key: &KeyEvent) -> Option<UserCommand> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(UserCommand::Quit),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char('s') => Some(UserCommand::Start),
        KeyCode::Char('x') => Some(UserCommand::Stop),
        KeyCode::Char('r') => Some(UserCommand::RefreshBalances),
        KeyCode::Char('c') => Some(UserCommand::ClearLogs),
        KeyCode::Char('t') => Some(UserCommand::ToggleTheme),
        KeyCode::Char('z') => Some(UserCommand::ResetStats),
        KeyCode::Char('e') => Some(UserCommand::EditSettings),
        KeyCode::Char('d') => Some(UserCommand::Defaults),
        KeyCode::Up => Some(UserCommand::Up),
        KeyCode::Down => Some(UserCommand::Down),
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Right => Some(UserCommand::Increase),
        KeyCode::Char('-') | KeyCode::Left => Some(UserCommand::Decrease),
        KeyCode::Enter => Some(UserCommand::Confirm),
        KeyCode::Esc => Some(UserCommand::Cancel),
        KeyCode::Char('q') => Some(UserCommand::Quit),
        _ => None,
    }
}

/// Reads keys on a plain thread (crossterm's reader blocks) until the
/// receiving side goes away.
pub fn spawn_key_reader(tx: mpsc::UnboundedSender<UserCommand>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || loop {
        if tx.is_closed() {
            break;
        }
        match event::poll(Duration::from_millis(200)) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) => {
                    if let Some(command) = command_for(&key) {
                        debug!("Key command {:?}", command);
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(%err, "terminal read failed");
                    break;
                }
            },
            Ok(false) => {}
            Err(err) => {
                warn!(%err, "terminal poll failed");
                break;
            }
        }
    })
}

/// Raw mode plus alternate screen for the lifetime of the guard.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> Result<Self> {
        enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;
        Ok(Self)
    }

    pub fn draw(&self, lines: &[String]) -> Result<()> {
        let mut out = stdout();
        queue!(out, cursor::MoveTo(0, 0), terminal::Clear(ClearType::All))?;
        for (row, line) in lines.iter().enumerate() {
            queue!(out, cursor::MoveTo(0, row as u16), Print(line))?;
        }
        out.flush()?;
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), cursor::Show, terminal::LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}
