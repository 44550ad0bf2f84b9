use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ControlStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    Running,
    Stopped,
}

impl RunMode {
    pub fn from_flag(running: bool) -> Self {
        if running {
            RunMode::Running
        } else {
            RunMode::Stopped
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Running => write!(f, "Running"),
            RunMode::Stopped => write!(f, "Stopped"),
        }
    }
}

/// The operator's view of whether the bot is running. It only changes when
/// the bot confirms a start or stop request (or the wallet is disconnected);
/// the backend itself is never asked.
#[derive(Debug, Clone)]
pub struct RunModeState {
    mode: RunMode,
    started_at: Option<DateTime<Utc>>,
}

impl RunModeState {
    pub fn new(mode: RunMode) -> Self {
        let started_at = match mode {
            RunMode::Running => Some(Utc::now()),
            RunMode::Stopped => None,
        };
        Self { mode, started_at }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        self.mode == RunMode::Running
    }

    pub fn confirm_start(&mut self, status: &ControlStatus) -> Result<(), String> {
        match status {
            ControlStatus::Started | ControlStatus::AlreadyRunning => {
                if !self.is_running() {
                    self.started_at = Some(Utc::now());
                }
                self.mode = RunMode::Running;
                info!("Bot started ({})", status);
                Ok(())
            }
            other => Err(format!("Bot did not start: {}", other)),
        }
    }

    pub fn confirm_stop(&mut self, status: &ControlStatus) -> Result<(), String> {
        match status {
            ControlStatus::Stopping => {
                self.force_stop();
                Ok(())
            }
            other => Err(format!("Bot did not stop: {}", other)),
        }
    }

    pub fn force_stop(&mut self) {
        if self.is_running() {
            info!("Bot stopped");
        }
        self.mode = RunMode::Stopped;
        self.started_at = None;
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at
            .map(|start| (Utc::now() - start).num_seconds().max(0) as u64)
            .unwrap_or(0)
    }
}

impl Default for RunModeState {
    fn default() -> Self {
        Self::new(RunMode::Stopped)
    }
}
