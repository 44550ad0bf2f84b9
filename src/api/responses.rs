use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{DisplayValue, GameRecord, LogRecord};

/// Body of `GET /api/stats`. Every field is optional on the wire; the bot
/// only fills balances once a wallet is loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSnapshot {
    pub current_balance: Option<DisplayValue>,
    pub s_token_balance: Option<DisplayValue>,
    pub all_time_high: Option<DisplayValue>,
    pub win_streak: u64,
    pub loss_streak: u64,
    pub games_since_69: u64,
    pub total_games: u64,
    pub total_wins: u64,
    pub total_losses: u64,
    pub session_profit: Option<DisplayValue>,
    pub last_update: Option<String>,
    pub log_messages: Vec<LogRecord>,
    pub recent_games: Vec<GameRecord>,
    pub current_bet: Option<DisplayValue>,
    pub wallet_connected: bool,
    pub wallet_address: Option<String>,
}

impl StatsSnapshot {
    /// Snapshots without a usable balance are treated as empty responses.
    pub fn is_usable(&self) -> bool {
        self.current_balance
            .as_ref()
            .map(DisplayValue::is_present)
            .unwrap_or(false)
    }

    /// Bet amount reported directly by the bot, when it parses as a decimal.
    pub fn current_bet_amount(&self) -> Option<Decimal> {
        self.current_bet
            .as_ref()
            .filter(|v| v.is_present())
            .and_then(DisplayValue::as_decimal)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlStatus {
    Started,
    AlreadyRunning,
    Stopping,
    NotRunning,
    StatsReset,
    Success,
    Error,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ControlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ControlStatus::Started => "started",
            ControlStatus::AlreadyRunning => "already_running",
            ControlStatus::Stopping => "stopping",
            ControlStatus::NotRunning => "not_running",
            ControlStatus::StatsReset => "stats_reset",
            ControlStatus::Success => "success",
            ControlStatus::Error => "error",
            ControlStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Generic `{status, message?}` answer used by the control endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub status: ControlStatus,
    #[serde(default)]
    pub message: Option<String>,
}

impl ControlResponse {
    #[cfg(test)]
    pub fn new(status: ControlStatus) -> Self {
        Self { status, message: None }
    }

    pub fn is_success(&self) -> bool {
        self.status == ControlStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletResponse {
    pub status: ControlStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub current_balance: Option<DisplayValue>,
    #[serde(default)]
    pub s_token_balance: Option<DisplayValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub status: ControlStatus,
    #[serde(default)]
    pub current_balance: Option<DisplayValue>,
    #[serde(default)]
    pub s_token_balance: Option<DisplayValue>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PrivateKeyRequest<'a> {
    pub private_key: &'a str,
}
