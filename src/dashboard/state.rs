use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

use super::Theme;
use crate::api::{ControlStatus, StatsSnapshot};
use crate::config::{PollingConfig, SettingsEditor, SettingsField};
use crate::engine::{
    extract_final_amount, infer, log_window, Inference, InferredPhase, LastRoundOutcome,
    RunModeState,
};
use crate::types::{DisplayValue, GameRecord, LogLevel, LogRecord};

/// Result shown in the "last bet" slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastResult {
    Win,
    Loss,
    PatternWin,
}

impl LastResult {
    pub fn label(&self) -> &'static str {
        match self {
            LastResult::Win => "WIN",
            LastResult::Loss => "LOSS",
            LastResult::PatternWin => "69 WIN",
        }
    }

    fn from_outcome(outcome: LastRoundOutcome) -> Self {
        if outcome.won {
            LastResult::Win
        } else {
            LastResult::Loss
        }
    }

    pub fn from_game(game: &GameRecord) -> Self {
        match (game.won, game.is_69) {
            (true, true) => LastResult::PatternWin,
            (true, false) => LastResult::Win,
            (false, _) => LastResult::Loss,
        }
    }
}

/// A log panel line. Server lines are deduplicated by message text; lines
/// the dashboard adds itself always append.
#[derive(Debug, Clone)]
struct LogEntry {
    record: LogRecord,
    local: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletView {
    pub address: Option<String>,
}

/// Everything the dashboard knows between polls. The inference engine is
/// stateless; the sticky bet amount and last result live here and are only
/// ever overwritten by newer evidence.
#[derive(Debug, Clone)]
pub struct DashboardSession {
    pub snapshot: StatsSnapshot,
    pub run: RunModeState,
    pub phase: InferredPhase,
    pub pending_bet: Option<Decimal>,
    pub last_result: Option<LastResult>,
    pub currently_betting: bool,
    pub wallet: Option<WalletView>,
    pub settings: Option<SettingsEditor>,
    pub edit_field: SettingsField,
    pub alert: Option<String>,
    pub theme: Theme,
    logs: VecDeque<LogEntry>,
    seen_messages: HashSet<String>,
    log_window: usize,
    log_history: usize,
}

impl DashboardSession {
    pub fn new(polling: &PollingConfig, run: RunModeState, theme: Theme) -> Self {
        let mut session = Self {
            snapshot: StatsSnapshot::default(),
            run,
            phase: InferredPhase::Offline,
            pending_bet: None,
            last_result: None,
            currently_betting: false,
            wallet: None,
            settings: None,
            edit_field: SettingsField::MinBet,
            alert: None,
            theme,
            logs: VecDeque::new(),
            seen_messages: HashSet::new(),
            log_window: polling.log_window,
            log_history: polling.log_history,
        };
        session.refresh_inference();
        session
    }

    pub fn is_running(&self) -> bool {
        self.run.is_running()
    }

    pub fn status_phrase(&self) -> &'static str {
        self.phase.status_phrase()
    }

    /// Merge a fresh `/api/stats` snapshot. Returns false when the snapshot
    /// carries no balance and was discarded.
    pub fn apply_snapshot(&mut self, snapshot: StatsSnapshot) -> bool {
        if !snapshot.is_usable() {
            debug!("Discarding stats snapshot without balance");
            return false;
        }

        for record in &snapshot.log_messages {
            self.push_log(record.clone(), false);
        }

        if self.is_running() {
            if let Some(bet) = snapshot.current_bet_amount() {
                self.pending_bet = Some(bet);
            }
        }

        if snapshot.wallet_connected {
            let address = snapshot
                .wallet_address
                .clone()
                .or_else(|| self.wallet.as_ref().and_then(|w| w.address.clone()));
            self.wallet = Some(WalletView { address });
        }

        self.snapshot = snapshot;
        self.refresh_inference();

        // The bot's own game list is more authoritative than the log heuristics.
        if let Some(game) = self.snapshot.recent_games.first() {
            self.last_result = Some(LastResult::from_game(game));
        }
        true
    }

    /// Apply a snapshot fetched only to learn the bet in flight.
    pub fn apply_bet_check(&mut self, snapshot: &StatsSnapshot) {
        if !self.is_running() {
            return;
        }
        let bet = snapshot.current_bet_amount().or_else(|| {
            snapshot
                .log_messages
                .iter()
                .rev()
                .find_map(|record| extract_final_amount(&record.message))
        });
        if let Some(bet) = bet {
            self.pending_bet = Some(bet);
        }
    }

    /// Status-tick snapshot: only its log tail is taken, then inference
    /// re-runs. Balances and counters wait for the stats tick.
    pub fn apply_status(&mut self, snapshot: StatsSnapshot) {
        if !self.is_running() {
            return;
        }
        self.snapshot.log_messages = snapshot.log_messages;
        self.refresh_inference();
    }

    /// Re-run the inference engine on the cached log tail and merge its
    /// evidence into the sticky fields.
    pub fn refresh_inference(&mut self) -> Inference {
        let window = log_window(&self.snapshot.log_messages, self.log_window);
        let inference = infer(window, self.is_running());

        self.phase = inference.phase;
        if let Some(bet) = inference.pending_bet {
            self.pending_bet = Some(bet);
        }
        if let Some(outcome) = inference.last_outcome {
            self.last_result = Some(LastResult::from_outcome(outcome));
        }

        if inference.phase.is_betting() {
            self.currently_betting = true;
        } else if matches!(inference.phase, InferredPhase::Online | InferredPhase::Offline) {
            self.currently_betting = false;
        }

        inference
    }

    pub fn confirm_start(&mut self, status: &ControlStatus) -> Result<(), String> {
        self.run.confirm_start(status)?;
        self.refresh_inference();
        Ok(())
    }

    pub fn confirm_stop(&mut self, status: &ControlStatus) -> Result<(), String> {
        self.run.confirm_stop(status)?;
        self.refresh_inference();
        Ok(())
    }

    pub fn force_stop(&mut self) {
        self.run.force_stop();
        self.refresh_inference();
    }

    fn push_log(&mut self, record: LogRecord, local: bool) {
        if !local && !self.seen_messages.insert(record.message.clone()) {
            return;
        }
        self.logs.push_back(LogEntry { record, local });
        if self.logs.len() > self.log_history {
            if let Some(dropped) = self.logs.pop_front() {
                if !dropped.local {
                    self.seen_messages.remove(&dropped.record.message);
                }
            }
        }
    }

    /// Records a dashboard-side event in the log panel.
    pub fn add_local_log(&mut self, level: LogLevel, message: impl Into<String>) {
        let time = chrono::Local::now().format("%H:%M:%S").to_string();
        self.push_log(LogRecord::new(time, level, message), true);
    }

    pub fn logs(&self) -> impl Iterator<Item = &LogRecord> {
        self.logs.iter().map(|entry| &entry.record)
    }

    pub fn log_count(&self) -> usize {
        self.logs.len()
    }

    /// Empties the log panel. Server lines seen before the clear may show
    /// up again; the cached snapshot and the inference window are untouched.
    pub fn clear_logs(&mut self) {
        self.logs.clear();
        self.seen_messages.clear();
    }

    pub fn is_editing_settings(&self) -> bool {
        self.settings.as_ref().is_some_and(SettingsEditor::is_editing)
    }

    pub fn set_wallet(&mut self, address: Option<String>) {
        self.wallet = Some(WalletView { address });
    }

    pub fn clear_wallet(&mut self) {
        self.wallet = None;
    }

    pub fn wallet_connected(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn update_balances(&mut self, current: Option<DisplayValue>, s_token: Option<DisplayValue>) {
        if let Some(current) = current {
            self.snapshot.current_balance = Some(current);
        }
        if let Some(s_token) = s_token {
            self.snapshot.s_token_balance = Some(s_token);
        }
    }

    /// Wins over games played, in percent with one decimal.
    pub fn win_rate(&self) -> Decimal {
        if self.snapshot.total_games == 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(self.snapshot.total_wins) / Decimal::from(self.snapshot.total_games)
            * dec!(100))
        .round_dp(1)
    }

    pub fn session_profit_label(&self) -> String {
        let Some(profit) = &self.snapshot.session_profit else {
            return "0".to_string();
        };
        match profit.as_decimal() {
            Some(d) if d > Decimal::ZERO => format!("+{}", profit),
            _ => profit.to_string(),
        }
    }

    pub fn session_profit_sign(&self) -> i8 {
        match self.snapshot.session_profit.as_ref().and_then(DisplayValue::as_decimal) {
            Some(d) if d > Decimal::ZERO => 1,
            Some(d) if d < Decimal::ZERO => -1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RunMode;

    fn session(mode: RunMode) -> DashboardSession {
        DashboardSession::new(&PollingConfig::default(), RunModeState::new(mode), Theme::Light)
    }

    fn snapshot(lines: &[&str]) -> StatsSnapshot {
        StatsSnapshot {
            current_balance: Some("100.00".into()),
            log_messages: lines.iter().map(|l| LogRecord::info(*l)).collect(),
            ..StatsSnapshot::default()
        }
    }

    #[test]
    fn test_stopped_session_is_offline() {
        let mut s = session(RunMode::Stopped);
        assert!(s.apply_snapshot(snapshot(&["🎲 PLACING BET 🎲", "Final Amount: 5.00 🍌"])));

        assert_eq!(s.phase, InferredPhase::Offline);
        assert_eq!(s.status_phrase(), "Offline");
        assert_eq!(s.pending_bet, None);
    }

    #[test]
    fn test_snapshot_without_balance_is_discarded() {
        let mut s = session(RunMode::Running);
        let mut empty = snapshot(&["✨ WIN: +3"]);
        empty.current_balance = Some(serde_json::from_str("0").unwrap());

        assert!(!s.apply_snapshot(empty));
        assert_eq!(s.phase, InferredPhase::Online);
        assert_eq!(s.log_count(), 0);
    }

    #[test]
    fn test_zero_balance_text_is_applied() {
        let mut s = session(RunMode::Running);
        let mut fresh = snapshot(&["Balance: 0.000"]);
        fresh.current_balance = Some(DisplayValue::new("0.000"));
        fresh.total_games = 5;

        assert!(s.apply_snapshot(fresh));
        assert_eq!(s.snapshot.total_games, 5);
        assert_eq!(s.log_count(), 1);
    }

    #[test]
    fn test_sticky_fields_survive_quiet_windows() {
        let mut s = session(RunMode::Running);
        s.apply_snapshot(snapshot(&["🎲 PLACING BET 🎲", "Final Amount: 5.00 🍌"]));
        assert_eq!(s.phase, InferredPhase::Betting);
        assert!(s.currently_betting);

        s.apply_snapshot(snapshot(&["✨ WIN: round closed"]));
        assert_eq!(s.phase, InferredPhase::Win);
        assert_eq!(s.pending_bet, Some(dec!(5.00)));
        assert_eq!(s.last_result, Some(LastResult::Win));
        // Result phases leave the betting flag as it was.
        assert!(s.currently_betting);

        s.apply_snapshot(snapshot(&["Rolling dice..."]));
        assert_eq!(s.phase, InferredPhase::Online);
        assert!(!s.currently_betting);
        assert_eq!(s.pending_bet, Some(dec!(5.00)));
        assert_eq!(s.last_result, Some(LastResult::Win));
    }

    #[test]
    fn test_recent_game_overrides_log_result() {
        let mut s = session(RunMode::Running);
        let mut snap = snapshot(&["✨ WIN: round closed"]);
        snap.recent_games = vec![GameRecord {
            time: "12:00:00".to_string(),
            game_id: "7".into(),
            dice: vec![6, 5, 4],
            amount: "5".into(),
            won: true,
            balance_change: "10".into(),
            is_69: true,
        }];

        s.apply_snapshot(snap);
        assert_eq!(s.phase, InferredPhase::Win);
        assert_eq!(s.last_result, Some(LastResult::PatternWin));
        assert_eq!(s.last_result.unwrap().label(), "69 WIN");
    }

    #[test]
    fn test_reported_current_bet_only_while_running() {
        let mut snap = snapshot(&[]);
        snap.current_bet = Some("8.50".into());

        let mut stopped = session(RunMode::Stopped);
        stopped.apply_snapshot(snap.clone());
        assert_eq!(stopped.pending_bet, None);

        let mut running = session(RunMode::Running);
        running.apply_snapshot(snap);
        assert_eq!(running.pending_bet, Some(dec!(8.50)));
    }

    #[test]
    fn test_bet_check_falls_back_to_logs() {
        let mut s = session(RunMode::Running);
        s.apply_bet_check(&snapshot(&["Final Amount: 2.00 🍌", "Final Amount: 3.00 🍌", "Gas Info"]));
        assert_eq!(s.pending_bet, Some(dec!(3.00)));

        let mut stopped = session(RunMode::Stopped);
        stopped.apply_bet_check(&snapshot(&["Final Amount: 2.00 🍌"]));
        assert_eq!(stopped.pending_bet, None);
    }

    #[test]
    fn test_status_snapshot_updates_phase_only() {
        let mut s = session(RunMode::Running);
        s.apply_snapshot(snapshot(&["Rolling dice..."]));

        let mut status = snapshot(&["Gas Info: 21000"]);
        status.current_balance = None;
        status.total_games = 99;
        s.apply_status(status);

        assert_eq!(s.phase, InferredPhase::Waiting);
        assert_eq!(s.snapshot.total_games, 0);
        assert_eq!(s.snapshot.current_balance, Some(DisplayValue::new("100.00")));
    }

    #[test]
    fn test_stop_forces_offline_immediately() {
        let mut s = session(RunMode::Running);
        s.apply_snapshot(snapshot(&["Waiting for game result"]));
        assert_eq!(s.phase, InferredPhase::Waiting);

        s.confirm_stop(&ControlStatus::Stopping).unwrap();
        assert_eq!(s.phase, InferredPhase::Offline);
        assert!(!s.currently_betting);
    }

    #[test]
    fn test_start_reinfers_cached_logs() {
        let mut s = session(RunMode::Stopped);
        s.apply_snapshot(snapshot(&["🎯 NEXT BET: 4.00 🍌"]));
        assert_eq!(s.phase, InferredPhase::Offline);

        s.confirm_start(&ControlStatus::Started).unwrap();
        assert_eq!(s.phase, InferredPhase::Planning);
    }

    #[test]
    fn test_log_history_dedupes_and_caps() {
        let polling = PollingConfig {
            log_window: 2,
            log_history: 3,
            ..PollingConfig::default()
        };
        let mut s = DashboardSession::new(&polling, RunModeState::default(), Theme::Light);

        s.apply_snapshot(snapshot(&["a", "b"]));
        s.apply_snapshot(snapshot(&["a", "b", "c", "d"]));
        let messages: Vec<&str> = s.logs().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["b", "c", "d"]);

        s.clear_logs();
        assert_eq!(s.log_count(), 0);
        assert_eq!(s.snapshot.log_messages.len(), 4);
    }

    #[test]
    fn test_local_events_always_append() {
        let mut s = session(RunMode::Stopped);
        s.add_local_log(LogLevel::Info, "Bot started");
        s.add_local_log(LogLevel::Info, "Bot stopped");
        s.add_local_log(LogLevel::Info, "Bot started");

        let messages: Vec<&str> = s.logs().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["Bot started", "Bot stopped", "Bot started"]);

        // A server line with the same text is still shown once.
        s.apply_snapshot(snapshot(&["Bot started", "Bot started"]));
        assert_eq!(s.log_count(), 4);
    }

    #[test]
    fn test_lines_append_after_clear() {
        let mut s = session(RunMode::Running);
        s.apply_snapshot(snapshot(&["Rolling dice..."]));
        s.clear_logs();

        s.add_local_log(LogLevel::Warn, "Statistics reset");
        s.apply_snapshot(snapshot(&["Rolling dice..."]));

        let messages: Vec<&str> = s.logs().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["Statistics reset", "Rolling dice..."]);
    }

    #[test]
    fn test_win_rate_and_profit() {
        let mut s = session(RunMode::Stopped);
        assert_eq!(s.win_rate(), Decimal::ZERO);

        let mut snap = snapshot(&[]);
        snap.total_games = 3;
        snap.total_wins = 2;
        snap.session_profit = Some(DisplayValue::new("12.5"));
        s.apply_snapshot(snap);

        assert_eq!(s.win_rate(), dec!(66.7));
        assert_eq!(s.session_profit_label(), "+12.5");
        assert_eq!(s.session_profit_sign(), 1);

        s.snapshot.session_profit = Some(DisplayValue::new("-4"));
        assert_eq!(s.session_profit_label(), "-4");
        assert_eq!(s.session_profit_sign(), -1);
    }

    #[test]
    fn test_wallet_from_snapshot() {
        let mut s = session(RunMode::Stopped);
        let mut snap = snapshot(&[]);
        snap.wallet_connected = true;
        snap.wallet_address = Some("0x40A94AB8Aac840Be65B22Ac857A78ac56447db5f".to_string());

        s.apply_snapshot(snap);
        assert!(s.wallet_connected());
        assert_eq!(
            s.wallet.as_ref().unwrap().address.as_deref(),
            Some("0x40A94AB8Aac840Be65B22Ac857A78ac56447db5f")
        );
    }
}
