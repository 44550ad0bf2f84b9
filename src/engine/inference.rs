//! Reconstructs what the bot is doing from its log tail.
//!
//! The backend exposes no status field, so the phase is derived by substring
//! matching over the most recent log lines. The functions here are pure: any
//! "sticky" behaviour (keeping the last bet amount or result around) belongs
//! to the caller, which merges the optional evidence returned in [`Inference`].

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::types::LogRecord;

/// Number of trailing log records inspected on each pass.
pub const LOG_WINDOW: usize = 15;

const PLACING_MARKERS: [&str; 4] = ["🎲 PLACING BET 🎲", "BET DETAILS", "Base Amount:", "Final Amount:"];
const WAITING_MARKERS: [&str; 4] = [
    "Transaction Success",
    "Waiting for game result",
    "Gas Info",
    "Game in progress",
];
const RESULT_MARKER: &str = "RESULT:";
const WIN_MARKERS: [&str; 2] = ["✨ WIN:", "WIN STREAK:"];
const LOSS_MARKERS: [&str; 2] = ["📉 LOSS:", "LOSS STREAK:"];
const PLANNING_MARKER: &str = "NEXT BET:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InferredPhase {
    Offline,
    Online,
    Betting,
    Waiting,
    Win,
    Loss,
    Planning,
}

impl InferredPhase {
    pub fn status_phrase(&self) -> &'static str {
        match self {
            InferredPhase::Offline => "Offline",
            InferredPhase::Online => "Waiting for next bet...",
            InferredPhase::Betting => "Placing bet...",
            InferredPhase::Waiting => "Waiting for game result...",
            InferredPhase::Win => "Game complete - Won!",
            InferredPhase::Loss => "Game complete - Lost",
            InferredPhase::Planning => "Calculating next bet...",
        }
    }

    /// A bet is in flight (placed or awaiting its result).
    pub fn is_betting(&self) -> bool {
        matches!(self, InferredPhase::Betting | InferredPhase::Waiting)
    }
}

impl fmt::Display for InferredPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InferredPhase::Offline => "OFFLINE",
            InferredPhase::Online => "ONLINE",
            InferredPhase::Betting => "BETTING",
            InferredPhase::Waiting => "WAITING",
            InferredPhase::Win => "WIN",
            InferredPhase::Loss => "LOSS",
            InferredPhase::Planning => "PLANNING",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastRoundOutcome {
    pub won: bool,
}

/// Result of one inference pass. `None` fields carry no new evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inference {
    pub phase: InferredPhase,
    pub pending_bet: Option<Decimal>,
    pub last_outcome: Option<LastRoundOutcome>,
}

impl Inference {
    fn offline() -> Self {
        Self {
            phase: InferredPhase::Offline,
            pending_bet: None,
            last_outcome: None,
        }
    }

    pub fn status_phrase(&self) -> &'static str {
        self.phase.status_phrase()
    }
}

/// The trailing `size` records of `records` (all of them if shorter).
pub fn log_window(records: &[LogRecord], size: usize) -> &[LogRecord] {
    &records[records.len().saturating_sub(size)..]
}

pub fn infer(window: &[LogRecord], running: bool) -> Inference {
    if !running {
        return Inference::offline();
    }

    let mut placing = false;
    let mut waiting = false;
    let mut planning = false;
    let mut outcome: Option<bool> = None;
    let mut pending_bet = None;

    for record in window {
        let text = record.message.as_str();

        if let Some(amount) = extract_final_amount(text) {
            pending_bet = Some(amount);
        }

        placing |= PLACING_MARKERS.iter().any(|m| text.contains(m));
        waiting |= WAITING_MARKERS.iter().any(|m| text.contains(m));
        planning |= text.contains(PLANNING_MARKER);

        if let Some(won) = classify_result(text) {
            outcome = Some(won);
        }
    }

    let phase = match outcome {
        None if placing => InferredPhase::Betting,
        None if waiting => InferredPhase::Waiting,
        Some(true) => InferredPhase::Win,
        Some(false) => InferredPhase::Loss,
        None if planning => InferredPhase::Planning,
        None => InferredPhase::Online,
    };

    Inference {
        phase,
        pending_bet,
        last_outcome: outcome.map(|won| LastRoundOutcome { won }),
    }
}

/// Win/loss signalled by a single line, if any. Later checks override
/// earlier ones, so an explicit loss marker beats a `RESULT:` on the same line.
fn classify_result(text: &str) -> Option<bool> {
    let mut outcome = None;
    if text.contains(RESULT_MARKER) {
        outcome = Some(text.contains("WON"));
    }
    if WIN_MARKERS.iter().any(|m| text.contains(m)) {
        outcome = Some(true);
    }
    if LOSS_MARKERS.iter().any(|m| text.contains(m)) {
        outcome = Some(false);
    }
    outcome
}

fn final_amount_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Final Amount:\s+([\d.]+)\s+🍌").expect("final amount pattern is valid")
    })
}

/// Bet amount from a `Final Amount: <decimal> 🍌` line, keeping its scale.
pub fn extract_final_amount(text: &str) -> Option<Decimal> {
    let captures = final_amount_pattern().captures(text)?;
    Decimal::from_str(captures.get(1)?.as_str()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn window(lines: &[&str]) -> Vec<LogRecord> {
        lines.iter().map(|l| LogRecord::info(*l)).collect()
    }

    #[test]
    fn test_not_running_is_offline() {
        let logs = window(&["🎲 PLACING BET 🎲", "Final Amount: 5.00 🍌", "✨ WIN: round closed"]);
        let result = infer(&logs, false);

        assert_eq!(result.phase, InferredPhase::Offline);
        assert_eq!(result.status_phrase(), "Offline");
        assert_eq!(result.pending_bet, None);
        assert_eq!(result.last_outcome, None);
    }

    #[test]
    fn test_placing_bet_extracts_amount() {
        let logs = window(&["🎲 PLACING BET 🎲", "Final Amount: 5.00 🍌"]);
        let result = infer(&logs, true);

        assert_eq!(result.phase, InferredPhase::Betting);
        assert_eq!(result.status_phrase(), "Placing bet...");
        assert_eq!(result.pending_bet, Some(dec!(5.00)));
        assert_eq!(result.pending_bet.unwrap().to_string(), "5.00");
    }

    #[test]
    fn test_amount_is_not_rounded() {
        assert_eq!(
            extract_final_amount("   Final Amount: 12.5 🍌").map(|d| d.to_string()),
            Some("12.5".to_string())
        );
    }

    #[test]
    fn test_malformed_amount_is_ignored() {
        assert_eq!(extract_final_amount("Final Amount: 1.2.3 🍌"), None);
        assert_eq!(extract_final_amount("Final Amount: . 🍌"), None);
        assert_eq!(extract_final_amount("Final Amount: lots 🍌"), None);

        let logs = window(&["Final Amount: 3.50 🍌", "Final Amount: 1..2 🍌"]);
        assert_eq!(infer(&logs, true).pending_bet, Some(dec!(3.50)));
    }

    #[test]
    fn test_last_amount_in_window_wins() {
        let logs = window(&["Final Amount: 3.50 🍌", "Gas Info: 21000", "Final Amount: 7.25 🍌"]);
        assert_eq!(infer(&logs, true).pending_bet, Some(dec!(7.25)));
    }

    #[test]
    fn test_win_marker() {
        let result = infer(&window(&["✨ WIN: round closed"]), true);

        assert_eq!(result.phase, InferredPhase::Win);
        assert_eq!(result.status_phrase(), "Game complete - Won!");
        assert_eq!(result.last_outcome, Some(LastRoundOutcome { won: true }));
    }

    #[test]
    fn test_empty_window_is_online() {
        let result = infer(&[], true);

        assert_eq!(result.phase, InferredPhase::Online);
        assert_eq!(result.status_phrase(), "Waiting for next bet...");
        assert_eq!(infer(&[], false).phase, InferredPhase::Offline);
    }

    #[test]
    fn test_result_masks_placing() {
        let logs = window(&["🎲 PLACING BET 🎲", "BET DETAILS", "Transaction Success", "📉 LOSS: -5 🍌"]);
        let result = infer(&logs, true);

        assert_eq!(result.phase, InferredPhase::Loss);
        assert_eq!(result.status_phrase(), "Game complete - Lost");
        assert_eq!(result.last_outcome, Some(LastRoundOutcome { won: false }));
    }

    #[test]
    fn test_result_won_text() {
        let logs = window(&["🎲 PLACING BET 🎲", "RESULT: WON 12 🍌", "Game in progress"]);
        let result = infer(&logs, true);

        assert_eq!(result.phase, InferredPhase::Win);
        assert_eq!(result.last_outcome, Some(LastRoundOutcome { won: true }));

        // RESULT: without WON counts as a loss.
        let result = infer(&window(&["RESULT: LOST"]), true);
        assert_eq!(result.phase, InferredPhase::Loss);
    }

    #[test]
    fn test_last_result_line_decides() {
        let logs = window(&["🔥 WIN STREAK: 3x", "📉 LOSS STREAK: 1x"]);
        assert_eq!(infer(&logs, true).phase, InferredPhase::Loss);

        let logs = window(&["📉 LOSS STREAK: 1x", "RESULT: WON"]);
        assert_eq!(infer(&logs, true).phase, InferredPhase::Win);
    }

    #[test]
    fn test_loss_marker_beats_result_on_same_line() {
        assert_eq!(classify_result("RESULT: WON but 📉 LOSS: after fees"), Some(false));
        assert_eq!(classify_result("RESULT: nothing WIN STREAK: 2"), Some(true));
        assert_eq!(classify_result("Rolling dice..."), None);
    }

    #[test]
    fn test_waiting_phase() {
        let logs = window(&["Transaction Success: 0xabc", "Waiting for game result"]);
        let result = infer(&logs, true);

        assert_eq!(result.phase, InferredPhase::Waiting);
        assert!(result.phase.is_betting());
        assert_eq!(result.status_phrase(), "Waiting for game result...");
    }

    #[test]
    fn test_placing_beats_waiting() {
        let logs = window(&["Gas Info: 30 gwei", "Base Amount: 4 🍌"]);
        assert_eq!(infer(&logs, true).phase, InferredPhase::Betting);
    }

    #[test]
    fn test_planning_phase() {
        let logs = window(&["💰 UPDATED BALANCE: 120.00 🍌", "🎯 NEXT BET: 6.00 🍌"]);
        let result = infer(&logs, true);

        assert_eq!(result.phase, InferredPhase::Planning);
        assert_eq!(result.status_phrase(), "Calculating next bet...");
        assert_eq!(result.pending_bet, None);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let logs = window(&["placing bet", "result: won", "next bet: 4"]);
        assert_eq!(infer(&logs, true).phase, InferredPhase::Online);
    }

    #[test]
    fn test_idempotent() {
        let logs = window(&["🎲 PLACING BET 🎲", "Final Amount: 2.00 🍌", "✨ WIN: +4 🍌", "NEXT BET: 3"]);
        assert_eq!(infer(&logs, true), infer(&logs, true));
        assert_eq!(infer(&logs, false), infer(&logs, false));
    }

    #[test]
    fn test_log_window_suffix() {
        let logs: Vec<LogRecord> = (0..20).map(|i| LogRecord::info(format!("line {}", i))).collect();

        let tail = log_window(&logs, LOG_WINDOW);
        assert_eq!(tail.len(), 15);
        assert_eq!(tail[0].message, "line 5");
        assert_eq!(log_window(&logs[..3], LOG_WINDOW).len(), 3);
    }

    #[test]
    fn test_window_excludes_older_result() {
        let mut logs = window(&["✨ WIN: earlier round"]);
        logs.extend((0..LOG_WINDOW).map(|i| LogRecord::info(format!("filler {}", i))));

        assert_eq!(infer(log_window(&logs, LOG_WINDOW), true).phase, InferredPhase::Online);
    }
}
