use crossterm::style::{Color, Stylize};
use std::fmt;
use std::str::FromStr;

use super::state::{DashboardSession, LastResult};
use crate::config::{
    optional_percent_label, percent_label, DisplayConfig, SettingsField, StrategySettings,
};
use crate::engine::InferredPhase;
use crate::types::{truncate_address, DisplayValue, LogLevel};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    fn palette(&self) -> Palette {
        match self {
            Theme::Light => Palette {
                heading: Color::DarkBlue,
                text: Color::Black,
                muted: Color::DarkGrey,
                positive: Color::DarkGreen,
                negative: Color::DarkRed,
                warning: Color::DarkYellow,
                highlight: Color::DarkMagenta,
            },
            Theme::Dark => Palette {
                heading: Color::Cyan,
                text: Color::White,
                muted: Color::Grey,
                positive: Color::Green,
                negative: Color::Red,
                warning: Color::Yellow,
                highlight: Color::Magenta,
            },
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{}'", other)),
        }
    }
}

struct Palette {
    heading: Color,
    text: Color,
    muted: Color,
    positive: Color,
    negative: Color,
    warning: Color,
    highlight: Color,
}

const KEY_HELP: &str = "[s] start  [x] stop  [r] refresh balances  [c] clear logs  [t] theme  \
     [z] reset stats  [e] edit settings  [q] quit";
const EDIT_HELP: &str = "[up/down] field  [+/-] change  [d] defaults  [enter] save  [esc] cancel";

fn format_uptime(seconds: u64) -> String {
    format!("{:02}:{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60, seconds % 60)
}

fn phase_color(phase: InferredPhase, palette: &Palette) -> Color {
    match phase {
        InferredPhase::Offline => palette.muted,
        InferredPhase::Online => palette.positive,
        InferredPhase::Betting | InferredPhase::Waiting => palette.warning,
        InferredPhase::Win => palette.positive,
        InferredPhase::Loss => palette.negative,
        InferredPhase::Planning => palette.highlight,
    }
}

fn result_color(result: LastResult, palette: &Palette) -> Color {
    match result {
        LastResult::Win => palette.positive,
        LastResult::Loss => palette.negative,
        LastResult::PatternWin => palette.highlight,
    }
}

fn heading(title: &str, palette: &Palette) -> String {
    format!("--- {} ---", title).with(palette.heading).bold().to_string()
}

/// Status, balance, statistics, recent games and log panels. Shared by the
/// live view and the one-shot `status` command.
pub fn render_status(session: &DashboardSession, display: &DisplayConfig) -> Vec<String> {
    let palette = session.theme.palette();
    let snap = &session.snapshot;
    let mut lines = Vec::new();

    lines.push(
        "=== Dice Bot Dashboard ==="
            .with(palette.heading)
            .bold()
            .to_string(),
    );

    let wallet = match &session.wallet {
        Some(view) => {
            let address = view
                .address
                .as_deref()
                .map(truncate_address)
                .unwrap_or_else(|| "connected".to_string());
            address.with(palette.positive).to_string()
        }
        None => "not connected".with(palette.negative).to_string(),
    };
    lines.push(format!("Wallet: {}", wallet));

    let run = if session.is_running() {
        format!("Running ({})", format_uptime(session.run.uptime_seconds()))
            .with(palette.positive)
            .to_string()
    } else {
        "Stopped".with(palette.muted).to_string()
    };
    lines.push(format!(
        "Bot: {}    Status: {}",
        run,
        session
            .status_phrase()
            .with(phase_color(session.phase, &palette))
            .bold()
    ));

    if session.is_running() {
        let bet = session
            .pending_bet
            .map(|b| format!("{} 🍌", b))
            .unwrap_or_else(|| "--".to_string());
        let last = match session.last_result {
            Some(result) => result.label().with(result_color(result, &palette)).bold().to_string(),
            None => "--".with(palette.muted).to_string(),
        };
        lines.push(format!("Current bet: {}    Last result: {}", bet, last));
    }

    lines.push(String::new());
    lines.push(heading("Balances", &palette));
    lines.push(
        format!(
            "Balance: {} 🍌    S: {}    All-time high: {}",
            value_or_dash(snap.current_balance.as_ref()),
            value_or_dash(snap.s_token_balance.as_ref()),
            value_or_dash(snap.all_time_high.as_ref()),
        )
        .with(palette.text)
        .to_string(),
    );

    let profit_color = match session.session_profit_sign() {
        1 => palette.positive,
        -1 => palette.negative,
        _ => palette.text,
    };
    lines.push(format!(
        "Session profit: {}",
        session.session_profit_label().with(profit_color)
    ));

    lines.push(String::new());
    lines.push(heading("Statistics", &palette));
    lines.push(format!(
        "Games: {}    Wins: {}    Losses: {}    Win rate: {}%",
        snap.total_games,
        snap.total_wins,
        snap.total_losses,
        session.win_rate()
    ));
    lines.push(format!(
        "Win streak: {}    Loss streak: {}    Games since 69: {}",
        snap.win_streak, snap.loss_streak, snap.games_since_69
    ));
    if let Some(updated) = &snap.last_update {
        lines.push(format!("Last update: {}", updated).with(palette.muted).to_string());
    }

    if let Some(editor) = &session.settings {
        lines.push(String::new());
        match editor.draft() {
            Some(draft) => {
                lines.push(heading("Strategy (editing)", &palette));
                for field in SettingsField::ALL {
                    let row = format!("{:<18} {}", field.label(), field.value_label(draft));
                    if field == session.edit_field {
                        lines.push(format!("> {}", row).with(palette.highlight).bold().to_string());
                    } else {
                        lines.push(format!("  {}", row));
                    }
                }
            }
            None => {
                lines.push(heading("Strategy", &palette));
                lines.extend(render_settings(editor.current()));
            }
        }
    }

    lines.push(String::new());
    lines.push(heading("Recent games", &palette));
    if snap.recent_games.is_empty() {
        lines.push("No games yet".with(palette.muted).to_string());
    } else {
        lines.push(format!(
            "{:<10} {:>8} {:<8} {:>10} {:<7} {:>10}",
            "Time", "Game", "Dice", "Amount", "Result", "Change"
        ));
        for game in snap.recent_games.iter().take(display.recent_games) {
            let result = LastResult::from_game(game);
            let color = result_color(result, &palette);
            lines.push(format!(
                "{:<10} {:>8} {:<8} {:>10} {} {:>10}",
                game.time,
                game.game_id.as_str(),
                game.dice_str(),
                game.amount.as_str(),
                format!("{:<7}", result.label()).with(color),
                game.signed_change().with(color),
            ));
        }
    }

    lines.push(String::new());
    lines.push(heading(&format!("Logs ({})", session.log_count()), &palette));
    let skip = session.log_count().saturating_sub(display.log_lines);
    for record in session.logs().skip(skip) {
        let level_color = match record.level {
            LogLevel::Error => palette.negative,
            LogLevel::Warn => palette.warning,
            LogLevel::Debug => palette.muted,
            LogLevel::Info => palette.text,
        };
        lines.push(format!(
            "[{}] {} {}",
            record.time,
            format!("{:<5}", record.level.as_str()).with(level_color),
            record.message
        ));
    }

    lines
}

/// Full live frame: the status panels plus the key help and any alert.
pub fn render_frame(session: &DashboardSession, display: &DisplayConfig) -> Vec<String> {
    let palette = session.theme.palette();
    let mut lines = render_status(session, display);

    lines.push(String::new());
    if let Some(alert) = &session.alert {
        lines.push(format!("! {}", alert).with(palette.negative).bold().to_string());
    }
    let help = if session.is_editing_settings() { EDIT_HELP } else { KEY_HELP };
    lines.push(help.with(palette.muted).to_string());
    lines
}

pub fn render_settings(settings: &StrategySettings) -> Vec<String> {
    vec![
        format!(
            "Min bet: {}    Max bet: {}",
            percent_label(settings.min_bet_percentage),
            percent_label(settings.max_bet_percentage)
        ),
        format!(
            "Win streak rate: {}    Loss recovery: {}",
            optional_percent_label(settings.win_streak_rate),
            percent_label(settings.loss_recovery_rate)
        ),
        format!(
            "Chase 69 after: {} games    Chase multiplier: {}x",
            settings.chase_69_threshold,
            settings.chase_69_multiplier.normalize()
        ),
        format!(
            "Win sensitivity: {}    Loss sensitivity: {}    Tracked games: {}",
            optional_percent_label(settings.win_sensitivity),
            optional_percent_label(settings.loss_sensitivity),
            settings
                .max_track_games
                .map(|n| n.to_string())
                .unwrap_or_else(|| "--".to_string())
        ),
    ]
}

pub fn value_or_dash(value: Option<&DisplayValue>) -> String {
    match value {
        Some(v) if !v.as_str().is_empty() => v.to_string(),
        _ => "--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StatsSnapshot;
    use crate::config::{PollingConfig, SettingsEditor};
    use crate::engine::{RunMode, RunModeState};
    use crate::types::{GameRecord, LogRecord};

    fn running_session() -> DashboardSession {
        let mut session = DashboardSession::new(
            &PollingConfig::default(),
            RunModeState::new(RunMode::Running),
            Theme::Dark,
        );
        session.apply_snapshot(StatsSnapshot {
            current_balance: Some("1,250.50".into()),
            total_games: 4,
            total_wins: 3,
            total_losses: 1,
            session_profit: Some("7.5".into()),
            log_messages: vec![
                LogRecord::info("🎲 PLACING BET 🎲"),
                LogRecord::info("Final Amount: 12.00 🍌"),
            ],
            recent_games: vec![GameRecord {
                time: "10:00:00".to_string(),
                game_id: "42".into(),
                dice: vec![6, 6, 9],
                amount: "12.00".into(),
                won: false,
                balance_change: "12.00".into(),
                is_69: false,
            }],
            ..StatsSnapshot::default()
        });
        session
    }

    fn joined(lines: &[String]) -> String {
        lines.join("\n")
    }

    #[test]
    fn test_theme_parse_and_toggle() {
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!(" light ".parse::<Theme>().unwrap(), Theme::Light);
        assert!("solarized".parse::<Theme>().is_err());
        assert_eq!(Theme::default(), Theme::Light);
        assert_eq!(Theme::Light.toggle(), Theme::Dark);
        assert_eq!(Theme::Dark.toggle().to_string(), "light");
    }

    #[test]
    fn test_status_panels() {
        let session = running_session();
        let text = joined(&render_status(&session, &DisplayConfig::default()));

        assert!(text.contains("Placing bet..."));
        assert!(text.contains("12.00 🍌"));
        assert!(text.contains("1,250.50"));
        assert!(text.contains("75.0%"));
        assert!(text.contains("+7.5"));
        assert!(text.contains("6 6 9"));
        assert!(text.contains("LOSS"));
        assert!(text.contains("Final Amount: 12.00 🍌"));
        assert!(!text.contains("[q] quit"));
    }

    #[test]
    fn test_stopped_session_hides_bet() {
        let session = DashboardSession::new(
            &PollingConfig::default(),
            RunModeState::default(),
            Theme::Light,
        );
        let text = joined(&render_status(&session, &DisplayConfig::default()));
        assert!(text.contains("Offline"));
        assert!(text.contains("not connected"));
        assert!(!text.contains("Current bet"));
        assert!(text.contains("No games yet"));
    }

    #[test]
    fn test_frame_shows_alert_and_help() {
        let mut session = running_session();
        session.alert = Some("Failed to start bot".to_string());
        let text = joined(&render_frame(&session, &DisplayConfig::default()));
        assert!(text.contains("! Failed to start bot"));
        assert!(text.contains("[q] quit"));
    }

    #[test]
    fn test_log_panel_respects_line_limit() {
        let mut session = running_session();
        for i in 0..5 {
            session.add_local_log(LogLevel::Info, format!("local event {}", i));
        }
        let display = DisplayConfig { log_lines: 2, ..DisplayConfig::default() };
        let text = joined(&render_status(&session, &display));
        assert!(!text.contains("local event 2"));
        assert!(text.contains("local event 3"));
        assert!(text.contains("local event 4"));
    }

    #[test]
    fn test_settings_lines() {
        let lines = render_settings(&StrategySettings::default());
        assert_eq!(lines[0], "Min bet: 10%    Max bet: 25%");
        assert!(lines[2].contains("1.1x"));
        assert!(lines[3].contains("Tracked games: 20"));
    }

    #[test]
    fn test_edit_mode_marks_selected_field() {
        let mut session = running_session();
        let mut editor = SettingsEditor::new(StrategySettings::default());
        editor.nudge(SettingsField::MaxBet, true).unwrap();
        session.settings = Some(editor);
        session.edit_field = SettingsField::MaxBet;

        let lines = render_frame(&session, &DisplayConfig::default());
        let text = joined(&lines);
        assert!(text.contains("Strategy (editing)"));
        assert!(lines.iter().any(|l| l.contains("> Max bet") && l.contains("26%")));
        assert!(lines.iter().any(|l| l.starts_with("  Min bet") && l.contains("10%")));
        assert!(text.contains("[enter] save"));
        assert!(!text.contains("[q] quit"));
    }

    #[test]
    fn test_value_or_dash() {
        assert_eq!(value_or_dash(None), "--");
        assert_eq!(value_or_dash(Some(&DisplayValue::new(""))), "--");
        assert_eq!(value_or_dash(Some(&DisplayValue::new("0.000"))), "0.000");
    }

    #[test]
    fn test_uptime_format() {
        assert_eq!(format_uptime(3725), "01:02:05");
    }
}
