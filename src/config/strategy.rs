use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Betting strategy parameters as exchanged with `/api/current_settings`
/// and `/api/save_settings`. Rates are fractions in 0..=1 sent as JSON floats.
/// The optional fields are not reported by every bot version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySettings {
    #[serde(with = "rust_decimal::serde::float")]
    pub min_bet_percentage: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub max_bet_percentage: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub win_streak_rate: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float")]
    pub loss_recovery_rate: Decimal,
    pub chase_69_threshold: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub chase_69_multiplier: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub win_sensitivity: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option", skip_serializing_if = "Option::is_none")]
    pub loss_sensitivity: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_track_games: Option<u32>,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            min_bet_percentage: dec!(0.10),
            max_bet_percentage: dec!(0.25),
            win_streak_rate: Some(dec!(0.20)),
            loss_recovery_rate: dec!(0.15),
            chase_69_threshold: 15,
            chase_69_multiplier: dec!(1.10),
            win_sensitivity: Some(dec!(0.50)),
            loss_sensitivity: Some(dec!(0.50)),
            max_track_games: Some(20),
        }
    }
}

impl StrategySettings {
    /// Copy with every optional parameter present, taking defaults for gaps.
    pub fn completed(&self) -> Self {
        let defaults = Self::default();
        Self {
            win_streak_rate: self.win_streak_rate.or(defaults.win_streak_rate),
            win_sensitivity: self.win_sensitivity.or(defaults.win_sensitivity),
            loss_sensitivity: self.loss_sensitivity.or(defaults.loss_sensitivity),
            max_track_games: self.max_track_games.or(defaults.max_track_games),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // Compared in whole percent, the resolution the editor works in.
        if whole_percent(self.min_bet_percentage) >= whole_percent(self.max_bet_percentage) {
            errors.push("Min bet percentage must be less than max bet percentage".to_string());
        }

        let rates = [
            ("min_bet_percentage", Some(self.min_bet_percentage)),
            ("max_bet_percentage", Some(self.max_bet_percentage)),
            ("win_streak_rate", self.win_streak_rate),
            ("loss_recovery_rate", Some(self.loss_recovery_rate)),
            ("win_sensitivity", self.win_sensitivity),
            ("loss_sensitivity", self.loss_sensitivity),
        ];
        for (name, rate) in rates {
            if let Some(rate) = rate {
                if rate < Decimal::ZERO || rate > Decimal::ONE {
                    errors.push(format!("{} must be between 0 and 100%", name));
                }
            }
        }

        if self.chase_69_multiplier <= Decimal::ZERO {
            errors.push("chase_69_multiplier must be > 0".to_string());
        }
        if self.max_track_games == Some(0) {
            errors.push("max_track_games must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

pub fn whole_percent(rate: Decimal) -> Decimal {
    (rate * dec!(100)).round_dp(0)
}

pub fn percent_label(rate: Decimal) -> String {
    format!("{}%", whole_percent(rate).normalize())
}

pub fn optional_percent_label(rate: Option<Decimal>) -> String {
    rate.map(percent_label).unwrap_or_else(|| "--".to_string())
}
