use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

use super::strategy::{optional_percent_label, percent_label, whole_percent, StrategySettings};

/// Operator edits in whole percent (rates) or raw values, as typed on the
/// command line or in the settings form. Unset fields keep the draft value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub min_bet_pct: Option<u32>,
    pub max_bet_pct: Option<u32>,
    pub win_streak_rate_pct: Option<u32>,
    pub loss_recovery_pct: Option<u32>,
    pub chase_threshold: Option<u32>,
    pub chase_multiplier: Option<Decimal>,
    pub win_sensitivity_pct: Option<u32>,
    pub loss_sensitivity_pct: Option<u32>,
    pub max_track_games: Option<u32>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One row of the settings form, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    MinBet,
    MaxBet,
    WinStreakRate,
    LossRecovery,
    ChaseThreshold,
    ChaseMultiplier,
    WinSensitivity,
    LossSensitivity,
    MaxTrackGames,
}

impl SettingsField {
    pub const ALL: [SettingsField; 9] = [
        SettingsField::MinBet,
        SettingsField::MaxBet,
        SettingsField::WinStreakRate,
        SettingsField::LossRecovery,
        SettingsField::ChaseThreshold,
        SettingsField::ChaseMultiplier,
        SettingsField::WinSensitivity,
        SettingsField::LossSensitivity,
        SettingsField::MaxTrackGames,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SettingsField::MinBet => "Min bet",
            SettingsField::MaxBet => "Max bet",
            SettingsField::WinStreakRate => "Win streak rate",
            SettingsField::LossRecovery => "Loss recovery",
            SettingsField::ChaseThreshold => "Chase 69 after",
            SettingsField::ChaseMultiplier => "Chase multiplier",
            SettingsField::WinSensitivity => "Win sensitivity",
            SettingsField::LossSensitivity => "Loss sensitivity",
            SettingsField::MaxTrackGames => "Tracked games",
        }
    }

    pub fn value_label(self, settings: &StrategySettings) -> String {
        match self {
            SettingsField::MinBet => percent_label(settings.min_bet_percentage),
            SettingsField::MaxBet => percent_label(settings.max_bet_percentage),
            SettingsField::WinStreakRate => optional_percent_label(settings.win_streak_rate),
            SettingsField::LossRecovery => percent_label(settings.loss_recovery_rate),
            SettingsField::ChaseThreshold => format!("{} games", settings.chase_69_threshold),
            SettingsField::ChaseMultiplier => format!("{}x", settings.chase_69_multiplier.normalize()),
            SettingsField::WinSensitivity => optional_percent_label(settings.win_sensitivity),
            SettingsField::LossSensitivity => optional_percent_label(settings.loss_sensitivity),
            SettingsField::MaxTrackGames => settings
                .max_track_games
                .map(|n| n.to_string())
                .unwrap_or_else(|| "--".to_string()),
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

fn rate(pct: u32) -> Decimal {
    Decimal::from(pct) / Decimal::from(100)
}

/// View/edit state for the strategy settings. The current settings mirror
/// the bot; edits happen on a draft that is only handed out once valid.
#[derive(Debug, Clone)]
pub struct SettingsEditor {
    current: StrategySettings,
    draft: Option<StrategySettings>,
}

impl SettingsEditor {
    pub fn new(current: StrategySettings) -> Self {
        Self { current, draft: None }
    }

    pub fn current(&self) -> &StrategySettings {
        &self.current
    }

    pub fn draft(&self) -> Option<&StrategySettings> {
        self.draft.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    /// Enter edit mode with a complete copy of the current settings.
    pub fn begin_edit(&mut self) -> &StrategySettings {
        self.draft.get_or_insert_with(|| self.current.completed())
    }

    pub fn apply(&mut self, patch: &SettingsPatch) -> Result<(), String> {
        let draft = self.draft.get_or_insert_with(|| self.current.completed());
        let previous = draft.clone();

        if let Some(v) = patch.min_bet_pct {
            draft.min_bet_percentage = rate(v);
        }
        if let Some(v) = patch.max_bet_pct {
            draft.max_bet_percentage = rate(v);
        }
        if let Some(v) = patch.win_streak_rate_pct {
            draft.win_streak_rate = Some(rate(v));
        }
        if let Some(v) = patch.loss_recovery_pct {
            draft.loss_recovery_rate = rate(v);
        }
        if let Some(v) = patch.chase_threshold {
            draft.chase_69_threshold = v;
        }
        if let Some(v) = patch.chase_multiplier {
            draft.chase_69_multiplier = v;
        }
        if let Some(v) = patch.win_sensitivity_pct {
            draft.win_sensitivity = Some(rate(v));
        }
        if let Some(v) = patch.loss_sensitivity_pct {
            draft.loss_sensitivity = Some(rate(v));
        }
        if let Some(v) = patch.max_track_games {
            draft.max_track_games = Some(v);
        }

        if let Err(errors) = draft.validate() {
            *draft = previous;
            return Err(errors.join(", "));
        }
        Ok(())
    }

    /// Step one field of the draft by its unit: one percent, one game or
    /// 0.01 of the multiplier. A step that breaks validation is refused.
    pub fn nudge(&mut self, field: SettingsField, up: bool) -> Result<(), String> {
        let draft = self.begin_edit().clone();
        let step_pct = |value: Decimal| {
            let pct = whole_percent(value).to_u32().unwrap_or(0);
            Some(if up { (pct + 1).min(100) } else { pct.saturating_sub(1) })
        };
        let step_count = |value: u32| Some(if up { value.saturating_add(1) } else { value.saturating_sub(1) });

        let mut patch = SettingsPatch::default();
        match field {
            SettingsField::MinBet => patch.min_bet_pct = step_pct(draft.min_bet_percentage),
            SettingsField::MaxBet => patch.max_bet_pct = step_pct(draft.max_bet_percentage),
            SettingsField::WinStreakRate => {
                patch.win_streak_rate_pct = step_pct(draft.win_streak_rate.unwrap_or_default())
            }
            SettingsField::LossRecovery => patch.loss_recovery_pct = step_pct(draft.loss_recovery_rate),
            SettingsField::ChaseThreshold => patch.chase_threshold = step_count(draft.chase_69_threshold),
            SettingsField::ChaseMultiplier => {
                let step = if up { dec!(0.01) } else { dec!(-0.01) };
                patch.chase_multiplier = Some(draft.chase_69_multiplier + step);
            }
            SettingsField::WinSensitivity => {
                patch.win_sensitivity_pct = step_pct(draft.win_sensitivity.unwrap_or_default())
            }
            SettingsField::LossSensitivity => {
                patch.loss_sensitivity_pct = step_pct(draft.loss_sensitivity.unwrap_or_default())
            }
            SettingsField::MaxTrackGames => {
                patch.max_track_games = step_count(draft.max_track_games.unwrap_or_default())
            }
        }
        self.apply(&patch)
    }

    pub fn reset_defaults(&mut self) {
        info!("Settings draft reset to defaults");
        self.draft = Some(StrategySettings::default());
    }

    /// Leave edit mode, discarding the draft.
    pub fn cancel(&mut self) {
        self.draft = None;
    }

    /// The settings to post to the bot. Validation runs again so a draft is
    /// never sent unchecked.
    pub fn finish(&self) -> Result<StrategySettings, String> {
        let draft = self.draft.clone().unwrap_or_else(|| self.current.completed());
        draft.validate().map_err(|errors| errors.join(", "))?;
        Ok(draft)
    }

    /// The bot accepted the draft; it becomes the current view.
    pub fn commit(&mut self, saved: StrategySettings) {
        self.current = saved;
        self.draft = None;
    }
}
