use serde::{Deserialize, Serialize};

use super::DisplayValue;

/// A completed round from the bot's `recent_games` list, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub game_id: DisplayValue,
    #[serde(default)]
    pub dice: Vec<u8>,
    #[serde(default)]
    pub amount: DisplayValue,
    #[serde(default)]
    pub won: bool,
    #[serde(default)]
    pub balance_change: DisplayValue,
    #[serde(default)]
    pub is_69: bool,
}

impl GameRecord {
    pub fn signed_change(&self) -> String {
        let sign = if self.won { '+' } else { '-' };
        format!("{}{}", sign, self.balance_change.unsigned())
    }

    pub fn dice_str(&self) -> String {
        self.dice
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_game_record() {
        let game: GameRecord = serde_json::from_str(
            r#"{"time": "14:02:11", "game_id": 4412, "dice": [6, 5, 4],
                "won": true, "amount": "25.00", "balance_change": 50, "is_69": true}"#,
        )
        .unwrap();

        assert_eq!(game.game_id.as_str(), "4412");
        assert_eq!(game.dice_str(), "6 5 4");
        assert!(game.is_69);
        assert_eq!(game.signed_change(), "+50");
    }

    #[test]
    fn test_loss_change_is_negative_once() {
        let game: GameRecord = serde_json::from_str(
            r#"{"game_id": "Unknown", "won": false, "balance_change": -12}"#,
        )
        .unwrap();

        assert_eq!(game.signed_change(), "-12");
        assert!(!game.is_69);
    }
}
