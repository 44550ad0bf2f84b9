use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A value the bot reports for display only. Balances arrive as formatted
/// strings once a wallet is loaded and as bare numbers before that, so both
/// are accepted and kept as text. Equality compares the text only.
#[derive(Debug, Clone, Default)]
pub struct DisplayValue {
    text: String,
    numeric: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDisplay {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl DisplayValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            text: value.into(),
            numeric: false,
        }
    }

    fn number(text: String) -> Self {
        Self { text, numeric: true }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// False for values the dashboard treats as "no data": null, empty text
    /// and a bare numeric zero. Formatted text such as `"0.000"` is present.
    pub fn is_present(&self) -> bool {
        if self.text.trim().is_empty() {
            return false;
        }
        if self.numeric {
            return self.as_decimal().map(|d| !d.is_zero()).unwrap_or(true);
        }
        true
    }

    /// Parses the value as a decimal, ignoring thousands separators.
    pub fn as_decimal(&self) -> Option<Decimal> {
        let cleaned: String = self.text.trim().chars().filter(|c| *c != ',').collect();
        Decimal::from_str(&cleaned).ok()
    }

    /// Magnitude without a leading sign, for "+x" / "-x" formatting.
    pub fn unsigned(&self) -> &str {
        self.text.trim().trim_start_matches(['-', '+'])
    }
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl PartialEq for DisplayValue {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for DisplayValue {}

impl From<&str> for DisplayValue {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for DisplayValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawDisplay::deserialize(deserializer)? {
            RawDisplay::Text(s) => Self::new(s),
            RawDisplay::Int(i) => Self::number(i.to_string()),
            RawDisplay::Float(f) => Self::number(f.to_string()),
            RawDisplay::Bool(b) => Self::new(b.to_string()),
            RawDisplay::Null => Self::default(),
        })
    }
}

impl Serialize for DisplayValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}
