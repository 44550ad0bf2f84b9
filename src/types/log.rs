use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Debug => "DEBUG",
        }
    }
}

// The bot emits Python level names; anything unrecognised is shown as INFO.
impl From<String> for LogLevel {
    fn from(s: String) -> Self {
        match s.to_uppercase().as_str() {
            "WARN" | "WARNING" => LogLevel::Warn,
            "ERROR" | "CRITICAL" | "FATAL" => LogLevel::Error,
            "DEBUG" | "TRACE" => LogLevel::Debug,
            _ => LogLevel::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of the bot's log tail as reported by `/api/stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(default)]
    pub time: String,
    pub level: LogLevel,
    #[serde(default)]
    pub message: String,
}

impl LogRecord {
    pub fn new(time: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new("", LogLevel::Info, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_level_names() {
        let record: LogRecord = serde_json::from_str(
            r#"{"time": "12:00:01", "level": "WARNING", "message": "Game pending"}"#,
        )
        .unwrap();
        assert_eq!(record.level, LogLevel::Warn);

        assert_eq!(LogLevel::from("CRITICAL".to_string()), LogLevel::Error);
        assert_eq!(LogLevel::from("debug".to_string()), LogLevel::Debug);
        assert_eq!(LogLevel::from("NOTICE".to_string()), LogLevel::Info);
    }

    #[test]
    fn test_missing_message_defaults_empty() {
        let record: LogRecord = serde_json::from_str(r#"{"level": "INFO"}"#).unwrap();
        assert_eq!(record.message, "");
        assert_eq!(record.level.to_string(), "INFO");
    }
}
