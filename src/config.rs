//! Parser configuration.

use serde::Deserialize;

/// What to do when a line violates the Line Protocol grammar or carries a
/// malformed number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Discard the offending line and continue with the next one.
    #[default]
    Skip,
    /// Abort the whole sequence with [`Error::Syntax`](crate::Error::Syntax).
    FailFast,
}

/// Options for [`LineProtocolParser`](crate::LineProtocolParser).
///
/// Deserializable so applications can embed it in their own config files:
///
/// ```ignore
/// [parser]
/// error_mode = "fail_fast"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Handling of malformed lines.
    pub error_mode: ErrorMode,
}

impl ParserConfig {
    /// Create the default configuration (skip malformed lines).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the error mode.
    pub fn error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Shorthand for `error_mode(ErrorMode::FailFast)`.
    pub fn fail_fast(self) -> Self {
        self.error_mode(ErrorMode::FailFast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_skips() {
        assert_eq!(ParserConfig::new().error_mode, ErrorMode::Skip);
    }

    #[test]
    fn test_fail_fast() {
        assert_eq!(ParserConfig::new().fail_fast().error_mode, ErrorMode::FailFast);
    }

    #[test]
    fn test_deserialize() {
        let config: ParserConfig = serde_json::from_str(r#"{"error_mode":"fail_fast"}"#).unwrap();
        assert_eq!(config.error_mode, ErrorMode::FailFast);

        let config: ParserConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.error_mode, ErrorMode::Skip);

        assert!(serde_json::from_str::<ParserConfig>(r#"{"error_mode":"loud"}"#).is_err());
    }
}
