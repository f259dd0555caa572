use std::path::PathBuf;

use serde::Deserialize;

use crate::error::MatchError;

// ---------------------------------------------------------------------------
// Top-level run config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RunConfig {
    pub name: String,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
}

#[derive(Debug, Deserialize)]
pub struct SourcesConfig {
    /// Directory tree holding the per-session processor export files.
    pub transactions_root: PathBuf,
    /// SQLite database with the exchanges and participants tables.
    pub exchanges_db: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: default_output_dir() }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

// ---------------------------------------------------------------------------
// Time windows
// ---------------------------------------------------------------------------

/// Scan time windows. The defaults are the audited policy values; override
/// only when re-running against a processor with different settlement lag.
#[derive(Debug, Clone, Deserialize)]
pub struct ToleranceConfig {
    /// How far an exchange may trail the current transaction before the
    /// primary scan gives up on this neighborhood.
    #[serde(default = "default_trail_secs")]
    pub trail_secs: i64,
    /// Local-match window lower bound, before the transaction.
    #[serde(default = "default_lookback_secs")]
    pub lookback_secs: i64,
    /// Local-match window upper bound, after the transaction.
    #[serde(default = "default_lookahead_secs")]
    pub lookahead_secs: i64,
}

fn default_trail_secs() -> i64 {
    10
}

fn default_lookback_secs() -> i64 {
    60
}

fn default_lookahead_secs() -> i64 {
    6 * 3600
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            trail_secs: default_trail_secs(),
            lookback_secs: default_lookback_secs(),
            lookahead_secs: default_lookahead_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, MatchError> {
        let config: RunConfig =
            toml::from_str(input).map_err(|e| MatchError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.sources.transactions_root.as_os_str().is_empty() {
            return Err(MatchError::ConfigValidation(
                "sources.transactions_root must not be empty".into(),
            ));
        }
        if self.sources.exchanges_db.as_os_str().is_empty() {
            return Err(MatchError::ConfigValidation(
                "sources.exchanges_db must not be empty".into(),
            ));
        }

        let t = &self.tolerance;
        if t.trail_secs < 0 || t.lookback_secs < 0 || t.lookahead_secs < 0 {
            return Err(MatchError::ConfigValidation(
                "tolerance windows must not be negative".into(),
            ));
        }
        if t.lookahead_secs < t.trail_secs {
            return Err(MatchError::ConfigValidation(format!(
                "lookahead_secs ({}) must cover trail_secs ({})",
                t.lookahead_secs, t.trail_secs
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "June close"

[sources]
transactions_root = "exports/3912"
exchanges_db = "exchanges.db"

[output]
dir = "audits/june"
"#;

    #[test]
    fn parse_valid_config() {
        let config = RunConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "June close");
        assert_eq!(config.sources.exchanges_db, PathBuf::from("exchanges.db"));
        assert_eq!(config.output.dir, PathBuf::from("audits/june"));
    }

    #[test]
    fn tolerance_defaults_are_policy_values() {
        let config = RunConfig::from_toml(VALID).unwrap();
        assert_eq!(config.tolerance.trail_secs, 10);
        assert_eq!(config.tolerance.lookback_secs, 60);
        assert_eq!(config.tolerance.lookahead_secs, 21_600);
    }

    #[test]
    fn output_dir_defaults_when_section_absent() {
        let input = r#"
name = "Minimal"

[sources]
transactions_root = "exports"
exchanges_db = "exchanges.db"
"#;
        let config = RunConfig::from_toml(input).unwrap();
        assert_eq!(config.output.dir, PathBuf::from("out"));
    }

    #[test]
    fn tolerance_override_round_trips() {
        let input = format!(
            r#"{VALID}
[tolerance]
trail_secs = 5
lookback_secs = 30
lookahead_secs = 7200
"#
        );
        let config = RunConfig::from_toml(&input).unwrap();
        assert_eq!(config.tolerance.trail_secs, 5);
        assert_eq!(config.tolerance.lookback_secs, 30);
        assert_eq!(config.tolerance.lookahead_secs, 7200);
    }

    #[test]
    fn reject_empty_source_path() {
        let input = r#"
name = "Bad"

[sources]
transactions_root = ""
exchanges_db = "exchanges.db"
"#;
        let err = RunConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("transactions_root"));
    }

    #[test]
    fn reject_negative_window() {
        let input = format!(
            r#"{VALID}
[tolerance]
trail_secs = -1
"#
        );
        let err = RunConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn reject_lookahead_shorter_than_trail() {
        let input = format!(
            r#"{VALID}
[tolerance]
trail_secs = 100
lookahead_secs = 50
"#
        );
        assert!(RunConfig::from_toml(&input).is_err());
    }
}
