use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::RepError;

#[derive(Debug, Clone)]
pub struct Settings {
    pub http_port: u16,
    /// Classifier base URL. Unset means every classification degrades.
    pub classifier_url: Option<String>,
    pub classifier_token: Option<String>,
    pub classifier_timeout: Duration,
    pub issue_confidence_threshold: f64,
    pub appeal_confidence_threshold: f64,
    pub sampler_epsilon: f64,
    pub feed_max_candidates: usize,
    pub feed_max_age_hours: i64,
    pub analyze_rate_limit_per_minute: usize,
    pub appeal_rate_limit_per_day: usize,
    /// Zero disables the sweeper.
    pub reward_sweep_interval: Duration,
    pub event_journal_path: Option<PathBuf>,
    /// Defaults to `appeals.jsonl` next to the event journal.
    pub appeal_journal_path: Option<PathBuf>,
    pub seed_data_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            http_port: 9700,
            classifier_url: None,
            classifier_token: None,
            classifier_timeout: Duration::from_millis(3000),
            issue_confidence_threshold: 0.7,
            appeal_confidence_threshold: 0.7,
            sampler_epsilon: 0.01,
            feed_max_candidates: 500,
            feed_max_age_hours: 168,
            analyze_rate_limit_per_minute: 30,
            appeal_rate_limit_per_day: 5,
            reward_sweep_interval: Duration::from_secs(300),
            event_journal_path: None,
            appeal_journal_path: None,
            seed_data_path: None,
        }
    }
}

impl Settings {
    /// Where appeal records are journaled, if anywhere.
    ///
    /// Appeals are persisted whenever events are, so a restart cannot reopen
    /// an appeal whose compensation is already in the ledger.
    #[must_use]
    pub fn appeal_journal(&self) -> Option<PathBuf> {
        self.appeal_journal_path.clone().or_else(|| {
            self.event_journal_path
                .as_ref()
                .map(|events| events.with_file_name("appeals.jsonl"))
        })
    }

    /// Validates the settings and returns an error if invalid.
    pub fn validate(&self) -> Result<(), RepError> {
        validate_port(self.http_port)?;
        validate_timeout(self.classifier_timeout)?;
        validate_threshold("ISSUE_CONFIDENCE_THRESHOLD", self.issue_confidence_threshold)?;
        validate_threshold("APPEAL_CONFIDENCE_THRESHOLD", self.appeal_confidence_threshold)?;
        if !self.sampler_epsilon.is_finite() || self.sampler_epsilon <= 0.0 {
            return Err(RepError::Config("SAMPLER_EPSILON must be positive".into()));
        }
        if self.feed_max_candidates == 0 {
            return Err(RepError::Config("FEED_MAX_CANDIDATES cannot be 0".into()));
        }
        if self.feed_max_age_hours <= 0 {
            return Err(RepError::Config("FEED_MAX_AGE_HOURS must be positive".into()));
        }
        if let Some(url) = &self.classifier_url {
            if url.trim().is_empty() {
                return Err(RepError::Config("CLASSIFIER_URL cannot be empty".into()));
            }
        }
        Ok(())
    }
}

fn validate_port(port: u16) -> Result<(), RepError> {
    if port == 0 {
        return Err(RepError::Config("Port cannot be 0".into()));
    }
    Ok(())
}

fn validate_timeout(timeout: Duration) -> Result<(), RepError> {
    let millis = timeout.as_millis();
    if !(100..=10_000).contains(&millis) {
        return Err(RepError::Config(format!(
            "CLASSIFIER_TIMEOUT_MS must be within 100..=10000, got {millis}"
        )));
    }
    Ok(())
}

fn validate_threshold(name: &str, value: f64) -> Result<(), RepError> {
    if !(value > 0.0 && value < 1.0) {
        return Err(RepError::Config(format!(
            "{name} must be strictly between 0 and 1, got {value}"
        )));
    }
    Ok(())
}

/// Read a value from environment variable, with support for _FILE suffix (Docker Secrets)
fn get_env_or_file(env_name: &str) -> Result<Option<String>, RepError> {
    let file_env = format!("{env_name}_FILE");
    if let Ok(file_path) = env::var(&file_env) {
        return fs::read_to_string(&file_path)
            .map(|content| Some(content.trim().to_string()))
            .map_err(|e| RepError::Config(format!("Failed to read {file_env}: {e}")));
    }
    Ok(env::var(env_name).ok().filter(|v| !v.trim().is_empty()))
}

fn parse_env<T>(name: &str, default: T) -> Result<T, RepError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| RepError::Config(format!("{name}: {e}"))),
        Err(_) => Ok(default),
    }
}

fn path_env(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

pub fn get_configuration() -> Result<Settings, RepError> {
    let defaults = Settings::default();

    let settings = Settings {
        http_port: parse_env("HTTP_PORT", defaults.http_port)?,
        classifier_url: env::var("CLASSIFIER_URL").ok(),
        classifier_token: get_env_or_file("CLASSIFIER_TOKEN")?,
        classifier_timeout: Duration::from_millis(parse_env("CLASSIFIER_TIMEOUT_MS", 3000)?),
        issue_confidence_threshold: parse_env(
            "ISSUE_CONFIDENCE_THRESHOLD",
            defaults.issue_confidence_threshold,
        )?,
        appeal_confidence_threshold: parse_env(
            "APPEAL_CONFIDENCE_THRESHOLD",
            defaults.appeal_confidence_threshold,
        )?,
        sampler_epsilon: parse_env("SAMPLER_EPSILON", defaults.sampler_epsilon)?,
        feed_max_candidates: parse_env("FEED_MAX_CANDIDATES", defaults.feed_max_candidates)?,
        feed_max_age_hours: parse_env("FEED_MAX_AGE_HOURS", defaults.feed_max_age_hours)?,
        analyze_rate_limit_per_minute: parse_env(
            "ANALYZE_RATE_LIMIT_PER_MINUTE",
            defaults.analyze_rate_limit_per_minute,
        )?,
        appeal_rate_limit_per_day: parse_env(
            "APPEAL_RATE_LIMIT_PER_DAY",
            defaults.appeal_rate_limit_per_day,
        )?,
        reward_sweep_interval: Duration::from_secs(parse_env("REWARD_SWEEP_INTERVAL_SECS", 300)?),
        event_journal_path: path_env("EVENT_JOURNAL_PATH"),
        appeal_journal_path: path_env("APPEAL_JOURNAL_PATH"),
        seed_data_path: path_env("SEED_DATA_PATH"),
    };

    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let err = validate_port(0).unwrap_err();
        assert!(err.to_string().contains("Port cannot be 0"));
    }

    #[test]
    fn test_timeout_range() {
        assert!(validate_timeout(Duration::from_millis(100)).is_ok());
        assert!(validate_timeout(Duration::from_millis(10_000)).is_ok());
        assert!(validate_timeout(Duration::from_millis(99)).is_err());
        assert!(validate_timeout(Duration::from_millis(10_001)).is_err());
    }

    #[test]
    fn test_threshold_must_be_open_unit_interval() {
        assert!(validate_threshold("T", 0.7).is_ok());
        assert!(validate_threshold("T", 0.0).is_err());
        assert!(validate_threshold("T", 1.0).is_err());
        assert!(validate_threshold("T", f64::NAN).is_err());
    }

    #[test]
    fn test_non_positive_epsilon_fails() {
        let settings = Settings {
            sampler_epsilon: 0.0,
            ..Settings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("SAMPLER_EPSILON"));
    }

    #[test]
    fn test_empty_classifier_url_fails() {
        let settings = Settings {
            classifier_url: Some("  ".into()),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_appeal_journal_follows_event_journal() {
        assert_eq!(Settings::default().appeal_journal(), None);

        let settings = Settings {
            event_journal_path: Some(PathBuf::from("/data/events.jsonl")),
            ..Settings::default()
        };
        assert_eq!(
            settings.appeal_journal(),
            Some(PathBuf::from("/data/appeals.jsonl"))
        );

        let explicit = Settings {
            appeal_journal_path: Some(PathBuf::from("/other/appeals.jsonl")),
            ..settings
        };
        assert_eq!(
            explicit.appeal_journal(),
            Some(PathBuf::from("/other/appeals.jsonl"))
        );
    }

    #[test]
    fn test_zero_candidates_fails() {
        let settings = Settings {
            feed_max_candidates: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
