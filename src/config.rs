//! # Configuration
//!
//! Layered configuration: built-in defaults, an optional TOML file,
//! `BEHOLDER__`-prefixed environment variables and finally CLI overrides.
//! API credentials are kept apart from the file-backed settings and are only
//! ever read from the environment.

use crate::audio::MixWindowPolicy;
use crate::tts::AudioEncoding;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default Semantic Scholar paper search endpoint
pub const SEMANTIC_SCHOLAR_SEARCH_URL: &str =
    "https://api.semanticscholar.org/graph/v1/paper/search";

/// Default Gemini REST endpoint
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default Google Cloud Text-to-Speech endpoint
pub const TTS_API_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Longest publication window accepted, in days
pub const MAX_DAYS_BACK: u32 = 36_500;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub acquisition: AcquisitionConfig,
    pub script: ScriptConfig,
    pub audio: AudioConfig,
}

/// Paper search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    /// Size of the publication window, ending today
    pub days_back: u32,
    /// Result limit per watch term
    pub limit: u32,
    pub fields_of_study: Vec<String>,
    pub timeout_secs: u64,
    /// Minimum spacing between two search requests
    pub requests_per_second: f64,
    pub retry: RetrySettings,
    pub circuit_breaker: CircuitBreakerSettings,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: SEMANTIC_SCHOLAR_SEARCH_URL.to_string(),
            days_back: 14,
            limit: 75,
            fields_of_study: vec!["Computer Science".to_string()],
            timeout_secs: 30,
            requests_per_second: 1.0,
            retry: RetrySettings::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
        }
    }
}

/// Serializable retry knobs for rate-limited search requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub jitter: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_delay_ms: 2000,
            max_delay_ms: 60_000,
            multiplier: 1.5,
            jitter: 0.3,
        }
    }
}

impl RetrySettings {
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Circuit breaker shared by every search of one run.
///
/// Counts consecutive throttled or failed requests across watch terms, so it
/// must open before a single search runs out of retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 60,
        }
    }
}

impl CircuitBreakerSettings {
    #[must_use]
    pub const fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }
}

/// Paper acquisition settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// `wkhtmltopdf` executable used to render web pages
    pub wkhtmltopdf: PathBuf,
    pub render_timeout_secs: u64,
    pub download_timeout_secs: u64,
    /// DOI resolver prefix for the last PDF tier
    pub doi_resolver: String,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            wkhtmltopdf: PathBuf::from("wkhtmltopdf"),
            render_timeout_secs: 120,
            download_timeout_secs: 60,
            doi_resolver: "https://doi.org/".to_string(),
        }
    }
}

/// Script generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
    /// PDFs totalling more than this are uploaded through the Files API
    /// instead of being sent inline
    pub inline_pdf_limit_bytes: usize,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            api_url: GEMINI_API_URL.to_string(),
            model: "gemini-1.5-pro".to_string(),
            temperature: 0.7,
            max_output_tokens: 300_000,
            timeout_secs: 600,
            inline_pdf_limit_bytes: 14 * 1024 * 1024,
        }
    }
}

/// Speech synthesis and mixing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub tts_url: String,
    pub language: String,
    pub voice: String,
    pub encoding: AudioEncoding,
    /// Canonical sample rate every clip is converted to
    pub sample_rate: u32,
    pub channels: u16,
    pub effects_dir: PathBuf,
    pub bgm_file: String,
    pub bgm_volume_db: f32,
    pub mix_window_policy: MixWindowPolicy,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            tts_url: TTS_API_URL.to_string(),
            language: "en-US".to_string(),
            voice: "en-US-Chirp3-HD-Algieba".to_string(),
            encoding: AudioEncoding::Mp3,
            sample_rate: 24_000,
            channels: 1,
            effects_dir: PathBuf::from("sound_effects"),
            bgm_file: "bgm.mp3".to_string(),
            bgm_volume_db: -5.0,
            mix_window_policy: MixWindowPolicy::WholeTimeline,
        }
    }
}

impl AudioConfig {
    #[must_use]
    pub fn bgm_path(&self) -> PathBuf {
        self.effects_dir.join(&self.bgm_file)
    }
}

/// Values supplied on the command line, applied last
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub days_back: Option<u32>,
    pub search_limit: Option<u32>,
    pub fields_of_study: Option<Vec<String>>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub language: Option<String>,
    pub voice: Option<String>,
}

/// API keys read from the environment
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    /// Google key used for both Gemini and Text-to-Speech
    pub g_api_key: String,
    /// Optional Semantic Scholar key, raises the search rate limit
    #[serde(default)]
    pub s2_api_key: Option<String>,
}

impl Credentials {
    /// Load `.env` (if any) then parse the process environment
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }
        Ok(envy::from_env::<Self>()?)
    }
}

impl Config {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                if let Some(user_config) = Self::user_config_path() {
                    builder = builder.add_source(config::File::from(user_config).required(false));
                }
                builder = builder.add_source(config::File::with_name("beholder").required(false));
            }
        }

        let config: Self = builder
            .add_source(
                config::Environment::with_prefix("BEHOLDER")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("search.fields_of_study")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/beholder/config.toml`
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("beholder").join("config.toml"))
    }

    /// Apply command line overrides and re-validate
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) -> Result<()> {
        if let Some(days_back) = overrides.days_back {
            self.search.days_back = days_back;
        }
        if let Some(limit) = overrides.search_limit {
            self.search.limit = limit;
        }
        if let Some(fields) = overrides.fields_of_study {
            self.search.fields_of_study = fields;
        }
        if let Some(model) = overrides.model {
            self.script.model = model;
        }
        if let Some(temperature) = overrides.temperature {
            self.script.temperature = temperature;
        }
        if let Some(max_tokens) = overrides.max_output_tokens {
            self.script.max_output_tokens = max_tokens;
        }
        if let Some(language) = overrides.language {
            self.audio.language = language;
        }
        if let Some(voice) = overrides.voice {
            self.audio.voice = voice;
        }
        self.validate()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, reason: &str| {
            Err(Error::InvalidInput {
                field: field.to_string(),
                reason: reason.to_string(),
            })
        };

        if self.search.days_back > MAX_DAYS_BACK {
            return invalid("search.days_back", "must be at most 36500 (100 years)");
        }
        if self.search.limit == 0 {
            return invalid("search.limit", "must be greater than 0");
        }
        if self.search.fields_of_study.is_empty() {
            return invalid("search.fields_of_study", "at least one field is required");
        }
        if self.search.requests_per_second <= 0.0 {
            return invalid("search.requests_per_second", "must be greater than 0");
        }
        if self.search.retry.max_attempts == 0 {
            return invalid("search.retry.max_attempts", "must be greater than 0");
        }
        if self.search.circuit_breaker.failure_threshold == 0 {
            return invalid(
                "search.circuit_breaker.failure_threshold",
                "must be greater than 0",
            );
        }
        url::Url::parse(&self.search.base_url).map_err(|e| Error::InvalidInput {
            field: "search.base_url".to_string(),
            reason: e.to_string(),
        })?;
        if !(0.0..=2.0).contains(&self.script.temperature) {
            return invalid("script.temperature", "must be between 0.0 and 2.0");
        }
        if self.audio.sample_rate == 0 {
            return invalid("audio.sample_rate", "must be greater than 0");
        }
        if !matches!(self.audio.channels, 1 | 2) {
            return invalid("audio.channels", "only mono and stereo are supported");
        }
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Parse {
            context: "config".to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DateWindow;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.search.days_back, 14);
        assert_eq!(config.search.limit, 75);
        assert_eq!(config.search.fields_of_study, vec!["Computer Science"]);
        assert!(
            config.search.circuit_breaker.failure_threshold < config.search.retry.max_attempts
        );
        assert_eq!(config.script.model, "gemini-1.5-pro");
        assert_eq!(config.audio.voice, "en-US-Chirp3-HD-Algieba");
        assert!((config.audio.bgm_volume_db + 5.0).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.search.limit = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidInput { .. })));
        config.search.limit = 10;

        config.audio.channels = 6;
        assert!(matches!(config.validate(), Err(Error::InvalidInput { .. })));
        config.audio.channels = 2;

        config.script.temperature = 3.5;
        assert!(matches!(config.validate(), Err(Error::InvalidInput { .. })));
        config.script.temperature = 1.0;

        config.search.base_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn test_days_back_is_bounded() {
        let mut config = Config::default();
        let err = config.apply_overrides(ConfigOverrides {
            days_back: Some(u32::MAX),
            ..Default::default()
        });
        assert!(matches!(err, Err(Error::InvalidInput { field, .. }) if field == "search.days_back"));

        config.search.days_back = MAX_DAYS_BACK;
        assert!(config.validate().is_ok());
        assert!(DateWindow::ending_today(config.search.days_back).is_ok());
    }

    #[test]
    fn test_overrides_are_applied() {
        let mut config = Config::default();
        config
            .apply_overrides(ConfigOverrides {
                days_back: Some(30),
                fields_of_study: Some(vec!["Psychology".to_string()]),
                voice: Some("en-GB-Standard-A".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(config.search.days_back, 30);
        assert_eq!(config.search.fields_of_study, vec!["Psychology"]);
        assert_eq!(config.audio.voice, "en-GB-Standard-A");
        assert_eq!(config.search.limit, 75);
    }

    #[test]
    fn test_toml_round_trip() {
        let rendered = Config::default().to_toml().unwrap();
        assert!(rendered.contains("[search]"));
        assert!(rendered.contains("mix_window_policy = \"whole_timeline\""));

        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.search.limit, 75);
    }
}
