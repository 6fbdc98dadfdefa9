//! Configuration module for loading environment variables and settings.
//!
//! Both loaders go through a lookup function so tests can feed a map instead
//! of touching the process environment.

use crate::error::ConfigError;
use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use std::fmt;

/// Default ElevenLabs API host.
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";

/// Default voice ("Rachel").
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8rCWM";

/// Default synthesis model.
pub const DEFAULT_MODEL_ID: &str = "eleven_monolingual_v1";

/// Default voice stability.
pub const DEFAULT_STABILITY: f32 = 0.5;

/// Default similarity boost.
pub const DEFAULT_SIMILARITY_BOOST: f32 = 0.5;

/// Default Google Calendar REST root.
pub const DEFAULT_CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Default clinic timezone.
pub const DEFAULT_TIMEZONE: &str = "Europe/Amsterdam";

/// Fixed synthesis parameters sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisProfile {
    /// Model identifier
    pub model_id: String,
    /// Voice stability in [0, 1]
    pub stability: f32,
    /// Similarity boost in [0, 1]
    pub similarity_boost: f32,
}

impl Default for SynthesisProfile {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            stability: DEFAULT_STABILITY,
            similarity_boost: DEFAULT_SIMILARITY_BOOST,
        }
    }
}

impl SynthesisProfile {
    /// Check that both voice settings lie in the unit interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.stability) {
            return Err(ConfigError::invalid_value(
                "ELEVENLABS_STABILITY",
                format!("must be between 0 and 1, got {}", self.stability),
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_boost) {
            return Err(ConfigError::invalid_value(
                "ELEVENLABS_SIMILARITY_BOOST",
                format!("must be between 0 and 1, got {}", self.similarity_boost),
            ));
        }
        Ok(())
    }
}

/// Speech converter configuration.
///
/// The API key is held as-is; only the remote service decides whether it is valid.
#[derive(Clone)]
pub struct SpeechConfig {
    /// ElevenLabs API key
    pub api_key: String,
    /// Language-model client key. Accepted for deployment compatibility, not used.
    pub llm_api_key: Option<String>,
    /// API host, overridable for tests and proxies
    pub base_url: String,
    /// Voice used when the caller does not pick one
    pub default_voice_id: String,
    /// Model and voice settings
    pub profile: SynthesisProfile,
}

impl fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("api_key", &"[REDACTED]")
            .field("llm_api_key", &self.llm_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("default_voice_id", &self.default_voice_id)
            .field("profile", &self.profile)
            .finish()
    }
}

impl SpeechConfig {
    /// Build a configuration with default endpoint, voice and profile.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            llm_api_key: None,
            base_url: DEFAULT_ELEVENLABS_BASE_URL.to_string(),
            default_voice_id: DEFAULT_VOICE_ID.to_string(),
            profile: SynthesisProfile::default(),
        }
    }

    /// Override the API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Load configuration from environment variables and .env file.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingEnvVar` if ELEVENLABS_API_KEY is not set,
    /// or `ConfigError::InvalidValue` for unparsable voice settings.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("ELEVENLABS_API_KEY")
            .ok_or_else(|| ConfigError::missing_env_var("ELEVENLABS_API_KEY"))?;

        let profile = SynthesisProfile {
            model_id: lookup("ELEVENLABS_MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            stability: parse_or(&lookup, "ELEVENLABS_STABILITY", DEFAULT_STABILITY)?,
            similarity_boost: parse_or(
                &lookup,
                "ELEVENLABS_SIMILARITY_BOOST",
                DEFAULT_SIMILARITY_BOOST,
            )?,
        };
        profile.validate()?;

        Ok(Self {
            api_key,
            llm_api_key: lookup("ANTHROPIC_API_KEY"),
            base_url: lookup("ELEVENLABS_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ELEVENLABS_BASE_URL.to_string()),
            default_voice_id: lookup("ELEVENLABS_VOICE_ID")
                .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
            profile,
        })
    }

    /// Get the text-to-speech endpoint URL for a voice.
    pub fn synthesis_endpoint(&self, voice_id: &str) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.base_url.trim_end_matches('/'),
            voice_id
        )
    }
}

/// Opening hours and slot granularity of the clinic.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessHours {
    /// First bookable minute
    pub open: NaiveTime,
    /// Closing time; no slot may end after it
    pub close: NaiveTime,
    /// Length of one appointment slot
    pub slot_minutes: u32,
    /// Days on which appointments can be booked
    pub working_days: Vec<Weekday>,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            slot_minutes: 30,
            working_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }
}

impl BusinessHours {
    /// Human readable range, e.g. `09:00 - 17:00`.
    pub fn label(&self) -> String {
        format!("{} - {}", self.open.format("%H:%M"), self.close.format("%H:%M"))
    }

    /// Whether appointments are offered on the given weekday.
    pub fn is_working_day(&self, day: Weekday) -> bool {
        self.working_days.contains(&day)
    }
}

/// Calendar server configuration.
#[derive(Clone)]
pub struct CalendarConfig {
    /// Raw `GOOGLE_OAUTH_CREDENTIALS` JSON. Checked on first tool call.
    pub oauth_credentials: Option<String>,
    /// Calendar to read and write
    pub calendar_id: String,
    /// Calendar REST root, overridable for tests
    pub api_base_url: String,
    /// Clinic timezone used for every date and time argument
    pub timezone: Tz,
    /// Opening hours
    pub hours: BusinessHours,
}

impl fmt::Debug for CalendarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarConfig")
            .field("oauth_credentials", &self.oauth_credentials.as_ref().map(|_| "[REDACTED]"))
            .field("calendar_id", &self.calendar_id)
            .field("api_base_url", &self.api_base_url)
            .field("timezone", &self.timezone)
            .field("hours", &self.hours)
            .finish()
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            oauth_credentials: None,
            calendar_id: "primary".to_string(),
            api_base_url: DEFAULT_CALENDAR_BASE_URL.to_string(),
            timezone: chrono_tz::Europe::Amsterdam,
            hours: BusinessHours::default(),
        }
    }
}

impl CalendarConfig {
    /// Load configuration from environment variables and .env file.
    ///
    /// Missing OAuth credentials are not an error here.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timezone = match lookup("CLINIC_TIMEZONE") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| ConfigError::invalid_value("CLINIC_TIMEZONE", e.to_string()))?,
            None => chrono_tz::Europe::Amsterdam,
        };

        let defaults = BusinessHours::default();
        let open = parse_time_or(&lookup, "BUSINESS_HOURS_START", defaults.open)?;
        let close = parse_time_or(&lookup, "BUSINESS_HOURS_END", defaults.close)?;
        if open >= close {
            return Err(ConfigError::invalid_value(
                "BUSINESS_HOURS_END",
                "closing time must be after opening time",
            ));
        }

        let slot_minutes: u32 = parse_or(&lookup, "SLOT_MINUTES", defaults.slot_minutes)?;
        if slot_minutes == 0 {
            return Err(ConfigError::invalid_value("SLOT_MINUTES", "must be positive"));
        }

        let working_days = match lookup("WORKING_DAYS") {
            Some(days) => days
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(|d| {
                    d.parse::<Weekday>().map_err(|_| {
                        ConfigError::invalid_value("WORKING_DAYS", format!("unknown day '{}'", d))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => defaults.working_days,
        };

        Ok(Self {
            oauth_credentials: lookup("GOOGLE_OAUTH_CREDENTIALS"),
            calendar_id: lookup("GOOGLE_CALENDAR_ID").unwrap_or_else(|| "primary".to_string()),
            api_base_url: lookup("GOOGLE_CALENDAR_BASE_URL")
                .unwrap_or_else(|| DEFAULT_CALENDAR_BASE_URL.to_string()),
            timezone,
            hours: BusinessHours {
                open,
                close,
                slot_minutes,
                working_days,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid_value(name, e.to_string())),
        None => Ok(default),
    }
}

fn parse_time_or<F>(lookup: &F, name: &str, default: NaiveTime) -> Result<NaiveTime, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .map_err(|e| ConfigError::invalid_value(name, e.to_string())),
        None => Ok(default),
    }
}
