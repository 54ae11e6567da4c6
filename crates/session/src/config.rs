//! # Session Configuration
//!
//! Loads the settings of a booking session from environment variables,
//! with defaults where appropriate.
//!
//! ## Environment Variables
//!
//! - `SLOT_DIRECTORY_URL`: base URL of the Slot Directory Service (required)
//! - `BOOKING_SERVICE_URL`: base URL of the Booking Service (required)
//! - `BATCH_SERVICE_URL`: Batch Numbering endpoint (optional)
//! - `DEFAULT_TIMEZONE`: fallback caller timezone (default: "Asia/Dubai")
//! - `CALLER_TIMEZONE`: caller timezone detected by the host (optional)
//! - `TIME_FORMAT`: "12h" or "24h" (default: "12h")
//! - `SLOT_DURATION_MINUTES`: duration of records without an end, 1 to 1439
//!   (default: 60)
//! - `PROGRAM_NAME`: program label forwarded with each booking (optional)
//! - `LOG_LEVEL`: logging level (default: "info")
//! - `REQUEST_TIMEOUT_SECONDS`: collaborator HTTP timeout (default: 30)

use std::env;
use std::time::Duration as StdDuration;

use chrono::Duration;
use chrono_tz::Tz;
use counselbook_core::models::slot::TimeFormat;
use counselbook_scheduling::TimezoneResolver;
use eyre::{Result, WrapErr, eyre};
use tracing::{Level, warn};

pub const FALLBACK_TIMEZONE: Tz = chrono_tz::Asia::Dubai;

/// Configuration for one booking session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the Slot Directory Service
    pub slot_directory_url: String,

    /// Base URL of the Booking Service
    pub booking_service_url: String,

    /// Batch Numbering endpoint, when cohort numbers are offered
    pub batch_service_url: Option<String>,

    /// Timezone used when the caller's own is unset or invalid
    pub default_timezone: Tz,

    /// Caller timezone as reported by the host, unvalidated
    pub caller_timezone: Option<String>,

    pub time_format: TimeFormat,

    /// Applied to directory records that carry no end time
    pub slot_duration: Duration,

    pub program_name: Option<String>,

    pub log_level: Level,

    /// Timeout for collaborator HTTP calls
    pub request_timeout: StdDuration,
}

impl SessionConfig {
    /// A configuration with every optional setting at its default.
    pub fn new(
        slot_directory_url: impl Into<String>,
        booking_service_url: impl Into<String>,
    ) -> Self {
        Self {
            slot_directory_url: slot_directory_url.into(),
            booking_service_url: booking_service_url.into(),
            batch_service_url: None,
            default_timezone: FALLBACK_TIMEZONE,
            caller_timezone: None,
            time_format: TimeFormat::TwelveHour,
            slot_duration: Duration::minutes(60),
            program_name: None,
            log_level: Level::INFO,
            request_timeout: StdDuration::from_secs(30),
        }
    }

    /// Creates a new SessionConfig from environment variables
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - `SLOT_DIRECTORY_URL` or `BOOKING_SERVICE_URL` is not set
    /// - `DEFAULT_TIMEZONE` is not a recognized IANA identifier
    /// - `TIME_FORMAT` is neither "12h" nor "24h"
    /// - `SLOT_DURATION_MINUTES` is not between 1 and 1439 minutes
    pub fn from_env() -> Result<Self> {
        let slot_directory_url = env::var("SLOT_DIRECTORY_URL")
            .wrap_err("SLOT_DIRECTORY_URL environment variable must be set")?;
        let booking_service_url = env::var("BOOKING_SERVICE_URL")
            .wrap_err("BOOKING_SERVICE_URL environment variable must be set")?;

        let mut config = Self::new(slot_directory_url, booking_service_url);

        config.batch_service_url = env::var("BATCH_SERVICE_URL").ok();

        if let Ok(zone) = env::var("DEFAULT_TIMEZONE") {
            config.default_timezone = zone
                .trim()
                .parse()
                .map_err(|_| eyre!("DEFAULT_TIMEZONE '{}' is not a valid IANA timezone", zone))?;
        }

        config.caller_timezone = env::var("CALLER_TIMEZONE").ok();

        if let Ok(format) = env::var("TIME_FORMAT") {
            config.time_format = format.parse().map_err(|e: String| eyre!(e))?;
        }

        if let Ok(minutes) = env::var("SLOT_DURATION_MINUTES") {
            config.slot_duration = parse_slot_duration(&minutes)?;
        }

        config.program_name = env::var("PROGRAM_NAME").ok();

        config.log_level =
            parse_log_level(&env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()));

        let timeout = env::var("REQUEST_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);
        config.request_timeout = StdDuration::from_secs(timeout);

        Ok(config)
    }

    /// The caller's timezone, or the configured default when it is unset or
    /// not recognized by `resolver`.
    pub fn initial_timezone(&self, resolver: &impl TimezoneResolver) -> Tz {
        match self.caller_timezone.as_deref() {
            Some(id) => resolver.resolve(id).unwrap_or_else(|| {
                warn!(
                    "Caller timezone '{}' is not recognized, using {}",
                    id,
                    self.default_timezone.name()
                );
                self.default_timezone
            }),
            None => self.default_timezone,
        }
    }
}

/// Parses `SLOT_DURATION_MINUTES`; a slot must be shorter than a day.
pub fn parse_slot_duration(value: &str) -> Result<Duration> {
    let minutes: i64 = value
        .trim()
        .parse()
        .wrap_err_with(|| format!("Invalid SLOT_DURATION_MINUTES value '{}'", value))?;
    if !(1..24 * 60).contains(&minutes) {
        return Err(eyre!(
            "SLOT_DURATION_MINUTES must be between 1 and 1439, got {}",
            minutes
        ));
    }
    Ok(Duration::minutes(minutes))
}

/// Unknown levels fall back to `INFO`.
pub fn parse_log_level(value: &str) -> Level {
    match value.trim().to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}
