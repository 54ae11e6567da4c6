use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::slot::TimeRange;

/// Cohort labels offered when the batch numbering service is unreachable.
pub const FALLBACK_BATCH_OPTIONS: [i64; 2] = [99, 98];

/// Details collected by the registration form, forwarded verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrantFields {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub country_code: String,
    pub location: String,
    pub grade: String,
    pub batch_no: String,
    pub parent_confirmed: bool,
}

impl RegistrantFields {
    /// Checks the fields the booking service requires.
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("location", &self.location),
            ("grade", &self.grade),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(format!("{} is required", field));
        }
        if !looks_like_email(&self.email) {
            return Err(format!("'{}' is not a valid email address", self.email));
        }
        if !self.parent_confirmed {
            return Err("parent availability must be confirmed".to_string());
        }
        Ok(())
    }
}

fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Cohort choices offered to a registrant given the current batch number.
pub fn batch_options(current: Option<i64>) -> Vec<i64> {
    match current {
        Some(current) if current > 0 => vec![current - 1, current - 2],
        _ => FALLBACK_BATCH_OPTIONS.to_vec(),
    }
}

/// The request handed to the booking service.
///
/// Carries the authoritative reference date and time range re-resolved from
/// the canonical slot, never the caller's display string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub idempotency_key: Uuid,
    pub reference_date: NaiveDate,
    pub reference_time_range: TimeRange,
    pub reference_timezone: String,
    pub starts_at: DateTime<Utc>,
    pub counselor_id: String,
    pub counselor_email: String,
    pub timezone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(flatten)]
    pub registrant: RegistrantFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub booking_id: String,
}
