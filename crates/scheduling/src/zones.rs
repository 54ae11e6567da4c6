//! Curated catalogue of the timezones offered in the zone picker.

use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneOption {
    pub id: &'static str,
    pub label: &'static str,
    pub city: &'static str,
}

pub const ZONE_OPTIONS: &[ZoneOption] = &[
    ZoneOption {
        id: "Asia/Dubai",
        label: "UAE",
        city: "Dubai",
    },
    ZoneOption {
        id: "Asia/Riyadh",
        label: "Saudi Arabia",
        city: "Riyadh",
    },
    ZoneOption {
        id: "Asia/Kuwait",
        label: "Kuwait",
        city: "Kuwait",
    },
    ZoneOption {
        id: "Asia/Qatar",
        label: "Qatar",
        city: "Doha",
    },
    ZoneOption {
        id: "Asia/Bahrain",
        label: "Bahrain",
        city: "Manama",
    },
    ZoneOption {
        id: "Asia/Muscat",
        label: "Oman",
        city: "Muscat",
    },
    ZoneOption {
        id: "Asia/Tehran",
        label: "Iran",
        city: "Tehran",
    },
    ZoneOption {
        id: "Asia/Kolkata",
        label: "India",
        city: "Kolkata",
    },
    ZoneOption {
        id: "Asia/Karachi",
        label: "Pakistan",
        city: "Karachi",
    },
    ZoneOption {
        id: "Asia/Dhaka",
        label: "Bangladesh",
        city: "Dhaka",
    },
    ZoneOption {
        id: "Asia/Kathmandu",
        label: "Nepal",
        city: "Kathmandu",
    },
    ZoneOption {
        id: "Asia/Singapore",
        label: "Singapore",
        city: "Singapore",
    },
    ZoneOption {
        id: "Asia/Kuala_Lumpur",
        label: "Malaysia",
        city: "Kuala Lumpur",
    },
    ZoneOption {
        id: "Asia/Manila",
        label: "Philippines",
        city: "Manila",
    },
    ZoneOption {
        id: "Asia/Tokyo",
        label: "Japan",
        city: "Tokyo",
    },
    ZoneOption {
        id: "Asia/Shanghai",
        label: "China",
        city: "Shanghai",
    },
    ZoneOption {
        id: "America/New_York",
        label: "New York",
        city: "New York",
    },
    ZoneOption {
        id: "Europe/London",
        label: "London",
        city: "London",
    },
    ZoneOption {
        id: "Europe/Paris",
        label: "Paris",
        city: "Paris",
    },
    ZoneOption {
        id: "Africa/Cairo",
        label: "Egypt",
        city: "Cairo",
    },
];

pub fn find_zone(id: &str) -> Option<&'static ZoneOption> {
    ZONE_OPTIONS.iter().find(|zone| zone.id == id)
}

/// City name for display, falling back to the last identifier segment.
pub fn city_name(id: &str) -> &str {
    match find_zone(id) {
        Some(zone) => zone.city,
        None => id.rsplit('/').next().unwrap_or(id),
    }
}

/// UTC offset of `tz` at instant `at`, e.g. `UTC+05:45`.
pub fn offset_label(tz: Tz, at: DateTime<Utc>) -> String {
    let seconds = tz
        .offset_from_utc_datetime(&at.naive_utc())
        .fix()
        .local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.abs() / 60;
    format!("UTC{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
}
