use std::fmt;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::slot::TimeFormat;

/// Which part of the booking flow the caller is in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Date and time pickers visible.
    #[default]
    Browsing,
    /// Registration form visible, pickers hidden.
    Registering,
    /// Booking accepted; terminal.
    Confirmed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Browsing => f.write_str("browsing"),
            Phase::Registering => f.write_str("registering"),
            Phase::Confirmed => f.write_str("confirmed"),
        }
    }
}

/// The caller's in-progress choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    pub timezone: Tz,
    pub time_format: TimeFormat,
    pub selected_local_date: Option<NaiveDate>,
    pub selected_display_time: Option<String>,
    pub phase: Phase,
}

impl SelectionState {
    pub fn new(timezone: Tz, time_format: TimeFormat) -> Self {
        Self {
            timezone,
            time_format,
            selected_local_date: None,
            selected_display_time: None,
            phase: Phase::Browsing,
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected_local_date = None;
        self.selected_display_time = None;
    }

    /// The selected (date, display time) pair, when both are set.
    pub fn selected_pair(&self) -> Option<(NaiveDate, &str)> {
        match (self.selected_local_date, self.selected_display_time.as_deref()) {
            (Some(date), Some(time)) => Some((date, time)),
            _ => None,
        }
    }
}
