//! # Slot Listing Contract
//!
//! Wire shape of the Slot Directory Service response and its ingestion into
//! canonical slots.
//!
//! ## Contract (version 1)
//!
//! ```json
//! {
//!   "contractVersion": 1,
//!   "referenceTimezone": "UTC",
//!   "slots": [
//!     {
//!       "referenceDate": "2025-06-01",
//!       "referenceTimeRangeStart": "16:30",
//!       "referenceTimeRangeEnd": "17:30",
//!       "counselorId": "c-17",
//!       "counselorEmail": "counselor@example.com"
//!     }
//!   ]
//! }
//! ```
//!
//! Every time in the listing is a wall-clock time in `referenceTimezone`.
//! `referenceTimeRangeEnd` may be omitted, in which case the configured slot
//! duration applies.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use counselbook_core::models::slot::{CanonicalSlot, TimeRange, parse_wall_clock};
use counselbook_scheduling::TimezoneResolver;
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const SUPPORTED_CONTRACT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotListing {
    pub contract_version: u32,
    pub reference_timezone: String,
    #[serde(default)]
    pub slots: Vec<SlotRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRecord {
    pub reference_date: NaiveDate,
    pub reference_time_range_start: String,
    #[serde(default)]
    pub reference_time_range_end: Option<String>,
    pub counselor_id: String,
    pub counselor_email: String,
}

impl SlotRecord {
    fn time_range(&self, default_duration: Duration) -> Result<TimeRange> {
        let start = parse_wall_clock(&self.reference_time_range_start)
            .ok_or_else(|| eyre!("malformed start '{}'", self.reference_time_range_start))?;
        let range = match &self.reference_time_range_end {
            Some(end) => {
                let end = parse_wall_clock(end).ok_or_else(|| eyre!("malformed end '{}'", end))?;
                TimeRange::from_bounds(start, end)?
            }
            None => TimeRange::starting_at(start, default_duration)?,
        };
        Ok(range)
    }
}

impl SlotListing {
    /// Validates the contract header and converts every well-formed record
    /// into a canonical slot.
    ///
    /// A listing with an unsupported version or an unknown reference timezone
    /// is rejected as a whole; a malformed record is dropped on its own.
    pub fn into_canonical(
        self,
        resolver: &impl TimezoneResolver,
        default_duration: Duration,
    ) -> Result<Vec<Arc<CanonicalSlot>>> {
        if self.contract_version != SUPPORTED_CONTRACT_VERSION {
            return Err(eyre!(
                "unsupported slot listing contract version {} (expected {})",
                self.contract_version,
                SUPPORTED_CONTRACT_VERSION
            ));
        }

        let reference_timezone = resolver.resolve(&self.reference_timezone).ok_or_else(|| {
            eyre!(
                "slot listing reference timezone '{}' is not recognized",
                self.reference_timezone
            )
        })?;

        let total = self.slots.len();
        let slots: Vec<Arc<CanonicalSlot>> = self
            .slots
            .into_iter()
            .filter_map(|record| match record.time_range(default_duration) {
                Ok(range) => Some(Arc::new(CanonicalSlot {
                    reference_date: record.reference_date,
                    reference_time_range: range,
                    reference_timezone,
                    counselor_id: record.counselor_id,
                    counselor_email: record.counselor_email,
                })),
                Err(e) => {
                    warn!(
                        "Dropping slot record {} for counselor {}: {}",
                        record.reference_date, record.counselor_id, e
                    );
                    None
                }
            })
            .collect();

        debug!(
            "Ingested {} of {} slot records (reference timezone {})",
            slots.len(),
            total,
            reference_timezone.name()
        );

        Ok(slots)
    }
}
