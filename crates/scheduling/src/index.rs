//! # Slot Index
//!
//! Groups converted slots by the caller-local calendar date on which they
//! start. The index is rebuilt wholesale whenever the timezone, the time
//! format or the slot list changes; it is never patched in place.
//!
//! ## Invariants
//!
//! - Every date key maps to a non-empty list
//! - Within a date, slots keep reference order (reference date, then
//!   reference start), even when local display order would differ
//! - Within a date, display times are unique. A later offering at the same
//!   instants as an earlier one is dropped; offerings at different instants
//!   that render alike (a DST fold) carry the zone abbreviation

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use counselbook_core::models::slot::{CanonicalSlot, ConvertedSlot, TimeFormat};
use tracing::{debug, warn};

use crate::timezone::convert_into;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotIndex {
    timezone: Tz,
    time_format: TimeFormat,
    dates: BTreeMap<NaiveDate, Vec<ConvertedSlot>>,
}

impl SlotIndex {
    /// An index with no dates, used while the slot list is loading.
    pub fn empty(timezone: Tz, time_format: TimeFormat) -> Self {
        Self {
            timezone,
            time_format,
            dates: BTreeMap::new(),
        }
    }

    /// Converts every slot into `timezone` and groups the results by local date.
    ///
    /// Slots that fail conversion are logged and skipped.
    pub fn build(slots: &[Arc<CanonicalSlot>], timezone: Tz, time_format: TimeFormat) -> Self {
        let mut ordered: Vec<&Arc<CanonicalSlot>> = slots.iter().collect();
        ordered.sort_by_key(|slot| slot.reference_order());

        let mut dates: BTreeMap<NaiveDate, Vec<ConvertedSlot>> = BTreeMap::new();
        let mut dropped = 0usize;

        for slot in ordered {
            let converted = match convert_into(slot, timezone, time_format) {
                Ok(converted) => converted,
                Err(failure) => {
                    warn!("Dropping slot from index: {}", failure);
                    dropped += 1;
                    continue;
                }
            };

            let day = dates.entry(converted.local_date).or_default();
            if day.iter().any(|existing| {
                existing.local_start == converted.local_start
                    && existing.local_end == converted.local_end
            }) {
                debug!(
                    "Skipping duplicate offering {} on {}",
                    converted.display_time, converted.local_date
                );
                continue;
            }
            day.push(converted);
        }

        for (date, day) in dates.iter_mut() {
            disambiguate(*date, day);
        }

        debug!(
            "Built slot index for {}: {} dates, {} slots, {} dropped",
            timezone.name(),
            dates.len(),
            dates.values().map(Vec::len).sum::<usize>(),
            dropped
        );

        Self {
            timezone,
            time_format,
            dates,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn time_format(&self) -> TimeFormat {
        self.time_format
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Number of dates with at least one slot.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn slot_count(&self) -> usize {
        self.dates.values().map(Vec::len).sum()
    }

    /// Local dates in ascending order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.keys().copied()
    }

    /// Canonical `YYYY-MM-DD` keys in ascending order.
    pub fn date_keys(&self) -> Vec<String> {
        self.dates
            .keys()
            .map(|date| date.format("%Y-%m-%d").to_string())
            .collect()
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.dates.contains_key(&date)
    }

    pub fn slots_on(&self, date: NaiveDate) -> &[ConvertedSlot] {
        self.dates.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn display_times(&self, date: NaiveDate) -> Vec<&str> {
        self.slots_on(date)
            .iter()
            .map(|slot| slot.display_time.as_str())
            .collect()
    }

    /// Resolves a (date, display time) pair to its converted slot.
    pub fn resolve(&self, date: NaiveDate, display_time: &str) -> Option<&ConvertedSlot> {
        self.slots_on(date)
            .iter()
            .find(|slot| slot.display_time == display_time)
    }

    /// How many slots a (date, display time) pair matches.
    pub fn match_count(&self, date: NaiveDate, display_time: &str) -> usize {
        self.slots_on(date)
            .iter()
            .filter(|slot| slot.display_time == display_time)
            .count()
    }

    /// Finds the projection of a canonical slot, if it is in the index.
    pub fn find_canonical(&self, canonical: &CanonicalSlot) -> Option<&ConvertedSlot> {
        self.dates
            .values()
            .flatten()
            .find(|slot| *slot.canonical == *canonical)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[ConvertedSlot])> + '_ {
        self.dates
            .iter()
            .map(|(date, slots)| (*date, slots.as_slice()))
    }
}

/// Suffixes the zone abbreviation to display times shared by slots at
/// different instants.
fn disambiguate(date: NaiveDate, day: &mut [ConvertedSlot]) {
    let clashing: Vec<usize> = (0..day.len())
        .filter(|&i| {
            day.iter()
                .enumerate()
                .any(|(j, other)| j != i && other.display_time == day[i].display_time)
        })
        .collect();

    for i in clashing {
        let slot = &mut day[i];
        slot.display_time = format!("{} {}", slot.display_time, slot.local_start.format("%Z"));
        debug!("Disambiguated repeated wall-clock time on {}: {}", date, slot.display_time);
    }
}
