use chrono::{DateTime, NaiveDate, Utc};
use counselbook_core::models::slot::ConvertedSlot;
use tracing::debug;

use crate::index::SlotIndex;

/// The slot offered to the caller before they pick anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultSelection {
    pub local_date: NaiveDate,
    pub slot: ConvertedSlot,
}

/// Picks the earliest still-bookable slot in the index.
///
/// Dates are walked in ascending order; on each date, slots that have already
/// started are skipped rather than the whole date. `None` means there is
/// nothing left to book, which callers show as an empty state.
pub fn pick_default(index: &SlotIndex, now: DateTime<Utc>) -> Option<DefaultSelection> {
    for (date, slots) in index.iter() {
        if let Some(slot) = slots.iter().find(|slot| slot.local_start > now) {
            debug!("Default slot: {} {}", date, slot.display_time);
            return Some(DefaultSelection {
                local_date: date,
                slot: slot.clone(),
            });
        }
    }

    debug!("No future slots in index for {}", index.timezone().name());
    None
}
