//! # Timezone Conversion
//!
//! Projects a canonical slot (reference date + reference time range, anchored
//! in the directory's reference timezone) onto the caller's wall clock.
//!
//! ## Algorithm
//!
//! 1. Combine the reference date and the range start into a naive date-time
//! 2. Anchor it in the reference timezone (earliest reading when a DST fold
//!    makes it ambiguous, a failure when a DST gap skips it)
//! 3. Re-project the instant into the target timezone
//! 4. The local date is the projected start's calendar date, which may differ
//!    from the reference date near midnight
//! 5. The display range formats the projected start and start + duration

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use counselbook_core::errors::{ConversionFailure, ConversionFailureReason};
use counselbook_core::models::slot::{CanonicalSlot, ConvertedSlot, TimeFormat};
use tracing::debug;

/// Injected access to the timezone database and the current instant.
///
/// Every lookup the scheduling core makes goes through this trait so tests can
/// pin both the zone database and "now".
pub trait TimezoneResolver: Send + Sync {
    /// Resolves an IANA identifier, `None` when it is not recognized.
    fn resolve(&self, id: &str) -> Option<Tz>;

    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Host-backed resolver: the bundled IANA database and the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimezoneResolver;

impl TimezoneResolver for SystemTimezoneResolver {
    fn resolve(&self, id: &str) -> Option<Tz> {
        id.trim().parse::<Tz>().ok()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Resolver with a frozen clock and, optionally, a restricted zone database.
#[derive(Debug, Clone)]
pub struct FixedTimezoneResolver {
    now: DateTime<Utc>,
    zones: Option<Vec<Tz>>,
}

impl FixedTimezoneResolver {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now, zones: None }
    }

    /// Only the listed zones will resolve.
    pub fn with_zones(mut self, zones: impl IntoIterator<Item = Tz>) -> Self {
        self.zones = Some(zones.into_iter().collect());
        self
    }

    pub fn set_now(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }
}

impl TimezoneResolver for FixedTimezoneResolver {
    fn resolve(&self, id: &str) -> Option<Tz> {
        let tz = id.trim().parse::<Tz>().ok()?;
        match &self.zones {
            Some(zones) if !zones.contains(&tz) => None,
            _ => Some(tz),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// Converts canonical slots into a caller timezone given by identifier.
#[derive(Debug, Clone)]
pub struct TimezoneConverter<R> {
    resolver: R,
}

impl<R: TimezoneResolver> TimezoneConverter<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    /// Validates a target timezone identifier.
    pub fn resolve(&self, id: &str) -> Result<Tz, ConversionFailure> {
        self.resolver
            .resolve(id)
            .ok_or_else(|| ConversionFailure::invalid_timezone(id))
    }

    pub fn convert(
        &self,
        slot: &Arc<CanonicalSlot>,
        target_timezone: &str,
        time_format: TimeFormat,
    ) -> Result<ConvertedSlot, ConversionFailure> {
        let target = self.resolve(target_timezone)?;
        convert_into(slot, target, time_format)
    }
}

/// Converts one canonical slot into an already-resolved target timezone.
///
/// Pure: the same slot, zone and format always yield the same value.
pub fn convert_into(
    slot: &Arc<CanonicalSlot>,
    target: Tz,
    time_format: TimeFormat,
) -> Result<ConvertedSlot, ConversionFailure> {
    let range = slot.reference_time_range;
    let naive = slot.reference_date.and_time(range.start());
    let anchored = slot
        .reference_timezone
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| {
            ConversionFailure::new(
                slot.describe(),
                ConversionFailureReason::NonexistentLocalTime {
                    date: slot.reference_date.to_string(),
                    time: range.start().format("%H:%M").to_string(),
                },
            )
        })?;

    let local_start = anchored.with_timezone(&target);
    let local_end = local_start
        .checked_add_signed(range.duration())
        .ok_or_else(|| {
            ConversionFailure::new(slot.describe(), ConversionFailureReason::OutOfRange)
        })?;

    let pattern = time_format.pattern();
    let display_time = format!(
        "{}-{}",
        local_start.format(pattern),
        local_end.format(pattern)
    );

    debug!(
        "Converted {} -> {} {} ({})",
        slot.describe(),
        local_start.date_naive(),
        display_time,
        target.name()
    );

    Ok(ConvertedSlot {
        canonical: Arc::clone(slot),
        local_date: local_start.date_naive(),
        local_start,
        local_end,
        display_time,
    })
}
