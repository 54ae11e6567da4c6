//! # Booking Payload Assembly
//!
//! Turns the caller's final selection into the request handed to the booking
//! service. The selected (local date, display time) pair is re-resolved
//! against the authoritative canonical slots rather than trusted as-is, so the
//! request always carries the reference time and counselor the directory
//! currently publishes.

use std::sync::Arc;

use chrono::Utc;
use counselbook_core::errors::{AssemblyFailure, AssemblyFailureReason};
use counselbook_core::models::booking::{BookingRequest, RegistrantFields};
use counselbook_core::models::selection::SelectionState;
use counselbook_core::models::slot::CanonicalSlot;
use counselbook_scheduling::SlotIndex;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct BookingPayloadAssembler {
    program: Option<String>,
}

impl BookingPayloadAssembler {
    pub fn new(program: Option<String>) -> Self {
        Self { program }
    }

    /// Builds the booking request for `selection`.
    ///
    /// # Errors
    ///
    /// * `StaleSelection` - the pair no longer resolves among `slots`
    /// * `IncompleteSelection` - the date or the time is missing
    /// * `InvalidRegistrant` - the registration form is incomplete
    pub fn assemble(
        &self,
        selection: &SelectionState,
        slots: &[Arc<CanonicalSlot>],
        registrant: &RegistrantFields,
        idempotency_key: Uuid,
    ) -> Result<BookingRequest, AssemblyFailure> {
        let (date, display_time) = selection
            .selected_pair()
            .ok_or_else(|| AssemblyFailure::new(AssemblyFailureReason::IncompleteSelection))?;

        let index = SlotIndex::build(slots, selection.timezone, selection.time_format);
        let converted = index.resolve(date, display_time).ok_or_else(|| {
            warn!(
                "Selection {} {} ({}) no longer resolves",
                date,
                display_time,
                selection.timezone.name()
            );
            AssemblyFailure::stale()
        })?;

        registrant
            .validate()
            .map_err(|e| AssemblyFailure::new(AssemblyFailureReason::InvalidRegistrant(e)))?;

        let canonical = &converted.canonical;
        debug!(
            "Assembled booking for {} (selected as {} {})",
            canonical.describe(),
            date,
            display_time
        );

        Ok(BookingRequest {
            idempotency_key,
            reference_date: canonical.reference_date,
            reference_time_range: canonical.reference_time_range,
            reference_timezone: canonical.reference_timezone.name().to_string(),
            starts_at: converted.local_start.with_timezone(&Utc),
            counselor_id: canonical.counselor_id.clone(),
            counselor_email: canonical.counselor_email.clone(),
            timezone: selection.timezone.name().to_string(),
            program: self.program.clone(),
            registrant: registrant.clone(),
        })
    }
}
