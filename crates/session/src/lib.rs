//! # CounselBook Session
//!
//! Drives one caller through the booking flow: load the slot listing, pick a
//! date and time in the caller's own timezone, fill in the registration form,
//! and confirm.
//!
//! [`machine::SelectionStateMachine`] holds the synchronous state and enforces
//! the flow's invariants. [`BookingSession`] wires it to the collaborator
//! services from `counselbook_directory`.

pub mod assembler;
pub mod config;
pub mod machine;

use std::sync::Arc;

use chrono::Duration;
use counselbook_core::errors::{BookingError, BookingResult};
use counselbook_core::models::booking::{BookingConfirmation, RegistrantFields, batch_options};
use counselbook_core::models::slot::CanonicalSlot;
use counselbook_directory::{BatchNumbering, BookingService, SlotDirectory};
use counselbook_scheduling::TimezoneResolver;
use tracing::{error, info, warn};

use crate::config::SessionConfig;
use crate::machine::SelectionStateMachine;

/// A selection state machine bound to its collaborators.
pub struct BookingSession<R, D, B> {
    machine: SelectionStateMachine<R>,
    directory: D,
    booking: B,
    slot_duration: Duration,
}

impl<R, D, B> BookingSession<R, D, B>
where
    R: TimezoneResolver,
    D: SlotDirectory,
    B: BookingService,
{
    pub fn new(resolver: R, directory: D, booking: B, config: &SessionConfig) -> Self {
        Self {
            machine: SelectionStateMachine::new(resolver, config),
            directory,
            booking,
            slot_duration: config.slot_duration,
        }
    }

    pub fn machine(&self) -> &SelectionStateMachine<R> {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut SelectionStateMachine<R> {
        &mut self.machine
    }

    async fn fetch_canonical(&self) -> eyre::Result<Vec<Arc<CanonicalSlot>>> {
        let listing = self.directory.fetch_listing().await?;
        listing.into_canonical(self.machine.resolver(), self.slot_duration)
    }

    /// Fetches the slot listing and rebuilds the index from it.
    ///
    /// On failure the index is left empty and the error is returned.
    pub async fn load_slots(&mut self) -> BookingResult<()> {
        self.machine.begin_fetch()?;
        match self.fetch_canonical().await {
            Ok(slots) => self.machine.complete_fetch(slots),
            Err(e) => {
                error!("Failed to load slot listing: {:#}", e);
                self.machine.abort_fetch();
                Err(BookingError::Directory(e))
            }
        }
    }

    /// Re-validates the selection against a fresh listing and submits it.
    ///
    /// When the selected slot has disappeared from the listing the session
    /// returns to browsing over the fresh listing and reports
    /// `StaleSelection`.
    pub async fn confirm_booking(
        &mut self,
        registrant: &RegistrantFields,
    ) -> BookingResult<BookingConfirmation> {
        self.machine.ensure_can_submit()?;

        let authoritative = match self.fetch_canonical().await {
            Ok(slots) => slots,
            Err(e) => {
                warn!(
                    "Could not refresh slot listing before booking, validating against the loaded one: {:#}",
                    e
                );
                self.machine.slots().to_vec()
            }
        };

        let request = match self.machine.begin_submission(registrant, &authoritative) {
            Ok(request) => request,
            Err(error) => {
                if error.forces_browsing() {
                    info!("Adopting refreshed listing of {} slots", authoritative.len());
                    self.machine.begin_fetch()?;
                    self.machine.complete_fetch(authoritative)?;
                }
                return Err(error);
            }
        };

        let outcome = self.booking.submit(&request).await;
        self.machine.complete_submission(outcome)
    }
}

/// Batch numbers offered on the registration form.
///
/// Falls back to the fixed options when the numbering service is unavailable.
pub async fn load_batch_options(numbering: &impl BatchNumbering) -> Vec<i64> {
    match numbering.current_batch().await {
        Ok(current) => batch_options(Some(current)),
        Err(e) => {
            warn!("Batch numbering unavailable, using fallback options: {:#}", e);
            batch_options(None)
        }
    }
}
