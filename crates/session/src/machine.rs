//! # Selection State Machine
//!
//! Owns the caller's timezone, time format, selected date and time, and the
//! phase of the booking flow, together with the slot index derived from them.
//!
//! ## Phases
//!
//! ```text
//! browsing --select_time--> registering --complete_submission(Ok)--> confirmed
//!    ^                          |
//!    +---------go_back----------+
//! ```
//!
//! ## Invariants
//!
//! Checked after every transition; a violation is a programming error and
//! panics:
//!
//! - a selected time implies a selected date, and the pair resolves to exactly
//!   one converted slot in the current index
//! - a selected date is a key of the current index
//! - `registering` and `confirmed` imply a complete selection
//! - a submission can only be outstanding while `registering`
//!
//! ## Collaborator calls
//!
//! Fetching the slot listing and submitting a booking are split into
//! `begin_*` / `complete_*` pairs so an event-driven host can keep handling
//! events while a call is outstanding. A timezone change that arrives during a
//! fetch is applied when the listing lands; a second submission while one is
//! outstanding is rejected.

use std::sync::Arc;

use chrono::NaiveDate;
use counselbook_core::errors::{BookingError, BookingResult};
use counselbook_core::models::booking::{BookingConfirmation, BookingRequest, RegistrantFields};
use counselbook_core::models::selection::{Phase, SelectionState};
use counselbook_core::models::slot::{CanonicalSlot, ConvertedSlot, TimeFormat};
use counselbook_scheduling::{
    DefaultSelection, SlotIndex, TimezoneConverter, TimezoneResolver, pick_default,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::assembler::BookingPayloadAssembler;
use crate::config::SessionConfig;

pub struct SelectionStateMachine<R> {
    converter: TimezoneConverter<R>,
    assembler: BookingPayloadAssembler,
    state: SelectionState,
    slots: Vec<Arc<CanonicalSlot>>,
    index: SlotIndex,
    suggestion: Option<DefaultSelection>,
    loading: bool,
    rebuild_queued: bool,
    submitting: bool,
    idempotency_key: Option<Uuid>,
}

impl<R: TimezoneResolver> SelectionStateMachine<R> {
    pub fn new(resolver: R, config: &SessionConfig) -> Self {
        let timezone = config.initial_timezone(&resolver);
        let state = SelectionState::new(timezone, config.time_format);
        debug!(
            "New selection session in {} ({})",
            timezone.name(),
            config.time_format
        );

        Self {
            converter: TimezoneConverter::new(resolver),
            assembler: BookingPayloadAssembler::new(config.program_name.clone()),
            index: SlotIndex::empty(timezone, config.time_format),
            state,
            slots: Vec::new(),
            suggestion: None,
            loading: false,
            rebuild_queued: false,
            submitting: false,
            idempotency_key: None,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn index(&self) -> &SlotIndex {
        &self.index
    }

    pub fn slots(&self) -> &[Arc<CanonicalSlot>] {
        &self.slots
    }

    /// The auto-selected default for the current index, if any slot is
    /// still bookable.
    pub fn suggestion(&self) -> Option<&DefaultSelection> {
        self.suggestion.as_ref()
    }

    pub fn resolver(&self) -> &R {
        self.converter.resolver()
    }

    pub fn resolver_mut(&mut self) -> &mut R {
        self.converter.resolver_mut()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Nothing to offer: the caller sees the empty state.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Today's date on the caller's wall clock.
    pub fn today(&self) -> NaiveDate {
        self.converter
            .resolver()
            .now()
            .with_timezone(&self.state.timezone)
            .date_naive()
    }

    /// Display times offered on the selected date.
    pub fn available_times(&self) -> Vec<&str> {
        match self.state.selected_local_date {
            Some(date) => self.index.display_times(date),
            None => Vec::new(),
        }
    }

    pub fn selected_slot(&self) -> Option<&ConvertedSlot> {
        let (date, time) = self.state.selected_pair()?;
        self.index.resolve(date, time)
    }

    pub fn begin_fetch(&mut self) -> BookingResult<()> {
        self.ensure_active("reload slots")?;
        self.ensure_phase(Phase::Browsing, "reload slots")?;

        info!("Loading slot listing");
        self.loading = true;
        self.slots.clear();
        self.index = SlotIndex::empty(self.state.timezone, self.state.time_format);
        self.suggestion = None;
        self.state.clear_selection();
        self.idempotency_key = None;

        self.check_invariants();
        Ok(())
    }

    pub fn complete_fetch(&mut self, slots: Vec<Arc<CanonicalSlot>>) -> BookingResult<()> {
        if !self.loading {
            return Err(BookingError::InvalidTransition {
                phase: self.state.phase,
                action: "complete a slot fetch that was never started",
            });
        }

        self.loading = false;
        self.slots = slots;
        if std::mem::take(&mut self.rebuild_queued) {
            info!(
                "Applying timezone change to {} queued during fetch",
                self.state.timezone.name()
            );
        }
        self.rebuild();
        info!(
            "Slot index ready: {} dates, {} slots in {}",
            self.index.len(),
            self.index.slot_count(),
            self.state.timezone.name()
        );

        self.check_invariants();
        Ok(())
    }

    /// The fetch failed; the index stays empty.
    pub fn abort_fetch(&mut self) {
        if self.loading {
            warn!("Slot listing fetch failed, showing empty state");
        }
        self.loading = false;
        self.rebuild_queued = false;
        self.check_invariants();
    }

    pub fn set_timezone(&mut self, id: &str) -> BookingResult<()> {
        self.ensure_active("change timezone")?;
        self.ensure_phase(Phase::Browsing, "change timezone")?;

        let timezone = self.converter.resolve(id).map_err(|failure| {
            warn!("Rejected timezone change: {}", failure);
            BookingError::from(failure)
        })?;

        self.state.timezone = timezone;
        self.state.clear_selection();
        self.idempotency_key = None;

        if self.loading {
            debug!("Slot fetch outstanding, index rebuild for {} queued", id);
            self.rebuild_queued = true;
            self.index = SlotIndex::empty(timezone, self.state.time_format);
        } else {
            self.rebuild();
        }

        self.check_invariants();
        Ok(())
    }

    /// Switches between 12h and 24h display; an existing selection keeps
    /// pointing at the same slot.
    pub fn set_time_format(&mut self, time_format: TimeFormat) -> BookingResult<()> {
        self.ensure_active("change time format")?;
        self.ensure_phase(Phase::Browsing, "change time format")?;

        if time_format == self.state.time_format {
            return Ok(());
        }

        let selected = self.selected_slot().map(|slot| Arc::clone(&slot.canonical));
        self.state.time_format = time_format;
        if self.loading {
            self.index = SlotIndex::empty(self.state.timezone, time_format);
        } else {
            self.rebuild();
        }
        self.state.selected_display_time = selected.and_then(|canonical| {
            self.index
                .find_canonical(&canonical)
                .map(|slot| slot.display_time.clone())
        });

        self.check_invariants();
        Ok(())
    }

    pub fn select_date(&mut self, date: NaiveDate) -> BookingResult<()> {
        self.ensure_active("select a date")?;
        self.ensure_phase(Phase::Browsing, "select a date")?;

        if !self.index.contains_date(date) {
            return Err(BookingError::UnknownDate(date.to_string()));
        }
        if date < self.today() {
            return Err(BookingError::DateInPast(date.to_string()));
        }

        self.state.selected_local_date = Some(date);
        self.state.selected_display_time = None;
        self.idempotency_key = None;

        self.check_invariants();
        Ok(())
    }

    /// Selects the suggested date, leaving the time for the caller to pick.
    ///
    /// Returns `None` when there is nothing to suggest.
    pub fn accept_suggestion(&mut self) -> BookingResult<Option<NaiveDate>> {
        self.ensure_active("accept the suggested date")?;
        let Some(date) = self.suggestion.as_ref().map(|s| s.local_date) else {
            return Ok(None);
        };
        self.select_date(date)?;
        Ok(Some(date))
    }

    pub fn select_time(&mut self, display_time: &str) -> BookingResult<()> {
        self.ensure_active("select a time")?;
        self.ensure_phase(Phase::Browsing, "select a time")?;

        let date = self
            .state
            .selected_local_date
            .ok_or(BookingError::NoDateSelected)?;
        if self.index.resolve(date, display_time).is_none() {
            return Err(BookingError::UnknownTime {
                date: date.to_string(),
                time: display_time.to_string(),
            });
        }

        if self.state.selected_display_time.as_deref() != Some(display_time) {
            self.idempotency_key = None;
        }
        self.state.selected_display_time = Some(display_time.to_string());
        self.state.phase = Phase::Registering;

        self.check_invariants();
        Ok(())
    }

    pub fn go_back(&mut self) -> BookingResult<()> {
        self.ensure_active("go back")?;
        self.ensure_phase(Phase::Registering, "go back")?;

        self.state.phase = Phase::Browsing;

        self.check_invariants();
        Ok(())
    }

    /// Whether `begin_submission` would be accepted right now.
    pub fn ensure_can_submit(&self) -> BookingResult<()> {
        self.ensure_active("confirm the booking")?;
        self.ensure_phase(Phase::Registering, "confirm the booking")
    }

    /// Assembles the booking request against `authoritative` slots and marks
    /// a submission as outstanding.
    ///
    /// A stale selection is cleared and the machine returns to `browsing`;
    /// any other failure leaves it in `registering`.
    pub fn begin_submission(
        &mut self,
        registrant: &RegistrantFields,
        authoritative: &[Arc<CanonicalSlot>],
    ) -> BookingResult<BookingRequest> {
        self.ensure_can_submit()?;

        let key = *self.idempotency_key.get_or_insert_with(Uuid::new_v4);
        match self
            .assembler
            .assemble(&self.state, authoritative, registrant, key)
        {
            Ok(request) => {
                info!(
                    "Submitting booking {} for {} {}",
                    key, request.reference_date, request.reference_time_range
                );
                self.submitting = true;
                self.check_invariants();
                Ok(request)
            }
            Err(failure) => {
                let error = BookingError::from(failure);
                if error.forces_browsing() {
                    warn!("Selection went stale before submission, returning to browsing");
                    self.state.clear_selection();
                    self.state.phase = Phase::Browsing;
                    self.idempotency_key = None;
                    self.check_invariants();
                }
                Err(error)
            }
        }
    }

    /// Records the booking service's answer to the outstanding submission.
    ///
    /// On failure the machine stays in `registering` and keeps its
    /// idempotency key, so a retry cannot double-book.
    pub fn complete_submission(
        &mut self,
        outcome: eyre::Result<BookingConfirmation>,
    ) -> BookingResult<BookingConfirmation> {
        if !self.submitting {
            return Err(BookingError::InvalidTransition {
                phase: self.state.phase,
                action: "complete a submission that was never started",
            });
        }
        self.submitting = false;

        match outcome {
            Ok(confirmation) => {
                info!("Booking confirmed: {}", confirmation.booking_id);
                self.state.phase = Phase::Confirmed;
                self.check_invariants();
                Ok(confirmation)
            }
            Err(e) => {
                warn!("Booking submission failed: {:#}", e);
                self.check_invariants();
                Err(BookingError::Submission(format!("{:#}", e)))
            }
        }
    }

    fn ensure_active(&self, action: &'static str) -> BookingResult<()> {
        if self.submitting {
            return Err(BookingError::SubmissionInProgress);
        }
        if self.state.phase == Phase::Confirmed {
            return Err(BookingError::InvalidTransition {
                phase: Phase::Confirmed,
                action,
            });
        }
        Ok(())
    }

    fn ensure_phase(&self, expected: Phase, action: &'static str) -> BookingResult<()> {
        if self.state.phase != expected {
            warn!("Rejected '{}' while {}", action, self.state.phase);
            return Err(BookingError::InvalidTransition {
                phase: self.state.phase,
                action,
            });
        }
        Ok(())
    }

    fn rebuild(&mut self) {
        self.index = SlotIndex::build(&self.slots, self.state.timezone, self.state.time_format);
        self.suggestion = pick_default(&self.index, self.converter.resolver().now());
    }

    fn check_invariants(&self) {
        let state = &self.state;

        if let Some(time) = state.selected_display_time.as_deref() {
            let Some(date) = state.selected_local_date else {
                panic!("selected time '{}' without a selected date", time);
            };
            let matches = self.index.match_count(date, time);
            assert!(
                matches == 1,
                "selection {} '{}' resolves to {} slots in the {} index",
                date,
                time,
                matches,
                state.timezone.name()
            );
        }

        if let Some(date) = state.selected_local_date {
            assert!(
                self.index.contains_date(date),
                "selected date {} is not in the {} index",
                date,
                state.timezone.name()
            );
        }

        if state.phase != Phase::Browsing {
            assert!(
                state.selected_pair().is_some(),
                "{} without a complete selection",
                state.phase
            );
        }

        if self.submitting {
            assert_eq!(
                state.phase,
                Phase::Registering,
                "submission outstanding outside registering"
            );
        }
    }
}
