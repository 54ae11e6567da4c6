use thiserror::Error;

use crate::models::selection::Phase;

/// Why a single canonical slot could not be projected into a caller timezone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionFailureReason {
    #[error("unrecognized timezone identifier '{0}'")]
    InvalidTimezone(String),

    #[error("{date} {time} does not exist in the reference timezone")]
    NonexistentLocalTime { date: String, time: String },

    #[error("projected time is out of the representable range")]
    OutOfRange,
}

/// A slot (or a target timezone) that failed conversion.
///
/// Conversion failures are never fatal to an index build: the offending slot
/// is dropped and the rest of the listing is still offered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert slot {slot}: {reason}")]
pub struct ConversionFailure {
    pub slot: String,
    pub reason: ConversionFailureReason,
}

impl ConversionFailure {
    pub fn new(slot: impl Into<String>, reason: ConversionFailureReason) -> Self {
        Self {
            slot: slot.into(),
            reason,
        }
    }

    pub fn invalid_timezone(id: &str) -> Self {
        Self::new("-", ConversionFailureReason::InvalidTimezone(id.to_string()))
    }

    pub fn is_invalid_timezone(&self) -> bool {
        matches!(self.reason, ConversionFailureReason::InvalidTimezone(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyFailureReason {
    #[error("the selection no longer resolves to an offered slot")]
    StaleSelection,

    #[error("a date and a time must both be selected")]
    IncompleteSelection,

    #[error("invalid registrant details: {0}")]
    InvalidRegistrant(String),
}

/// The booking request could not be built from the current selection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot assemble booking request: {reason}")]
pub struct AssemblyFailure {
    pub reason: AssemblyFailureReason,
}

impl AssemblyFailure {
    pub fn new(reason: AssemblyFailureReason) -> Self {
        Self { reason }
    }

    pub fn stale() -> Self {
        Self::new(AssemblyFailureReason::StaleSelection)
    }
}

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Cannot {action} while {phase}")]
    InvalidTransition { phase: Phase, action: &'static str },

    #[error("No slots are offered on {0}")]
    UnknownDate(String),

    #[error("Date {0} is in the past")]
    DateInPast(String),

    #[error("A date must be selected before a time")]
    NoDateSelected,

    #[error("Time {time} is not offered on {date}")]
    UnknownTime { date: String, time: String },

    #[error("A booking submission is already in progress")]
    SubmissionInProgress,

    #[error("Selected slot is no longer available")]
    StaleSelection,

    #[error("Assembly error: {0}")]
    Assembly(AssemblyFailure),

    #[error("Booking failed: {0}")]
    Submission(String),

    #[error("Slot directory error: {0}")]
    Directory(#[from] eyre::Report),
}

impl BookingError {
    /// Whether the caller has to be sent back to the date/time pickers.
    pub fn forces_browsing(&self) -> bool {
        matches!(self, BookingError::StaleSelection)
    }
}

impl From<AssemblyFailure> for BookingError {
    fn from(failure: AssemblyFailure) -> Self {
        match failure.reason {
            AssemblyFailureReason::StaleSelection => BookingError::StaleSelection,
            _ => BookingError::Assembly(failure),
        }
    }
}

impl From<ConversionFailure> for BookingError {
    fn from(failure: ConversionFailure) -> Self {
        match failure.reason {
            ConversionFailureReason::InvalidTimezone(id) => BookingError::InvalidTimezone(id),
            other => BookingError::Directory(eyre::eyre!("{}: {}", failure.slot, other)),
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
