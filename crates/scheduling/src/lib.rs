//! # CounselBook Scheduling
//!
//! The timezone-aware part of the booking core. Canonical slots are projected
//! into the caller's timezone, indexed by the caller-local calendar date, and
//! a default slot is picked from the index.
//!
//! ## Pipeline
//!
//! - **timezone**: resolves identifiers through an injected [`TimezoneResolver`]
//!   and converts one canonical slot at a time
//! - **index**: groups converted slots by local date
//! - **auto_select**: picks the earliest slot still in the future
//! - **zones**: curated zone catalogue offered to callers
//!
//! Everything here is pure and deterministic given the resolver's "now".

pub mod auto_select;
pub mod index;
pub mod timezone;
pub mod zones;

pub use auto_select::{DefaultSelection, pick_default};
pub use index::SlotIndex;
pub use timezone::{
    FixedTimezoneResolver, SystemTimezoneResolver, TimezoneConverter, TimezoneResolver,
    convert_into,
};
