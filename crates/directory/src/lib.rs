//! # CounselBook Directory
//!
//! Narrow interfaces to the services the booking core depends on but does not
//! own:
//!
//! - **Slot Directory Service**: publishes the canonical slot listing
//! - **Booking Service**: accepts a finalized booking request
//! - **Batch Numbering Service**: supplies the current cohort number
//!
//! Each collaborator is a trait so the session can be driven against the HTTP
//! clients in [`http`] or the mocks in [`mock`].

pub mod http;
pub mod listing;

pub mod mock;

use async_trait::async_trait;
use counselbook_core::models::booking::{BookingConfirmation, BookingRequest};
use eyre::Result;

use crate::listing::SlotListing;

/// Source of the canonical slot listing.
#[async_trait]
pub trait SlotDirectory: Send + Sync {
    async fn fetch_listing(&self) -> Result<SlotListing>;
}

/// Destination for finalized booking requests.
///
/// An `Err` covers both a rejection by the service and an unreachable service.
#[async_trait]
pub trait BookingService: Send + Sync {
    async fn submit(&self, request: &BookingRequest) -> Result<BookingConfirmation>;
}

/// Source of the current cohort number.
#[async_trait]
pub trait BatchNumbering: Send + Sync {
    async fn current_batch(&self) -> Result<i64>;
}
