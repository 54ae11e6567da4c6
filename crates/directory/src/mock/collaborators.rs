use async_trait::async_trait;
use counselbook_core::models::booking::{BookingConfirmation, BookingRequest};
use mockall::mock;

use crate::listing::SlotListing;
use crate::{BatchNumbering, BookingService, SlotDirectory};

// Mock collaborators for testing
mock! {
    pub SlotDirectory {}

    #[async_trait]
    impl SlotDirectory for SlotDirectory {
        async fn fetch_listing(&self) -> eyre::Result<SlotListing>;
    }
}

mock! {
    pub BookingService {}

    #[async_trait]
    impl BookingService for BookingService {
        async fn submit(&self, request: &BookingRequest) -> eyre::Result<BookingConfirmation>;
    }
}

mock! {
    pub BatchNumbering {}

    #[async_trait]
    impl BatchNumbering for BatchNumbering {
        async fn current_batch(&self) -> eyre::Result<i64>;
    }
}
