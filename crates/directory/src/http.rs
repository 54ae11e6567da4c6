//! HTTP clients for the collaborator services.

use std::time::Duration;

use async_trait::async_trait;
use counselbook_core::models::booking::{BookingConfirmation, BookingRequest};
use eyre::{Result, WrapErr, eyre};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::listing::SlotListing;
use crate::{BatchNumbering, BookingService, SlotDirectory};

/// Header carrying the per-attempt idempotency key.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .wrap_err("Failed to build HTTP client")
}

fn trim_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// `GET {base}/slots/available`
#[derive(Debug, Clone)]
pub struct HttpSlotDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSlotDirectory {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: trim_base(base_url),
        })
    }

    pub fn listing_url(&self) -> String {
        format!("{}/slots/available", self.base_url)
    }
}

#[async_trait]
impl SlotDirectory for HttpSlotDirectory {
    async fn fetch_listing(&self) -> Result<SlotListing> {
        let url = self.listing_url();
        debug!("Fetching slot listing from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .wrap_err("Slot directory is unreachable")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(eyre!("Slot directory returned {}: {}", status, error_text));
        }

        let listing: SlotListing = response
            .json()
            .await
            .wrap_err("Slot directory returned a malformed listing")?;

        info!(
            "Fetched {} slot records (contract v{})",
            listing.slots.len(),
            listing.contract_version
        );
        Ok(listing)
    }
}

/// Response body of the booking endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub booking: Option<BookedRecord>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookedRecord {
    #[serde(rename = "_id")]
    pub id: String,
}

impl BookingResponse {
    /// A booking counts as accepted when the service says so or hands back a
    /// booking record.
    pub fn into_confirmation(self) -> Result<BookingConfirmation> {
        match (self.success, self.booking) {
            (_, Some(record)) => Ok(BookingConfirmation {
                booking_id: record.id,
            }),
            (true, None) => Ok(BookingConfirmation {
                booking_id: String::new(),
            }),
            (false, None) => Err(eyre!(
                "{}",
                self.message
                    .unwrap_or_else(|| "booking was not accepted".to_string())
            )),
        }
    }
}

/// `POST {base}/bookings`
#[derive(Debug, Clone)]
pub struct HttpBookingService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBookingService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: trim_base(base_url),
        })
    }
}

#[async_trait]
impl BookingService for HttpBookingService {
    async fn submit(&self, request: &BookingRequest) -> Result<BookingConfirmation> {
        let url = format!("{}/bookings", self.base_url);
        info!(
            "Submitting booking for {} {} ({})",
            request.reference_date, request.reference_time_range, request.timezone
        );

        let response = self
            .client
            .post(&url)
            .header(IDEMPOTENCY_HEADER, request.idempotency_key.to_string())
            .json(request)
            .send()
            .await
            .wrap_err("Booking service is unreachable")?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: BookingResponse = serde_json::from_str(&body).unwrap_or_default();

        if !status.is_success() {
            let message = parsed.message.unwrap_or(body);
            return Err(eyre!("Booking service returned {}: {}", status, message));
        }

        parsed.into_confirmation()
    }
}

/// Reads the current batch number from the numbering endpoint.
#[derive(Debug, Clone)]
pub struct HttpBatchNumbering {
    client: reqwest::Client,
    url: String,
}

impl HttpBatchNumbering {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            url: url.to_string(),
        })
    }
}

/// The endpoint answers `[{"Batch_No": 108}]`; the number may arrive quoted.
pub fn parse_batch_number(body: &Value) -> Result<i64> {
    let raw = body
        .get(0)
        .and_then(|row| row.get("Batch_No"))
        .ok_or_else(|| eyre!("batch response has no Batch_No"))?;

    match raw {
        Value::Number(n) => n.as_i64().ok_or_else(|| eyre!("batch number {} is not an integer", n)),
        Value::String(s) => s
            .trim()
            .parse()
            .wrap_err_with(|| format!("batch number '{}' is not an integer", s)),
        other => Err(eyre!("unexpected batch number {}", other)),
    }
}

#[async_trait]
impl BatchNumbering for HttpBatchNumbering {
    async fn current_batch(&self) -> Result<i64> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .wrap_err("Batch numbering service is unreachable")?;

        if !response.status().is_success() {
            return Err(eyre!("Batch numbering service returned {}", response.status()));
        }

        let body: Value = response.json().await?;
        parse_batch_number(&body)
    }
}
