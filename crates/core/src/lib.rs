//! # CounselBook Core
//!
//! Shared data model and error types for the counselling-session booking core.
//! Every other crate in the workspace speaks in these types: canonical slots
//! as published by the slot directory, their caller-local projections, the
//! caller's selection, and the request handed to the booking service.

pub mod errors;
pub mod models;
