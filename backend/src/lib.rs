//! # Driving School Backend
//!
//! REST backend for a driving school: student and instructor accounts with
//! email OTP verification, a course catalog, public inquiries, course
//! bookings paid in full or in monthly installments, lesson progress,
//! and verifiable completion certificates.
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`config`]: TOML configuration with environment overrides
//! - [`models`]: Domain entities, typed IDs and closed status enums
//! - [`db`]: Repository traits with in-memory and PostgreSQL backends
//! - [`services`]: Business rules and status transitions
//! - [`notify`]: Outgoing email (SMTP or log-only) and message templates
//! - [`render`]: PDF receipts and certificates
//! - [`http`]: Axum-based HTTP server and request handlers
//!
//! Money is always an `i64` count of minor units (cents).

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod config;

pub mod db;
pub mod models;

pub mod notify;
pub mod render;

pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
