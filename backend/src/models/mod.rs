//! Domain models for the driving-school backend.
//!
//! Every entity is a flat record with database-assigned `i64` identifiers
//! (wrapped in newtypes) and closed status enums. Money is held in integer
//! minor units.

pub mod macros;

pub mod account;
pub mod booking;
pub mod course;
pub mod document;
pub mod enrollment;
pub mod ids;
pub mod inquiry;

pub use account::*;
pub use booking::*;
pub use course::*;
pub use document::*;
pub use enrollment::*;
pub use ids::*;
pub use inquiry::*;

/// Error returned when a status string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
