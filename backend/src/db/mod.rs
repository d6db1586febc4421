//! Persistence for the driving school backend.
//!
//! Storage is reached through repository traits so the in-memory and Postgres
//! backends are interchangeable.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  HTTP handlers (crate::http)                            │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Services (crate::services) - business rules            │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository traits (repository/) - FullRepository       │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴──────────────────┐
//!     │                                  │
//! ┌───▼──────────────┐        ┌──────────▼─────────┐
//! │ LocalRepository  │        │ PostgresRepository │
//! │   (in-memory)    │        │  (Diesel + r2d2)   │
//! └──────────────────┘        └────────────────────┘
//! ```
//!
//! # Usage
//! ```ignore
//! use drivingschool::db::{RepositoryFactory, RepositoryType};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = RepositoryFactory::create(RepositoryType::Local, None).await?;
//!     let courses = repo.list_courses(true).await?;
//!     Ok(())
//! }
//! ```

// Feature flag priority: postgres > local
// When multiple features are enabled (e.g., --all-features), postgres takes precedence.
#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod checksum;
pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

// Postgres config is colocated with the repository implementation.
#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::{PoolStats, PostgresConfig};
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    _private: (),
}

pub use checksum::{sha256_hex, sha256_hex_parts};
pub use factory::{RepositoryFactory, RepositoryType};
pub use repo_config::{PostgresSettings, RepositorySettings};
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    AppliedPayment, BookingFilter, BookingRepository, CourseRepository, EnrollmentRepository,
    ErrorContext, FullRepository, InquiryRepository, RepositoryError, RepositoryResult,
    UserRepository,
};
