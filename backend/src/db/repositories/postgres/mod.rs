//! Postgres repository implementation using Diesel.
//!
//! Implements every repository trait against the schema created by the
//! embedded migrations under `migrations/`.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Connection health monitoring
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel::sql_types::Text;
use diesel::upsert::excluded;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task;
use tracing::debug;

use crate::db::repository::bookings::check_payment_amount;
use crate::db::repository::{
    AppliedPayment, BookingFilter, BookingRepository, CourseRepository, EnrollmentRepository,
    ErrorContext, InquiryRepository, RepositoryError, RepositoryResult, UserRepository,
};
use crate::models::{
    Booking, BookingId, Certificate, CertificateId, Course, CourseId, Document, Enrollment,
    EnrollmentId, Inquiry, InquiryId, InquiryStatus, InstallmentPlan, InstallmentStatus,
    NewBooking, NewCertificate, NewCourse, NewDocument, NewEnrollment, NewInquiry, NewPayment,
    NewUser, Otp, OtpPurpose, Payment, PaymentId, Session, User, UserId, UserRole,
};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

define_sql_function!(fn lower(x: Text) -> Text);

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl PostgresConfig {
    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub connections_in_use: u32,
    /// Number of idle connections
    pub idle_connections: u32,
    /// Total number of connections in the pool
    pub total_connections: u32,
    /// Maximum pool size
    pub max_size: u32,
    /// Total successful queries executed
    pub total_queries: u64,
    /// Total failed queries
    pub failed_queries: u64,
    /// Total retried operations
    pub retried_operations: u64,
}

/// Diesel-backed repository for Postgres.
///
/// This repository implementation provides:
/// - Connection pooling with configurable limits
/// - Automatic retry for transient failures
/// - Health monitoring and statistics
/// - Automatic schema migrations
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    // Metrics counters
    total_queries: std::sync::Arc<AtomicU64>,
    failed_queries: std::sync::Arc<AtomicU64>,
    retried_operations: std::sync::Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    ///
    /// # Arguments
    /// * `config` - Database configuration
    ///
    /// # Returns
    /// * `Ok(PostgresRepository)` on success
    /// * `Err(RepositoryError)` if connection or migration fails
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true) // Validate connections before use
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        // Run migrations once during initialization
        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self {
            pool,
            config,
            total_queries: std::sync::Arc::new(AtomicU64::new(0)),
            failed_queries: std::sync::Arc::new(AtomicU64::new(0)),
            retried_operations: std::sync::Arc::new(AtomicU64::new(0)),
        })
    }

    /// Run pending database migrations.
    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;

        Ok(())
    }

    /// Execute a database operation with automatic retry for transient failures.
    ///
    /// This method will retry the operation up to `max_retries` times if a
    /// retryable error occurs (connection errors, timeouts, serialization failures).
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();
        let retried_operations = self.retried_operations.clone();

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    retried_operations.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2; // Exponential backoff
                }

                // Get connection
                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                };

                // Execute the operation
                total_queries.fetch_add(1, Ordering::Relaxed);
                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => {
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }

            failed_queries.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Get pool health statistics.
    ///
    /// Returns current pool state and query statistics for monitoring.
    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            retried_operations: self.retried_operations.load(Ordering::Relaxed),
        }
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

fn missing(entity: &str, id: impl ToString, operation: &str) -> RepositoryError {
    let id = id.to_string();
    RepositoryError::not_found_with_context(
        format!("{} {} not found", entity, id),
        ErrorContext::new(operation)
            .with_entity(entity.to_lowercase())
            .with_entity_id(id),
    )
}

/// Load a booking and hold its row lock until the transaction ends.
fn lock_booking(
    tx: &mut PgConnection,
    booking_id: BookingId,
    operation: &str,
) -> RepositoryResult<Booking> {
    bookings::table
        .find(booking_id.value())
        .select(BookingRow::as_select())
        .for_update()
        .first(tx)
        .optional()
        .map_err(map_diesel_error)?
        .ok_or_else(|| missing("Booking", booking_id, operation))?
        .into_domain()
}

/// Insert a payment against a locked booking and add it to `amount_paid`.
fn insert_payment(
    tx: &mut PgConnection,
    booking: &Booking,
    row: &NewPaymentRow,
    operation: &str,
) -> RepositoryResult<AppliedPayment> {
    check_payment_amount(row.amount, booking, operation)?;
    let payment = diesel::insert_into(payments::table)
        .values(row)
        .returning(PaymentRow::as_returning())
        .get_result(tx)
        .map_err(map_diesel_error)?
        .into_domain()?;
    let booking = diesel::update(bookings::table.find(booking.id.value()))
        .set(bookings::amount_paid.eq(bookings::amount_paid + payment.amount))
        .returning(BookingRow::as_returning())
        .get_result(tx)
        .map_err(map_diesel_error)?
        .into_domain()?;
    Ok(AppliedPayment { payment, booking })
}

// =========================================================
// Accounts
// =========================================================

#[async_trait]
impl UserRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        let healthy = self
            .with_conn(|conn| {
                sql_query("SELECT 1")
                    .execute(conn)
                    .map(|_| true)
                    .map_err(map_diesel_error)
            })
            .await?;
        let stats = self.get_pool_stats();
        debug!(
            in_use = stats.connections_in_use,
            idle = stats.idle_connections,
            queries = stats.total_queries,
            failed = stats.failed_queries,
            retried = stats.retried_operations,
            "Postgres pool"
        );
        Ok(healthy)
    }

    async fn create_user(&self, user: NewUser) -> RepositoryResult<User> {
        let row = NewUserRow::from(user);
        self.with_conn(move |conn| {
            diesel::insert_into(users::table)
                .values(&row)
                .returning(UserRow::as_returning())
                .get_result(conn)
                .map_err(|e| map_diesel_error(e).with_operation("create_user"))?
                .into_domain()
        })
        .await
    }

    async fn get_user(&self, user_id: UserId) -> RepositoryResult<User> {
        self.with_conn(move |conn| {
            users::table
                .find(user_id.value())
                .select(UserRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| missing("User", user_id, "get_user"))?
                .into_domain()
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            users::table
                .filter(users::email.eq(&email))
                .select(UserRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(UserRow::into_domain)
                .transpose()
        })
        .await
    }

    async fn list_users_by_role(&self, role: UserRole) -> RepositoryResult<Vec<User>> {
        self.with_conn(move |conn| {
            users::table
                .filter(users::role.eq(role.as_str()))
                .order(users::user_id.asc())
                .select(UserRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(UserRow::into_domain)
                .collect()
        })
        .await
    }

    async fn update_user(&self, user: &User) -> RepositoryResult<User> {
        let user = user.clone();
        self.with_conn(move |conn| {
            diesel::update(users::table.find(user.id.value()))
                .set((
                    users::name.eq(&user.name),
                    users::phone.eq(&user.phone),
                    users::verified.eq(user.verified),
                    users::password_hash.eq(&user.password_hash),
                    users::password_salt.eq(&user.password_salt),
                ))
                .returning(UserRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| missing("User", user.id, "update_user"))?
                .into_domain()
        })
        .await
    }

    async fn store_otp(&self, otp: Otp) -> RepositoryResult<()> {
        let row = OtpRow::from(otp);
        self.with_conn(move |conn| {
            diesel::insert_into(otps::table)
                .values(&row)
                .on_conflict((otps::email, otps::purpose))
                .do_update()
                .set((
                    otps::code.eq(excluded(otps::code)),
                    otps::expires_at.eq(excluded(otps::expires_at)),
                    otps::consumed.eq(excluded(otps::consumed)),
                    otps::failed_attempts.eq(excluded(otps::failed_attempts)),
                ))
                .execute(conn)
                .map_err(map_diesel_error)?;
            Ok(())
        })
        .await
    }

    async fn find_otp(&self, email: &str, purpose: OtpPurpose) -> RepositoryResult<Option<Otp>> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            otps::table
                .find((&email, purpose.as_str()))
                .select(OtpRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(OtpRow::into_domain)
                .transpose()
        })
        .await
    }

    async fn consume_otp(&self, email: &str, purpose: OtpPurpose) -> RepositoryResult<bool> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            let updated = diesel::update(
                otps::table
                    .filter(otps::email.eq(&email))
                    .filter(otps::purpose.eq(purpose.as_str()))
                    .filter(otps::consumed.eq(false)),
            )
            .set(otps::consumed.eq(true))
            .execute(conn)
            .map_err(map_diesel_error)?;
            Ok(updated > 0)
        })
        .await
    }

    async fn record_otp_failure(
        &self,
        email: &str,
        purpose: OtpPurpose,
        max_attempts: i32,
    ) -> RepositoryResult<i32> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let attempts: Option<i32> =
                    diesel::update(otps::table.find((&email, purpose.as_str())))
                        .set(otps::failed_attempts.eq(otps::failed_attempts + 1))
                        .returning(otps::failed_attempts)
                        .get_result(tx)
                        .optional()
                        .map_err(map_diesel_error)?;
                let Some(attempts) = attempts else {
                    return Ok(0);
                };
                if attempts >= max_attempts {
                    diesel::update(otps::table.find((&email, purpose.as_str())))
                        .set(otps::consumed.eq(true))
                        .execute(tx)
                        .map_err(map_diesel_error)?;
                }
                Ok(attempts)
            })
        })
        .await
    }

    async fn create_session(&self, session: Session) -> RepositoryResult<()> {
        let row = SessionRow::from(session);
        self.with_conn(move |conn| {
            diesel::insert_into(sessions::table)
                .values(&row)
                .execute(conn)
                .map_err(map_diesel_error)?;
            Ok(())
        })
        .await
    }

    async fn find_session(&self, token: &str) -> RepositoryResult<Option<Session>> {
        let token = token.to_string();
        self.with_conn(move |conn| {
            sessions::table
                .find(&token)
                .select(SessionRow::as_select())
                .first(conn)
                .optional()
                .map(|row| row.map(Session::from))
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn delete_session(&self, token: &str) -> RepositoryResult<()> {
        let token = token.to_string();
        self.with_conn(move |conn| {
            diesel::delete(sessions::table.find(&token))
                .execute(conn)
                .map_err(map_diesel_error)?;
            Ok(())
        })
        .await
    }

    async fn delete_user_sessions(&self, user_id: UserId) -> RepositoryResult<usize> {
        self.with_conn(move |conn| {
            diesel::delete(sessions::table.filter(sessions::user_id.eq(user_id.value())))
                .execute(conn)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn add_document(&self, document: NewDocument) -> RepositoryResult<Document> {
        let row = NewDocumentRow::from(document);
        self.with_conn(move |conn| {
            diesel::insert_into(documents::table)
                .values(&row)
                .returning(DocumentRow::as_returning())
                .get_result(conn)
                .map(Document::from)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn list_documents(&self, user_id: UserId) -> RepositoryResult<Vec<Document>> {
        self.with_conn(move |conn| {
            documents::table
                .filter(documents::user_id.eq(user_id.value()))
                .order(documents::document_id.asc())
                .select(DocumentRow::as_select())
                .load(conn)
                .map(|rows| rows.into_iter().map(Document::from).collect())
                .map_err(map_diesel_error)
        })
        .await
    }
}

// =========================================================
// Courses
// =========================================================

#[async_trait]
impl CourseRepository for PostgresRepository {
    async fn create_course(&self, course: NewCourse) -> RepositoryResult<Course> {
        let row = NewCourseRow::from(course);
        self.with_conn(move |conn| {
            diesel::insert_into(courses::table)
                .values(&row)
                .returning(CourseRow::as_returning())
                .get_result(conn)
                .map(Course::from)
                .map_err(|e| map_diesel_error(e).with_operation("create_course"))
        })
        .await
    }

    async fn get_course(&self, course_id: CourseId) -> RepositoryResult<Course> {
        self.with_conn(move |conn| {
            courses::table
                .find(course_id.value())
                .select(CourseRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Course::from)
                .ok_or_else(|| missing("Course", course_id, "get_course"))
        })
        .await
    }

    async fn find_course_by_name(&self, name: &str) -> RepositoryResult<Option<Course>> {
        let name = name.to_lowercase();
        self.with_conn(move |conn| {
            courses::table
                .filter(lower(courses::name).eq(&name))
                .select(CourseRow::as_select())
                .first(conn)
                .optional()
                .map(|row| row.map(Course::from))
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn list_courses(&self, active_only: bool) -> RepositoryResult<Vec<Course>> {
        self.with_conn(move |conn| {
            let mut query = courses::table.select(CourseRow::as_select()).into_boxed();
            if active_only {
                query = query.filter(courses::active.eq(true));
            }
            query
                .order(courses::course_id.asc())
                .load(conn)
                .map(|rows| rows.into_iter().map(Course::from).collect())
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn update_course(&self, course: &Course) -> RepositoryResult<Course> {
        let course = course.clone();
        self.with_conn(move |conn| {
            diesel::update(courses::table.find(course.id.value()))
                .set((
                    courses::name.eq(&course.name),
                    courses::description.eq(&course.description),
                    courses::fee.eq(course.fee),
                    courses::duration_weeks.eq(course.duration_weeks),
                    courses::total_lessons.eq(course.total_lessons),
                    courses::active.eq(course.active),
                ))
                .returning(CourseRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(Course::from)
                .ok_or_else(|| missing("Course", course.id, "update_course"))
        })
        .await
    }
}

// =========================================================
// Inquiries
// =========================================================

#[async_trait]
impl InquiryRepository for PostgresRepository {
    async fn create_inquiry(&self, inquiry: NewInquiry) -> RepositoryResult<Inquiry> {
        let row = NewInquiryRow::from(inquiry);
        self.with_conn(move |conn| {
            diesel::insert_into(inquiries::table)
                .values(&row)
                .returning(InquiryRow::as_returning())
                .get_result(conn)
                .map_err(map_diesel_error)?
                .into_domain()
        })
        .await
    }

    async fn get_inquiry(&self, inquiry_id: InquiryId) -> RepositoryResult<Inquiry> {
        self.with_conn(move |conn| {
            inquiries::table
                .find(inquiry_id.value())
                .select(InquiryRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| missing("Inquiry", inquiry_id, "get_inquiry"))?
                .into_domain()
        })
        .await
    }

    async fn list_inquiries(
        &self,
        status: Option<InquiryStatus>,
    ) -> RepositoryResult<Vec<Inquiry>> {
        self.with_conn(move |conn| {
            let mut query = inquiries::table
                .select(InquiryRow::as_select())
                .into_boxed();
            if let Some(status) = status {
                query = query.filter(inquiries::status.eq(status.as_str()));
            }
            query
                .order(inquiries::inquiry_id.desc())
                .load(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(InquiryRow::into_domain)
                .collect()
        })
        .await
    }

    async fn update_inquiry(&self, inquiry: &Inquiry) -> RepositoryResult<Inquiry> {
        let inquiry = inquiry.clone();
        self.with_conn(move |conn| {
            diesel::update(inquiries::table.find(inquiry.id.value()))
                .set((
                    inquiries::status.eq(inquiry.status.as_str()),
                    inquiries::response.eq(inquiry.response.as_deref()),
                    inquiries::resolved_at.eq(inquiry.resolved_at),
                ))
                .returning(InquiryRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| missing("Inquiry", inquiry.id, "update_inquiry"))?
                .into_domain()
        })
        .await
    }
}

// =========================================================
// Bookings, payments and installment plans
// =========================================================

#[async_trait]
impl BookingRepository for PostgresRepository {
    async fn create_booking(&self, booking: NewBooking) -> RepositoryResult<Booking> {
        let row = NewBookingRow::from(booking);
        self.with_conn(move |conn| {
            diesel::insert_into(bookings::table)
                .values(&row)
                .returning(BookingRow::as_returning())
                .get_result(conn)
                .map_err(map_diesel_error)?
                .into_domain()
        })
        .await
    }

    async fn get_booking(&self, booking_id: BookingId) -> RepositoryResult<Booking> {
        self.with_conn(move |conn| {
            bookings::table
                .find(booking_id.value())
                .select(BookingRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| missing("Booking", booking_id, "get_booking"))?
                .into_domain()
        })
        .await
    }

    async fn list_bookings(&self, filter: BookingFilter) -> RepositoryResult<Vec<Booking>> {
        self.with_conn(move |conn| {
            let mut query = bookings::table.select(BookingRow::as_select()).into_boxed();
            if let Some(student_id) = filter.student_id {
                query = query.filter(bookings::student_id.eq(student_id.value()));
            }
            if let Some(status) = filter.status {
                query = query.filter(bookings::status.eq(status.as_str()));
            }
            query
                .order(bookings::booking_id.desc())
                .load(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(BookingRow::into_domain)
                .collect()
        })
        .await
    }

    async fn update_booking(&self, booking: &Booking) -> RepositoryResult<Booking> {
        let booking = booking.clone();
        self.with_conn(move |conn| {
            diesel::update(bookings::table.find(booking.id.value()))
                .set((
                    bookings::status.eq(booking.status.as_str()),
                    bookings::instructor_id.eq(booking.instructor_id.map(|id| id.value())),
                ))
                .returning(BookingRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| missing("Booking", booking.id, "update_booking"))?
                .into_domain()
        })
        .await
    }

    async fn record_payment(&self, payment: NewPayment) -> RepositoryResult<AppliedPayment> {
        let booking_id = payment.booking_id;
        let row = NewPaymentRow::from(payment);
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let booking = lock_booking(tx, booking_id, "record_payment")?;
                insert_payment(tx, &booking, &row, "record_payment")
            })
        })
        .await
    }

    async fn get_payment(&self, payment_id: PaymentId) -> RepositoryResult<Payment> {
        self.with_conn(move |conn| {
            payments::table
                .find(payment_id.value())
                .select(PaymentRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| missing("Payment", payment_id, "get_payment"))?
                .into_domain()
        })
        .await
    }

    async fn list_payments_for_booking(
        &self,
        booking_id: BookingId,
    ) -> RepositoryResult<Vec<Payment>> {
        self.with_conn(move |conn| {
            payments::table
                .filter(payments::booking_id.eq(booking_id.value()))
                .order(payments::payment_id.asc())
                .select(PaymentRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(PaymentRow::into_domain)
                .collect()
        })
        .await
    }

    async fn create_installment_plan(
        &self,
        plan: &InstallmentPlan,
        down_payment: Option<NewPayment>,
    ) -> RepositoryResult<(Booking, Option<Payment>)> {
        let booking_id = plan.booking_id;
        let plan_row = InstallmentPlanRow {
            booking_id: booking_id.value(),
            months: plan.months,
            down_payment: plan.down_payment,
            created_at: plan.created_at,
        };
        let entry_rows: Vec<InstallmentRow> = plan
            .entries
            .iter()
            .map(|entry| InstallmentRow::from_domain(booking_id, entry))
            .collect();
        let payment_row = down_payment.map(NewPaymentRow::from);

        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let booking = lock_booking(tx, booking_id, "create_installment_plan")?;

                let inserted = diesel::insert_into(installment_plans::table)
                    .values(&plan_row)
                    .on_conflict_do_nothing()
                    .execute(tx)
                    .map_err(map_diesel_error)?;
                if inserted == 0 {
                    return Err(RepositoryError::conflict_with_context(
                        format!("Booking {} already has an installment plan", booking_id),
                        ErrorContext::new("create_installment_plan")
                            .with_entity("installment_plan")
                            .with_entity_id(booking_id),
                    ));
                }
                if !entry_rows.is_empty() {
                    diesel::insert_into(installments::table)
                        .values(&entry_rows)
                        .execute(tx)
                        .map_err(map_diesel_error)?;
                }

                match &payment_row {
                    Some(row) => {
                        let applied = insert_payment(tx, &booking, row, "create_installment_plan")?;
                        Ok((applied.booking, Some(applied.payment)))
                    }
                    None => Ok((booking, None)),
                }
            })
        })
        .await
    }

    async fn pay_installment(&self, payment: NewPayment) -> RepositoryResult<AppliedPayment> {
        let booking_id = payment.booking_id;
        let number = payment.installment_number.unwrap_or_default();
        let row = NewPaymentRow::from(payment);

        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let context = || {
                    ErrorContext::new("pay_installment")
                        .with_entity("installment_plan")
                        .with_entity_id(booking_id)
                };
                let booking = lock_booking(tx, booking_id, "pay_installment")?;
                let entry = installments::table
                    .find((booking_id.value(), number))
                    .select(InstallmentRow::as_select())
                    .for_update()
                    .first(tx)
                    .optional()
                    .map_err(map_diesel_error)?
                    .ok_or_else(|| {
                        RepositoryError::not_found_with_context(
                            format!("Installment {} not found for booking {}", number, booking_id),
                            context(),
                        )
                    })?
                    .into_domain()?;
                if entry.is_paid() {
                    return Err(RepositoryError::conflict_with_context(
                        format!("Installment {} is already paid", number),
                        context(),
                    ));
                }
                if entry.amount != row.amount {
                    return Err(RepositoryError::validation_with_context(
                        format!("Installment {} is {}, not {}", number, entry.amount, row.amount),
                        context(),
                    ));
                }

                let applied = insert_payment(tx, &booking, &row, "pay_installment")?;
                let marked = diesel::update(
                    installments::table
                        .find((booking_id.value(), number))
                        .filter(installments::status.ne(InstallmentStatus::Paid.as_str())),
                )
                .set((
                    installments::status.eq(InstallmentStatus::Paid.as_str()),
                    installments::paid_at.eq(Some(applied.payment.paid_at)),
                    installments::payment_id.eq(Some(applied.payment.id.value())),
                ))
                .execute(tx)
                .map_err(map_diesel_error)?;
                if marked != 1 {
                    return Err(RepositoryError::conflict_with_context(
                        format!("Installment {} is already paid", number),
                        context(),
                    ));
                }
                Ok(applied)
            })
        })
        .await
    }

    async fn get_installment_plan(
        &self,
        booking_id: BookingId,
    ) -> RepositoryResult<Option<InstallmentPlan>> {
        self.with_conn(move |conn| {
            let Some(plan) = installment_plans::table
                .find(booking_id.value())
                .select(InstallmentPlanRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
            else {
                return Ok(None);
            };

            let entries = installments::table
                .filter(installments::booking_id.eq(booking_id.value()))
                .order(installments::number.asc())
                .select(InstallmentRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(InstallmentRow::into_domain)
                .collect::<RepositoryResult<Vec<_>>>()?;

            Ok(Some(InstallmentPlan {
                booking_id,
                months: plan.months,
                down_payment: plan.down_payment,
                entries,
                created_at: plan.created_at,
            }))
        })
        .await
    }
}

// =========================================================
// Enrollments and certificates
// =========================================================

#[async_trait]
impl EnrollmentRepository for PostgresRepository {
    async fn create_enrollment(&self, enrollment: NewEnrollment) -> RepositoryResult<Enrollment> {
        let row = NewEnrollmentRow::from(enrollment);
        self.with_conn(move |conn| {
            diesel::insert_into(enrollments::table)
                .values(&row)
                .returning(EnrollmentRow::as_returning())
                .get_result(conn)
                .map_err(map_diesel_error)?
                .into_domain()
        })
        .await
    }

    async fn get_enrollment(&self, enrollment_id: EnrollmentId) -> RepositoryResult<Enrollment> {
        self.with_conn(move |conn| {
            enrollments::table
                .find(enrollment_id.value())
                .select(EnrollmentRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| missing("Enrollment", enrollment_id, "get_enrollment"))?
                .into_domain()
        })
        .await
    }

    async fn find_enrollment_by_booking(
        &self,
        booking_id: BookingId,
    ) -> RepositoryResult<Option<Enrollment>> {
        self.with_conn(move |conn| {
            enrollments::table
                .filter(enrollments::booking_id.eq(booking_id.value()))
                .select(EnrollmentRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(EnrollmentRow::into_domain)
                .transpose()
        })
        .await
    }

    async fn list_enrollments_for_student(
        &self,
        student_id: UserId,
    ) -> RepositoryResult<Vec<Enrollment>> {
        self.with_conn(move |conn| {
            enrollments::table
                .filter(enrollments::student_id.eq(student_id.value()))
                .order(enrollments::enrollment_id.asc())
                .select(EnrollmentRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(EnrollmentRow::into_domain)
                .collect()
        })
        .await
    }

    async fn update_enrollment(&self, enrollment: &Enrollment) -> RepositoryResult<Enrollment> {
        let enrollment = enrollment.clone();
        self.with_conn(move |conn| {
            diesel::update(enrollments::table.find(enrollment.id.value()))
                .set((
                    enrollments::status.eq(enrollment.status.as_str()),
                    enrollments::lessons_completed.eq(enrollment.lessons_completed),
                    enrollments::instructor_id
                        .eq(enrollment.instructor_id.map(|id| id.value())),
                    enrollments::certificate_status.eq(enrollment.certificate_status.as_str()),
                    enrollments::completed_at.eq(enrollment.completed_at),
                ))
                .returning(EnrollmentRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| missing("Enrollment", enrollment.id, "update_enrollment"))?
                .into_domain()
        })
        .await
    }

    async fn create_certificate(
        &self,
        certificate: NewCertificate,
    ) -> RepositoryResult<Certificate> {
        let enrollment_id = certificate.enrollment_id;
        let row = NewCertificateRow::from(certificate);
        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let exists: i64 = enrollments::table
                    .filter(enrollments::enrollment_id.eq(enrollment_id.value()))
                    .count()
                    .get_result(tx)
                    .map_err(map_diesel_error)?;
                if exists == 0 {
                    return Err(missing("Enrollment", enrollment_id, "create_certificate"));
                }
                diesel::insert_into(certificates::table)
                    .values(&row)
                    .returning(CertificateRow::as_returning())
                    .get_result(tx)
                    .map_err(|e| map_diesel_error(e).with_operation("create_certificate"))?
                    .into_domain()
            })
        })
        .await
    }

    async fn get_certificate(
        &self,
        certificate_id: CertificateId,
    ) -> RepositoryResult<Certificate> {
        self.with_conn(move |conn| {
            certificates::table
                .find(certificate_id.value())
                .select(CertificateRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| missing("Certificate", certificate_id, "get_certificate"))?
                .into_domain()
        })
        .await
    }

    async fn find_certificate_by_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> RepositoryResult<Option<Certificate>> {
        self.with_conn(move |conn| {
            certificates::table
                .filter(certificates::enrollment_id.eq(enrollment_id.value()))
                .select(CertificateRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(CertificateRow::into_domain)
                .transpose()
        })
        .await
    }

    async fn find_certificate_by_hash(&self, hash: &str) -> RepositoryResult<Option<Certificate>> {
        let hash = hash.to_string();
        self.with_conn(move |conn| {
            certificates::table
                .filter(certificates::verification_hash.eq(&hash))
                .select(CertificateRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(CertificateRow::into_domain)
                .transpose()
        })
        .await
    }

    async fn find_certificate_by_number(
        &self,
        number: &str,
    ) -> RepositoryResult<Option<Certificate>> {
        let number = number.to_string();
        self.with_conn(move |conn| {
            certificates::table
                .filter(certificates::certificate_number.eq(&number))
                .select(CertificateRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .map(CertificateRow::into_domain)
                .transpose()
        })
        .await
    }

    async fn update_certificate(
        &self,
        certificate: &Certificate,
    ) -> RepositoryResult<Certificate> {
        let certificate = certificate.clone();
        self.with_conn(move |conn| {
            diesel::update(certificates::table.find(certificate.id.value()))
                .set((
                    certificates::certificate_number.eq(certificate.certificate_number.as_deref()),
                    certificates::verification_hash.eq(certificate.verification_hash.as_deref()),
                    certificates::status.eq(certificate.status.as_str()),
                    certificates::issued_at.eq(certificate.issued_at),
                ))
                .returning(CertificateRow::as_returning())
                .get_result(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| missing("Certificate", certificate.id, "update_certificate"))?
                .into_domain()
        })
        .await
    }

    async fn list_certificates_for_student(
        &self,
        student_id: UserId,
    ) -> RepositoryResult<Vec<Certificate>> {
        self.with_conn(move |conn| {
            certificates::table
                .filter(certificates::student_id.eq(student_id.value()))
                .order(certificates::certificate_id.asc())
                .select(CertificateRow::as_select())
                .load(conn)
                .map_err(map_diesel_error)?
                .into_iter()
                .map(CertificateRow::into_domain)
                .collect()
        })
        .await
    }
}
