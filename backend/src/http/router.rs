//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::info;

use super::handlers::{
    self, accounts, bookings, certificates, courses, documents, enrollments, inquiries,
};
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(accounts::register))
        .route("/verify-otp", post(accounts::verify_otp))
        .route("/resend-otp", post(accounts::resend_otp))
        .route("/login", post(accounts::login))
        .route("/logout", post(accounts::logout))
        .route("/me", get(accounts::me))
        .route("/forgot-password", post(accounts::forgot_password))
        .route("/reset-password", post(accounts::reset_password));

    let api_v1 = Router::new()
        .nest("/auth", auth_routes)
        .route("/instructors", get(accounts::list_instructors))
        // Course catalog
        .route(
            "/courses",
            get(courses::list_courses).post(courses::create_course),
        )
        .route(
            "/courses/{id}",
            get(courses::get_course).patch(courses::update_course),
        )
        // Inquiries
        .route(
            "/inquiries",
            get(inquiries::list_inquiries).post(inquiries::submit_inquiry),
        )
        .route("/inquiries/{id}", get(inquiries::get_inquiry))
        .route(
            "/inquiries/{id}/status",
            patch(inquiries::update_inquiry_status),
        )
        // Bookings and payments
        .route(
            "/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/bookings/{id}", get(bookings::get_booking))
        .route(
            "/bookings/{id}/status",
            patch(bookings::update_booking_status),
        )
        .route("/bookings/{id}/payments", get(bookings::list_payments))
        .route("/bookings/{id}/pay", post(bookings::pay_in_full))
        .route(
            "/bookings/{id}/installments",
            get(bookings::get_installment_plan).post(bookings::create_installment_plan),
        )
        .route(
            "/bookings/{id}/installments/{number}/pay",
            post(bookings::pay_installment),
        )
        .route("/payments/{id}", get(bookings::get_payment))
        .route("/payments/{id}/receipt", get(bookings::payment_receipt))
        // Per-student views
        .route(
            "/students/{id}/bookings",
            get(bookings::list_student_bookings),
        )
        .route(
            "/students/{id}/enrollments",
            get(enrollments::list_student_enrollments),
        )
        .route(
            "/students/{id}/certificates",
            get(certificates::list_student_certificates),
        )
        // Enrollments and certificates
        .route("/enrollments", post(enrollments::enroll))
        .route("/enrollments/{id}", get(enrollments::get_enrollment))
        .route(
            "/enrollments/{id}/progress",
            patch(enrollments::record_progress),
        )
        .route(
            "/enrollments/{id}/status",
            patch(enrollments::update_enrollment_status),
        )
        .route(
            "/enrollments/{id}/certificate",
            post(certificates::generate_certificate),
        )
        .route(
            "/certificates/verify/{code}",
            get(certificates::verify_certificate),
        )
        .route("/certificates/{id}", get(certificates::get_certificate))
        .route("/certificates/{id}/pdf", get(certificates::certificate_pdf))
        // Documents
        .route(
            "/users/{id}/documents",
            get(documents::list_documents).post(documents::upload_document),
        );

    let body_limit = state.config.server.max_body_bytes();
    let static_dir = state.config.server.static_dir.clone();

    let mut router = Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1);

    // Serve a pre-built browser client, falling back to its index for client-side routes.
    if let Some(dir) = static_dir {
        info!(dir = %dir.display(), "Serving static client");
        let index = dir.join("index.html");
        router = router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
