//! `/v1/auth/*` and `/v1/instructors`.

use axum::{extract::State, http::StatusCode, Json};

use super::HandlerResult;
use crate::http::auth::AuthUser;
use crate::http::dto::{
    EmailRequest, ListResponse, LoginRequest, MessageResponse, ResetPasswordRequest,
    UserSummary, VerifyOtpRequest,
};
use crate::http::error::AppError;
use crate::http::extract::ApiJson;
use crate::http::state::AppState;
use crate::models::{OtpPurpose, User};
use crate::services::auth::{self, LoginResponse, RegisterRequest};

/// POST /v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = auth::register(state.repo(), state.mailer(), &state.config, request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /v1/auth/verify-otp
pub async fn verify_otp(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerifyOtpRequest>,
) -> HandlerResult<MessageResponse> {
    auth::verify_otp(
        state.repo(),
        &state.config,
        &request.email,
        &request.code,
        OtpPurpose::Verification,
    )
    .await?;
    Ok(Json(MessageResponse::new("Email verified")))
}

/// POST /v1/auth/resend-otp
///
/// Answers 200 for unknown emails too.
pub async fn resend_otp(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<EmailRequest>,
) -> HandlerResult<MessageResponse> {
    auth::issue_otp(
        state.repo(),
        state.mailer(),
        &state.config,
        &request.email,
        OtpPurpose::Verification,
    )
    .await?;
    Ok(Json(MessageResponse::new(
        "If the account exists, a verification code has been sent",
    )))
}

/// POST /v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> HandlerResult<LoginResponse> {
    let response = auth::login(state.repo(), &state.config, &request.email, &request.password).await?;
    Ok(Json(response))
}

/// POST /v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<StatusCode, AppError> {
    auth::logout(state.repo(), &caller.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/auth/me
pub async fn me(caller: AuthUser) -> HandlerResult<User> {
    Ok(Json(caller.user))
}

/// POST /v1/auth/forgot-password
///
/// Always answers 200 so the endpoint does not reveal which accounts exist.
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<EmailRequest>,
) -> HandlerResult<MessageResponse> {
    auth::forgot_password(state.repo(), state.mailer(), &state.config, &request.email).await?;
    Ok(Json(MessageResponse::new(
        "If the account exists, a reset code has been sent",
    )))
}

/// POST /v1/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ResetPasswordRequest>,
) -> HandlerResult<MessageResponse> {
    auth::reset_password(
        state.repo(),
        &state.config,
        &request.email,
        &request.code,
        &request.new_password,
    )
    .await?;
    Ok(Json(MessageResponse::new("Password updated")))
}

/// GET /v1/instructors
pub async fn list_instructors(
    State(state): State<AppState>,
) -> HandlerResult<ListResponse<UserSummary>> {
    let instructors = auth::list_instructors(state.repo()).await?;
    Ok(Json(
        instructors
            .into_iter()
            .map(UserSummary::from)
            .collect::<Vec<_>>()
            .into(),
    ))
}
