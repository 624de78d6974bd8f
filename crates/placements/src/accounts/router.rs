use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::notify::NotificationSink;

use super::domain::{UserId, UserRecord};
use super::registration::{
    ProviderRegistration, RegistrationError, RegistrationService, StudentRegistration,
    TutorRegistration,
};
use super::repository::{DirectoryError, UserRepository, VerificationStore};

/// Router builder exposing the self-registration endpoints.
pub fn accounts_router<U, V, N>(service: Arc<RegistrationService<U, V, N>>) -> Router
where
    U: UserRepository + 'static,
    V: VerificationStore + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/accounts/register/student",
            post(register_student_handler::<U, V, N>),
        )
        .route(
            "/api/v1/accounts/register/tutor",
            post(register_tutor_handler::<U, V, N>),
        )
        .route(
            "/api/v1/accounts/register/provider",
            post(register_provider_handler::<U, V, N>),
        )
        .route(
            "/api/v1/accounts/register/provider/verify",
            post(verify_provider_handler::<U, V, N>),
        )
        .with_state(service)
}

fn registered(record: UserRecord) -> Response {
    let payload = json!({
        "user_id": record.user.id,
        "username": record.user.username,
        "role": record.user.role.label(),
        "is_active": record.user.is_active,
        "is_verified": record.user.is_verified,
    });
    (StatusCode::CREATED, axum::Json(payload)).into_response()
}

fn registration_error(error: RegistrationError) -> Response {
    let status = match &error {
        RegistrationError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RegistrationError::UsernameTaken
        | RegistrationError::EmailTaken
        | RegistrationError::PhoneTaken
        | RegistrationError::ExternalIdTaken
        | RegistrationError::AlreadyVerified => StatusCode::CONFLICT,
        RegistrationError::VerificationMismatch => StatusCode::FORBIDDEN,
        RegistrationError::Directory(DirectoryError::NotFound) => StatusCode::NOT_FOUND,
        RegistrationError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn register_student_handler<U, V, N>(
    State(service): State<Arc<RegistrationService<U, V, N>>>,
    axum::Json(registration): axum::Json<StudentRegistration>,
) -> Response
where
    U: UserRepository + 'static,
    V: VerificationStore + 'static,
    N: NotificationSink + 'static,
{
    match service.register_student(registration) {
        Ok(record) => registered(record),
        Err(error) => registration_error(error),
    }
}

pub(crate) async fn register_tutor_handler<U, V, N>(
    State(service): State<Arc<RegistrationService<U, V, N>>>,
    axum::Json(registration): axum::Json<TutorRegistration>,
) -> Response
where
    U: UserRepository + 'static,
    V: VerificationStore + 'static,
    N: NotificationSink + 'static,
{
    match service.register_tutor(registration) {
        Ok(record) => registered(record),
        Err(error) => registration_error(error),
    }
}

pub(crate) async fn register_provider_handler<U, V, N>(
    State(service): State<Arc<RegistrationService<U, V, N>>>,
    axum::Json(registration): axum::Json<ProviderRegistration>,
) -> Response
where
    U: UserRepository + 'static,
    V: VerificationStore + 'static,
    N: NotificationSink + 'static,
{
    match service.register_provider(registration) {
        Ok(record) => registered(record),
        Err(error) => registration_error(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyProviderRequest {
    pub(crate) user_id: UserId,
    pub(crate) code: String,
}

pub(crate) async fn verify_provider_handler<U, V, N>(
    State(service): State<Arc<RegistrationService<U, V, N>>>,
    axum::Json(request): axum::Json<VerifyProviderRequest>,
) -> Response
where
    U: UserRepository + 'static,
    V: VerificationStore + 'static,
    N: NotificationSink + 'static,
{
    match service.verify_provider(&request.user_id, &request.code) {
        Ok(record) => {
            let payload = json!({
                "user_id": record.user.id,
                "is_active": record.user.is_active,
                "is_verified": record.user.is_verified,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => registration_error(error),
    }
}
