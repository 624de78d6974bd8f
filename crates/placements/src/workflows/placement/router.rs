//! HTTP surface for the placement workflow and its satellite records.
//!
//! The acting user is resolved from the `x-user-id` header through the
//! user directory; this is the seam where session authentication plugs
//! in. Authorization itself happens in the services.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::accounts::{Actor, UserId, UserRepository};
use crate::notify::NotificationSink;

use super::domain::{PlacementEdit, PlacementId, PlacementStatus, PlacementSubmission};
use super::messaging::{
    MessageId, MessageRepository, MessageService, MessageServiceError, MessageSubmission,
};
use super::reports::{ReportRepository, ReportService, ReportServiceError, ReportSubmission};
use super::repository::{PlacementRepository, RepositoryError};
use super::service::{PlacementService, PlacementServiceError};
use super::transition::TransitionError;
use super::visits::{VisitId, VisitRepository, VisitService, VisitServiceError, VisitSubmission};

pub(crate) const ACTOR_HEADER: &str = "x-user-id";

fn error_body(status: StatusCode, message: impl ToString) -> Response {
    let payload = json!({ "error": message.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn actor_id(headers: &HeaderMap) -> Result<UserId, Response> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(|value| UserId(value.to_string()))
        .ok_or_else(|| error_body(StatusCode::UNAUTHORIZED, "missing x-user-id header"))
}

fn placement_error(error: PlacementServiceError) -> Response {
    let status = match &error {
        PlacementServiceError::Transition(TransitionError::InvalidState { .. }) => {
            StatusCode::CONFLICT
        }
        PlacementServiceError::Transition(_) | PlacementServiceError::NotVisible => {
            StatusCode::FORBIDDEN
        }
        PlacementServiceError::Validation(_) | PlacementServiceError::UnknownProvider => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PlacementServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        PlacementServiceError::UnknownActor => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, error)
}

/// Router builder exposing the placement request endpoints.
pub fn placement_router<R, D, N>(service: Arc<PlacementService<R, D, N>>) -> Router
where
    R: PlacementRepository + 'static,
    D: UserRepository + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/placements",
            post(create_placement_handler::<R, D, N>).get(list_placements_handler::<R, D, N>),
        )
        .route(
            "/api/v1/placements/statistics",
            get(statistics_handler::<R, D, N>),
        )
        .route(
            "/api/v1/placements/:placement_id",
            get(get_placement_handler::<R, D, N>).put(edit_placement_handler::<R, D, N>),
        )
        .route(
            "/api/v1/placements/:placement_id/approve",
            post(approve_handler::<R, D, N>),
        )
        .route(
            "/api/v1/placements/:placement_id/reject",
            post(reject_handler::<R, D, N>),
        )
        .route(
            "/api/v1/placements/:placement_id/complete",
            post(complete_handler::<R, D, N>),
        )
        .with_state(service)
}

async fn create_placement_handler<R, D, N>(
    State(service): State<Arc<PlacementService<R, D, N>>>,
    headers: HeaderMap,
    axum::Json(submission): axum::Json<PlacementSubmission>,
) -> Response
where
    R: PlacementRepository + 'static,
    D: UserRepository + 'static,
    N: NotificationSink + 'static,
{
    let actor = match resolve(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.submit(&actor, submission) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.view())).into_response(),
        Err(error) => placement_error(error),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    status: Option<String>,
}

async fn list_placements_handler<R, D, N>(
    State(service): State<Arc<PlacementService<R, D, N>>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response
where
    R: PlacementRepository + 'static,
    D: UserRepository + 'static,
    N: NotificationSink + 'static,
{
    let actor = match resolve(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let status = match params.status.as_deref() {
        None => None,
        Some(raw) => match PlacementStatus::from_label(raw) {
            Some(status) => Some(status),
            None => {
                return error_body(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("unknown status filter '{raw}'"),
                )
            }
        },
    };
    match service.list(&actor, status) {
        Ok(records) => {
            let views: Vec<_> = records.iter().map(|record| record.view()).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => placement_error(error),
    }
}

async fn statistics_handler<R, D, N>(
    State(service): State<Arc<PlacementService<R, D, N>>>,
    headers: HeaderMap,
) -> Response
where
    R: PlacementRepository + 'static,
    D: UserRepository + 'static,
    N: NotificationSink + 'static,
{
    let actor = match resolve(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.statistics(&actor) {
        Ok(tally) => (StatusCode::OK, axum::Json(tally)).into_response(),
        Err(error) => placement_error(error),
    }
}

async fn get_placement_handler<R, D, N>(
    State(service): State<Arc<PlacementService<R, D, N>>>,
    headers: HeaderMap,
    Path(placement_id): Path<String>,
) -> Response
where
    R: PlacementRepository + 'static,
    D: UserRepository + 'static,
    N: NotificationSink + 'static,
{
    let actor = match resolve(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.get(&actor, &PlacementId(placement_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(error) => placement_error(error),
    }
}

async fn edit_placement_handler<R, D, N>(
    State(service): State<Arc<PlacementService<R, D, N>>>,
    headers: HeaderMap,
    Path(placement_id): Path<String>,
    axum::Json(edit): axum::Json<PlacementEdit>,
) -> Response
where
    R: PlacementRepository + 'static,
    D: UserRepository + 'static,
    N: NotificationSink + 'static,
{
    let actor = match resolve(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.edit(&actor, &PlacementId(placement_id), edit) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(error) => placement_error(error),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ReviewRequest {
    #[serde(default)]
    comments: String,
}

async fn approve_handler<R, D, N>(
    State(service): State<Arc<PlacementService<R, D, N>>>,
    headers: HeaderMap,
    Path(placement_id): Path<String>,
    body: Option<axum::Json<ReviewRequest>>,
) -> Response
where
    R: PlacementRepository + 'static,
    D: UserRepository + 'static,
    N: NotificationSink + 'static,
{
    let actor = match resolve(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let comments = body.map(|axum::Json(body)| body.comments).unwrap_or_default();
    match service.approve(&actor, &PlacementId(placement_id), comments) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(error) => placement_error(error),
    }
}

async fn reject_handler<R, D, N>(
    State(service): State<Arc<PlacementService<R, D, N>>>,
    headers: HeaderMap,
    Path(placement_id): Path<String>,
    body: Option<axum::Json<ReviewRequest>>,
) -> Response
where
    R: PlacementRepository + 'static,
    D: UserRepository + 'static,
    N: NotificationSink + 'static,
{
    let actor = match resolve(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let comments = body.map(|axum::Json(body)| body.comments).unwrap_or_default();
    match service.reject(&actor, &PlacementId(placement_id), comments) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(error) => placement_error(error),
    }
}

async fn complete_handler<R, D, N>(
    State(service): State<Arc<PlacementService<R, D, N>>>,
    headers: HeaderMap,
    Path(placement_id): Path<String>,
) -> Response
where
    R: PlacementRepository + 'static,
    D: UserRepository + 'static,
    N: NotificationSink + 'static,
{
    let actor = match resolve(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.complete(&actor, &PlacementId(placement_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(error) => placement_error(error),
    }
}

fn resolve<R, D, N>(
    service: &PlacementService<R, D, N>,
    headers: &HeaderMap,
) -> Result<Actor, Response>
where
    R: PlacementRepository + 'static,
    D: UserRepository + 'static,
    N: NotificationSink + 'static,
{
    let id = actor_id(headers)?;
    service
        .actor(&id)
        .map_err(|_| error_body(StatusCode::UNAUTHORIZED, "account not found or inactive"))
}

// Satellite routers share one state shape: the satellite service plus
// the directory used for actor resolution.

fn directory_actor<D: UserRepository>(
    directory: &D,
    headers: &HeaderMap,
) -> Result<Actor, Response> {
    let id = actor_id(headers)?;
    match directory.fetch(&id) {
        Ok(Some(record)) if record.user.is_active => Ok(record.actor()),
        Ok(_) => Err(error_body(
            StatusCode::UNAUTHORIZED,
            "account not found or inactive",
        )),
        Err(error) => Err(error_body(StatusCode::INTERNAL_SERVER_ERROR, error)),
    }
}

fn visit_error(error: VisitServiceError) -> Response {
    let status = match &error {
        VisitServiceError::PlacementNotReady { .. } => StatusCode::CONFLICT,
        VisitServiceError::PlacementMissing => StatusCode::NOT_FOUND,
        VisitServiceError::NotVisitOwner | VisitServiceError::Transition(_) => {
            StatusCode::FORBIDDEN
        }
        VisitServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        VisitServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, error)
}

/// Router builder exposing the visit schedule endpoints.
pub fn visits_router<V, P, D>(service: Arc<VisitService<V, P>>, directory: Arc<D>) -> Router
where
    V: VisitRepository + 'static,
    P: PlacementRepository + 'static,
    D: UserRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/visits",
            post(schedule_visit_handler::<V, P, D>).get(list_visits_handler::<V, P, D>),
        )
        .route("/api/v1/visits/upcoming", get(upcoming_visits_handler::<V, P, D>))
        .route(
            "/api/v1/visits/:visit_id/complete",
            post(complete_visit_handler::<V, P, D>),
        )
        .with_state((service, directory))
}

async fn schedule_visit_handler<V, P, D>(
    State((service, directory)): State<(Arc<VisitService<V, P>>, Arc<D>)>,
    headers: HeaderMap,
    axum::Json(submission): axum::Json<VisitSubmission>,
) -> Response
where
    V: VisitRepository + 'static,
    P: PlacementRepository + 'static,
    D: UserRepository + 'static,
{
    let actor = match directory_actor(directory.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.schedule(&actor, submission) {
        Ok(visit) => (StatusCode::CREATED, axum::Json(visit)).into_response(),
        Err(error) => visit_error(error),
    }
}

async fn list_visits_handler<V, P, D>(
    State((service, directory)): State<(Arc<VisitService<V, P>>, Arc<D>)>,
    headers: HeaderMap,
) -> Response
where
    V: VisitRepository + 'static,
    P: PlacementRepository + 'static,
    D: UserRepository + 'static,
{
    let actor = match directory_actor(directory.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.list(&actor) {
        Ok(visits) => (StatusCode::OK, axum::Json(visits)).into_response(),
        Err(error) => visit_error(error),
    }
}

async fn upcoming_visits_handler<V, P, D>(
    State((service, directory)): State<(Arc<VisitService<V, P>>, Arc<D>)>,
    headers: HeaderMap,
) -> Response
where
    V: VisitRepository + 'static,
    P: PlacementRepository + 'static,
    D: UserRepository + 'static,
{
    let actor = match directory_actor(directory.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.upcoming(&actor, Utc::now()) {
        Ok(visits) => (StatusCode::OK, axum::Json(visits)).into_response(),
        Err(error) => visit_error(error),
    }
}

async fn complete_visit_handler<V, P, D>(
    State((service, directory)): State<(Arc<VisitService<V, P>>, Arc<D>)>,
    headers: HeaderMap,
    Path(visit_id): Path<String>,
) -> Response
where
    V: VisitRepository + 'static,
    P: PlacementRepository + 'static,
    D: UserRepository + 'static,
{
    let actor = match directory_actor(directory.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.complete(&actor, &VisitId(visit_id)) {
        Ok(visit) => (StatusCode::OK, axum::Json(visit)).into_response(),
        Err(error) => visit_error(error),
    }
}

fn report_error(error: ReportServiceError) -> Response {
    let status = match &error {
        ReportServiceError::PlacementNotReady { .. } => StatusCode::CONFLICT,
        ReportServiceError::PlacementMissing => StatusCode::NOT_FOUND,
        ReportServiceError::NotPlacementOwner | ReportServiceError::Transition(_) => {
            StatusCode::FORBIDDEN
        }
        ReportServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ReportServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, error)
}

/// Router builder exposing the placement report endpoints.
pub fn reports_router<T, P, D, N>(
    service: Arc<ReportService<T, P, D, N>>,
    directory: Arc<D>,
) -> Router
where
    T: ReportRepository + 'static,
    P: PlacementRepository + 'static,
    D: UserRepository + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/reports",
            post(submit_report_handler::<T, P, D, N>).get(list_reports_handler::<T, P, D, N>),
        )
        .with_state((service, directory))
}

async fn submit_report_handler<T, P, D, N>(
    State((service, directory)): State<(Arc<ReportService<T, P, D, N>>, Arc<D>)>,
    headers: HeaderMap,
    axum::Json(submission): axum::Json<ReportSubmission>,
) -> Response
where
    T: ReportRepository + 'static,
    P: PlacementRepository + 'static,
    D: UserRepository + 'static,
    N: NotificationSink + 'static,
{
    let actor = match directory_actor(directory.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.submit(&actor, submission) {
        Ok(report) => (StatusCode::CREATED, axum::Json(report)).into_response(),
        Err(error) => report_error(error),
    }
}

async fn list_reports_handler<T, P, D, N>(
    State((service, directory)): State<(Arc<ReportService<T, P, D, N>>, Arc<D>)>,
    headers: HeaderMap,
) -> Response
where
    T: ReportRepository + 'static,
    P: PlacementRepository + 'static,
    D: UserRepository + 'static,
    N: NotificationSink + 'static,
{
    let actor = match directory_actor(directory.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.list(&actor) {
        Ok(reports) => (StatusCode::OK, axum::Json(reports)).into_response(),
        Err(error) => report_error(error),
    }
}

fn message_error(error: MessageServiceError) -> Response {
    let status = match &error {
        MessageServiceError::UnknownRecipient => StatusCode::UNPROCESSABLE_ENTITY,
        MessageServiceError::NotRecipient | MessageServiceError::NotSender => StatusCode::FORBIDDEN,
        MessageServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, error)
}

/// Router builder exposing the messaging endpoints.
pub fn messaging_router<M, D>(service: Arc<MessageService<M, D>>, directory: Arc<D>) -> Router
where
    M: MessageRepository + 'static,
    D: UserRepository + 'static,
{
    Router::new()
        .route("/api/v1/messages", post(send_message_handler::<M, D>))
        .route("/api/v1/messages/inbox", get(inbox_handler::<M, D>))
        .route("/api/v1/messages/sent", get(sent_handler::<M, D>))
        .route(
            "/api/v1/messages/unread_count",
            get(unread_count_handler::<M, D>),
        )
        .route("/api/v1/messages/read_all", post(read_all_handler::<M, D>))
        .route(
            "/api/v1/messages/:message_id/read",
            post(mark_read_handler::<M, D>),
        )
        .route(
            "/api/v1/messages/:message_id",
            delete(delete_message_handler::<M, D>),
        )
        .with_state((service, directory))
}

async fn send_message_handler<M, D>(
    State((service, directory)): State<(Arc<MessageService<M, D>>, Arc<D>)>,
    headers: HeaderMap,
    axum::Json(submission): axum::Json<MessageSubmission>,
) -> Response
where
    M: MessageRepository + 'static,
    D: UserRepository + 'static,
{
    let actor = match directory_actor(directory.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.send(&actor, submission) {
        Ok(message) => (StatusCode::CREATED, axum::Json(message)).into_response(),
        Err(error) => message_error(error),
    }
}

async fn inbox_handler<M, D>(
    State((service, directory)): State<(Arc<MessageService<M, D>>, Arc<D>)>,
    headers: HeaderMap,
) -> Response
where
    M: MessageRepository + 'static,
    D: UserRepository + 'static,
{
    let actor = match directory_actor(directory.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.inbox(&actor) {
        Ok(messages) => (StatusCode::OK, axum::Json(messages)).into_response(),
        Err(error) => message_error(error),
    }
}

async fn sent_handler<M, D>(
    State((service, directory)): State<(Arc<MessageService<M, D>>, Arc<D>)>,
    headers: HeaderMap,
) -> Response
where
    M: MessageRepository + 'static,
    D: UserRepository + 'static,
{
    let actor = match directory_actor(directory.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.sent(&actor) {
        Ok(messages) => (StatusCode::OK, axum::Json(messages)).into_response(),
        Err(error) => message_error(error),
    }
}

async fn unread_count_handler<M, D>(
    State((service, directory)): State<(Arc<MessageService<M, D>>, Arc<D>)>,
    headers: HeaderMap,
) -> Response
where
    M: MessageRepository + 'static,
    D: UserRepository + 'static,
{
    let actor = match directory_actor(directory.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.unread_count(&actor) {
        Ok(count) => (StatusCode::OK, axum::Json(json!({ "unread_count": count }))).into_response(),
        Err(error) => message_error(error),
    }
}

async fn read_all_handler<M, D>(
    State((service, directory)): State<(Arc<MessageService<M, D>>, Arc<D>)>,
    headers: HeaderMap,
) -> Response
where
    M: MessageRepository + 'static,
    D: UserRepository + 'static,
{
    let actor = match directory_actor(directory.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.mark_all_read(&actor) {
        Ok(marked) => (StatusCode::OK, axum::Json(json!({ "marked": marked }))).into_response(),
        Err(error) => message_error(error),
    }
}

async fn mark_read_handler<M, D>(
    State((service, directory)): State<(Arc<MessageService<M, D>>, Arc<D>)>,
    headers: HeaderMap,
    Path(message_id): Path<String>,
) -> Response
where
    M: MessageRepository + 'static,
    D: UserRepository + 'static,
{
    let actor = match directory_actor(directory.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.mark_read(&actor, &MessageId(message_id)) {
        Ok(message) => (StatusCode::OK, axum::Json(message)).into_response(),
        Err(error) => message_error(error),
    }
}

async fn delete_message_handler<M, D>(
    State((service, directory)): State<(Arc<MessageService<M, D>>, Arc<D>)>,
    headers: HeaderMap,
    Path(message_id): Path<String>,
) -> Response
where
    M: MessageRepository + 'static,
    D: UserRepository + 'static,
{
    let actor = match directory_actor(directory.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.delete(&actor, &MessageId(message_id)) {
        Ok(()) => (StatusCode::OK, axum::Json(json!({ "deleted": true }))).into_response(),
        Err(error) => message_error(error),
    }
}
