use crate::infra::{
    AppState, InMemoryMessageRepository, InMemoryPlacementRepository, InMemoryReportRepository,
    InMemoryUserRepository, InMemoryVerificationStore, InMemoryVisitRepository,
    LoggingNotificationSink,
};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

use placements::accounts::{accounts_router, RegistrationService};
use placements::workflows::placement::{
    messaging_router, placement_router, reports_router, visits_router, MessageService,
    PlacementService, ReportService, VisitService,
};

pub(crate) type Registration = RegistrationService<
    InMemoryUserRepository,
    InMemoryVerificationStore,
    LoggingNotificationSink,
>;
pub(crate) type Placements = PlacementService<
    InMemoryPlacementRepository,
    InMemoryUserRepository,
    LoggingNotificationSink,
>;
pub(crate) type Visits = VisitService<InMemoryVisitRepository, InMemoryPlacementRepository>;
pub(crate) type Reports = ReportService<
    InMemoryReportRepository,
    InMemoryPlacementRepository,
    InMemoryUserRepository,
    LoggingNotificationSink,
>;
pub(crate) type Messages = MessageService<InMemoryMessageRepository, InMemoryUserRepository>;

/// The wired service graph over one set of in-memory stores.
pub(crate) struct Services {
    pub(crate) registration: Arc<Registration>,
    pub(crate) placements: Arc<Placements>,
    pub(crate) visits: Arc<Visits>,
    pub(crate) reports: Arc<Reports>,
    pub(crate) messages: Arc<Messages>,
    pub(crate) directory: Arc<InMemoryUserRepository>,
}

impl Services {
    pub(crate) fn in_memory() -> Self {
        let directory = Arc::new(InMemoryUserRepository::default());
        let verifications = Arc::new(InMemoryVerificationStore::default());
        let placements_repo = Arc::new(InMemoryPlacementRepository::default());
        let visits_repo = Arc::new(InMemoryVisitRepository::default());
        let reports_repo = Arc::new(InMemoryReportRepository::default());
        let messages_repo = Arc::new(InMemoryMessageRepository::default());
        let notifier = Arc::new(LoggingNotificationSink);

        Services {
            registration: Arc::new(RegistrationService::new(
                directory.clone(),
                verifications,
                notifier.clone(),
            )),
            placements: Arc::new(PlacementService::new(
                placements_repo.clone(),
                directory.clone(),
                notifier.clone(),
            )),
            visits: Arc::new(VisitService::new(
                visits_repo,
                placements_repo.clone(),
            )),
            reports: Arc::new(ReportService::new(
                reports_repo,
                placements_repo,
                directory.clone(),
                notifier,
            )),
            messages: Arc::new(MessageService::new(messages_repo, directory.clone())),
            directory,
        }
    }
}

/// Compose the domain routers with the service's operational endpoints.
pub(crate) fn api_router(services: Services) -> axum::Router {
    accounts_router(services.registration)
        .merge(placement_router(services.placements))
        .merge(visits_router(services.visits, services.directory.clone()))
        .merge(reports_router(services.reports, services.directory.clone()))
        .merge(messaging_router(services.messages, services.directory))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
