//! Placement request workflow: submission, two-stage review, completion,
//! and the satellite records (visits, reports, messages) that attach to
//! an approved placement.
//!
//! Every status mutation goes through the transition function in
//! [`transition`], and the repository applies it conditionally on the
//! expected current status, so concurrent reviews cannot clobber each
//! other.

pub mod domain;
pub mod messaging;
mod notices;
pub mod reports;
pub mod repository;
pub mod router;
pub mod service;
pub mod transition;
pub mod visits;

#[cfg(test)]
mod tests;

pub use domain::{
    GeoPoint, PlacementEdit, PlacementId, PlacementRecord, PlacementStatus, PlacementSubmission,
    PlacementView, StatusTally,
};
pub use messaging::{
    Message, MessageId, MessageRepository, MessageService, MessageServiceError, MessageSubmission,
};
pub use reports::{
    PlacementReport, ReportId, ReportRepository, ReportService, ReportServiceError,
    ReportSubmission,
};
pub use repository::{PlacementRepository, RepositoryError, TransitionPatch};
pub use router::{messaging_router, placement_router, reports_router, visits_router};
pub use service::{PlacementService, PlacementServiceError};
pub use transition::{transition, PlacementAction, TransitionError};
pub use visits::{
    VisitId, VisitRepository, VisitSchedule, VisitService, VisitServiceError, VisitSubmission,
};
