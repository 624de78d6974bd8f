//! Outbound notification seam.
//!
//! Notifications are best-effort: the code path that performs a state
//! mutation composes the notice and hands it to the sink after the
//! mutation has been persisted. Sink failures are logged by the caller
//! and never roll back the mutation that triggered them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Events that produce an outbound notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeEvent {
    RequestCreated,
    ProviderApproved,
    TutorApproved,
    Rejected,
    Completed,
    ReportSubmitted,
    VerificationCode,
}

impl NoticeEvent {
    pub const fn label(self) -> &'static str {
        match self {
            NoticeEvent::RequestCreated => "request_created",
            NoticeEvent::ProviderApproved => "provider_approved",
            NoticeEvent::TutorApproved => "tutor_approved",
            NoticeEvent::Rejected => "rejected",
            NoticeEvent::Completed => "completed",
            NoticeEvent::ReportSubmitted => "report_submitted",
            NoticeEvent::VerificationCode => "verification_code",
        }
    }
}

/// A notice addressed to one or more recipients, keyed by email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub event: NoticeEvent,
    pub recipients: Vec<String>,
    pub subject: String,
    pub details: BTreeMap<String, String>,
}

/// Transport abstraction for outbound notices (e-mail in production).
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notice: Notice) -> Result<(), NotifyError>;
}

/// Notice dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
