//! Maps workflow events to outbound notices.
//!
//! Called synchronously by the service right after a persisted mutation,
//! with the old and new status passed in directly. At most one batch per
//! transition; a re-save without a status change never reaches this
//! module.

use std::collections::BTreeMap;

use crate::notify::{Notice, NoticeEvent};

use super::domain::{PlacementRecord, PlacementStatus};

/// Resolved recipient addresses for one placement request.
pub(crate) struct Recipients {
    pub(crate) student: String,
    pub(crate) provider: String,
    pub(crate) tutor_pool: Vec<String>,
    pub(crate) approving_tutor: Option<String>,
}

fn details(record: &PlacementRecord) -> BTreeMap<String, String> {
    let mut details = BTreeMap::new();
    details.insert("placement_id".to_string(), record.id.0.clone());
    details.insert("company".to_string(), record.company_name.clone());
    details.insert("job_title".to_string(), record.job_title.clone());
    details.insert("status".to_string(), record.status.label().to_string());
    details
}

pub(crate) fn created_notice(record: &PlacementRecord, recipients: &Recipients) -> Notice {
    Notice {
        event: NoticeEvent::RequestCreated,
        recipients: vec![recipients.provider.clone()],
        subject: format!("New placement request - {}", record.company_name),
        details: details(record),
    }
}

/// Role-appropriate notices for a persisted status change.
pub(crate) fn transition_notices(
    record: &PlacementRecord,
    to: PlacementStatus,
    recipients: &Recipients,
) -> Vec<Notice> {
    match to {
        PlacementStatus::ApprovedByProvider => vec![Notice {
            event: NoticeEvent::ProviderApproved,
            recipients: recipients.tutor_pool.clone(),
            subject: format!(
                "Placement request awaiting tutor approval - {}",
                record.company_name
            ),
            details: details(record),
        }],
        PlacementStatus::ApprovedByTutor => vec![Notice {
            event: NoticeEvent::TutorApproved,
            recipients: vec![recipients.student.clone(), recipients.provider.clone()],
            subject: format!("Placement request approved - {}", record.company_name),
            details: details(record),
        }],
        PlacementStatus::Rejected => vec![Notice {
            event: NoticeEvent::Rejected,
            recipients: vec![recipients.student.clone()],
            subject: format!("Placement request update - {}", record.company_name),
            details: details(record),
        }],
        PlacementStatus::Completed => {
            let mut addresses = vec![recipients.student.clone(), recipients.provider.clone()];
            if let Some(tutor) = &recipients.approving_tutor {
                addresses.push(tutor.clone());
            }
            vec![Notice {
                event: NoticeEvent::Completed,
                recipients: addresses,
                subject: format!("Placement completed - {}", record.company_name),
                details: details(record),
            }]
        }
        PlacementStatus::Pending => Vec::new(),
    }
}
