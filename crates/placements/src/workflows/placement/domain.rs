use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::accounts::UserId;

/// Identifier wrapper for placement requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacementId(pub String);

/// Lifecycle status of a placement request.
///
/// The only legal moves are forward along
/// `pending -> approved_by_provider -> approved_by_tutor -> completed`,
/// plus `rejected` from either review stage. `rejected` and `completed`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStatus {
    Pending,
    ApprovedByProvider,
    ApprovedByTutor,
    Rejected,
    Completed,
}

impl PlacementStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PlacementStatus::Pending => "pending",
            PlacementStatus::ApprovedByProvider => "approved_by_provider",
            PlacementStatus::ApprovedByTutor => "approved_by_tutor",
            PlacementStatus::Rejected => "rejected",
            PlacementStatus::Completed => "completed",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PlacementStatus::Pending),
            "approved_by_provider" => Some(PlacementStatus::ApprovedByProvider),
            "approved_by_tutor" => Some(PlacementStatus::ApprovedByTutor),
            "rejected" => Some(PlacementStatus::Rejected),
            "completed" => Some(PlacementStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlacementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Optional map pin for the placement location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Student-provided description of the requested placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementSubmission {
    pub provider: UserId,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub location: String,
    #[serde(default)]
    pub geo: Option<GeoPoint>,
    #[serde(default)]
    pub document: Option<String>,
}

/// Partial edit applied to a still-pending request by its owning student.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlacementEdit {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub geo: Option<GeoPoint>,
    #[serde(default)]
    pub document: Option<String>,
}

impl PlacementEdit {
    /// Merge the provided fields into `record`, leaving the rest alone.
    pub fn apply_to(&self, record: &mut PlacementRecord) {
        if let Some(value) = &self.company_name {
            record.company_name = value.clone();
        }
        if let Some(value) = &self.job_title {
            record.job_title = value.clone();
        }
        if let Some(value) = &self.job_description {
            record.job_description = value.clone();
        }
        if let Some(value) = self.start_date {
            record.start_date = value;
        }
        if let Some(value) = self.end_date {
            record.end_date = value;
        }
        if let Some(value) = &self.location {
            record.location = value.clone();
        }
        if let Some(value) = self.geo {
            record.geo = Some(value);
        }
        if let Some(value) = &self.document {
            record.document = Some(value.clone());
        }
    }
}

/// The central workflow record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub id: PlacementId,
    pub student: UserId,
    pub provider: UserId,
    /// Advisory assignment only; does not gate who may approve.
    pub tutor: Option<UserId>,
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub location: String,
    pub geo: Option<GeoPoint>,
    pub document: Option<String>,
    pub status: PlacementStatus,
    pub provider_approved_at: Option<DateTime<Utc>>,
    pub tutor_approved_at: Option<DateTime<Utc>>,
    /// The tutor user who performed the final approval.
    pub approved_by_tutor: Option<UserId>,
    pub provider_comments: String,
    pub tutor_comments: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlacementRecord {
    pub fn view(&self) -> PlacementView {
        PlacementView {
            id: self.id.clone(),
            student: self.student.clone(),
            provider: self.provider.clone(),
            company_name: self.company_name.clone(),
            job_title: self.job_title.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            location: self.location.clone(),
            status: self.status.label(),
            provider_approved_at: self.provider_approved_at,
            tutor_approved_at: self.tutor_approved_at,
            approved_by_tutor: self.approved_by_tutor.clone(),
            provider_comments: self.provider_comments.clone(),
            tutor_comments: self.tutor_comments.clone(),
        }
    }
}

/// Serialized representation exposed over the API.
#[derive(Debug, Clone, Serialize)]
pub struct PlacementView {
    pub id: PlacementId,
    pub student: UserId,
    pub provider: UserId,
    pub company_name: String,
    pub job_title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub location: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tutor_approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by_tutor: Option<UserId>,
    pub provider_comments: String,
    pub tutor_comments: String,
}

/// Counts by status over a role-visible subset of requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusTally {
    pub total: usize,
    pub pending: usize,
    pub approved_by_provider: usize,
    pub approved_by_tutor: usize,
    pub rejected: usize,
    pub completed: usize,
}

impl StatusTally {
    pub fn count(records: &[PlacementRecord]) -> Self {
        let mut tally = StatusTally {
            total: records.len(),
            ..StatusTally::default()
        };
        for record in records {
            match record.status {
                PlacementStatus::Pending => tally.pending += 1,
                PlacementStatus::ApprovedByProvider => tally.approved_by_provider += 1,
                PlacementStatus::ApprovedByTutor => tally.approved_by_tutor += 1,
                PlacementStatus::Rejected => tally.rejected += 1,
                PlacementStatus::Completed => tally.completed += 1,
            }
        }
        tally
    }
}
