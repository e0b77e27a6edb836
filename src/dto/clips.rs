use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::sse::ClipOrigin,
    services::clip_service::{Availability, UploadReport},
    state::{announce::missing_clip_guidance, session::BallNumber},
};

/// Result of an upload batch.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Files stored as clips.
    pub saved: usize,
    /// Files whose name held no ball number.
    pub skipped: usize,
    /// Summary to show next to the upload button.
    pub message: String,
}

impl From<UploadReport> for UploadResponse {
    fn from(report: UploadReport) -> Self {
        Self {
            saved: report.saved,
            skipped: report.skipped,
            message: report.message(),
        }
    }
}

/// Whether a number has a playable clip.
#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityResponse {
    /// Checked ball.
    #[schema(value_type = u8)]
    pub number: BallNumber,
    /// Whether a playable clip exists.
    pub found: bool,
    /// Where the clip would come from when found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ClipOrigin>,
    /// Upload guidance when nothing was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

impl AvailabilityResponse {
    /// Describe `availability` for `number`.
    pub fn new(number: BallNumber, availability: Availability) -> Self {
        match availability {
            Availability::Found(source) => Self {
                number,
                found: true,
                source: Some(source.into()),
                guidance: None,
            },
            Availability::Missing => Self {
                number,
                found: false,
                source: None,
                guidance: Some(missing_clip_guidance(number)),
            },
        }
    }
}
