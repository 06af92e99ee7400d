use serde::Serialize;

use crate::models::VideoStatus;

/// Internal event, published by the status updater strictly after its
/// transaction commits. Never serialized to clients directly — the SSE
/// listener converts it into a `VideoStatusUpdate`.
#[derive(Debug, Clone)]
pub struct VideoStatusChanged {
    pub video_id: String,
    pub public_id: String,
    pub owner_username: String,
    pub status: VideoStatus,
    pub message: Option<String>,
}

impl VideoStatusChanged {
    pub fn new(video_id: impl Into<String>, public_id: impl Into<String>, owner_username: impl Into<String>, status: VideoStatus) -> Self {
        Self {
            video_id: video_id.into(),
            public_id: public_id.into(),
            owner_username: owner_username.into(),
            status,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// The SSE-facing payload delivered as `event: videoStatusUpdate`.
#[derive(Debug, Clone, Serialize)]
pub struct VideoStatusUpdate {
    pub public_id: String,
    pub status: VideoStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&VideoStatusChanged> for VideoStatusUpdate {
    fn from(e: &VideoStatusChanged) -> Self {
        Self {
            public_id: e.public_id.clone(),
            status: e.status,
            message: e.message.clone(),
        }
    }
}
