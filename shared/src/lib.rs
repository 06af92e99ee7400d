pub mod events;
pub mod models;

pub use events::{VideoStatusChanged, VideoStatusUpdate};
pub use models::{
    EditOptions, Page, ProblemDetails, Role, User, Video, VideoResponse, VideoStatus,
};
