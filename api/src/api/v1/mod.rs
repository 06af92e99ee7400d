pub mod auth;
pub mod sse;
pub mod videos;
