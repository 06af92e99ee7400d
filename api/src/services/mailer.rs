//! Outbound email is an external collaborator the core never calls
//! synchronously from a request path. `Mailer` is the seam; the only
//! implementation shipped here logs what would have been sent, matching
//! how this teacher's codebase treats other out-of-process dependencies
//! it doesn't own (see `services::offloadmq`).

use async_trait::async_trait;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification_email(&self, to_email: &str, username: &str, verification_link: &str);
}

pub struct LoggingMailer;

#[async_trait]
impl Mailer for LoggingMailer {
    async fn send_verification_email(&self, to_email: &str, username: &str, verification_link: &str) {
        log::info!("verification email for {username} <{to_email}>: {verification_link}");
    }
}
