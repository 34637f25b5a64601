use std::sync::Arc;

use async_trait::async_trait;
use dray_queue::{JobId, ProcessError, Processor};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::mail::{MailError, MailTransport};

#[derive(Debug, Deserialize)]
struct EmailPayload {
    to: String,
    subject: String,
    body: String,
}

/// Sends `payload` as a plaintext email through the configured transport.
///
/// Sending is not idempotent: a lease that expires after the message left
/// the transport re-sends on the next attempt. At-least-once delivery is
/// the accepted trade-off here.
pub struct EmailSendProcessor {
    mailer: Arc<dyn MailTransport>,
}

impl EmailSendProcessor {
    pub const JOB_TYPE: &'static str = "EMAIL_SEND";

    pub fn new(mailer: Arc<dyn MailTransport>) -> Self {
        Self { mailer }
    }
}

#[async_trait]
impl Processor for EmailSendProcessor {
    fn job_type(&self) -> &'static str {
        Self::JOB_TYPE
    }

    async fn process(&self, job_id: &JobId, payload: &Value) -> Result<Value, ProcessError> {
        let payload: EmailPayload = serde_json::from_value(payload.clone())
            .map_err(|e| ProcessError::invalid_payload(format!("expected to, subject and body: {e}")))?;

        if payload.to.trim().is_empty()
            || payload.subject.trim().is_empty()
            || payload.body.trim().is_empty()
        {
            return Err(ProcessError::invalid_payload(
                "to, subject and body must be non-empty",
            ));
        }

        let message_id = self
            .mailer
            .send(&payload.to, &payload.subject, &payload.body)
            .await
            .map_err(|e| match e {
                MailError::Address(_) | MailError::Build(_) => {
                    ProcessError::invalid_payload(e.to_string())
                }
                MailError::Transport(_) => ProcessError::transient(e.to_string()),
            })?;

        info!(job_id = %job_id, to = %payload.to, "Email sent");
        Ok(json!({ "message": "Email sent", "messageId": message_id }))
    }
}
