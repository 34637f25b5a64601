use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum MailError {
    /// A sender or recipient address failed to parse.
    #[error("Invalid email address: {0}")]
    Address(String),

    /// The message itself could not be assembled.
    #[error("Failed to build message: {0}")]
    Build(String),

    /// The SMTP conversation failed. Usually worth retrying.
    #[error("Failed to send email: {0}")]
    Transport(String),
}

/// Outbound mail boundary. Returns an id for the accepted message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<String, MailError>;
}

/// SMTP mailer speaking plaintext to a relay.
///
/// Plaintext fits the local capture servers (MailHog and friends) this
/// service is pointed at in development, which listen on 1025 without TLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(host: &str, port: u16, from: &str) -> Result<Self, MailError> {
        let from = from
            .parse()
            .map_err(|e| MailError::Address(format!("{from}: {e}")))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();

        info!(host, port, "Created SMTP transport");
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<String, MailError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| MailError::Address(format!("{to}: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| MailError::Build(e.to_string()))?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        if !response.is_positive() {
            return Err(MailError::Transport(format!(
                "SMTP rejected message: {}",
                response.code()
            )));
        }

        let message_id = uuid::Uuid::new_v4().to_string();
        debug!(message_id = %message_id, "Email accepted by relay");
        Ok(message_id)
    }
}
