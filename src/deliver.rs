//! Payload assembly and mail delivery.
//!
//! [`assemble`] turns an extracted article plus its rewritten body into a
//! [`DeliveryPayload`]; the [`MailTransport`] trait is the seam to the
//! outbound SMTP session so tests can record payloads instead of sending
//! them. The production transport is [`SmtpMailer`], which authenticates
//! over STARTTLS and attaches the resolved image inline. [`DryRunMailer`]
//! logs the payload and sends nothing.
//!
//! A delivered email is a one-shot: transport failures are reported to the
//! caller, and nothing upstream is rolled back.

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt::Write as _;
use tracing::{debug, info, instrument};

use crate::config::MailConfig;
use crate::error::DeliveryError;
use crate::models::{Article, DeliveryPayload, ResolvedImage};

/// Content id the HTML body uses to reference the inline attachment.
const ARTICLE_IMAGE_CID: &str = "article-image";

/// Compose the final payload for one article.
///
/// The image, when present, is referenced ahead of the body. Each
/// blank-line separated block of the rewritten text becomes one HTML
/// paragraph; headline and paragraphs are entity-escaped since the
/// rewritten text is untrusted remote content.
pub fn assemble(
    article: &Article,
    body_text: &str,
    image: Option<ResolvedImage>,
) -> DeliveryPayload {
    let mut html = String::new();
    if image.is_some() {
        let _ = write!(
            html,
            "<img src=\"cid:{ARTICLE_IMAGE_CID}\" width=\"600\"><br>"
        );
    }
    let _ = write!(html, "<h2>{}</h2>", html_escape::encode_text(&article.headline));
    for paragraph in body_text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        let _ = write!(html, "<p>{}</p>", html_escape::encode_text(paragraph));
    }

    debug!(
        subject = %article.headline,
        html_bytes = html.len(),
        has_image = image.is_some(),
        "Assembled delivery payload"
    );
    DeliveryPayload {
        subject: article.headline.clone(),
        html_body: html,
        image,
    }
}

/// Outbound delivery sink.
///
/// Accepts one payload at a time and reports plain success or failure;
/// there is no partial-delivery state to inspect.
pub trait MailTransport {
    async fn send(&self, payload: &DeliveryPayload) -> Result<(), DeliveryError>;
}

/// SMTP delivery via STARTTLS with password authentication.
#[derive(Debug)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    recipient: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig, password: String) -> Result<Self, DeliveryError> {
        let username = config.username.clone().unwrap_or_else(|| config.sender.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(username, password))
            .build();
        Ok(Self {
            transport,
            sender: config.sender.parse()?,
            recipient: config.recipient.parse()?,
        })
    }

    async fn build_message(&self, payload: &DeliveryPayload) -> Result<Message, DeliveryError> {
        let builder = Message::builder()
            .from(self.sender.clone())
            .to(self.recipient.clone())
            .subject(payload.subject.clone());

        let message = match &payload.image {
            Some(image) => {
                let bytes = tokio::fs::read(&image.path).await?;
                let content_type = ContentType::parse(image.mime())?;
                let attachment =
                    Attachment::new_inline(ARTICLE_IMAGE_CID.to_string()).body(bytes, content_type);
                builder.multipart(
                    MultiPart::related()
                        .singlepart(SinglePart::html(payload.html_body.clone()))
                        .singlepart(attachment),
                )?
            }
            None => builder
                .header(ContentType::TEXT_HTML)
                .body(payload.html_body.clone())?,
        };
        Ok(message)
    }
}

impl MailTransport for SmtpMailer {
    #[instrument(level = "info", skip_all, fields(subject = %payload.subject))]
    async fn send(&self, payload: &DeliveryPayload) -> Result<(), DeliveryError> {
        let message = self.build_message(payload).await?;
        self.transport.send(message).await?;
        info!("Email handed to SMTP relay");
        Ok(())
    }
}

/// Transport used by `--dry-run`: logs the payload, sends nothing.
pub struct DryRunMailer;

impl MailTransport for DryRunMailer {
    async fn send(&self, payload: &DeliveryPayload) -> Result<(), DeliveryError> {
        info!(
            subject = %payload.subject,
            html_bytes = payload.html_body.len(),
            image = payload.image.as_ref().map(|i| i.path.display().to_string()),
            "Dry run; payload not transmitted"
        );
        Ok(())
    }
}
