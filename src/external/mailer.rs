use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::config::MailerConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Account, Event};
use crate::utils::email_local_part;

/// A rendered message ready to be handed to the mail API.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> AppResult<()>;
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Invitation sent to `email` when the organizer adds it to the roster.
pub fn invitation_email(
    event: &Event,
    email: &str,
    account: Option<&Account>,
    app_url: &str,
) -> OutgoingEmail {
    let greeting = account
        .map(|a| a.firstname.as_str())
        .unwrap_or_else(|| email_local_part(email));
    let date = event.date.format("%B %-d, %Y").to_string();
    let link = format!("{}/invitations", app_url.trim_end_matches('/'));
    let budget = event.budget.map(|b| format!("{b:.2}"));

    let subject = format!("Invitation to {}", event.name);

    let mut html = format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;\">\
         <h2 style=\"text-align: center;\">Invitation to {name}</h2>\
         <p>Hello {greeting},</p>\
         <p>You are invited to <strong>{name}</strong>, taking place on {date}.</p>\
         <p><strong>Event type:</strong> {kind}</p>",
        name = escape_html(&event.name),
        greeting = escape_html(greeting),
        date = date,
        kind = event.event_type,
    );
    if let Some(b) = &budget {
        html.push_str(&format!("<p><strong>Suggested budget:</strong> {b}</p>"));
    }
    html.push_str(&format!(
        "<p style=\"text-align: center; margin: 30px 0;\"><a href=\"{link}\">Answer the invitation</a></p></div>"
    ));

    let mut text = format!(
        "Invitation to {name}\n\nHello {greeting},\n\nYou are invited to {name}, taking place on {date}.\n\nEvent type: {kind}\n",
        name = event.name,
        kind = event.event_type,
    );
    if let Some(b) = &budget {
        text.push_str(&format!("Suggested budget: {b}\n"));
    }
    text.push_str(&format!("\nAnswer the invitation here:\n{link}\n"));

    OutgoingEmail {
        to: email.to_string(),
        to_name: account.map(|a| format!("{} {}", a.firstname, a.lastname)),
        subject,
        html,
        text,
    }
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: Address<'a>,
    to: Vec<Address<'a>>,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// Transactional mail over a JSON HTTP API with bearer authentication.
#[derive(Clone)]
pub struct HttpMailer {
    client: Client,
    config: MailerConfig,
}

impl HttpMailer {
    pub fn new(config: MailerConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.config.api_url.is_empty() && !self.config.api_key.is_empty()
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: OutgoingEmail) -> AppResult<()> {
        if !self.is_enabled() {
            log::warn!("Mailer not configured, skipping email to {}", email.to);
            return Ok(());
        }

        let body = SendRequest {
            from: Address {
                email: &self.config.from_address,
                name: Some(&self.config.from_name),
            },
            to: vec![Address {
                email: &email.to,
                name: email.to_name.as_deref(),
            }],
            subject: &email.subject,
            html: &email.html,
            text: &email.text,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            log::info!("Email sent to {}: {}", email.to, email.subject);
            Ok(())
        } else {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(AppError::ExternalApiError(format!(
                "Email sending failed: HTTP {}: {}",
                status.as_u16(),
                error_text
            )))
        }
    }
}
