// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Outbound notifications: SMS and WhatsApp through Twilio, email through SendGrid.
//!
//! Every requested channel is attempted independently. A provider failure
//! (or a provider that isn't configured) becomes a failed [`ChannelResult`]
//! for that channel rather than an error for the whole dispatch.

use crate::config::Config;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Maximum characters of summary text carried by SMS/WhatsApp messages.
const SHORT_MESSAGE_CHARS: usize = 200;
const DEFAULT_RECIPIENT_NAME: &str = "User";
const TEST_MESSAGE: &str = "Wellness Coach notification test! If you received this message, \
everything is working.";
const TEST_SUBJECT: &str = "Test - Wellness Coach Notifications";

/// Delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Channel {
    Sms,
    Whatsapp,
    Email,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Whatsapp => "whatsapp",
            Channel::Email => "email",
        }
    }
}

impl FromStr for Channel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sms" => Ok(Channel::Sms),
            "whatsapp" => Ok(Channel::Whatsapp),
            "email" => Ok(Channel::Email),
            other => Err(AppError::BadRequest(format!("Unknown channel: {}", other))),
        }
    }
}

/// Outcome of one channel delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChannelResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChannelResult {
    fn delivered(message_id: Option<String>, status: Option<String>) -> Self {
        Self {
            success: true,
            message_id,
            status,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            status: None,
            error: Some(error.into()),
        }
    }
}

/// Per-channel results, keyed by channel name.
pub type DispatchResults = BTreeMap<Channel, ChannelResult>;

/// Contact details for a dispatch. Blank values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Recipient {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Recipient {
    pub fn phone(&self) -> Option<&str> {
        non_blank(self.phone.as_deref())
    }

    pub fn email(&self) -> Option<&str> {
        non_blank(self.email.as_deref())
    }

    fn display_name(&self) -> &str {
        non_blank(self.name.as_deref()).unwrap_or(DEFAULT_RECIPIENT_NAME)
    }
}

/// Which providers are usable.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NotificationStatus {
    pub twilio_configured: bool,
    pub sendgrid_configured: bool,
    pub available_channels: Vec<Channel>,
}

// ─── Provider Clients ────────────────────────────────────────────

#[derive(Clone)]
struct TwilioClient {
    http: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
}

#[derive(Deserialize)]
struct TwilioMessage {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize, Default)]
struct TwilioErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl TwilioClient {
    async fn send(&self, from: &str, to: &str, body: &str) -> Result<TwilioMessage, String> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .await
            .map_err(|e| format!("Twilio request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body: TwilioErrorBody = response.json().await.unwrap_or_default();
            return Err(format!(
                "Twilio HTTP {}: {}",
                status,
                body.message.unwrap_or_default()
            ));
        }

        response
            .json()
            .await
            .map_err(|e| format!("Invalid Twilio response: {}", e))
    }
}

#[derive(Clone)]
struct SendGridClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    from_email: String,
}

impl SendGridClient {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        text: &str,
    ) -> Result<(Option<String>, u16), String> {
        let payload = serde_json::json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.from_email },
            "subject": subject,
            "content": [
                { "type": "text/plain", "value": text },
                { "type": "text/html", "value": html },
            ],
        });

        let response = self
            .http
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("SendGrid request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("SendGrid HTTP {}: {}", status, body));
        }

        let message_id = response
            .headers()
            .get("X-Message-Id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok((message_id, status.as_u16()))
    }
}

// ─── Dispatcher ──────────────────────────────────────────────────

/// Notification dispatcher.
#[derive(Clone)]
pub struct NotificationService {
    twilio: Option<TwilioClient>,
    sendgrid: Option<SendGridClient>,
    sms_from: String,
    whatsapp_from: String,
}

impl NotificationService {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::new();

        let twilio = match (&config.twilio_account_sid, &config.twilio_auth_token) {
            (Some(sid), Some(token)) => Some(TwilioClient {
                http: http.clone(),
                base_url: config.twilio_base_url.trim_end_matches('/').to_string(),
                account_sid: sid.clone(),
                auth_token: token.clone(),
            }),
            _ => {
                tracing::warn!("Twilio credentials not found; SMS and WhatsApp disabled");
                None
            }
        };

        let sendgrid = match &config.sendgrid_api_key {
            Some(key) => Some(SendGridClient {
                http,
                base_url: config.sendgrid_base_url.trim_end_matches('/').to_string(),
                api_key: key.clone(),
                from_email: config.from_email.clone(),
            }),
            None => {
                tracing::warn!("SendGrid API key not found; email disabled");
                None
            }
        };

        Self {
            twilio,
            sendgrid,
            sms_from: config.twilio_phone_number.clone(),
            whatsapp_from: config.whatsapp_from_number.clone(),
        }
    }

    pub fn status(&self) -> NotificationStatus {
        let mut available_channels = Vec::new();
        if self.twilio.is_some() {
            available_channels.extend([Channel::Sms, Channel::Whatsapp]);
        }
        if self.sendgrid.is_some() {
            available_channels.push(Channel::Email);
        }

        NotificationStatus {
            twilio_configured: self.twilio.is_some(),
            sendgrid_configured: self.sendgrid.is_some(),
            available_channels,
        }
    }

    pub async fn send_sms(&self, to: &str, body: &str) -> ChannelResult {
        self.send_twilio(Channel::Sms, &self.sms_from, &to_e164(to), body)
            .await
    }

    pub async fn send_whatsapp(&self, to: &str, body: &str) -> ChannelResult {
        self.send_twilio(
            Channel::Whatsapp,
            &self.whatsapp_from,
            &to_whatsapp_address(to),
            body,
        )
        .await
    }

    async fn send_twilio(&self, channel: Channel, from: &str, to: &str, body: &str) -> ChannelResult {
        let Some(twilio) = &self.twilio else {
            return ChannelResult::failed("Twilio not configured");
        };

        match twilio.send(from, to, body).await {
            Ok(message) => {
                tracing::info!(channel = channel.as_str(), sid = %message.sid, "Message sent");
                ChannelResult::delivered(Some(message.sid), message.status)
            }
            Err(error) => {
                tracing::error!(channel = channel.as_str(), error = %error, "Message failed");
                ChannelResult::failed(error)
            }
        }
    }

    pub async fn send_email(&self, to: &str, subject: &str, html: &str, text: &str) -> ChannelResult {
        let Some(sendgrid) = &self.sendgrid else {
            return ChannelResult::failed("SendGrid not configured");
        };

        match sendgrid.send(to, subject, html, text).await {
            Ok((message_id, status)) => {
                tracing::info!(channel = "email", status, "Email sent");
                ChannelResult::delivered(message_id, Some(status.to_string()))
            }
            Err(error) => {
                tracing::error!(channel = "email", error = %error, "Email failed");
                ChannelResult::failed(error)
            }
        }
    }

    /// Deliver a summary on each requested channel whose contact detail is present.
    pub async fn send_wellness_summary(
        &self,
        recipient: &Recipient,
        summary: &str,
        channels: &[Channel],
    ) -> DispatchResults {
        let mut results = DispatchResults::new();
        let name = recipient.display_name();

        let wants = |c: Channel| channels.contains(&c);

        if let Some(phone) = recipient.phone() {
            let short = short_message(name, summary);
            if wants(Channel::Sms) {
                results.insert(Channel::Sms, self.send_sms(phone, &short).await);
            }
            if wants(Channel::Whatsapp) {
                results.insert(Channel::Whatsapp, self.send_whatsapp(phone, &short).await);
            }
        }

        if let (true, Some(email)) = (wants(Channel::Email), recipient.email()) {
            let subject = format!("Your Daily Wellness Report - {}", name);
            let html = summary_email_html(name, summary);
            results.insert(
                Channel::Email,
                self.send_email(email, &subject, &html, summary).await,
            );
        }

        results
    }

    /// Send a fixed test message to every channel a contact is given for.
    pub async fn send_test_notifications(
        &self,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> DispatchResults {
        let mut results = DispatchResults::new();

        if let Some(phone) = non_blank(phone) {
            results.insert(Channel::Sms, self.send_sms(phone, TEST_MESSAGE).await);
            results.insert(
                Channel::Whatsapp,
                self.send_whatsapp(phone, TEST_MESSAGE).await,
            );
        }

        if let Some(email) = non_blank(email) {
            let html = format!(
                "<h2>Notification Test</h2><p>{}</p>",
                html_escape(TEST_MESSAGE)
            );
            results.insert(
                Channel::Email,
                self.send_email(email, TEST_SUBJECT, &html, TEST_MESSAGE)
                    .await,
            );
        }

        results
    }
}

// ─── Formatting ──────────────────────────────────────────────────

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Prefix `+` if missing.
fn to_e164(phone: &str) -> String {
    let phone = phone.trim();
    if phone.starts_with('+') {
        phone.to_string()
    } else {
        format!("+{}", phone)
    }
}

fn to_whatsapp_address(phone: &str) -> String {
    let phone = phone.trim();
    if phone.starts_with("whatsapp:") {
        phone.to_string()
    } else {
        format!("whatsapp:{}", to_e164(phone))
    }
}

/// Truncate to `max` characters, appending an ellipsis only when cut.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

fn short_message(name: &str, summary: &str) -> String {
    format!(
        "Hi {}!\n\n{}\n\nSee the full report in the app!",
        name,
        truncate_chars(summary, SHORT_MESSAGE_CHARS)
    )
}

fn summary_email_html(name: &str, summary: &str) -> String {
    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2 style="color: #4CAF50;">Your Daily Wellness Report</h2>
    <p>Hello <strong>{name}</strong>,</p>
    <div style="background-color: #f9f9f9; padding: 20px; border-radius: 8px; margin: 20px 0;">
      <h3 style="color: #2196F3; margin-top: 0;">Your Health Data</h3>
      <p style="white-space: pre-line;">{summary}</p>
    </div>
    <div style="background-color: #e8f5e8; padding: 15px; border-radius: 8px; margin: 20px 0;">
      <h4 style="color: #4CAF50; margin-top: 0;">Tip of the Day</h4>
      <p>Keep tracking your health data regularly. Small daily improvements add up!</p>
    </div>
    <hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">
    <p style="font-size: 12px; color: #666;">
      This report was generated automatically from your health data.<br>
      To stop receiving these reports, change your notification settings in the app.
    </p>
  </div>
</body>
</html>"#,
        name = html_escape(name),
        summary = html_escape(summary),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
