use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingConfirmation,
    BookingCancellation,
}

impl NotificationKind {
    fn subject(&self) -> &'static str {
        match self {
            NotificationKind::BookingConfirmation => "Your booking is confirmed",
            NotificationKind::BookingCancellation => "Your booking has been cancelled",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("request error: {0}")]
    Request(String),
    #[error("API error: {0}")]
    Api(String),
}

/// Outbound traveler messaging. Callers never wait on delivery; see [`dispatch`].
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        recipient: &str,
        kind: NotificationKind,
        data: serde_json::Value,
    ) -> Result<(), NotificationError>;
}

/// Fire-and-forget delivery. Failures are logged for operators and never
/// reach the caller.
pub fn dispatch(
    notifier: Arc<dyn Notifier>,
    recipient: String,
    kind: NotificationKind,
    data: serde_json::Value,
) {
    tokio::spawn(async move {
        match notifier.notify(&recipient, kind, data).await {
            Ok(()) => log::info!("Sent {:?} notification to {}", kind, recipient),
            Err(e) => log::error!(
                "Failed to send {:?} notification to {}: {}",
                kind,
                recipient,
                e
            ),
        }
    });
}

#[derive(Debug, Serialize)]
struct SendGridEmail {
    email: String,
}

#[derive(Debug, Serialize)]
struct SendGridPersonalization {
    to: Vec<SendGridEmail>,
}

#[derive(Debug, Serialize)]
struct SendGridContent {
    #[serde(rename = "type")]
    content_type: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct SendGridRequest {
    personalizations: Vec<SendGridPersonalization>,
    from: SendGridEmail,
    subject: String,
    content: Vec<SendGridContent>,
}

pub struct SendGridNotifier {
    api_key: String,
    from_email: String,
    client: reqwest::Client,
}

impl SendGridNotifier {
    pub fn new(api_key: String, from_email: String) -> Self {
        Self {
            api_key,
            from_email,
            client: reqwest::Client::new(),
        }
    }
}

fn render_body(kind: NotificationKind, data: &serde_json::Value) -> String {
    let reference = data["booking_reference"].as_str().unwrap_or("-");
    let title = data["subject_title"].as_str().unwrap_or("your trip");

    match kind {
        NotificationKind::BookingConfirmation => format!(
            "Thanks for booking {}.\nReference: {}\nStart date: {}\nTotal: {} {}",
            title,
            reference,
            data["start_date"].as_str().unwrap_or("-"),
            data["total_price"],
            data["currency"].as_str().unwrap_or("").to_uppercase(),
        ),
        NotificationKind::BookingCancellation => format!(
            "Your booking {} for {} has been cancelled.\nRefund: {} {}",
            reference,
            title,
            data["refund_amount"],
            data["currency"].as_str().unwrap_or("").to_uppercase(),
        ),
    }
}

#[async_trait]
impl Notifier for SendGridNotifier {
    async fn notify(
        &self,
        recipient: &str,
        kind: NotificationKind,
        data: serde_json::Value,
    ) -> Result<(), NotificationError> {
        let url = "https://api.sendgrid.com/v3/mail/send";

        let request = SendGridRequest {
            personalizations: vec![SendGridPersonalization {
                to: vec![SendGridEmail {
                    email: recipient.to_string(),
                }],
            }],
            from: SendGridEmail {
                email: self.from_email.clone(),
            },
            subject: kind.subject().to_string(),
            content: vec![SendGridContent {
                content_type: "text/plain".to_string(),
                value: render_body(kind, &data),
            }],
        };

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| NotificationError::Request(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(NotificationError::Api(format!(
                "Status: {}, Body: {}",
                status, body
            )))
        }
    }
}

/// Writes notifications to the log instead of sending them.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        recipient: &str,
        kind: NotificationKind,
        data: serde_json::Value,
    ) -> Result<(), NotificationError> {
        log::info!(
            "[notification] to={} subject={:?}\n{}",
            recipient,
            kind.subject(),
            render_body(kind, &data)
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_confirmation_body() {
        let body = render_body(
            NotificationKind::BookingConfirmation,
            &json!({
                "booking_reference": "WF-ABC-123456",
                "subject_title": "Fjord Kayaking",
                "start_date": "2025-07-01T00:00:00Z",
                "total_price": 409.5,
                "currency": "usd",
            }),
        );
        assert!(body.contains("WF-ABC-123456"));
        assert!(body.contains("Fjord Kayaking"));
        assert!(body.contains("409.5 USD"));
    }

    #[test]
    fn test_cancellation_body_tolerates_missing_fields() {
        let body = render_body(NotificationKind::BookingCancellation, &json!({}));
        assert!(body.contains("your trip"));
    }

    #[actix_rt::test]
    async fn test_log_notifier_never_fails() {
        let result = LogNotifier
            .notify("ana@example.com", NotificationKind::BookingCancellation, json!({}))
            .await;
        assert!(result.is_ok());
    }
}
