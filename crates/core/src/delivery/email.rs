use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::collaborators::{CollaboratorError, NotificationSender, SendOutcome, SendQuoteRequest};
use crate::domain::quote::Quote;

/// The message pre-filled on the send step.
pub fn default_email_message(quote: &Quote) -> String {
    let name = quote.client.as_ref().map(|client| client.name.as_str()).unwrap_or("there");
    let valid_until = quote.valid_until.format("%-m/%-d/%Y");

    format!(
        "Hi {name},\n\n\
         Please find attached your quote for the requested services. \
         This quote is valid until {valid_until}.\n\n\
         If you have any questions or would like to discuss any details, \
         please don't hesitate to reach out.\n\n\
         Best regards,\nYour Team"
    )
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum SenderMode {
    #[default]
    Deliver,
    Decline,
    Unreachable,
}

/// Keeps every request in memory instead of talking to a mail server.
///
/// `declining` answers with `success == false`; `unreachable` fails the call
/// outright. Both are there so delivery failures can be rehearsed.
#[derive(Clone, Default)]
pub struct RecordingNotificationSender {
    sent: Arc<Mutex<Vec<SendQuoteRequest>>>,
    mode: SenderMode,
}

impl RecordingNotificationSender {
    pub fn declining() -> Self {
        Self { mode: SenderMode::Decline, ..Self::default() }
    }

    pub fn unreachable() -> Self {
        Self { mode: SenderMode::Unreachable, ..Self::default() }
    }

    pub fn sent(&self) -> Vec<SendQuoteRequest> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl NotificationSender for RecordingNotificationSender {
    async fn send(&self, request: SendQuoteRequest) -> Result<SendOutcome, CollaboratorError> {
        match self.mode {
            SenderMode::Unreachable => {
                return Err(CollaboratorError::unavailable(
                    "notification sender",
                    "outbound mail relay is unreachable",
                ));
            }
            SenderMode::Decline => {
                return Ok(SendOutcome::failed(format!(
                    "recipient `{}` was refused",
                    request.recipient_email
                )));
            }
            SenderMode::Deliver => {}
        }

        let message_id = format!("msg-{}", Uuid::new_v4());
        info!(
            event_name = "delivery.email_recorded",
            quote_id = %request.quote_id,
            recipient = %request.recipient_email,
            message_id = %message_id,
            attach_rendering = request.attach_rendering,
            "quote email recorded"
        );

        match self.sent.lock() {
            Ok(mut sent) => sent.push(request),
            Err(poisoned) => poisoned.into_inner().push(request),
        }
        Ok(SendOutcome::delivered(message_id))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::collaborators::{CollaboratorError, NotificationSender, SendQuoteRequest};
    use crate::domain::client::{Client, ClientId};
    use crate::domain::quote::QuoteId;
    use crate::engine::QuoteEngine;

    use super::{default_email_message, RecordingNotificationSender};

    fn request() -> SendQuoteRequest {
        SendQuoteRequest {
            quote_id: QuoteId("quote-1".to_owned()),
            recipient_email: "sarah@techcorp.com".to_owned(),
            recipient_name: "Sarah Johnson".to_owned(),
            message: "Hi".to_owned(),
            attach_rendering: true,
        }
    }

    #[test]
    fn default_message_greets_client_and_states_validity() {
        let created = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().expect("valid date");
        let mut quote = QuoteEngine::default().create_quote_at(created);
        quote.client = Some(Client {
            id: ClientId("1".to_owned()),
            name: "Sarah Johnson".to_owned(),
            email: "sarah@techcorp.com".to_owned(),
            company: "TechCorp Solutions".to_owned(),
            phone: None,
            created_at: None,
            updated_at: None,
        });

        let message = default_email_message(&quote);
        assert!(message.starts_with("Hi Sarah Johnson,\n\n"));
        assert!(message.contains("This quote is valid until 3/31/2026."));
        assert!(message.ends_with("Best regards,\nYour Team"));
    }

    #[tokio::test]
    async fn recording_sender_keeps_requests_and_issues_message_ids() {
        let sender = RecordingNotificationSender::default();
        let outcome = sender.send(request()).await.expect("send");

        assert!(outcome.success);
        assert!(outcome.message_id.as_deref().is_some_and(|id| id.starts_with("msg-")));
        assert_eq!(sender.sent(), vec![request()]);
    }

    #[tokio::test]
    async fn failure_modes_do_not_record_anything() {
        let declining = RecordingNotificationSender::declining();
        let outcome = declining.send(request()).await.expect("declined, not errored");
        assert!(!outcome.success);
        assert!(outcome.error.is_some());
        assert!(declining.sent().is_empty());

        let unreachable = RecordingNotificationSender::unreachable();
        let error = unreachable.send(request()).await.expect_err("relay down");
        assert!(matches!(error, CollaboratorError::Unavailable { .. }));
    }
}
