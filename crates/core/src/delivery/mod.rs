//! Adapters that get a finished quote to the client: an outbox-style email
//! sender and an HTML document renderer.

pub mod document;
pub mod email;

use thiserror::Error;

use crate::collaborators::CollaboratorError;

pub use document::{register_template_filters, HtmlDocumentRenderer};
pub use email::{default_email_message, RecordingNotificationSender};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("template error: {0}")]
    Template(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tera::Error> for DeliveryError {
    fn from(value: tera::Error) -> Self {
        Self::Template(value.to_string())
    }
}

impl From<DeliveryError> for CollaboratorError {
    fn from(value: DeliveryError) -> Self {
        match value {
            DeliveryError::Template(message) => {
                CollaboratorError::rejected("document renderer", message)
            }
            DeliveryError::Io(error) => CollaboratorError::unavailable("document renderer", error),
        }
    }
}
