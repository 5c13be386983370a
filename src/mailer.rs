use serde::Serialize;
use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::RaffleError;

/// Which outcome template to render
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateKind {
    /// Slot confirmed within the quota
    EventSignup,
    /// Ranked past capacity, placed in the queue
    EventQueue,
}

/// Template substitution data
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MessageData {
    pub event_name: String,
    /// Link back to the participant's signup-management page
    pub edit_url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recipient {
    pub display_name: String,
    pub address: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SendReceipt {
    pub message_id: String,
}

/// Renders a template and hands it to the delivery backend.
pub trait Mailer: Send + Sync {
    fn render_and_send(
        &self,
        kind: TemplateKind,
        data: &MessageData,
        to: &Recipient,
    ) -> Result<SendReceipt, RaffleError>;
}

/// One message captured by [`RecordingMailer`]
#[derive(Clone, Debug, PartialEq)]
pub struct SentMessage {
    pub kind: TemplateKind,
    pub data: MessageData,
    pub to: Recipient,
}

/// Test double that records every send and can be told to fail for
/// specific addresses.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMessage>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send to `address` fail.
    pub fn fail_for(&self, address: &str) {
        self.failing
            .lock()
            .expect("mailer lock poisoned")
            .insert(address.to_string());
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("mailer lock poisoned").clone()
    }
}

impl Mailer for RecordingMailer {
    fn render_and_send(
        &self,
        kind: TemplateKind,
        data: &MessageData,
        to: &Recipient,
    ) -> Result<SendReceipt, RaffleError> {
        if self
            .failing
            .lock()
            .expect("mailer lock poisoned")
            .contains(&to.address)
        {
            return Err(RaffleError::Mail {
                address: to.address.clone(),
                reason: "injected delivery failure".into(),
            });
        }
        let mut sent = self.sent.lock().expect("mailer lock poisoned");
        let message_id = format!("msg-{}", sent.len());
        sent.push(SentMessage {
            kind,
            data: data.clone(),
            to: to.clone(),
        });
        Ok(SendReceipt { message_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_mailer_captures_and_fails_on_demand() {
        let mailer = RecordingMailer::new();
        mailer.fail_for("down@example.com");

        let data = MessageData {
            event_name: "Meetup".into(),
            edit_url: "https://example.com/s1".into(),
        };
        let ok = Recipient {
            display_name: "A".into(),
            address: "a@example.com".into(),
        };
        let down = Recipient {
            display_name: "B".into(),
            address: "down@example.com".into(),
        };

        assert!(mailer.render_and_send(TemplateKind::EventSignup, &data, &ok).is_ok());
        assert!(matches!(
            mailer.render_and_send(TemplateKind::EventQueue, &data, &down),
            Err(RaffleError::Mail { .. })
        ));
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to.address, "a@example.com");
    }
}
