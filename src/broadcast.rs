use serde::Serialize;
use tokio::sync::broadcast;

/// Channel key clients subscribe to for one event's raffle.
pub fn raffle_channel(event_id: &str) -> String {
    format!("raffle-{event_id}")
}

/// One published notification
#[derive(Clone, Debug, Serialize)]
pub struct Notice {
    pub channel: String,
    pub event: String,
    pub payload: serde_json::Value,
}

/// Fire-and-forget fan-out to real-time clients. At-most-once delivery;
/// publishing with no subscribers is not an error.
pub trait Broadcaster: Send + Sync {
    fn publish(&self, channel: &str, event: &str, payload: serde_json::Value);
}

/// In-process broadcaster over a tokio broadcast channel.
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<Notice>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn publish(&self, channel: &str, event: &str, payload: serde_json::Value) {
        let _ = self.tx.send(Notice {
            channel: channel.to_string(),
            event: event.to_string(),
            payload,
        });
    }
}
