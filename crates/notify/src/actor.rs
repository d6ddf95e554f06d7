use tokio::sync::mpsc;
use tracing::{error, info};

use crate::Notifier;

/// 内部消息类型
pub(crate) enum Message {
    Send {
        text: String,
        parse_mode: &'static str,
    },
}

/// 通知 Actor
///
/// Delivers messages one at a time, in the order they were queued.
pub(crate) struct NotificationActor {
    notifier: Box<dyn Notifier>,
    receiver: mpsc::Receiver<Message>,
}

impl NotificationActor {
    pub fn new(notifier: Box<dyn Notifier>, receiver: mpsc::Receiver<Message>) -> Self {
        Self { notifier, receiver }
    }

    pub async fn run(mut self) {
        info!("Notification actor started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                Message::Send { text, parse_mode } => {
                    self.handle_send(&text, parse_mode).await;
                }
            }
        }

        info!("Notification actor stopped");
    }

    async fn handle_send(&self, text: &str, parse_mode: &str) {
        if let Err(e) = self.notifier.send_formatted_message(text, parse_mode).await {
            error!("Failed to send notification: {}", e);
            // Fallback to plain text
            if let Err(e2) = self.notifier.send_message(text).await {
                error!("Failed to send fallback text: {}", e2);
            }
        }
    }
}
