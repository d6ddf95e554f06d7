use tokio::sync::mpsc;

use crate::actor::Message;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification service unavailable")]
    ServiceUnavailable,

    #[error("No notification target configured")]
    NotConfigured,
}

/// 通知服务句柄（对外接口）
#[derive(Clone)]
pub struct NotificationHandle {
    sender: Option<mpsc::Sender<Message>>,
}

impl NotificationHandle {
    pub(crate) fn new(sender: mpsc::Sender<Message>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Handle without a delivery target; every send fails.
    pub(crate) fn unconfigured() -> Self {
        Self { sender: None }
    }

    /// Whether a notifier was built and messages can be delivered
    pub fn is_ready(&self) -> bool {
        self.sender.is_some()
    }

    /// Queue an HTML message for delivery.
    ///
    /// Returns once the message is queued; messages queued from one task
    /// are delivered in order.
    pub async fn send(&self, text: impl Into<String>) -> Result<(), NotifyError> {
        let sender = self.sender.as_ref().ok_or(NotifyError::NotConfigured)?;
        sender
            .send(Message::Send {
                text: text.into(),
                parse_mode: crate::HTML,
            })
            .await
            .map_err(|_| NotifyError::ServiceUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use anyhow::Result;
    use async_trait::async_trait;

    use super::NotifyError;
    use crate::{
        create_notification_service, create_notification_service_with, NotificationConfig,
        Notifier, TelegramConfig,
    };

    struct Recording {
        sent: Arc<Mutex<Vec<(String, String)>>>,
        fail_formatted: bool,
    }

    #[async_trait]
    impl Notifier for Recording {
        async fn send_message(&self, text: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((text.to_string(), "plain".to_string()));
            Ok(())
        }

        async fn send_formatted_message(&self, text: &str, parse_mode: &str) -> Result<()> {
            if self.fail_formatted {
                anyhow::bail!("bad markup");
            }
            self.sent
                .lock()
                .unwrap()
                .push((text.to_string(), parse_mode.to_string()));
            Ok(())
        }
    }

    async fn drain() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_messages_delivered_in_order() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let handle = create_notification_service_with(Box::new(Recording {
            sent: Arc::clone(&sent),
            fail_formatted: false,
        }));

        handle.send("first").await.unwrap();
        handle.send("second").await.unwrap();
        drain().await;

        let sent = sent.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![
                ("first".to_string(), "HTML".to_string()),
                ("second".to_string(), "HTML".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_plain_text() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let handle = create_notification_service_with(Box::new(Recording {
            sent: Arc::clone(&sent),
            fail_formatted: true,
        }));

        handle.send("<b>broken").await.unwrap();
        drain().await;

        let sent = sent.lock().unwrap().clone();
        assert_eq!(sent, vec![("<b>broken".to_string(), "plain".to_string())]);
    }

    fn telegram_config(chat_id: &str) -> NotificationConfig {
        NotificationConfig {
            enabled: true,
            telegram: TelegramConfig {
                enabled: true,
                bot_token: "123:abc".to_string(),
                chat_id: chat_id.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_unconfigured_send_fails() {
        let handle =
            create_notification_service(NotificationConfig::default(), reqwest::Client::new());

        assert!(!handle.is_ready());
        assert!(matches!(
            handle.send("lost").await,
            Err(NotifyError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_unusable_target_is_not_ready() {
        let handle =
            create_notification_service(telegram_config("not-a-chat"), reqwest::Client::new());

        assert!(!handle.is_ready());
        assert!(handle.send("lost").await.is_err());
    }

    #[tokio::test]
    async fn test_channel_username_target_is_ready() {
        let handle =
            create_notification_service(telegram_config("@my_channel"), reqwest::Client::new());

        assert!(handle.is_ready());
    }
}
