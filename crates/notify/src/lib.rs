use anyhow::Result;
use async_trait::async_trait;

mod actor;
mod config;
mod handle;
pub mod telegram;

pub use config::{NotificationConfig, TelegramConfig};
pub use handle::{NotificationHandle, NotifyError};
pub use telegram::TelegramNotifier;

/// Parse mode used for feed messages
pub const HTML: &str = "HTML";

/// 通知系统核心 trait
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 发送文本消息
    async fn send_message(&self, text: &str) -> Result<()>;

    /// 发送带格式的消息（Markdown/HTML等）
    async fn send_formatted_message(&self, text: &str, parse_mode: &str) -> Result<()>;
}

/// Start the notification actor with a notifier built from `config`.
///
/// When `config` is incomplete or the notifier cannot be built, the returned
/// handle is not ready and every send fails.
pub fn create_notification_service(
    config: NotificationConfig,
    client: reqwest::Client,
) -> NotificationHandle {
    match create_notifier(&config, client) {
        Some(notifier) => create_notification_service_with(notifier),
        None => NotificationHandle::unconfigured(),
    }
}

/// Start the notification actor around an existing notifier.
pub fn create_notification_service_with(notifier: Box<dyn Notifier>) -> NotificationHandle {
    let (sender, receiver) = tokio::sync::mpsc::channel(256);
    let actor = actor::NotificationActor::new(notifier, receiver);
    tokio::spawn(actor.run());
    NotificationHandle::new(sender)
}

fn create_notifier(config: &NotificationConfig, client: reqwest::Client) -> Option<Box<dyn Notifier>> {
    if !config.is_ready() {
        return None;
    }

    match TelegramNotifier::new_with_client(
        client,
        &config.telegram.bot_token,
        &config.telegram.chat_id,
    ) {
        Ok(notifier) => Some(Box::new(notifier)),
        Err(e) => {
            tracing::error!("Failed to create Telegram notifier: {}", e);
            None
        }
    }
}
