use super::Notifier;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, Recipient};

/// Telegram 通知实现
pub struct TelegramNotifier {
    bot: Bot,
    recipient: Recipient,
}

impl TelegramNotifier {
    /// `chat_id` is a numeric chat id or a public `@channel` username.
    pub fn new_with_client(client: Client, api_key: &str, chat_id: &str) -> Result<Self> {
        Ok(Self {
            bot: Bot::with_client(api_key, client),
            recipient: parse_recipient(chat_id)?,
        })
    }
}

fn parse_recipient(chat_id: &str) -> Result<Recipient> {
    let chat_id = chat_id.trim();
    match chat_id.strip_prefix('@') {
        Some(name) if !name.is_empty() => Ok(Recipient::ChannelUsername(chat_id.to_string())),
        Some(_) => anyhow::bail!("Empty channel username"),
        None => chat_id
            .parse()
            .map(|id| Recipient::Id(ChatId(id)))
            .map_err(|_| anyhow::anyhow!("Invalid chat id: {}", chat_id)),
    }
}

fn parse_mode(mode: &str) -> Result<ParseMode> {
    mode.parse()
        .map_err(|_| anyhow::anyhow!("Unsupported parse mode: {}", mode))
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> Result<()> {
        self.bot
            .send_message(self.recipient.clone(), text)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("Telegram send failed: {}", e))
    }

    async fn send_formatted_message(&self, text: &str, mode: &str) -> Result<()> {
        self.bot
            .send_message(self.recipient.clone(), text)
            .parse_mode(parse_mode(mode)?)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("Telegram send failed: {}", e))
    }
}
