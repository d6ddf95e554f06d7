use serde::{Deserialize, Serialize};

/// 通知配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub telegram: TelegramConfig,
}

impl NotificationConfig {
    /// Whether a delivery target is fully configured
    pub fn is_ready(&self) -> bool {
        self.enabled
            && self.telegram.enabled
            && !self.telegram.bot_token.is_empty()
            && !self.telegram.chat_id.is_empty()
    }
}

/// Telegram 配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: String,
    pub chat_id: String,
}
