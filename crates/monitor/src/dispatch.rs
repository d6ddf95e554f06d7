use async_trait::async_trait;
use notify::NotificationHandle;
use rss::FeedEntry;

use crate::error::DispatchError;
use crate::models::Subscription;
use crate::template::CommandRouting;

/// Sink for messages produced by a poll. The routing target is part of the
/// sink's own configuration.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, message: String) -> Result<(), DispatchError>;
}

#[async_trait]
impl Dispatcher for NotificationHandle {
    async fn dispatch(&self, message: String) -> Result<(), DispatchError> {
        self.send(message).await?;
        Ok(())
    }
}

/// Build the message for a new entry: the rendered command when the
/// subscription has one, a name/link notification otherwise. Both end with
/// the subscription tag and owner.
pub fn format_message(
    subscription: &Subscription,
    entry: &FeedEntry,
    routing: &CommandRouting,
) -> String {
    let link = entry.effective_link();

    let mut message = match &subscription.command {
        Some(command) => routing.address(&command.render(link)),
        None => format!(
            "<b>Name: </b><code>{}</code>\n\n<b>Link: </b><code>{}</code>",
            strip_markup(&entry.title),
            link
        ),
    };

    message.push_str(&format!(
        "\n<b>Tag: </b><code>{}</code> <code>{}</code>",
        subscription.tag, subscription.owner
    ));
    message
}

fn strip_markup(title: &str) -> String {
    title.replace(['<', '>'], "")
}
