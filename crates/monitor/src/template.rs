use std::fmt;

use serde::{Deserialize, Serialize};

/// Command dispatched for each new entry.
///
/// The entry link is substituted right after the first token:
/// `mirror -up remote:dir` renders as `mirror <link> -up remote:dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommandTemplate {
    program: String,
    args: Option<String>,
}

impl CommandTemplate {
    /// Returns `None` for a blank command.
    pub fn parse(command: &str) -> Option<Self> {
        let command = command.trim();
        let (program, args) = match command.split_once(char::is_whitespace) {
            Some((program, args)) => (program, Some(args.trim())),
            None => (command, None),
        };

        if program.is_empty() {
            return None;
        }

        Some(Self {
            program: program.to_string(),
            args: args.filter(|a| !a.is_empty()).map(str::to_string),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> Option<&str> {
        self.args.as_deref()
    }

    /// Substitute `link` into the template.
    pub fn render(&self, link: &str) -> String {
        match &self.args {
            Some(args) => format!("{} {} {}", self.program, link, args),
            None => format!("{} {}", self.program, link),
        }
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.args {
            Some(args) => write!(f, "{} {}", self.program, args),
            None => write!(f, "{}", self.program),
        }
    }
}

impl TryFrom<String> for CommandTemplate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| "empty command".to_string())
    }
}

impl From<CommandTemplate> for String {
    fn from(value: CommandTemplate) -> Self {
        value.to_string()
    }
}

/// How rendered commands are addressed in the dispatch target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CommandRouting {
    /// `/command ...`
    #[default]
    Slash,
    /// `@bot/command ...`, for targets shared with other bots.
    /// Commands already addressed with `@` are left alone.
    Mention(String),
}

impl CommandRouting {
    pub fn address(&self, rendered: &str) -> String {
        let command = rendered.trim_start_matches('/');
        match self {
            CommandRouting::Slash => format!("/{}", command),
            CommandRouting::Mention(_) if command.starts_with('@') => command.to_string(),
            CommandRouting::Mention(bot) => format!("@{}/{}", bot, command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_inserted_after_first_token() {
        let template = CommandTemplate::parse("/mirror -up remote:tv -z").unwrap();
        assert_eq!(
            template.render("https://example.com/a.torrent"),
            "/mirror https://example.com/a.torrent -up remote:tv -z"
        );
    }

    #[test]
    fn test_single_token_command() {
        let template = CommandTemplate::parse("leech").unwrap();
        assert_eq!(template.args(), None);
        assert_eq!(template.render("magnet:?xt=1"), "leech magnet:?xt=1");
    }

    #[test]
    fn test_blank_command_is_none() {
        assert!(CommandTemplate::parse("   ").is_none());
    }

    #[test]
    fn test_serde_round_trips_as_string() {
        let template = CommandTemplate::parse("mirror  -up  remote").unwrap();
        let json = serde_json::to_string(&template).unwrap();
        assert_eq!(json, "\"mirror -up  remote\"");
        let back: CommandTemplate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, template);
    }

    #[test]
    fn test_slash_routing() {
        let routing = CommandRouting::Slash;
        assert_eq!(routing.address("/mirror link"), "/mirror link");
        assert_eq!(routing.address("mirror link"), "/mirror link");
    }

    #[test]
    fn test_mention_routing() {
        let routing = CommandRouting::Mention("mirrorbot".to_string());
        assert_eq!(routing.address("/mirror link"), "@mirrorbot/mirror link");
        assert_eq!(routing.address("@otherbot/leech link"), "@otherbot/leech link");
    }
}
