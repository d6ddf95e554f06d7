//! Parsing of subscription definition and edit lines.
//!
//! ```text
//! <title> <feedUrl> [-c <command>] [-inf <grp|grp>] [-exf <grp|grp>] [-stv <true|false>]
//! <title> [-c <command>|none] [-inf <grp|grp>|none] [-exf <grp|grp>|none] [-stv <true|false>]
//! ```
//!
//! An option value runs until the next known option, so commands may carry
//! their own flags (`-c mirror -up remote:tv`).

use crate::error::{SubscriptionError, SubscriptionResult};
use crate::models::{KeywordGroups, SubscriptionPatch};
use crate::template::CommandTemplate;

const OPTIONS: [&str; 4] = ["-c", "-inf", "-exf", "-stv"];

/// A parsed subscribe line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionDefinition {
    pub title: String,
    pub feed_url: String,
    pub command: Option<CommandTemplate>,
    pub include: KeywordGroups,
    pub exclude: KeywordGroups,
    pub sensitive: bool,
}

/// A parsed edit line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDefinition {
    pub title: String,
    pub patch: SubscriptionPatch,
}

#[derive(Debug, Default)]
struct Options {
    command: Option<String>,
    include: Option<String>,
    exclude: Option<String>,
    sensitive: Option<String>,
}

fn parse_options(args: &[&str]) -> Options {
    let mut options = Options::default();
    let mut i = 0;

    while i < args.len() {
        let key = args[i];
        if !OPTIONS.contains(&key) {
            i += 1;
            continue;
        }

        let start = i + 1;
        let mut end = start;
        while end < args.len() && !OPTIONS.contains(&args[end]) {
            end += 1;
        }
        let value = args[start..end].join(" ");

        match key {
            "-c" => options.command = Some(value),
            "-inf" => options.include = Some(value),
            "-exf" => options.exclude = Some(value),
            "-stv" => options.sensitive = Some(value),
            _ => {}
        }
        i = end;
    }

    options
}

fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn is_none(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("none")
}

/// Parse one subscribe line.
pub fn parse_definition(line: &str) -> SubscriptionResult<SubscriptionDefinition> {
    let args: Vec<&str> = line.split_whitespace().collect();
    if args.len() < 2 {
        return Err(SubscriptionError::InvalidDefinition(format!(
            "{}: expected <title> <feedUrl> [options]",
            line.trim()
        )));
    }

    let title = args[0];
    let feed_url = args[1];
    if OPTIONS.contains(&title) || OPTIONS.contains(&feed_url) {
        return Err(SubscriptionError::InvalidDefinition(format!(
            "{}: title and feed url must come before options",
            line.trim()
        )));
    }

    let options = parse_options(&args[2..]);

    Ok(SubscriptionDefinition {
        title: title.to_string(),
        feed_url: feed_url.to_string(),
        command: options.command.as_deref().and_then(CommandTemplate::parse),
        include: options
            .include
            .as_deref()
            .map(KeywordGroups::parse)
            .unwrap_or_default(),
        exclude: options
            .exclude
            .as_deref()
            .map(KeywordGroups::parse)
            .unwrap_or_default(),
        sensitive: options.sensitive.as_deref().is_some_and(parse_flag),
    })
}

/// Parse one edit line. Only options present in the line change; `none`
/// clears the command or a filter list.
pub fn parse_edit(line: &str) -> SubscriptionResult<EditDefinition> {
    let args: Vec<&str> = line.split_whitespace().collect();
    if args.len() < 2 || OPTIONS.contains(&args[0]) {
        return Err(SubscriptionError::InvalidDefinition(format!(
            "{}: expected <title> [options]",
            line.trim()
        )));
    }

    let options = parse_options(&args[1..]);
    let groups = |value: String| {
        if is_none(&value) {
            KeywordGroups::default()
        } else {
            KeywordGroups::parse(&value)
        }
    };

    let patch = SubscriptionPatch {
        command: options.command.map(|value| {
            if is_none(&value) {
                None
            } else {
                CommandTemplate::parse(&value)
            }
        }),
        include: options.include.map(groups),
        exclude: options.exclude.map(groups),
        sensitive: options.sensitive.as_deref().map(parse_flag),
    };

    if patch.is_empty() {
        return Err(SubscriptionError::InvalidDefinition(format!(
            "{}: nothing to edit",
            line.trim()
        )));
    }

    Ok(EditDefinition {
        title: args[0].to_string(),
        patch,
    })
}
