//! Turning raw chat text into commands.
//!
//! Every chat type goes through the same tokenizer: an optional leading
//! `@botname` mention is dropped, then a `/command` (optionally suffixed with
//! `@botname`) is split off and the rest is split on whitespace.

/// A parsed slash command addressed to this bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

/// What an incoming text message means to the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Command(Command),
    /// A command explicitly addressed to a different bot.
    ForeignCommand,
    /// Anything that is not a slash command.
    Text(String),
}

/// Parse `text` for the bot called `bot_name` (no leading `@`).
pub fn parse(text: &str, bot_name: &str) -> Parsed {
    let trimmed = strip_mention(text.trim(), bot_name);

    let Some(rest) = trimmed.strip_prefix('/') else {
        return Parsed::Text(trimmed.to_string());
    };

    let mut tokens = rest.split_whitespace();
    let head = tokens.next().unwrap_or_default();

    let name = match head.split_once('@') {
        Some((name, target)) if target.eq_ignore_ascii_case(bot_name) => name,
        Some(_) => return Parsed::ForeignCommand,
        None => head,
    };

    if name.is_empty() {
        return Parsed::Text(trimmed.to_string());
    }

    Parsed::Command(Command {
        name: name.to_lowercase(),
        args: tokens.map(str::to_string).collect(),
    })
}

/// Drop a leading `@botname` mention, as sent in group chats.
fn strip_mention<'a>(text: &'a str, bot_name: &str) -> &'a str {
    let Some(after_at) = text.strip_prefix('@') else {
        return text;
    };

    let mention_len = after_at
        .find(char::is_whitespace)
        .unwrap_or(after_at.len());
    let mention = &after_at[..mention_len];

    if mention.eq_ignore_ascii_case(bot_name) {
        after_at[mention_len..].trim_start()
    } else {
        text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountError {
    /// Not a plain positive integer.
    Invalid,
    /// Larger than the configured maximum.
    TooMany,
}

/// Validate a frame count argument.
///
/// Accepts ASCII digits only with a non-zero value; leading zeros are fine
/// (`010` is 10) but `000` is zero and rejected.
pub fn parse_count(raw: &str, max: u32) -> Result<u32, CountError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CountError::Invalid);
    }

    let significant = raw.trim_start_matches('0');
    if significant.is_empty() {
        return Err(CountError::Invalid);
    }

    match significant.parse::<u32>() {
        Ok(n) if n <= max => Ok(n),
        // Only overflow can fail here, which is "too many" as well
        _ => Err(CountError::TooMany),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(name: &str, args: &[&str]) -> Parsed {
        Parsed::Command(Command {
            name: name.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn test_plain_command() {
        assert_eq!(parse("/frame query 3", "MockBot"), cmd("frame", &["query", "3"]));
        assert_eq!(parse("/help", "MockBot"), cmd("help", &[]));
        assert_eq!(parse("  /random   2  ", "MockBot"), cmd("random", &["2"]));
    }

    #[test]
    fn test_command_with_bot_suffix() {
        assert_eq!(parse("/frame@MockBot q", "MockBot"), cmd("frame", &["q"]));
        assert_eq!(parse("/frame@mockbot q", "MockBot"), cmd("frame", &["q"]));
        assert_eq!(parse("/frame@OtherBot q", "MockBot"), Parsed::ForeignCommand);
    }

    #[test]
    fn test_group_mention_prefix() {
        assert_eq!(parse("@MockBot /random 2", "MockBot"), cmd("random", &["2"]));
        assert_eq!(
            parse("@OtherBot /random 2", "MockBot"),
            Parsed::Text("@OtherBot /random 2".to_string())
        );
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(
            parse("hello there", "MockBot"),
            Parsed::Text("hello there".to_string())
        );
        assert_eq!(parse("/", "MockBot"), Parsed::Text("/".to_string()));
    }

    #[test]
    fn test_mention_stripped_from_plain_text() {
        assert_eq!(
            parse("@MockBot some subtitle", "MockBot"),
            Parsed::Text("some subtitle".to_string())
        );
        assert_eq!(
            parse("  @mockbot   some subtitle ", "MockBot"),
            Parsed::Text("some subtitle".to_string())
        );
        assert_eq!(parse("@MockBot", "MockBot"), Parsed::Text(String::new()));
    }

    #[test]
    fn test_parse_count_valid() {
        assert_eq!(parse_count("1", 10), Ok(1));
        assert_eq!(parse_count("10", 10), Ok(10));
        assert_eq!(parse_count("010", 10), Ok(10));
    }

    #[test]
    fn test_parse_count_invalid() {
        for raw in ["0", "000", "-1", "aaa", "", "1.5", "+3", "３"] {
            assert_eq!(parse_count(raw, 10), Err(CountError::Invalid), "{raw}");
        }
    }

    #[test]
    fn test_parse_count_too_many() {
        assert_eq!(parse_count("11", 10), Err(CountError::TooMany));
        assert_eq!(parse_count("100", 10), Err(CountError::TooMany));
        assert_eq!(
            parse_count("99999999999999999999", 10),
            Err(CountError::TooMany)
        );
    }
}
