//! Commands typed at the prompt.

use rpc::filter::FilterParseError;
use search_session::SearchFilters;

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Search(String),
    Filter(SearchFilters),
    More,
    Cancel,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command /{0}, try /help")]
    Unknown(String),

    #[error("/{0} takes no arguments")]
    UnexpectedArgument(&'static str),

    #[error("usage: /search FROM to TO")]
    MissingQuery,

    #[error(transparent)]
    Filter(#[from] FilterParseError),
}

pub const HELP: &str = "\
commands:
  TEXT | /search TEXT     start a new search, e.g. SFO to JFK
  /filter [KEY=VALUE...]  max-price=N airline=XX max-stops=N, no arguments clears
  /more                   load the next page
  /cancel                 stop polling, keep the results
  /quit";

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<UserCommand>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(UserCommand::Search(line.to_string())));
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    let no_args = |command: UserCommand, name: &'static str| {
        if args.is_empty() {
            Ok(command)
        } else {
            Err(CommandError::UnexpectedArgument(name))
        }
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "search" | "s" if args.is_empty() => return Err(CommandError::MissingQuery),
        "search" | "s" => UserCommand::Search(args.to_string()),
        "filter" | "f" => UserCommand::Filter(args.parse()?),
        "more" | "m" => no_args(UserCommand::More, "more")?,
        "cancel" | "c" => no_args(UserCommand::Cancel, "cancel")?,
        "help" | "h" | "?" => UserCommand::Help,
        "quit" | "q" | "exit" => UserCommand::Quit,
        _ => return Err(CommandError::Unknown(name.to_string())),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("SFO to JFK", UserCommand::Search("SFO to JFK".into()))]
    #[case("  /search  SEA to BOS ", UserCommand::Search("SEA to BOS".into()))]
    #[case("/more", UserCommand::More)]
    #[case("/M", UserCommand::More)]
    #[case("/cancel", UserCommand::Cancel)]
    #[case("/quit", UserCommand::Quit)]
    #[case("/exit", UserCommand::Quit)]
    #[case("/?", UserCommand::Help)]
    #[case("/filter", UserCommand::Filter(SearchFilters::default()))]
    fn test_parse(#[case] line: &str, #[case] expected: UserCommand) {
        assert_eq!(parse(line), Ok(Some(expected)));
    }

    #[test]
    fn test_parse_filter_arguments() {
        let expected = SearchFilters::default()
            .with_max_price(300)
            .with_airline("UA")
            .with_max_stops(1);
        assert_eq!(
            parse("/filter max-price=300 airline=ua max-stops=1"),
            Ok(Some(UserCommand::Filter(expected)))
        );
    }

    #[test]
    fn test_blank_line_is_ignored() {
        assert_eq!(parse("   "), Ok(None));
    }

    #[rstest]
    #[case("/book", CommandError::Unknown("book".into()))]
    #[case("/more 2", CommandError::UnexpectedArgument("more"))]
    #[case("/search", CommandError::MissingQuery)]
    fn test_parse_errors(#[case] line: &str, #[case] expected: CommandError) {
        assert_eq!(parse(line), Err(expected));
    }

    #[test]
    fn test_bad_filter_is_reported() {
        assert!(matches!(
            parse("/filter max-price=cheap"),
            Err(CommandError::Filter(_))
        ));
    }
}
