//! Replay script parser using nom
//!
//! Script format, one command per line:
//! ```text
//! # comment
//! put <key> <value>
//! get <key>
//! remove <key>
//! dump
//! ```
//!
//! Keys and values are `i64`. Keywords are case-insensitive, blank lines and
//! `#` comments are ignored, and a command may carry a trailing comment.

use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, digit1, one_of, space0, space1},
    combinator::{eof, map, map_res, opt, recognize, rest, value},
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};

/// The trace from the classic capacity-2 walkthrough
pub const CANONICAL: &str = "\
# capacity 2
put 1 1
put 2 2
get 1      # 1
put 3 3    # evicts 2
get 2      # not found
put 4 4    # evicts 1
get 1      # not found
get 3      # 3
get 4      # 4
";

/// A single cache operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Insert or update
    Put {
        /// Key to write
        key: i64,
        /// Value to store
        value: i64,
    },
    /// Lookup with promotion
    Get {
        /// Key to read
        key: i64,
    },
    /// Explicit deletion
    Remove {
        /// Key to delete
        key: i64,
    },
    /// Snapshot of the recency order
    Dump,
}

/// A command together with its 1-based source line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Line number in the script
    pub line: usize,
    /// Parsed command
    pub command: Command,
}

/// A script line that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    /// Line number in the script
    pub line: usize,
    /// The offending line, trimmed
    pub text: String,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parse error on line {}: {:?}", self.line, self.text)
    }
}

impl std::error::Error for ScriptError {}

fn integer(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| {
        s.parse::<i64>()
    })(input)
}

fn command(input: &str) -> IResult<&str, Command> {
    alt((
        map(
            tuple((tag_no_case("put"), space1, integer, space1, integer)),
            |(_, _, key, _, value)| Command::Put { key, value },
        ),
        map(preceded(pair(tag_no_case("get"), space1), integer), |key| {
            Command::Get { key }
        }),
        map(preceded(pair(tag_no_case("remove"), space1), integer), |key| {
            Command::Remove { key }
        }),
        value(Command::Dump, tag_no_case("dump")),
    ))(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    preceded(char('#'), rest)(input)
}

/// Parse one script line; `None` for blank and comment-only lines
pub fn parse_line(input: &str) -> IResult<&str, Option<Command>> {
    terminated(
        preceded(space0, opt(terminated(command, space0))),
        pair(opt(comment), eof),
    )(input)
}

/// Parse a whole script, yielding one item per command or malformed line
pub fn parse_script(source: &str) -> impl Iterator<Item = Result<Step, ScriptError>> + '_ {
    source.lines().enumerate().filter_map(|(idx, raw)| {
        let line = idx + 1;
        match parse_line(raw) {
            Ok((_, Some(command))) => Some(Ok(Step { line, command })),
            Ok((_, None)) => None,
            Err(_) => Some(Err(ScriptError {
                line,
                text: raw.trim().to_string(),
            })),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(line: &str) -> Option<Command> {
        parse_line(line).unwrap().1
    }

    #[test]
    fn test_parse_put() {
        assert_eq!(parsed("put 1 2"), Some(Command::Put { key: 1, value: 2 }));
        assert_eq!(
            parsed("  PUT\t-5   +7  "),
            Some(Command::Put { key: -5, value: 7 })
        );
    }

    #[test]
    fn test_parse_get_remove_dump() {
        assert_eq!(parsed("get 3"), Some(Command::Get { key: 3 }));
        assert_eq!(parsed("Remove 9"), Some(Command::Remove { key: 9 }));
        assert_eq!(parsed("dump"), Some(Command::Dump));
    }

    #[test]
    fn test_blank_and_comment_lines() {
        assert_eq!(parsed(""), None);
        assert_eq!(parsed("   "), None);
        assert_eq!(parsed("# just a note"), None);
        assert_eq!(parsed("get 1 # trailing"), Some(Command::Get { key: 1 }));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(parse_line("put 1").is_err());
        assert!(parse_line("put 1 2 3").is_err());
        assert!(parse_line("getx 1").is_err());
        assert!(parse_line("get one").is_err());
        assert!(parse_line("dumpster").is_err());
        assert!(parse_line("get 99999999999999999999").is_err());
    }

    #[test]
    fn test_parse_script_line_numbers() {
        let source = "# header\nput 1 1\n\nbogus\nget 1\n";
        let items: Vec<_> = parse_script(source).collect();

        assert_eq!(
            items,
            vec![
                Ok(Step {
                    line: 2,
                    command: Command::Put { key: 1, value: 1 }
                }),
                Err(ScriptError {
                    line: 4,
                    text: "bogus".to_string()
                }),
                Ok(Step {
                    line: 5,
                    command: Command::Get { key: 1 }
                }),
            ]
        );
    }

    #[test]
    fn test_canonical_parses_cleanly() {
        let steps: Vec<_> = parse_script(CANONICAL).collect();
        assert_eq!(steps.len(), 9);
        assert!(steps.iter().all(|s| s.is_ok()));
    }

    #[test]
    fn test_error_display() {
        let err = ScriptError {
            line: 3,
            text: "nope".to_string(),
        };
        assert_eq!(err.to_string(), "Parse error on line 3: \"nope\"");
    }
}
