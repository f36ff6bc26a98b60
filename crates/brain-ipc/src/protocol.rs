//! Session protocol definitions.
//!
//! A session is one command. The client writes a single command line
//! terminated by `\n`, then the optional input payload, then closes its
//! write half. The daemon answers with plain text and closes the
//! connection.
//!
//! Responses are a single line starting with [`OK_PREFIX`] or
//! [`ERROR_PREFIX`], except for `LIST` (one path per line) and a
//! successful `EDIT` (the raw document).

use crate::IpcError;
use std::fmt;

/// Maximum command line length (4KB)
pub const MAX_COMMAND_LINE: usize = 4 * 1024;

/// Prefix of a successful response line
pub const OK_PREFIX: &str = "OK:";

/// Prefix of a failed response line
pub const ERROR_PREFIX: &str = "ERROR:";

/// Commands understood by the brain daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Create or overwrite a document with the session input
    New,
    /// List every document path
    List,
    /// Fetch a document's raw source
    Edit,
    /// Move a document without overwriting the destination
    Move,
    /// Delete a document
    Delete,
}

impl Verb {
    /// Parse a verb token, ignoring ASCII case.
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "NEW" => Some(Verb::New),
            "LIST" => Some(Verb::List),
            "EDIT" => Some(Verb::Edit),
            "MOVE" => Some(Verb::Move),
            "DELETE" => Some(Verb::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::New => "NEW",
            Verb::List => "LIST",
            Verb::Edit => "EDIT",
            Verb::Move => "MOVE",
            Verb::Delete => "DELETE",
        }
    }

    /// Number of positional arguments the verb takes.
    pub fn arity(&self) -> usize {
        match self {
            Verb::List => 0,
            Verb::New | Verb::Edit | Verb::Delete => 1,
            Verb::Move => 2,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split a command line into whitespace-delimited tokens.
pub fn parse_command(line: &str) -> Result<Vec<String>, IpcError> {
    let tokens: Vec<String> = line.split_ascii_whitespace().map(String::from).collect();
    if tokens.is_empty() {
        return Err(IpcError::EmptyCommand);
    }
    Ok(tokens)
}

/// Build a command line from a verb and its arguments.
pub fn format_command(verb: Verb, args: &[&str]) -> Result<String, IpcError> {
    let mut line = String::from(verb.as_str());
    for arg in args {
        if arg.is_empty() || arg.chars().any(|c| c.is_ascii_whitespace()) {
            return Err(IpcError::InvalidArgument(arg.to_string()));
        }
        line.push(' ');
        line.push_str(arg);
    }
    line.push('\n');

    if line.len() > MAX_COMMAND_LINE {
        return Err(IpcError::CommandTooLong);
    }
    Ok(line)
}

/// Format a success line.
pub fn ok_line(message: impl fmt::Display) -> String {
    format!("{} {}\n", OK_PREFIX, message)
}

/// Format an error line.
pub fn error_line(cause: impl fmt::Display) -> String {
    format!("{} {}\n", ERROR_PREFIX, cause)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_parse_ignores_case() {
        assert_eq!(Verb::parse("NEW"), Some(Verb::New));
        assert_eq!(Verb::parse("move"), Some(Verb::Move));
        assert_eq!(Verb::parse("Delete"), Some(Verb::Delete));
        assert_eq!(Verb::parse("PING"), None);
    }

    #[test]
    fn test_parse_command_tokens() {
        let tokens = parse_command("MOVE  notes/a.md\tnotes/b.md\n").unwrap();
        assert_eq!(tokens, vec!["MOVE", "notes/a.md", "notes/b.md"]);
    }

    #[test]
    fn test_parse_command_empty() {
        assert!(matches!(parse_command("  \n"), Err(IpcError::EmptyCommand)));
    }

    #[test]
    fn test_format_command() {
        let line = format_command(Verb::Move, &["a.md", "b.md"]).unwrap();
        assert_eq!(line, "MOVE a.md b.md\n");
        assert_eq!(format_command(Verb::List, &[]).unwrap(), "LIST\n");
    }

    #[test]
    fn test_format_command_rejects_spaces() {
        assert!(matches!(
            format_command(Verb::New, &["my notes.md"]),
            Err(IpcError::InvalidArgument(_))
        ));
        assert!(format_command(Verb::New, &[""]).is_err());
    }

    #[test]
    fn test_response_lines() {
        assert_eq!(ok_line("saved a.md"), "OK: saved a.md\n");
        assert_eq!(error_line("a.md does not exist"), "ERROR: a.md does not exist\n");
    }

    #[test]
    fn test_verb_arity() {
        assert_eq!(Verb::List.arity(), 0);
        assert_eq!(Verb::Edit.arity(), 1);
        assert_eq!(Verb::Move.arity(), 2);
    }
}
