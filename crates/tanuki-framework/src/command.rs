//! Command classification and splitting.
//!
//! A message body is a command when it starts with the configured literal
//! prefix (e.g. `!`) or with a *rich prefix*: a run of one or more characters
//! that are neither alphanumeric nor whitespace (`?!`, `🏓`, `>>`).
//!
//! ```rust
//! use tanuki_framework::command::{extract_command, is_command};
//!
//! assert!(is_command("!ping 1 2", "!"));
//! assert_eq!(
//!     extract_command("!Ping 1 2", "!"),
//!     ("ping".to_string(), vec!["1".to_string(), "2".to_string()]),
//! );
//! ```
//!
//! All functions here are pure: the result depends only on the body and the
//! prefix passed in.

/// A classified command: lower-cased verb plus arguments in original case.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedCommand {
    /// Lower-cased first token after the prefix. May be empty.
    pub verb: String,
    /// Remaining whitespace-separated tokens, verbatim.
    pub args: Vec<String>,
}

impl ParsedCommand {
    /// Returns `true` when nothing followed the prefix.
    ///
    /// An empty verb never resolves to a plugin.
    pub fn is_empty(&self) -> bool {
        self.verb.is_empty()
    }
}

/// Returns `true` if `body` starts with the literal `prefix`.
///
/// An empty prefix matches every body.
pub fn has_prefix(body: &str, prefix: &str) -> bool {
    body.starts_with(prefix)
}

/// Returns the leading symbol run of `body`, if any.
///
/// The run is measured in characters, so multi-byte symbols and emoji
/// sequences are returned whole.
pub fn has_rich_prefix(body: &str) -> Option<&str> {
    let end = body
        .char_indices()
        .find(|&(_, ch)| ch.is_alphanumeric() || ch.is_whitespace())
        .map_or(body.len(), |(idx, _)| idx);
    (end > 0).then(|| &body[..end])
}

/// Returns `true` if `body` is a command under `prefix`.
pub fn is_command(body: &str, prefix: &str) -> bool {
    has_prefix(body, prefix) || has_rich_prefix(body).is_some()
}

/// Strips the prefix from `body` and splits the remainder into
/// `(verb, args)`.
///
/// The literal prefix wins over a rich prefix when both match. When no prefix
/// matches the whole body is split. An empty remainder yields an empty verb
/// and no arguments.
pub fn extract_command(body: &str, prefix: &str) -> (String, Vec<String>) {
    let rest = if has_prefix(body, prefix) {
        &body[prefix.len()..]
    } else if let Some(rich) = has_rich_prefix(body) {
        &body[rich.len()..]
    } else {
        body
    };

    let mut tokens = rest.split_whitespace();
    match tokens.next() {
        Some(verb) => (verb.to_lowercase(), tokens.map(str::to_string).collect()),
        None => (String::new(), Vec::new()),
    }
}

/// Classifies and splits `body` in one step.
///
/// Returns `None` when `body` is not a command.
pub fn parse(body: &str, prefix: &str) -> Option<ParsedCommand> {
    if !is_command(body, prefix) {
        return None;
    }
    let (verb, args) = extract_command(body, prefix);
    Some(ParsedCommand { verb, args })
}
