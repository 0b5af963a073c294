//! Classification of lines read at the prompt.
//!
//! A line is either the request to leave or a message for the model. There
//! are no other commands.

/// What a line read at the prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// End the session.
    Exit,

    /// Send this text to the model.
    Message(String),
}

/// The word that ends the session, in any letter casing.
pub const EXIT_COMMAND: &str = "exit";

/// Classifies one line of user input.
///
/// End of input, an empty line and `exit` in any casing all mean
/// [`UserInput::Exit`]. Anything else, including whitespace, is a message
/// sent verbatim.
///
/// # Examples
///
/// ```
/// # use consoleai::chat::{UserInput, classify_input};
/// assert_eq!(classify_input(None), UserInput::Exit);
/// assert_eq!(classify_input(Some("EXIT")), UserInput::Exit);
/// assert_eq!(
///     classify_input(Some("Hello")),
///     UserInput::Message("Hello".to_string())
/// );
/// ```
pub fn classify_input(line: Option<&str>) -> UserInput {
    match line {
        None => UserInput::Exit,
        Some(line) => {
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() || line.eq_ignore_ascii_case(EXIT_COMMAND) {
                UserInput::Exit
            } else {
                UserInput::Message(line.to_string())
            }
        }
    }
}
