//! Typed command parsing for the terminal client.

use crate::profile::parse_invite;
use thiserror::Error;

/// Input the client rejects before anything is sent or changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Please enter a name")]
    EmptyName,
    #[error("Please enter a game id or invite link")]
    MissingGameId,
    #[error("Please select a player to guess")]
    MissingTarget,
    #[error("You cannot guess yourself")]
    SelfGuess,
    #[error("There is no player {0:?} in this game")]
    UnknownPlayer(String),
    #[error("Only the Sipahi can make a guess")]
    NotSipahi,
    #[error("This round is already over")]
    RoundOver,
    #[error("The game has not started")]
    NotPlaying,
    #[error("Unknown command {0:?}; type `help` for the list")]
    UnknownCommand(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Set the display name.
    Name(String),
    Create,
    /// Join by game id (already extracted from an invite link).
    Join(String),
    Start,
    /// Accuse a player, by list number, id or name.
    Guess(String),
    /// Move on to the next round without waiting.
    Next,
    Status,
    Retry,
    Offline,
    Reset,
    Rules,
    Help,
    Quit,
}

/// Parses one input line. Blank lines are `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "name" => {
            if rest.is_empty() {
                return Err(InputError::EmptyName);
            }
            Command::Name(rest.to_string())
        }
        "create" | "new" => Command::Create,
        "join" => Command::Join(parse_invite(rest).ok_or(InputError::MissingGameId)?),
        "start" => Command::Start,
        "guess" | "accuse" => {
            if rest.is_empty() {
                return Err(InputError::MissingTarget);
            }
            Command::Guess(rest.to_string())
        }
        "next" => Command::Next,
        "status" => Command::Status,
        "retry" | "reconnect" => Command::Retry,
        "offline" => Command::Offline,
        "reset" => Command::Reset,
        "rules" => Command::Rules,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(InputError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}
