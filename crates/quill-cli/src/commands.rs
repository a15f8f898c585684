//! Command execution for the shell's `set`/`get` surface.

use thiserror::Error;

use quill_storage::kv::{KvEngine, KvError};

/// Result of executing one command line.
pub type CommandResult = Result<String, CommandError>;

/// Errors from parsing or executing a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command name was recognized but the arguments were not.
    #[error("invalid command syntax")]
    InvalidSyntax,

    /// The command name was not recognized.
    #[error("unknown command")]
    UnknownCommand,

    /// The engine rejected the operation.
    #[error(transparent)]
    Kv(#[from] KvError),
}

/// Executes `set <key> <value>` and `get <key>` against a key-value engine.
///
/// Parsing is whitespace-splitting, like the rest of the shell: keys and
/// values cannot contain spaces.
pub struct KvExecutor<E> {
    engine: E,
}

impl<E: KvEngine> KvExecutor<E> {
    /// Wraps an engine.
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Executes one command line and returns its textual result.
    pub fn execute(&self, line: &str) -> CommandResult {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [] => Err(CommandError::InvalidSyntax),
            ["set", key, value] => {
                self.engine.set(key.as_bytes(), value.as_bytes())?;
                Ok("OK".to_string())
            }
            ["set", ..] => Err(CommandError::InvalidSyntax),
            ["get", key] => {
                let value = self.engine.get(key.as_bytes())?;
                Ok(String::from_utf8_lossy(&value).into_owned())
            }
            ["get", ..] => Err(CommandError::InvalidSyntax),
            _ => Err(CommandError::UnknownCommand),
        }
    }
}
