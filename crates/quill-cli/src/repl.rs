//! Interactive REPL for QuillDB.
//!
//! A line-oriented shell with history and line editing over the `set`/`get`
//! command surface.

use std::path::PathBuf;

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use tracing::error;

use quill_storage::kv::KvEngine;

use crate::commands::KvExecutor;
use crate::config::CliConfig;

/// The prompt shown when waiting for input.
const PROMPT: &str = "quill> ";

/// What the REPL should do after processing a line.
enum LineOutcome {
    Continue,
    Exit,
}

/// Interactive shell over a key-value engine.
pub struct Repl<E> {
    executor: KvExecutor<E>,
    editor: Editor<(), DefaultHistory>,
    history_file: Option<PathBuf>,
}

impl<E: KvEngine> Repl<E> {
    /// Creates a REPL with history settings from `config`.
    pub fn new(config: &CliConfig, executor: KvExecutor<E>) -> Result<Self> {
        let rl_config = Config::builder()
            .history_ignore_space(true)
            .max_history_size(config.history_size)?
            .build();

        let mut editor = Editor::<(), DefaultHistory>::with_config(rl_config)?;

        let history_file = config.history_path();
        if let Some(ref path) = history_file {
            if path.exists() {
                let _ = editor.load_history(path);
            }
        }

        Ok(Self {
            executor,
            editor,
            history_file,
        })
    }

    /// Prints the welcome banner.
    pub fn print_banner(&self) {
        println!("QuillDB shell v{}", env!("CARGO_PKG_VERSION"));
        println!("Type exit or quit to leave.\n");
    }

    /// Runs the read-eval-print loop until `exit`, `quit`, or end of input.
    pub fn run(&mut self) -> Result<()> {
        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(line);

                    if let LineOutcome::Exit = self.process_line(line) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // ^C cancels the current line, not the shell.
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    error!("readline error: {e}");
                    break;
                }
            }
        }

        self.save_history();
        Ok(())
    }

    /// Executes one trimmed, non-empty line. Command errors are printed and
    /// the shell keeps going.
    fn process_line(&mut self, line: &str) -> LineOutcome {
        if line == "exit" || line == "quit" {
            return LineOutcome::Exit;
        }

        match self.executor.execute(line) {
            Ok(output) => println!("{output}"),
            Err(e) => println!("Error: {e}"),
        }
        LineOutcome::Continue
    }

    fn save_history(&mut self) {
        if let Some(ref path) = self.history_file {
            let _ = self.editor.save_history(path);
        }
    }
}
