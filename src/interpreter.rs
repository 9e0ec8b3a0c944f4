use crate::command::Truncation;
use crate::config::{Config, Limits};
use crate::parser::Tokenizer;
use crate::sequencer::{Outcome, Reentry, Sequencer};
use crate::spawner::ProcessSpawner;
use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, IsTerminal, Read, Write};
use tracing::{debug, warn};

/// Prompt printed before each interactive line.
pub const PROMPT: &str = "seqsh> ";
/// Keyword that leaves the read-execute loop.
pub const EXIT_KEYWORD: &str = "exit";

/// Line-oriented front-end feeding the tokenizer and sequencer.
///
/// Every line goes through the same path: [`Tokenizer::parse`], then
/// [`Sequencer::run`]. Self-reference commands restart the loop the caller
/// is currently in.
///
/// Example
/// ```no_run
/// use seqsh::{Config, Interpreter};
/// let sh = Interpreter::new(&Config::default());
/// let mut out = Vec::new();
/// let outcomes = sh.execute_line("echo hello; echo world", &mut out, &mut seqsh::NoReentry);
/// assert_eq!(outcomes.len(), 2);
/// ```
pub struct Interpreter {
    tokenizer: Tokenizer,
    sequencer: Sequencer,
    limits: Limits,
}

impl Interpreter {
    /// Build an interpreter using the backend selected in `config`.
    pub fn new(config: &Config) -> Self {
        let spawner = config.backend.spawner(config.stack_size);
        Self::with_spawner(config, spawner)
    }

    /// Build an interpreter around a custom spawner.
    pub fn with_spawner(config: &Config, spawner: Box<dyn ProcessSpawner>) -> Self {
        Self {
            tokenizer: Tokenizer::new(config.limits, config.self_names.clone()),
            sequencer: Sequencer::new(spawner),
            limits: config.limits,
        }
    }

    /// Parse and run one line, writing reports to `out`.
    pub fn execute_line(
        &self,
        line: &str,
        out: &mut dyn Write,
        reentry: &mut dyn Reentry,
    ) -> Vec<Outcome> {
        let batch = self.tokenizer.parse(line);
        for truncation in batch.truncations() {
            log_truncation(truncation, &self.limits);
        }
        debug!(
            commands = batch.len(),
            backend = self.sequencer.spawner().name(),
            "parsed line"
        );
        self.sequencer.run(batch, out, reentry)
    }

    /// Interactive mode when stdin is a terminal, batch mode otherwise.
    pub fn run(&self) -> anyhow::Result<()> {
        if io::stdin().is_terminal() {
            self.repl()
        } else {
            let mut input = io::stdin().lock();
            self.run_batch(&mut input, &mut io::stdout())
        }
    }

    /// Interactive read-execute loop.
    ///
    /// Ends on end of input or the `exit` keyword. Ctrl-C drops the current
    /// line and shows a fresh prompt.
    pub fn repl(&self) -> anyhow::Result<()> {
        let mut rl = DefaultEditor::new().context("failed to initialise line editor")?;
        let mut stdout = io::stdout();

        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if trimmed == EXIT_KEYWORD {
                        println!("bye!");
                        break;
                    }
                    if let Err(err) = rl.add_history_entry(trimmed) {
                        debug!(%err, "history not updated");
                    }
                    let mut nested = |_: &mut dyn Write| -> anyhow::Result<()> { self.repl() };
                    self.execute_line(&line, &mut stdout, &mut nested);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => return Err(err).context("failed to read input"),
            }
        }

        Ok(())
    }

    /// Non-interactive loop over `input`.
    ///
    /// Lines are read up to a newline or the input buffer size. A first
    /// read that is empty or a lone newline ends the session immediately.
    /// Any other line without commands, whitespace included, is skipped. A
    /// self-reference continues reading from the same input.
    pub fn run_batch(&self, input: &mut dyn BufRead, out: &mut dyn Write) -> anyhow::Result<()> {
        let mut first = true;

        while let Some(line) = read_bounded_line(input, self.limits.max_line)? {
            if first && (line.is_empty() || line == "\n") {
                break;
            }
            first = false;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed == EXIT_KEYWORD {
                break;
            }

            let mut nested =
                |out: &mut dyn Write| -> anyhow::Result<()> { self.run_batch(&mut *input, out) };
            self.execute_line(&line, out, &mut nested);
        }

        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

/// Read one line of at most `max_line - 1` bytes, newline included.
///
/// Returns `None` at end of input. Longer lines come back in chunks.
fn read_bounded_line(input: &mut dyn BufRead, max_line: usize) -> anyhow::Result<Option<String>> {
    let limit = max_line.saturating_sub(1).max(1) as u64;
    let mut buf = Vec::new();
    let read = (&mut *input)
        .take(limit)
        .read_until(b'\n', &mut buf)
        .context("failed to read input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

fn log_truncation(truncation: &Truncation, limits: &Limits) {
    match truncation {
        Truncation::LineTooLong { dropped } => {
            warn!(dropped, limit = limits.max_line - 1, "input line truncated")
        }
        Truncation::TooManyCommands { dropped } => {
            warn!(dropped, limit = limits.max_commands, "too many commands, extra ones ignored")
        }
        Truncation::TooManyArgs { index, dropped } => {
            warn!(
                command = index,
                dropped,
                limit = limits.max_args,
                "too many arguments, extra ones ignored"
            )
        }
    }
}
