use std::ffi::{CString, NulError};

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// What the sequencer should do with a parsed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Launch the named program as a child process.
    Program,
    /// Restart the read-execute loop instead of spawning anything.
    Reenter,
}

/// One parsed program invocation.
///
/// The argument vector follows exec conventions: element 0 is the program name.
/// A `Command` always has at least one argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    kind: CommandKind,
    argv: Vec<String>,
}

impl Command {
    /// Build a command from its argument vector.
    ///
    /// Returns `None` for an empty vector or an empty program name, so an
    /// existing `Command` always satisfies `argc() >= 1`.
    pub fn new(kind: CommandKind, argv: Vec<String>) -> Option<Self> {
        match argv.first() {
            Some(program) if !program.is_empty() => Some(Self { kind, argv }),
            _ => None,
        }
    }

    /// Shorthand for a `Program` command built from string slices.
    pub fn program_from<S: AsRef<str>>(argv: &[S]) -> Option<Self> {
        Self::new(
            CommandKind::Program,
            argv.iter().map(|s| s.as_ref().to_owned()).collect(),
        )
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// The program name, identical to `argv()[0]`.
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// Full argument vector including the program name.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Arguments after the program name.
    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn argc(&self) -> usize {
        self.argv.len()
    }

    /// Convert the argument vector into C strings for an exec call.
    ///
    /// The end-of-list marker is added by the caller when it builds the
    /// pointer array, see [`crate::spawner`].
    pub(crate) fn to_cstrings(&self) -> Result<Vec<CString>, NulError> {
        self.argv.iter().map(|arg| CString::new(arg.as_str())).collect()
    }
}

/// All commands parsed from one input line, in their original order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandBatch {
    commands: Vec<Command>,
    truncations: Vec<Truncation>,
}

/// Input that the tokenizer dropped to stay within its configured limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Truncation {
    /// The line was longer than the input buffer; `dropped` bytes were cut.
    LineTooLong { dropped: usize },
    /// More statements than `max_commands`; the trailing ones were dropped.
    TooManyCommands { dropped: usize },
    /// The command at `index` had more tokens than `max_args`.
    TooManyArgs { index: usize, dropped: usize },
}

impl CommandBatch {
    pub(crate) fn new(commands: Vec<Command>, truncations: Vec<Truncation>) -> Self {
        Self {
            commands,
            truncations,
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Limits that were hit while parsing. Empty when nothing was dropped.
    pub fn truncations(&self) -> &[Truncation] {
        &self.truncations
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl IntoIterator for CommandBatch {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

impl From<Vec<Command>> for CommandBatch {
    fn from(commands: Vec<Command>) -> Self {
        Self::new(commands, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_argv_is_rejected() {
        assert!(Command::new(CommandKind::Program, vec![]).is_none());
        assert!(Command::new(CommandKind::Program, vec![String::new()]).is_none());
    }

    #[test]
    fn test_program_is_first_argument() {
        let cmd = Command::program_from(&["ls", "-l", "/tmp"]).unwrap();
        assert_eq!(cmd.program(), "ls");
        assert_eq!(cmd.args(), &["-l".to_string(), "/tmp".to_string()]);
        assert_eq!(cmd.argc(), 3);
        assert_eq!(cmd.kind(), CommandKind::Program);
    }

    #[test]
    fn test_interior_nul_cannot_become_cstring() {
        let cmd = Command::program_from(&["echo", "a\0b"]).unwrap();
        assert!(cmd.to_cstrings().is_err());
    }
}
