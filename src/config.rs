use crate::spawner::Backend;

/// Default input buffer size in bytes, including room for a terminator.
pub const DEFAULT_MAX_LINE: usize = 1024;
/// Default number of statements accepted from one line.
pub const DEFAULT_MAX_COMMANDS: usize = 16;
/// Default number of tokens per command (a 64-slot argv with the end marker).
pub const DEFAULT_MAX_ARGS: usize = 63;
/// Default size of the stack mapped for the clone backend.
pub const DEFAULT_STACK_SIZE: usize = 1024 * 1024;

/// Bounds enforced by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum commands per batch; later statements are dropped.
    pub max_commands: usize,
    /// Maximum tokens per command, program name included.
    pub max_args: usize,
    /// Input buffer size; at most `max_line - 1` bytes of a line are kept.
    pub max_line: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_commands: DEFAULT_MAX_COMMANDS,
            max_args: DEFAULT_MAX_ARGS,
            max_line: DEFAULT_MAX_LINE,
        }
    }
}

/// Everything the interpreter needs to know before it starts reading input.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub limits: Limits,
    pub stack_size: usize,
    /// Program names that mean "re-enter this shell" instead of a launch.
    pub self_names: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::CloneStack,
            limits: Limits::default(),
            stack_size: DEFAULT_STACK_SIZE,
            self_names: vec!["seqsh".to_string(), "./seqsh".to_string()],
        }
    }
}

impl Config {
    /// Reject settings the engine cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.limits.max_commands == 0 {
            anyhow::bail!("max-commands must be at least 1");
        }
        if self.limits.max_args == 0 {
            anyhow::bail!("max-args must be at least 1");
        }
        if self.limits.max_line < 2 {
            anyhow::bail!("max-line must be at least 2");
        }
        if self.stack_size == 0 {
            anyhow::bail!("stack-size must be non-zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.limits.max_commands, 16);
        assert_eq!(config.limits.max_args, 63);
        assert_eq!(config.backend, Backend::CloneStack);
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        let mut config = Config::default();
        config.limits.max_args = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.stack_size = 0;
        assert!(config.validate().is_err());
    }
}
