use crate::command::{Command, CommandBatch, CommandKind, Truncation};
use crate::config::Limits;

/// Characters that end one statement and start the next.
const STATEMENT_DELIMITERS: [char; 2] = [';', '\n'];

/// Splits a raw input line into a [`CommandBatch`].
///
/// The grammar is deliberately flat: statements are separated by `;` or a
/// newline, tokens by whitespace runs. There is no quoting. Anything beyond
/// the configured [`Limits`] is dropped and recorded as a [`Truncation`].
#[derive(Debug, Clone)]
pub struct Tokenizer {
    limits: Limits,
    self_names: Vec<String>,
}

impl Tokenizer {
    /// Create a tokenizer with the given bounds and self-reference names.
    pub fn new(limits: Limits, self_names: Vec<String>) -> Self {
        Self { limits, self_names }
    }

    /// Parse one line of input.
    ///
    /// Empty and whitespace-only statements are skipped silently. Never fails:
    /// over-long input is truncated and the cut is reported through
    /// [`CommandBatch::truncations`].
    pub fn parse(&self, line: &str) -> CommandBatch {
        let mut truncations = Vec::new();
        let line = self.bound_line(line, &mut truncations);

        let mut segments = line
            .split(STATEMENT_DELIMITERS)
            .map(str::trim)
            .filter(|segment| !segment.is_empty());

        let mut commands = Vec::new();
        for segment in segments.by_ref().take(self.limits.max_commands) {
            let index = commands.len();
            if let Some(command) = self.parse_segment(segment, index, &mut truncations) {
                commands.push(command);
            }
        }

        let dropped = segments.count();
        if dropped > 0 {
            truncations.push(Truncation::TooManyCommands { dropped });
        }

        CommandBatch::new(commands, truncations)
    }

    fn parse_segment(
        &self,
        segment: &str,
        index: usize,
        truncations: &mut Vec<Truncation>,
    ) -> Option<Command> {
        let mut tokens = segment.split_whitespace();
        let argv: Vec<String> = tokens
            .by_ref()
            .take(self.limits.max_args)
            .map(str::to_owned)
            .collect();

        let dropped = tokens.count();
        if dropped > 0 {
            truncations.push(Truncation::TooManyArgs { index, dropped });
        }

        let kind = match argv.first() {
            Some(program) if self.is_self_reference(program) => CommandKind::Reenter,
            _ => CommandKind::Program,
        };
        Command::new(kind, argv)
    }

    fn is_self_reference(&self, program: &str) -> bool {
        self.self_names.iter().any(|name| name == program)
    }

    /// Keep at most `max_line - 1` bytes, cut back to a char boundary.
    fn bound_line<'a>(&self, line: &'a str, truncations: &mut Vec<Truncation>) -> &'a str {
        let limit = self.limits.max_line.saturating_sub(1);
        if line.len() <= limit {
            return line;
        }
        let mut end = limit;
        while !line.is_char_boundary(end) {
            end -= 1;
        }
        truncations.push(Truncation::LineTooLong {
            dropped: line.len() - end,
        });
        &line[..end]
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        let config = crate::config::Config::default();
        Self::new(config.limits, config.self_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argvs(batch: &CommandBatch) -> Vec<Vec<&str>> {
        batch
            .commands()
            .iter()
            .map(|cmd| cmd.argv().iter().map(String::as_str).collect())
            .collect()
    }

    fn small(max_commands: usize, max_args: usize) -> Tokenizer {
        Tokenizer::new(
            Limits {
                max_commands,
                max_args,
                max_line: 1024,
            },
            vec!["seqsh".to_string()],
        )
    }

    #[test]
    fn test_two_statements_in_order() {
        let batch = Tokenizer::default().parse("echo hi; echo bye");
        assert_eq!(argvs(&batch), vec![vec!["echo", "hi"], vec!["echo", "bye"]]);
        assert!(batch.truncations().is_empty());
    }

    #[test]
    fn test_newline_is_a_delimiter() {
        let batch = Tokenizer::default().parse("ls -l\npwd\n");
        assert_eq!(argvs(&batch), vec![vec!["ls", "-l"], vec!["pwd"]]);
    }

    #[test]
    fn test_blank_input_yields_nothing() {
        let tokenizer = Tokenizer::default();
        for line in ["", "   ", "\t\n", ";", " ; ;; \n ;"] {
            let batch = tokenizer.parse(line);
            assert!(batch.is_empty(), "expected no commands for {line:?}");
            assert!(batch.truncations().is_empty());
        }
    }

    #[test]
    fn test_empty_segments_are_dropped_between_commands() {
        let batch = Tokenizer::default().parse(";; true ;  ; false;");
        assert_eq!(argvs(&batch), vec![vec!["true"], vec!["false"]]);
    }

    #[test]
    fn test_whitespace_runs_split_tokens() {
        let batch = Tokenizer::default().parse("  echo \t a    b\t\tc  ");
        assert_eq!(argvs(&batch), vec![vec!["echo", "a", "b", "c"]]);
    }

    #[test]
    fn test_segment_count_matches_non_empty_statements() {
        let line = "a 1; b 2 ; c; ; d 4 4";
        let batch = Tokenizer::default().parse(line);
        let expected: Vec<&str> = line
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        assert_eq!(batch.len(), expected.len());
        for (cmd, segment) in batch.commands().iter().zip(&expected) {
            assert!(cmd.argc() >= 1);
            // Rejoining the tokens reproduces the segment's token sequence.
            let segment_tokens: Vec<&str> = segment.split_whitespace().collect();
            assert_eq!(cmd.argv().join(" "), segment_tokens.join(" "));
        }
    }

    #[test]
    fn test_reparse_is_idempotent() {
        let tokenizer = Tokenizer::default();
        let first = tokenizer.parse("  grep  -n   foo   bar.txt ");
        let rejoined = first.commands()[0].argv().join(" ");
        let second = tokenizer.parse(&rejoined);
        assert_eq!(first.commands(), second.commands());
    }

    #[test]
    fn test_too_many_args_truncates_only_that_command() {
        let batch = small(16, 3).parse("echo 1 2 3 4 5; echo ok");
        assert_eq!(argvs(&batch), vec![vec!["echo", "1", "2"], vec!["echo", "ok"]]);
        assert_eq!(
            batch.truncations(),
            &[Truncation::TooManyArgs {
                index: 0,
                dropped: 3
            }]
        );
    }

    #[test]
    fn test_too_many_commands_are_dropped() {
        let batch = small(2, 8).parse("a; b; c; ; d");
        assert_eq!(argvs(&batch), vec![vec!["a"], vec!["b"]]);
        assert_eq!(
            batch.truncations(),
            &[Truncation::TooManyCommands { dropped: 2 }]
        );
    }

    #[test]
    fn test_long_line_is_cut_at_buffer_size() {
        let tokenizer = Tokenizer::new(
            Limits {
                max_commands: 16,
                max_args: 63,
                max_line: 8,
            },
            Vec::new(),
        );
        let batch = tokenizer.parse("echo abcdefgh");
        assert_eq!(argvs(&batch), vec![vec!["echo", "ab"]]);
        assert_eq!(
            batch.truncations(),
            &[Truncation::LineTooLong { dropped: 6 }]
        );
    }

    #[test]
    fn test_long_line_cut_respects_char_boundary() {
        let tokenizer = Tokenizer::new(
            Limits {
                max_commands: 16,
                max_args: 63,
                max_line: 5,
            },
            Vec::new(),
        );
        // "aé" is 3 bytes, a 4 byte limit falls inside "ü".
        let batch = tokenizer.parse("aéü");
        assert_eq!(argvs(&batch), vec![vec!["aé"]]);
    }

    #[test]
    fn test_self_reference_is_tagged() {
        let batch = Tokenizer::default().parse("./seqsh; seqsh -x; seqshell");
        let kinds: Vec<CommandKind> = batch.commands().iter().map(Command::kind).collect();
        assert_eq!(
            kinds,
            vec![
                CommandKind::Reenter,
                CommandKind::Reenter,
                CommandKind::Program
            ]
        );
    }
}
