use argh::FromArgs;
use seqsh::{Backend, Config, Interpreter, Limits};
use std::io;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Run `;`-separated commands one after another, timing each of them.
struct Args {
    /// process creation backend: `fork` or `clone`
    #[argh(option, default = "Backend::CloneStack")]
    backend: Backend,

    /// maximum number of commands taken from one line
    #[argh(option, default = "seqsh::config::DEFAULT_MAX_COMMANDS")]
    max_commands: usize,

    /// maximum number of tokens per command, program name included
    #[argh(option, default = "seqsh::config::DEFAULT_MAX_ARGS")]
    max_args: usize,

    /// size in bytes of the stack mapped for the clone backend
    #[argh(option, default = "seqsh::config::DEFAULT_STACK_SIZE")]
    stack_size: usize,

    /// program name that re-enters the shell; repeatable, replaces the defaults
    #[argh(option)]
    self_name: Vec<String>,

    /// read commands from stdin without a prompt even on a terminal
    #[argh(switch)]
    batch: bool,
}

impl Args {
    fn into_config(self) -> Config {
        let defaults = Config::default();
        Config {
            backend: self.backend,
            limits: Limits {
                max_commands: self.max_commands,
                max_args: self.max_args,
                max_line: defaults.limits.max_line,
            },
            stack_size: self.stack_size,
            self_names: if self.self_name.is_empty() {
                defaults.self_names
            } else {
                self.self_name
            },
        }
    }
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env("SEQSH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args: Args = argh::from_env();
    let batch = args.batch;
    let config = args.into_config();
    config.validate()?;
    tracing::debug!(backend = %config.backend, "starting");

    let sh = Interpreter::new(&config);
    if batch {
        sh.run_batch(&mut io::stdin().lock(), &mut io::stdout())
    } else {
        sh.run()
    }
}
