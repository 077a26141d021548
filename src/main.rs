use std::{
    error::Error,
    io::{self, stdin, IsTerminal},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use danfe::module;
use danfe::repl::{fragments, Feed, Repl, PROMPT};
use rustyline::history::DefaultHistory;
use rustyline::validate::MatchingBracketValidator;
use rustyline::Editor;
use rustyline::{error::ReadlineError, Cmd, ConditionalEventHandler, Event, EventContext, EventHandler, KeyEvent, Movement, RepeatCount};
use rustyline::{Completer, Helper, Highlighter, Hinter, Validator};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Interpreter for the Danfe scripting language.
///
/// Without a subcommand, starts the interactive shell.
#[derive(Parser)]
#[command(name = "danfe", version)]
struct Cli {
    /// Stop after this many loop iterations and function calls.
    #[arg(long, global = true)]
    max_steps: Option<u64>,

    /// Log at debug level unless DANFE_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a file as the program's entry point.
    Run { path: PathBuf },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("DANFE_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Command::Run { path }) => run_file(path, cli.max_steps),
        None => match run_prompt(cli.max_steps) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("error: {}", err);
                ExitCode::FAILURE
            }
        },
    }
}

fn run_file(path: PathBuf, max_steps: Option<u64>) -> ExitCode {
    match module::run(&path, max_steps) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

struct TabEventHandler;
impl ConditionalEventHandler for TabEventHandler {
    fn handle(&self, _: &Event, _n: RepeatCount, _: bool, _: &EventContext) -> Option<Cmd> {
        Some(Cmd::Indent(Movement::WholeLine))
    }
}

#[derive(Helper, Completer, Hinter, Highlighter, Validator)]
struct ReplHelper {
    #[rustyline(Completer)]
    completer: (),
    #[rustyline(Validator)]
    validator: MatchingBracketValidator,
}

fn run_prompt(max_steps: Option<u64>) -> Result<(), Box<dyn Error>> {
    let mut repl = Repl::new(io::stdout()).with_step_limit(max_steps);
    if !stdin().is_terminal() {
        let input = io::read_to_string(stdin().lock())?;
        repl.run(fragments(input.lines()))?;
        return Ok(());
    }

    let h = ReplHelper {
        completer: (),
        validator: MatchingBracketValidator::new(),
    };
    let mut rl: Editor<ReplHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(h));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabEventHandler)),
    );

    loop {
        let readline = rl.readline(PROMPT);
        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                if repl.feed(&line)? == Feed::Exit {
                    return Ok(());
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(()),
            Err(err) => {
                break Err(Box::new(err));
            }
        }
    }
}
