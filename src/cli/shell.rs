use std::{
    io::{self, BufRead},
    path::PathBuf,
};

use rustyline::{
    completion::{Completer, FilenameCompleter, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};

use crate::cli::core::{CliError, CliMode, CommandError, LoopControl, ShellContext};
use crate::cli::output::{info as output_info, warning as output_warning};

const SCRIPT_ENV: &str = "POKER_LEDGER_CLI_SCRIPT";
const HISTORY_FILE: &str = "history.txt";
const LIST_FLAGS: [&str; 3] = ["--from", "--to", "--sort"];
const SORT_KEYS: [&str; 5] = ["date", "name", "fee", "outcome", "profit"];

/// Runs the shell: interactive unless `POKER_LEDGER_CLI_SCRIPT` is set, in
/// which case commands are read line by line from stdin.
pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;

    match mode {
        CliMode::Interactive => run_interactive(&mut context),
        CliMode::Script => run_script(&mut context),
    }
}

fn history_path(context: &ShellContext) -> PathBuf {
    context.config_manager.base_dir().join(HISTORY_FILE)
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let mut editor = Editor::<LedgerHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(LedgerHelper::new(context.command_names())));
    editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);

    let history = history_path(context);
    if editor.load_history(&history).is_err() {
        tracing::debug!(path = %history.display(), "no shell history yet");
    }

    while context.running {
        match editor.readline(&context.prompt()) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                // Passwords typed inline stay out of the history file.
                if !line.to_ascii_lowercase().starts_with("login") {
                    editor.add_history_entry(line).ok();
                }
                match handle_line(context, line) {
                    Ok(LoopControl::Continue) => {}
                    Ok(LoopControl::Exit) => break,
                    Err(err) => context.report_error(err)?,
                }
            }
            Err(ReadlineError::Interrupted) => {
                if context.confirm_exit()? {
                    break;
                }
            }
            Err(ReadlineError::Eof) => {
                output_info("Exiting shell.");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    if let Err(err) = editor.save_history(&history) {
        tracing::warn!(path = %history.display(), error = %err, "failed to save shell history");
    }
    Ok(())
}

/// Reads one command per stdin line. Blank lines and `#` comments are skipped.
fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    for line in io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match handle_line(context, line) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => context.report_error(err)?,
        }
        if !context.running {
            break;
        }
    }
    Ok(())
}

fn handle_line(context: &mut ShellContext, line: &str) -> Result<LoopControl, CommandError> {
    let tokens = match shell_words::split(line) {
        Ok(tokens) => tokens,
        Err(err) => {
            output_warning(format!("Could not parse `{line}`: {err}"));
            return Ok(LoopControl::Continue);
        }
    };
    let Some((raw, rest)) = tokens.split_first() else {
        return Ok(LoopControl::Continue);
    };

    let args: Vec<&str> = rest.iter().map(String::as_str).collect();
    let control = context.dispatch(&raw.to_lowercase(), raw, &args)?;
    if control == LoopControl::Exit {
        context.running = false;
    }
    Ok(control)
}

/// What the word under the cursor should complete to.
#[derive(Debug, PartialEq, Eq)]
enum Completion {
    Words(Vec<&'static str>),
    Path,
    Nothing,
}

/// Completes command names, `list` flags and sort keys, and file paths for
/// `import`/`export`.
struct LedgerHelper {
    commands: Vec<&'static str>,
    files: FilenameCompleter,
}

impl LedgerHelper {
    fn new(mut commands: Vec<&'static str>) -> Self {
        commands.sort_unstable();
        Self {
            commands,
            files: FilenameCompleter::new(),
        }
    }

    /// `before` holds the finished words preceding the one being typed.
    fn completion_for(&self, before: &[&str]) -> Completion {
        let Some(command) = before.first() else {
            return Completion::Words(self.commands.clone());
        };
        match (command.to_ascii_lowercase().as_str(), before.last().copied()) {
            ("import" | "export", _) if before.len() == 1 => Completion::Path,
            ("help", _) if before.len() == 1 => Completion::Words(self.commands.clone()),
            ("list", Some("--sort")) => Completion::Words(SORT_KEYS.to_vec()),
            ("list", Some("--from" | "--to")) => Completion::Nothing,
            ("list", _) => Completion::Words(
                LIST_FLAGS
                    .into_iter()
                    .filter(|flag| !before.contains(flag))
                    .collect(),
            ),
            _ => Completion::Nothing,
        }
    }
}

impl Completer for LedgerHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let typed = &line[..pos];
        let start = typed.rfind(char::is_whitespace).map_or(0, |idx| idx + 1);
        let before: Vec<&str> = typed[..start].split_whitespace().collect();
        let needle = typed[start..].to_ascii_lowercase();

        match self.completion_for(&before) {
            Completion::Path => self.files.complete(line, pos, ctx),
            Completion::Nothing => Ok((start, Vec::new())),
            Completion::Words(words) => Ok((
                start,
                words
                    .into_iter()
                    .filter(|word| word.starts_with(&needle))
                    .map(|word| Pair {
                        display: word.to_string(),
                        replacement: word.to_string(),
                    })
                    .collect(),
            )),
        }
    }
}

impl Hinter for LedgerHelper {
    type Hint = String;
}

impl Highlighter for LedgerHelper {}

impl Validator for LedgerHelper {}

impl Helper for LedgerHelper {}
