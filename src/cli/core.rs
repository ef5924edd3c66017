use std::io;

use chrono::Utc;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password};
use rustyline::error::ReadlineError;
use strsim::levenshtein;
use thiserror::Error;

use crate::cli::commands::{self, CommandDefinition, CommandRegistry};
use crate::cli::output;
use crate::config::{Config, ConfigManager};
use crate::core::{LedgerEngine, Session};
use crate::domain::{DisplayRow, Ledger};
use crate::errors::LedgerError;
use crate::storage::{CsvStorage, LedgerSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

/// Failures that end the shell.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Readline(#[from] ReadlineError),
    #[error(transparent)]
    Prompt(#[from] dialoguer::Error),
}

/// Failures of a single command; reported and the shell continues.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Not logged in. Use `login <user>` or `demo` first.")]
    NotLoggedIn,
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Prompt(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

pub type CommandResult = Result<(), CommandError>;

/// Everything a command handler can reach: configuration, the engine, and
/// the active session with its ledger.
pub struct ShellContext {
    pub(crate) mode: CliMode,
    pub(crate) registry: CommandRegistry,
    pub(crate) config: Config,
    pub(crate) config_manager: ConfigManager,
    pub(crate) engine: LedgerEngine,
    pub(crate) session: Option<Session>,
    pub(crate) ledger: Option<Ledger>,
    /// Rows of the last `list`, so `delete <row>` refers to what was shown.
    pub(crate) last_view: Option<Vec<DisplayRow>>,
    pub(crate) theme: ColorfulTheme,
    pub(crate) running: bool,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        Self::with_config_manager(mode, ConfigManager::new()?)
    }

    pub fn with_config_manager(mode: CliMode, config_manager: ConfigManager) -> Result<Self, CliError> {
        let config = config_manager.load()?;
        output::set_preferences(output::OutputPreferences {
            plain: mode == CliMode::Script,
        });

        let ledger_dir = config.resolve_ledger_dir(config_manager.base_dir());
        let storage = CsvStorage::new(ledger_dir)?;
        config.retention_sweep().run(&storage, Utc::now())?;

        let engine = LedgerEngine::new(Box::new(storage), config.schema)
            .with_demo_seed(config.demo.seed_examples);

        Ok(Self {
            mode,
            registry: CommandRegistry::new(commands::all_definitions()),
            config,
            config_manager,
            engine,
            session: None,
            ledger: None,
            last_view: None,
            theme: ColorfulTheme::default(),
            running: true,
        })
    }

    pub(crate) fn prompt(&self) -> String {
        match &self.session {
            Some(session) if session.is_ephemeral() => "poker[demo]> ".into(),
            Some(session) => format!("poker[{}]> ", session.identity()),
            None => "poker> ".into(),
        }
    }

    pub(crate) fn command_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandDefinition> {
        self.registry.get(name)
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.get(command).map(|def| def.handler) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));

        let mut suggestions: Vec<_> = self
            .registry
            .names()
            .map(|key| (levenshtein(key, input), key))
            .collect();
        suggestions.sort_by_key(|(distance, _)| *distance);

        if let Some((distance, best)) = suggestions.first() {
            if *distance <= 3 {
                output::info(format!("Suggestion: `{}`?", best));
            }
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
            }
            CommandError::Ledger(LedgerError::Schema(message)) => {
                output::error(format!("Schema error: {message}"));
                output::hint(format!(
                    "Files must carry exactly these columns: {}",
                    self.engine.schema().columns().join(", ")
                ));
            }
            other => output::error(other.to_string()),
        }
        Ok(())
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        Ok(self.confirm("Exit shell?", true)?)
    }

    pub(crate) fn is_interactive(&self) -> bool {
        self.mode == CliMode::Interactive
    }

    pub(crate) fn confirm(&self, prompt: &str, default: bool) -> Result<bool, dialoguer::Error> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()
    }

    pub(crate) fn prompt_text(&self, prompt: &str, default: Option<String>) -> Result<String, CommandError> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default);
        }
        Ok(input.interact_text()?)
    }

    pub(crate) fn prompt_password(&self) -> Result<String, CommandError> {
        Ok(Password::with_theme(&self.theme)
            .with_prompt("Password")
            .interact()?)
    }

    /// Installs `session`, loading its ledger. The previous session ends first.
    pub(crate) fn begin_session(&mut self, session: Session) -> CommandResult {
        self.end_session()?;
        let ledger = self.engine.load(&session)?;
        self.session = Some(session);
        self.ledger = Some(ledger);
        Ok(())
    }

    /// Drops the active session; ephemeral sinks are deleted.
    pub(crate) fn end_session(&mut self) -> Result<bool, CommandError> {
        self.ledger = None;
        self.last_view = None;
        match self.session.take() {
            Some(session) => {
                self.engine.end_session(&session)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(crate) fn current_ledger(&self) -> Result<&Ledger, CommandError> {
        self.ledger.as_ref().ok_or(CommandError::NotLoggedIn)
    }

    pub(crate) fn current_session(&self) -> Result<&Session, CommandError> {
        self.session.as_ref().ok_or(CommandError::NotLoggedIn)
    }

    /// Swaps in the state a successful engine mutation returned.
    pub(crate) fn replace_ledger(&mut self, ledger: Ledger) {
        self.ledger = Some(ledger);
        self.last_view = None;
    }

    pub(crate) fn money(&self, amount: f64, precision: usize) -> String {
        output::format_money(&self.config.currency_symbol, amount, precision)
    }

    pub(crate) fn storage(&self) -> &dyn LedgerSink {
        self.engine.storage()
    }
}

impl Drop for ShellContext {
    fn drop(&mut self) {
        if let Err(err) = self.end_session() {
            tracing::warn!(error = %err, "failed to close session on shutdown");
        }
    }
}
