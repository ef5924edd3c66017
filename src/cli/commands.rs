use std::{collections::HashMap, fs, path::Path};

use chrono::{Local, Utc};

use crate::cli::core::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::core::{LedgerEngine, Session};
use crate::domain::{format_date, parse_date, DateRange, LedgerSchema, Record, SortKey};
use crate::errors::LedgerError;
use crate::utils::build_info;

pub type CommandHandler = fn(&mut ShellContext, &[&str]) -> CommandResult;

#[derive(Clone)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub handler: CommandHandler,
}

impl CommandDefinition {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        usage: &'static str,
        handler: CommandHandler,
    ) -> Self {
        Self {
            name,
            description,
            usage,
            handler,
        }
    }
}

pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandDefinition>,
    order: Vec<&'static str>,
}

impl CommandRegistry {
    pub fn new(definitions: Vec<CommandDefinition>) -> Self {
        let mut commands = HashMap::new();
        let mut order = Vec::new();
        for definition in definitions {
            order.push(definition.name);
            commands.insert(definition.name, definition);
        }
        Self { commands, order }
    }

    pub fn get(&self, name: &str) -> Option<&CommandDefinition> {
        self.commands.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.order
            .iter()
            .filter_map(move |name| self.commands.get(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }
}

pub(crate) fn all_definitions() -> Vec<CommandDefinition> {
    vec![
        CommandDefinition::new("login", "Log in with configured credentials", "login <user> [password]", cmd_login),
        CommandDefinition::new("demo", "Start a disposable demo session", "demo", cmd_demo),
        CommandDefinition::new("logout", "End the current session", "logout", cmd_logout),
        CommandDefinition::new("whoami", "Show the active session", "whoami", cmd_whoami),
        CommandDefinition::new(
            "add",
            "Add a tournament record",
            "add <date> <name> <fee> <amount>   (minimal ledgers: add <date> <amount>)",
            cmd_add,
        ),
        CommandDefinition::new("delete", "Delete a row shown by `list`", "delete <row>", cmd_delete),
        CommandDefinition::new(
            "list",
            "Show records, optionally filtered and sorted",
            "list [--from DATE] [--to DATE] [--sort date|name|fee|outcome|profit]",
            cmd_list,
        ),
        CommandDefinition::new("stats", "Show profit, ROI and ITM rate", "stats", cmd_stats),
        CommandDefinition::new("chart", "Show the cumulative profit series", "chart", cmd_chart),
        CommandDefinition::new("import", "Replace the ledger with a CSV file", "import <path>", cmd_import),
        CommandDefinition::new("export", "Write the ledger as CSV", "export [path]", cmd_export),
        CommandDefinition::new("config", "Show configuration", "config", cmd_config),
        CommandDefinition::new("version", "Show build metadata", "version", cmd_version),
        CommandDefinition::new("help", "Show available commands", "help [command]", cmd_help),
        CommandDefinition::new("exit", "Exit the shell", "exit", cmd_exit),
    ]
}

fn cmd_login(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let username = match args.first() {
        Some(name) => name.to_string(),
        None if context.is_interactive() => context.prompt_text("Username", None)?,
        None => return Err(usage("login <user> [password]")),
    };
    let password = match args.get(1) {
        Some(password) => password.to_string(),
        None if context.is_interactive() => context.prompt_password()?,
        None => return Err(usage("login <user> [password]")),
    };

    let session = Session::authenticate(&context.config, &username, &password)?;
    context.begin_session(session)?;
    output::success(format!("Logged in as `{}`.", username));
    report_record_count(context)
}

fn cmd_demo(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    if !context.config.demo.enabled {
        return Err(CommandError::InvalidArguments(
            "Demo sessions are disabled in the configuration.".into(),
        ));
    }
    let session = Session::ephemeral(&context.config.demo.prefix, Utc::now());
    context.begin_session(session)?;
    output::success("Demo session started. Its records are discarded on logout.");
    report_record_count(context)
}

fn cmd_logout(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    if context.end_session()? {
        output::success("Logged out.");
    } else {
        output::info("No active session.");
    }
    Ok(())
}

fn cmd_whoami(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let session = context.current_session()?;
    let kind = if session.is_ephemeral() { "demo" } else { "user" };
    output::info(format!("{} ({})", session.identity(), kind));
    output::info(format!(
        "Ledger file: {}",
        context.storage().location(session.identity()).display()
    ));
    Ok(())
}

fn cmd_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let schema = context.current_ledger()?.schema;
    let record = if args.is_empty() && context.is_interactive() {
        prompt_record(context, schema)?
    } else {
        parse_record(schema, args)?
    };
    let next = context
        .engine
        .add_record(context.current_ledger()?, record.clone())?;
    context.replace_ledger(next);
    output::success(format!("Added {}.", record));
    Ok(())
}

fn cmd_delete(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let raw = args.first().ok_or_else(|| usage("delete <row>"))?;
    let row: usize = raw
        .parse()
        .ok()
        .filter(|row| *row >= 1)
        .ok_or_else(|| CommandError::InvalidArguments(format!("`{raw}` is not a row number")))?;

    let ledger = context.current_ledger()?;
    let index = match &context.last_view {
        Some(view) => view.get(row - 1).map(|shown| shown.index).ok_or_else(|| {
            LedgerError::NotFound(format!(
                "row {} is not in the last listing ({} rows shown)",
                row,
                view.len()
            ))
        })?,
        None => row - 1,
    };

    if context.is_interactive() {
        let label = ledger
            .record(index)
            .map(|record| record.to_string())
            .unwrap_or_else(|| format!("row {row}"));
        if !context.confirm(&format!("Delete {label}?"), false)? {
            output::info("Nothing deleted.");
            return Ok(());
        }
    }

    let next = context.engine.delete_record(ledger, index)?;
    context.replace_ledger(next);
    output::success(format!("Deleted row {row}."));
    Ok(())
}

fn cmd_list(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (range, key) = parse_list_args(args)?;
    let ledger = context.current_ledger()?;
    let rows = LedgerEngine::filter_and_sort(ledger, &range, key);
    let schema = ledger.schema;

    if rows.is_empty() {
        output::info("No records.");
    } else {
        let mut headers = vec!["Row"];
        headers.extend_from_slice(schema.columns());
        let table_rows: Vec<Vec<String>> = rows
            .iter()
            .enumerate()
            .map(|(pos, row)| {
                let record = &row.record;
                let mut cells = vec![(pos + 1).to_string(), format_date(record.date)];
                if schema.has_details() {
                    cells.push(record.tournament_name.clone());
                    cells.push(context.money(record.entry_fee, 2));
                }
                cells.push(context.money(record.outcome.amount(), 2));
                cells
            })
            .collect();
        output::info(output::table(&headers, &table_rows));
    }
    context.last_view = Some(rows);
    Ok(())
}

fn cmd_stats(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let stats = LedgerEngine::compute_stats(context.current_ledger()?);
    output::section("Statistics");
    output::info(format!("Total Profit/Loss : {}", context.money(stats.total_profit, 0)));
    output::info(format!("ROI               : {}", output::format_percent(stats.roi)));
    output::info(format!("ITM Rate          : {}", output::format_percent(stats.itm_rate)));
    output::info(format!(
        "Tournaments       : {} ({} in the money)",
        stats.total_records, stats.in_the_money_count
    ));
    output::info(format!("Entry fees        : {}", context.money(stats.total_entry_fees, 0)));
    Ok(())
}

fn cmd_chart(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let stats = LedgerEngine::compute_stats(context.current_ledger()?);
    if stats.cumulative_profit_series.is_empty() {
        output::info("No records.");
        return Ok(());
    }
    output::section("Cumulative Profit/Loss");
    let rows: Vec<Vec<String>> = stats
        .cumulative_profit_series
        .iter()
        .map(|point| {
            vec![
                format_date(point.date),
                context.money(point.profit, 0),
                context.money(point.cumulative, 0),
            ]
        })
        .collect();
    output::info(output::table(&["Date", "Profit/Loss", "Cumulative"], &rows));
    Ok(())
}

fn cmd_import(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let path = args.first().ok_or_else(|| usage("import <path>"))?;
    let session = context.current_session()?;
    let bytes = fs::read(path)?;
    let next = context.engine.import(session, &bytes)?;
    let count = next.len();
    context.replace_ledger(next);
    output::success(format!("Imported {count} records from {path}."));
    Ok(())
}

fn cmd_export(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let bytes = LedgerEngine::export(context.current_ledger()?)?;
    match args.first() {
        Some(path) => {
            fs::write(Path::new(path), &bytes)?;
            output::success(format!("Exported ledger to {path}."));
        }
        None => print!("{}", String::from_utf8_lossy(&bytes)),
    }
    Ok(())
}

fn cmd_config(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let config = &context.config;
    output::section("Configuration");
    output::info(format!("Config file : {}", context.config_manager.path().display()));
    output::info(format!("Schema      : {} ({})", config.schema, config.schema.columns().join(", ")));
    output::info(format!(
        "Ledger dir  : {}",
        config.resolve_ledger_dir(context.config_manager.base_dir()).display()
    ));
    output::info(format!("Users       : {}", config.credentials.len()));
    output::info(format!(
        "Demo        : {} (prefix `{}`, kept {} min)",
        if config.demo.enabled { "enabled" } else { "disabled" },
        config.demo.prefix,
        config.demo.retention_minutes
    ));
    Ok(())
}

fn cmd_version(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let meta = build_info::current();
    output::section(format!("Poker Ledger {}", meta.version));
    output::info(format!("  Revision : {}", meta.revision));
    output::info(format!("  Profile  : {}", meta.profile));
    output::info(format!("  Rustc    : {}", meta.rustc));
    Ok(())
}

fn cmd_help(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if let Some(name) = args.first().map(|name| name.to_lowercase()) {
        match context.command(&name) {
            Some(command) => {
                output::section(format!("Help: {}", command.name));
                output::info(format!("  Description: {}", command.description));
                output::info(format!("  Usage: {}", command.usage));
            }
            None => context.suggest_command(args[0]),
        }
        return Ok(());
    }

    output::section("Available commands");
    for command in context.registry.iter() {
        output::info(format!("  {:<10} {}", command.name, command.description));
    }
    output::info("Use `help <command>` for details.");
    Ok(())
}

fn cmd_exit(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    Err(CommandError::ExitRequested)
}

fn usage(text: &str) -> CommandError {
    CommandError::InvalidArguments(format!("Usage: {text}"))
}

fn report_record_count(context: &ShellContext) -> CommandResult {
    let count = context.current_ledger()?.len();
    output::info(format!("{count} records loaded."));
    Ok(())
}

fn parse_amount(raw: &str, field: &str) -> Result<f64, CommandError> {
    raw.trim()
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| CommandError::InvalidArguments(format!("{field} `{raw}` is not a number")))
}

fn parse_day(raw: &str) -> Result<chrono::NaiveDate, CommandError> {
    parse_date(raw).ok_or_else(|| {
        CommandError::InvalidArguments(format!("`{raw}` is not a date (use YYYY-MM-DD)"))
    })
}

fn parse_record(schema: LedgerSchema, args: &[&str]) -> Result<Record, CommandError> {
    match (schema.has_details(), args) {
        (false, [date, amount]) => Ok(Record::minimal(
            parse_day(date)?,
            parse_amount(amount, "Profit/Loss")?,
        )),
        (true, [date, name, fee, amount]) => Ok(Record::for_schema(
            schema,
            parse_day(date)?,
            *name,
            parse_amount(fee, "Entry fee")?,
            parse_amount(amount, schema.outcome_column())?,
        )),
        (false, _) => Err(usage("add <date> <amount>")),
        (true, _) => Err(usage("add <date> <name> <fee> <amount>")),
    }
}

fn prompt_record(context: &ShellContext, schema: LedgerSchema) -> Result<Record, CommandError> {
    let today = format_date(Local::now().date_naive());
    let date = parse_day(&context.prompt_text("Date", Some(today))?)?;
    if !schema.has_details() {
        let amount = parse_amount(&context.prompt_text("Profit/Loss", None)?, "Profit/Loss")?;
        return Ok(Record::minimal(date, amount));
    }
    let name = context.prompt_text("Tournament Name", Some(String::new()))?;
    let fee = parse_amount(&context.prompt_text("Entry Fee", Some("0".into()))?, "Entry fee")?;
    let label = schema.outcome_column();
    let amount = parse_amount(&context.prompt_text(label, None)?, label)?;
    Ok(Record::for_schema(schema, date, name, fee, amount))
}

fn parse_list_args(args: &[&str]) -> Result<(DateRange, SortKey), CommandError> {
    let mut range = DateRange::all();
    let mut key = SortKey::Date;
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let mut value = || {
            iter.next()
                .copied()
                .ok_or_else(|| CommandError::InvalidArguments(format!("`{flag}` needs a value")))
        };
        match *flag {
            "--from" => range.start = Some(parse_day(value()?)?),
            "--to" => range.end = Some(parse_day(value()?)?),
            "--sort" => key = value()?.parse()?,
            other => {
                return Err(CommandError::InvalidArguments(format!(
                    "unknown option `{other}`"
                )))
            }
        }
    }
    Ok((range, key))
}
