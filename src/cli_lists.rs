use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use recency_lists_server::lists::{AddOutcome, ListName, RemoveOutcome};
use recency_lists_server::server::is_valid_identifier;
use recency_lists_server::{ListManager, SqliteListStore};

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

const DB_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

fn parse_list_name(s: &str) -> Result<ListName, String> {
    s.parse::<ListName>().map_err(|e| e.to_string())
}

fn parse_item_id(s: &str) -> Result<String, String> {
    if is_valid_identifier(s) {
        Ok(s.to_string())
    } else {
        Err(format!("{:?} is not a valid item id", s))
    }
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the lists database file.
    #[clap(value_parser = parse_path)]
    pub path: PathBuf,

    /// A single command to run instead of starting the interactive prompt.
    #[clap(trailing_var_arg = true)]
    pub command: Vec<String>,
}

#[derive(Parser)]
#[command(name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Shows one list of an owner, or all of them if no list is given.
    Show {
        owner: String,
        #[clap(value_parser = parse_list_name)]
        list: Option<ListName>,
    },

    /// Puts an item in front of an owner's list.
    Add {
        owner: String,
        #[clap(value_parser = parse_list_name)]
        list: ListName,
        #[clap(value_parser = parse_item_id)]
        item_id: String,
    },

    /// Removes an item from an owner's list.
    Remove {
        owner: String,
        #[clap(value_parser = parse_list_name)]
        list: ListName,
        #[clap(value_parser = parse_item_id)]
        item_id: String,
    },

    /// Deletes an owner's whole list.
    Clear {
        owner: String,
        #[clap(value_parser = parse_list_name)]
        list: ListName,
    },

    /// Counts the owners watching an item.
    Watchers {
        #[clap(value_parser = parse_item_id)]
        item_id: String,
    },

    /// Shows the path of the current lists db.
    Where,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

const PROMPT: &str = ">> ";

fn show_lists(list_manager: &ListManager, owner: &str, list: Option<ListName>) -> Result<()> {
    let documents = match list {
        Some(list) => list_manager
            .get_list(owner, list)?
            .map(|document| vec![(list, document)])
            .unwrap_or_default(),
        None => list_manager.get_lists(owner)?,
    };

    if documents.is_empty() {
        println!("(no lists)");
    }
    for (list, document) in documents {
        println!(
            "{} ({} items, created {}, updated {}):",
            list,
            document.item_ids.len(),
            document.created_at,
            document.updated_at
        );
        for (position, item_id) in document.item_ids.iter().enumerate() {
            println!("  {:>2}. {}", position + 1, item_id);
        }
    }
    Ok(())
}

fn run_command(command: InnerCommand, list_manager: &ListManager, db_path: &str) -> Result<bool> {
    match command {
        InnerCommand::Show { owner, list } => show_lists(list_manager, &owner, list)?,
        InnerCommand::Add {
            owner,
            list,
            item_id,
        } => match list_manager.add_item(&owner, list, &item_id)? {
            AddOutcome::Created => println!("Created {} of {} with {}", list, owner, item_id),
            AddOutcome::Prepended => println!("Added {} to {} of {}", item_id, list, owner),
            AddOutcome::AlreadyPresent => {
                println!("{} is already in {} of {}", item_id, list, owner)
            }
        },
        InnerCommand::Remove {
            owner,
            list,
            item_id,
        } => match list_manager.remove_item(&owner, list, &item_id)? {
            RemoveOutcome::Removed => println!("Removed {} from {} of {}", item_id, list, owner),
            RemoveOutcome::ListDeleted => {
                println!("Removed {}, {} of {} is now gone", item_id, list, owner)
            }
            RemoveOutcome::NotPresent => println!("{} is not in {} of {}", item_id, list, owner),
        },
        InnerCommand::Clear { owner, list } => {
            list_manager.remove_all(&owner, list)?;
            println!("Cleared {} of {}", list, owner);
        }
        InnerCommand::Watchers { item_id } => {
            println!("{}", list_manager.count_watchers(&item_id)?);
        }
        InnerCommand::Where => println!("{}", db_path),
        InnerCommand::Exit => return Ok(false),
    }
    Ok(true)
}

fn execute_command(
    line: String,
    list_manager: &ListManager,
    db_path: &str,
) -> CommandExecutionResult {
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    match cli {
        Ok(cli) => match run_command(cli.command, list_manager, db_path) {
            Ok(true) => CommandExecutionResult::Ok,
            Ok(false) => CommandExecutionResult::Exit,
            Err(err) => CommandExecutionResult::Error(format!("{:#}", err)),
        },
        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
            CommandExecutionResult::Ok
        }
    }
}

#[derive(rustyline_derive::Hinter)]
struct CommandsHelper {
    commands_names: Vec<String>,
}

impl CommandsHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        CommandsHelper { commands_names }
    }
}

impl Completer for CommandsHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .cloned()
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for CommandsHelper {}
impl Validator for CommandsHelper {}
impl Helper for CommandsHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let db_path = cli_args.path.display().to_string();
    let collections = SqliteListStore::open_collections(&cli_args.path, DB_BUSY_TIMEOUT)?;
    let list_manager = ListManager::new(collections);

    if !cli_args.command.is_empty() {
        let cli = InnerCli::try_parse_from(
            std::iter::once(" ").chain(cli_args.command.iter().map(String::as_str)),
        )?;
        run_command(cli.command, &list_manager, &db_path)?;
        return Ok(());
    }

    InnerCli::command().print_long_help()?;

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<CommandsHelper, FileHistory>::with_config(config)?;
    rl.set_helper(Some(CommandsHelper::new()));

    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &list_manager, &db_path) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => break,
                    CommandExecutionResult::Error(err) => {
                        eprintln!("Error: {}", err);
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }
    Ok(())
}
