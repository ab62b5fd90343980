// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use lendshelf_config::{Config, ConfigManager};
use std::path::PathBuf;

mod commands;
mod prompt;
mod setup;

fn book_arg() -> Arg {
    Arg::new("book")
        .value_name("BOOK")
        .help("Book ID, unique ID prefix, or catalog entry ID")
}

fn build_cli() -> Command {
    Command::new("lendshelf")
        .version(clap::crate_version!())
        .author("Lendshelf Team")
        .about("Borrow, download, and return library e-books")
        .arg(
            Arg::new("config-dir")
                .short('c')
                .long("config-dir")
                .value_name("DIR")
                .help("Directory holding config.toml")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Overrides the configured log level")
                .value_parser(["error", "warn", "info", "debug", "trace"])
                .global(true),
        )
        .subcommand(Command::new("init").about("Write a default configuration file"))
        .subcommand(
            Command::new("login")
                .about("Sign in with a library card")
                .arg(Arg::new("barcode").required(true).value_name("BARCODE").help("Library card barcode"))
                .arg(Arg::new("pin").short('p').long("pin").value_name("PIN").help("PIN (prompted when omitted)")),
        )
        .subcommand(Command::new("sync").about("Fetch the loans feed and update local records"))
        .subcommand(
            Command::new("list")
                .about("List locally known books and their status")
                .arg(
                    Arg::new("downloaded")
                        .short('d')
                        .long("downloaded")
                        .help("Show only downloaded books")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("status").about("Show details for one book").arg(book_arg().required(true)))
        .subcommand(
            Command::new("borrow")
                .about("Borrow or download a book, or place a hold")
                .arg(book_arg().required_unless_present("entry"))
                .arg(
                    Arg::new("entry")
                        .short('e')
                        .long("entry")
                        .value_name("FILE")
                        .help("Catalog entry document to borrow from")
                        .conflicts_with("book"),
                ),
        )
        .subcommand(Command::new("revoke").about("Return a loan or cancel a hold").arg(book_arg().required(true)))
        .subcommand(Command::new("refresh").about("Refresh a book's metadata from the catalog").arg(book_arg().required(true)))
        .subcommand(Command::new("delete").about("Delete downloaded content, keeping the loan").arg(book_arg().required(true)))
        .subcommand(
            Command::new("feed")
                .about("Export the local loans as a feed document")
                .arg(Arg::new("output").short('o').long("output").value_name("FILE").help("Output file path (stdout when omitted)")),
        )
        .subcommand(
            Command::new("logout")
                .about("Sign out and delete all local data")
                .arg(Arg::new("force").short('f').long("force").help("Skip confirmation prompt").action(ArgAction::SetTrue)),
        )
}

fn config_manager(matches: &ArgMatches) -> Result<ConfigManager> {
    let manager = match matches.get_one::<String>("config-dir") {
        Some(dir) => ConfigManager::with_directory(PathBuf::from(dir)),
        None => ConfigManager::new(),
    };
    manager.context("Failed to locate configuration directory")
}

fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let manager = config_manager(&matches)?;
    let config = manager
        .load_with_env_overrides()
        .with_context(|| format!("Failed to load {}", manager.config_path().display()))?;

    let log_level = matches
        .get_one::<String>("log-level")
        .cloned()
        .unwrap_or_else(|| config.app.log_level.to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.tasks.worker_threads)
        .enable_all()
        .build()
        .context("Failed to start worker pool")?;

    runtime.block_on(run(&matches, &manager, &config))
}

async fn run(matches: &ArgMatches, manager: &ConfigManager, config: &Config) -> Result<()> {
    if let Some(("init", _)) = matches.subcommand() {
        return commands::init_config(manager);
    }
    if matches.subcommand().is_none() {
        build_cli().print_help()?;
        return Ok(());
    }

    let library = setup::open_library(manager, config)?;
    let command = async {
        match matches.subcommand() {
            Some(("login", sub_matches)) => commands::login(&library, sub_matches).await,
            Some(("sync", _)) => commands::sync(&library).await,
            Some(("list", sub_matches)) => commands::list_books(&library, sub_matches).await,
            Some(("status", sub_matches)) => commands::show_status(&library, sub_matches).await,
            Some(("borrow", sub_matches)) => commands::borrow(&library, sub_matches).await,
            Some(("revoke", sub_matches)) => commands::revoke(&library, sub_matches).await,
            Some(("refresh", sub_matches)) => commands::refresh(&library, sub_matches).await,
            Some(("delete", sub_matches)) => commands::delete_content(&library, sub_matches).await,
            Some(("feed", sub_matches)) => commands::export_feed(&library, sub_matches).await,
            Some(("logout", sub_matches)) => commands::logout(&library, sub_matches),
            _ => {
                build_cli().print_help()?;
                Ok(())
            }
        }
    };

    tokio::select! {
        result = command => result,
        _ = tokio::signal::ctrl_c() => {
            let cancelled = library.orchestrator().cancel_all();
            log::info!("Interrupted, cancelled {} task(s)", cancelled);
            anyhow::bail!("Interrupted")
        }
    }
}
