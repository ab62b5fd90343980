// FILE: crates/cli/src/commands.rs

use crate::prompt::read_pin;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::ArgMatches;
use console::{style, Term};
use lendshelf_config::ConfigManager;
use lendshelf_core::{AccountCredentials, BookId, BookStatus, FeedEntry, StatusKind};
use lendshelf_feed_parser::{FeedParser, JsonFeedParser};
use lendshelf_sync_engine::{EntryFailedCallback, Library};
use std::sync::Arc;

/// Shortest ID prefix accepted on the command line
const MIN_PREFIX_LEN: usize = 4;

/// Write a default configuration file
pub fn init_config(manager: &ConfigManager) -> Result<()> {
    let created = manager
        .initialize()
        .context("Failed to write configuration")?;

    if created {
        println!(
            "{} Configuration written to {}",
            style("✓").green().bold(),
            manager.config_path().display()
        );
    } else {
        println!(
            "Configuration already exists at {}",
            manager.config_path().display()
        );
    }

    for issue in manager.validate().context("Failed to validate configuration")? {
        println!("  {} {}", style("warning:").yellow(), issue);
    }
    Ok(())
}

/// Sign in with a library card
pub async fn login(library: &Library, matches: &ArgMatches) -> Result<()> {
    let barcode = matches
        .get_one::<String>("barcode")
        .ok_or_else(|| anyhow::anyhow!("Barcode is required"))?;

    let pin = match matches.get_one::<String>("pin") {
        Some(pin) => pin.clone(),
        None => match read_pin(&Term::stderr()) {
            Some(pin) => pin,
            None => bail!("A PIN is required"),
        },
    };

    let accepted = library
        .login(AccountCredentials::new(barcode.clone(), pin))
        .join()
        .await
        .context("Login failed")?;

    println!(
        "{} Signed in as {}",
        style("✓").green().bold(),
        style(&accepted.barcode).bold()
    );
    Ok(())
}

/// Fetch the loans feed and update local records
pub async fn sync(library: &Library) -> Result<()> {
    ensure_loaded(library).await?;

    let on_entry_failed: EntryFailedCallback = Arc::new(|failure| {
        eprintln!(
            "  {} {}: {}",
            style("skipped").yellow(),
            failure.entry_id,
            failure.error
        );
    });
    let report = library
        .sync(Some(on_entry_failed))
        .join()
        .await
        .context("Sync failed")?;

    println!(
        "{} Synced {} book(s)",
        style("✓").green().bold(),
        style(report.processed).bold().cyan()
    );
    if !report.failures.is_empty() {
        println!("  {} entries could not be stored", report.failures.len());
    }
    if !report.stale.is_empty() {
        println!("\nNo longer on the loans feed:");
        for id in &report.stale {
            println!("  {}  {}", style(id.short()).dim(), title_of(library, id));
        }
    }
    Ok(())
}

/// List locally known books and their status
pub async fn list_books(library: &Library, matches: &ArgMatches) -> Result<()> {
    ensure_loaded(library).await?;
    let downloaded_only = matches.get_flag("downloaded");

    let mut statuses = library.statuses();
    if downloaded_only {
        statuses.retain(|status| status.kind() == StatusKind::Downloaded);
    }

    if statuses.is_empty() {
        println!("No books found. Use 'sync' to fetch your loans.");
        return Ok(());
    }

    println!("\n{} Books", style(statuses.len()).bold().cyan());
    println!("{}", "=".repeat(80));
    for status in statuses {
        println!(
            "{}  {:<18} {}",
            style(status.id().short()).dim(),
            describe_status(&status),
            title_of(library, status.id())
        );
    }
    Ok(())
}

/// Show details for one book
pub async fn show_status(library: &Library, matches: &ArgMatches) -> Result<()> {
    ensure_loaded(library).await?;
    let id = book_id(library, matches)?;

    let status = library
        .status(&id)
        .ok_or_else(|| anyhow::anyhow!("No local record for {}", id))?;

    println!("\n{}", style("Book Information").bold().cyan());
    println!("{}", "=".repeat(80));
    println!("ID: {}", id);
    println!("Status: {}", style(describe_status(&status)).bold());

    if let Some(snapshot) = library.snapshot(&id) {
        print_entry(&snapshot.entry);
        println!("Cover: {}", yes_no(snapshot.cover_present));
        println!("Downloaded: {}", yes_no(snapshot.content_present));
        if snapshot.rights.is_some() {
            println!("Rights: present");
        }
    }
    Ok(())
}

/// Borrow or download a book, or place a hold
pub async fn borrow(library: &Library, matches: &ArgMatches) -> Result<()> {
    ensure_loaded(library).await?;

    let entry = match matches.get_one::<String>("entry") {
        Some(path) => {
            let bytes =
                std::fs::read(path).with_context(|| format!("Failed to read {}", path))?;
            JsonFeedParser::new()
                .parse_entry(&bytes)
                .with_context(|| format!("Failed to parse entry document {}", path))?
        }
        None => {
            let id = book_id(library, matches)?;
            library
                .snapshot(&id)
                .map(|snapshot| snapshot.entry)
                .ok_or_else(|| anyhow::anyhow!("No local record for {}", id))?
        }
    };

    println!("Borrowing {}", style(&entry.title).bold());
    let target = BookId::from_entry(&entry);
    let observer_library = library.clone();
    let subscription = library.subscribe(move |id| {
        if *id != target {
            return;
        }
        if let Some(status @ BookStatus::DownloadInProgress { .. }) = observer_library.status(id) {
            eprint!("\r  {}", describe_status(&status));
        }
    });

    let result = library.borrow(entry).join().await;
    library.unsubscribe(subscription);
    eprintln!();

    let status = result.context("Borrow failed")?;
    println!(
        "{} {}",
        style("✓").green().bold(),
        describe_status(&status)
    );
    Ok(())
}

/// Return a loan or cancel a hold
pub async fn revoke(library: &Library, matches: &ArgMatches) -> Result<()> {
    ensure_loaded(library).await?;
    let id = book_id(library, matches)?;
    let title = title_of(library, &id);

    library
        .revoke(id)
        .join()
        .await
        .with_context(|| format!("Failed to return '{}'", title))?;

    println!("{} Returned '{}'", style("✓").green().bold(), title);
    Ok(())
}

/// Refresh a book's metadata from the catalog
pub async fn refresh(library: &Library, matches: &ArgMatches) -> Result<()> {
    ensure_loaded(library).await?;
    let id = book_id(library, matches)?;

    let status = library
        .update_metadata(id.clone())
        .join()
        .await
        .context("Failed to refresh metadata")?;

    println!(
        "{} {} is {}",
        style("✓").green().bold(),
        title_of(library, &id),
        describe_status(&status)
    );
    Ok(())
}

/// Delete downloaded content, keeping the loan
pub async fn delete_content(library: &Library, matches: &ArgMatches) -> Result<()> {
    ensure_loaded(library).await?;
    let id = book_id(library, matches)?;

    let status = library
        .delete_local_content(&id)
        .context("Failed to delete content")?;

    println!(
        "{} Deleted content of '{}' (now {})",
        style("✓").green().bold(),
        title_of(library, &id),
        describe_status(&status)
    );
    Ok(())
}

/// Export the local loans as a feed document
pub async fn export_feed(library: &Library, matches: &ArgMatches) -> Result<()> {
    let feed = library
        .generate_feed()
        .join()
        .await
        .context("Failed to generate feed")?;
    let document = JsonFeedParser::pretty()
        .serialize_feed(&feed.entries)
        .context("Failed to serialize feed")?;

    match matches.get_one::<String>("output") {
        Some(path) => {
            std::fs::write(path, &document).with_context(|| format!("Failed to write {}", path))?;
            println!(
                "{} Exported {} book(s) to {}",
                style("✓").green().bold(),
                feed.entry_count(),
                path
            );
        }
        None => println!("{}", String::from_utf8_lossy(&document)),
    }
    Ok(())
}

/// Sign out and delete all local data
pub fn logout(library: &Library, matches: &ArgMatches) -> Result<()> {
    if !matches.get_flag("force") {
        let term = Term::stderr();
        term.write_str("Delete all downloaded books and sign out? [y/N]: ")?;
        let answer = term.read_line().context("Failed to read confirmation")?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    library.logout();
    println!("{} Signed out", style("✓").green().bold());
    Ok(())
}

async fn ensure_loaded(library: &Library) -> Result<()> {
    library
        .load_account_data()
        .join()
        .await
        .context("Failed to load local records")?;
    Ok(())
}

fn book_id(library: &Library, matches: &ArgMatches) -> Result<BookId> {
    let arg = matches
        .get_one::<String>("book")
        .ok_or_else(|| anyhow::anyhow!("Book ID is required"))?;
    let known: Vec<BookId> = library
        .statuses()
        .iter()
        .map(|status| status.id().clone())
        .collect();
    resolve_book_id(arg, &known)
}

/// Resolves a full ID, a unique ID prefix, or a catalog entry ID
pub fn resolve_book_id(arg: &str, known: &[BookId]) -> Result<BookId> {
    let arg = arg.trim();
    if BookId::is_digest(arg) {
        return Ok(BookId::from_raw(arg));
    }

    if arg.len() >= MIN_PREFIX_LEN && arg.bytes().all(|b| b.is_ascii_hexdigit()) {
        let prefix = arg.to_ascii_lowercase();
        let matching: Vec<&BookId> = known
            .iter()
            .filter(|id| id.as_str().starts_with(&prefix))
            .collect();
        match matching.as_slice() {
            [id] => return Ok((*id).clone()),
            [] => {}
            _ => bail!("'{}' matches {} books; use a longer prefix", arg, matching.len()),
        }
    }

    Ok(BookId::from_entry_id(arg))
}

/// One-line human description of a status
pub fn describe_status(status: &BookStatus) -> String {
    let label = status.kind().label();
    match status {
        BookStatus::Held {
            queue_position: Some(position),
            ..
        } => format!("{} (#{} in queue)", label, position),
        BookStatus::HeldReady {
            end_date: Some(end),
            ..
        } => format!("{} until {}", label, format_date(end)),
        BookStatus::Loaned {
            loan_end_date: Some(end),
            ..
        }
        | BookStatus::Downloaded {
            loan_end_date: Some(end),
            ..
        } => format!("{} until {}", label, format_date(end)),
        BookStatus::DownloadInProgress { bytes_so_far, .. } => match status.download_fraction() {
            Some(fraction) => format!("{} {:.0}%", label, fraction * 100.0),
            None => format!("{} {} bytes", label, bytes_so_far),
        },
        BookStatus::DownloadFailed { cause, .. } | BookStatus::RevokeFailed { cause, .. } => {
            format!("{}: {}", label, cause)
        }
        _ => label.to_string(),
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn title_of(library: &Library, id: &BookId) -> String {
    library
        .snapshot(id)
        .map(|snapshot| snapshot.entry.title)
        .unwrap_or_else(|| id.short().to_string())
}

fn print_entry(entry: &FeedEntry) {
    println!("Title: {}", style(&entry.title).bold());
    if !entry.authors.is_empty() {
        println!("Author: {}", entry.authors.join(", "));
    }
    println!("Catalog ID: {}", entry.id);
    println!("Availability: {}", entry.availability.name());
    for acquisition in &entry.acquisitions {
        println!("Link ({}): {}", acquisition.kind, acquisition.href);
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
