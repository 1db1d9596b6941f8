//! `checkin` - CLI for the QR code check-in desk.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::warn;

use checkin::cli::{
    AdmitCommand, ClearCommand, Cli, Command, ConfigCommand, EventCommand, ExportCommand,
    ListCommand, OutputFormat, ScanCommand,
};
use checkin::{
    init_logging, ops, CheckInFlow, ClearOutcome, Config, FeedSource, Guest, GuestStore,
    QrExporter, Scanner, Session, SessionEvent, Storage,
};

/// Capacity of the session event channel.
const EVENT_BUFFER: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Scan(cmd) => handle_scan(&config, cmd).await,
        Command::Admit(cmd) => handle_admit(&config, &cmd),
        Command::List(cmd) => handle_list(&config, &cmd),
        Command::Stats(cmd) => handle_stats(&config, cmd.json),
        Command::Event(cmd) => handle_event(&config, cmd),
        Command::Clear(cmd) => handle_clear(&config, &cmd),
        Command::Export(cmd) => handle_export(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_store(config: &Config) -> anyhow::Result<GuestStore> {
    let storage = Storage::open(config.database_path())?;
    let store = GuestStore::load(Box::new(storage), config.event.default_name.clone())?;
    Ok(store)
}

async fn handle_scan(config: &Config, cmd: ScanCommand) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let flow = CheckInFlow::new(&config.checkin);
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    let mut session = Session::new(store, flow, std::io::stdout());
    if let Some(feed) = cmd.feed {
        let scanner = Scanner::new(Box::new(FeedSource::new(feed)), tx.clone());
        session = session.with_scanner(scanner);
    }

    spawn_console(tx.clone());
    spawn_interrupt(tx);

    session.run(rx).await?;
    Ok(())
}

/// Forward console lines to the session; end it on EOF.
///
/// Runs on a plain thread: a blocking stdin read inside the runtime would
/// hold up shutdown until the next line arrives.
fn spawn_console(tx: mpsc::Sender<SessionEvent>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(SessionEvent::Input(line)).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Console read failed");
                    break;
                }
            }
        }
        let _ = tx.blocking_send(SessionEvent::Quit);
    });
}

fn spawn_interrupt(tx: mpsc::Sender<SessionEvent>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(SessionEvent::Quit).await;
        }
    });
}

fn handle_admit(config: &Config, cmd: &AdmitCommand) -> anyhow::Result<()> {
    let mut store = open_store(config)?;

    let check_in = match ops::admit(
        &mut store,
        &config.checkin,
        &cmd.payload,
        cmd.party_size,
        cmd.gifts,
    ) {
        Ok(check_in) => check_in,
        Err(e) if e.is_duplicate() => return Err(e).context("guest not admitted again"),
        Err(e) => return Err(e.into()),
    };

    println!("{}", check_in.notification());
    match check_in.persist_error {
        Some(e) if e.is_storage_error() => Err(e).context("check-in recorded but not saved"),
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn handle_list(config: &Config, cmd: &ListCommand) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let limit = cmd.limit.unwrap_or(usize::MAX);
    let guests: Vec<&Guest> = store.guests().iter().take(limit).collect();

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&guests)?),
        OutputFormat::Plain => {
            for guest in &guests {
                println!(
                    "{}  {}  {}  party {}  gifts {}",
                    check_in_time(guest),
                    guest.name,
                    guest.phone,
                    guest.party_size,
                    guest.gift_count
                );
            }
        }
        OutputFormat::Table => print_table(store.event_name(), &guests),
    }
    Ok(())
}

fn check_in_time(guest: &Guest) -> String {
    guest
        .checked_in_at
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

fn print_table(event_name: &str, guests: &[&Guest]) {
    println!("{event_name}");
    if guests.is_empty() {
        println!("No guests checked in yet.");
        return;
    }

    let name_width = guests
        .iter()
        .map(|g| g.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Name".len());
    let phone_width = guests
        .iter()
        .map(|g| g.phone.chars().count())
        .max()
        .unwrap_or(0)
        .max("Phone".len());

    println!(
        "{:<16}  {:<name_width$}  {:<phone_width$}  {:>5}  {:>5}",
        "Checked in", "Name", "Phone", "Party", "Gifts"
    );
    println!(
        "{}",
        "-".repeat(16 + name_width + phone_width + 5 + 5 + 8)
    );
    for guest in guests {
        println!(
            "{:<16}  {:<name_width$}  {:<phone_width$}  {:>5}  {:>5}",
            check_in_time(guest),
            guest.name,
            guest.phone,
            guest.party_size,
            guest.gift_count
        );
    }
}

fn handle_stats(config: &Config, json: bool) -> anyhow::Result<()> {
    let storage = Storage::open(config.database_path())?;
    let storage_stats = storage.stats()?;
    let database_path = storage.path().to_path_buf();
    let store = GuestStore::load(Box::new(storage), config.event.default_name.clone())?;

    if json {
        let stats = serde_json::json!({
            "event_name": store.event_name(),
            "checked_in": store.count(),
            "people_present": store.total_people(),
            "gifts": store.total_gifts(),
            "database_path": database_path,
            "database_entries": storage_stats.entries,
            "database_size_bytes": storage_stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}", store.event_name());
        println!("{}", "-".repeat(store.event_name().chars().count()));
        println!("Checked in:      {}", store.count());
        println!("People present:  {}", store.total_people());
        println!("Gifts:           {}", store.total_gifts());
        println!("Database:        {}", database_path.display());
        println!(
            "Database size:   {} bytes, {} entries",
            storage_stats.db_size_bytes, storage_stats.entries
        );
    }
    Ok(())
}

fn handle_event(config: &Config, cmd: EventCommand) -> anyhow::Result<()> {
    let mut store = open_store(config)?;
    match cmd {
        EventCommand::Show => println!("{}", store.event_name()),
        EventCommand::Rename { name } => {
            store.set_event_name(&name)?;
            println!("Event renamed to \"{}\"", store.event_name());
        }
    }
    Ok(())
}

fn handle_clear(config: &Config, cmd: &ClearCommand) -> anyhow::Result<()> {
    let mut store = open_store(config)?;

    match ops::clear(&mut store, cmd.yes)? {
        ClearOutcome::Unconfirmed { pending } => {
            println!("This will remove all {pending} checked-in guests.");
            println!("Use --yes to confirm.");
        }
        ClearOutcome::Cleared { removed } => println!("Cleared {removed} guests."),
    }
    Ok(())
}

fn handle_export(config: &Config, cmd: &ExportCommand) -> anyhow::Result<()> {
    let text = match cmd.input_path() {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read guest list from stdin")?;
            text
        }
    };

    let exporter = QrExporter::from_config(&config.export)?;

    if cmd.dry_run {
        let plan = exporter.plan(&text)?;
        for entry in &plan.entries {
            println!("{}  <- {}", entry.file_name, entry.payload);
        }
        println!(
            "{} QR codes planned, {} lines skipped",
            plan.entries.len(),
            plan.skipped_lines
        );
        return Ok(());
    }

    let report = exporter.export(&text)?;
    let output = cmd
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.export.archive_name));
    report.write_to(&output)?;

    println!(
        "Wrote {} QR codes to {} ({} lines skipped)",
        report.entries.len(),
        output.display(),
        report.skipped_lines
    );
    println!("blake3: {}", report.digest);
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:       {}", config.database_path().display());
                println!();
                println!("[Event]");
                println!("  Default name:        {}", config.event.default_name);
                println!();
                println!("[Check-in]");
                println!("  Max party size:      {}", config.checkin.max_party_size);
                println!("  Default party size:  {}", config.checkin.default_party_size);
                println!();
                println!("[Export]");
                println!("  Image size:          {}", config.export.image_size);
                println!("  Quiet zone:          {}", config.export.quiet_zone);
                println!("  Dark color:          {}", config.export.dark_color);
                println!("  Light color:         {}", config.export.light_color);
                println!("  Archive name:        {}", config.export.archive_name);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
