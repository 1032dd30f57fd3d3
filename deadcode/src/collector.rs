//! deadcode-collector - receive class loads and report dead code
//!
//! This tool provides commands for:
//! - Listening for class load packets and keeping per-class counts
//! - Seeding the known class list and removing classes from it
//! - Reporting dead (never loaded) and active classes
//!
//! `listen` holds an advisory lock on the inventory while it runs; `reset` and
//! `remove` refuse to touch a locked inventory.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Inventory: $XDG_DATA_HOME/deadcode/data.json (~/.local/share/deadcode/data.json)
//! - Logs: $XDG_STATE_HOME/deadcode/deadcode.log.<date> (~/.local/state/deadcode/)
//! - Config: $XDG_CONFIG_HOME/deadcode/config.toml (~/.config/deadcode/config.toml)

mod storage_lock;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deadcode_core::{CollectorListener, Config, SharedInventory};

#[derive(Parser)]
#[command(name = "deadcode-collector")]
#[command(about = "Collect class loads and report dead code")]
#[command(version)]
struct Args {
    /// Config file (default: $XDG_CONFIG_HOME/deadcode/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Inventory file (default: from config)
    #[arg(short, long, global = true)]
    storage: Option<PathBuf>,

    /// Mirror log output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Receive class load packets until interrupted
    Listen {
        /// UDP port (default: from config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Seconds between inventory saves (default: from config)
        #[arg(long)]
        save_interval: Option<u64>,
    },

    /// Show dead/active totals
    Status,

    /// List classes that were never loaded
    Dead,

    /// List loaded classes, most loaded first
    Active,

    /// Start over with the given class list, all marked dead
    Reset {
        /// File with one class per line (default: stdin)
        file: Option<PathBuf>,
    },

    /// Stop tracking the given classes
    Remove {
        /// File with one class per line (default: stdin)
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    let _log_guard = deadcode_core::logging::init(&config.logging, args.verbose)
        .context("failed to initialize logging")?;

    let storage = args
        .storage
        .clone()
        .unwrap_or_else(|| config.collector.storage_path());

    match args.command {
        Command::Listen {
            port,
            save_interval,
        } => cmd_listen(
            &storage,
            port.unwrap_or(config.collector.port),
            Duration::from_secs(save_interval.unwrap_or(config.collector.save_interval_secs)),
        ),
        Command::Status => cmd_status(&storage),
        Command::Dead => cmd_dead(&storage),
        Command::Active => cmd_active(&storage),
        Command::Reset { file } => cmd_reset(&storage, file.as_deref()),
        Command::Remove { file } => cmd_remove(&storage, file.as_deref()),
    }
}

fn load_inventory(storage: &Path) -> Result<SharedInventory> {
    SharedInventory::load(storage)
        .with_context(|| format!("failed to load inventory from {}", storage.display()))
}

fn save_inventory(inventory: &SharedInventory, storage: &Path) -> Result<()> {
    inventory
        .save(storage)
        .with_context(|| format!("failed to save inventory to {}", storage.display()))
}

/// Read a class list from a file or stdin
fn read_classes(file: Option<&Path>) -> Result<Vec<String>> {
    let raw = match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read class list from stdin")?;
            raw
        }
    };

    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn cmd_listen(storage: &Path, port: u16, save_interval: Duration) -> Result<()> {
    let _lock = storage_lock::acquire(storage)?;
    let inventory = load_inventory(storage)?;
    let summary = inventory.read().summary();
    println!("Inventory:   {}", storage.display());
    println!(
        "Classes:     {} (dead {}, active {})",
        summary.total(),
        summary.dead,
        summary.active
    );

    let listener = CollectorListener::bind(("0.0.0.0", port))
        .with_context(|| format!("failed to bind UDP port {}", port))?;
    println!("Listening:   udp://{}", listener.local_addr()?);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed))
            .context("failed to install signal handler")?;
    }

    let saver = {
        let inventory = inventory.clone();
        let shutdown = Arc::clone(&shutdown);
        let storage = storage.to_path_buf();
        thread::spawn(move || {
            let mut last_save = Instant::now();
            while !shutdown.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(200));
                if last_save.elapsed() >= save_interval {
                    if let Err(e) = inventory.save(&storage) {
                        tracing::warn!(error = %e, "Periodic inventory save failed");
                    }
                    last_save = Instant::now();
                }
            }
        })
    };

    let served = listener.serve(&inventory, &shutdown);
    shutdown.store(true, Ordering::Relaxed);
    join_saver(saver);
    served?;

    println!("Saving...");
    save_inventory(&inventory, storage)?;

    let summary = inventory.read().summary();
    println!("Dead {} Active {}", summary.dead, summary.active);
    Ok(())
}

/// Wait for the periodic saver. Returns false if it panicked; the caller still
/// performs the final save.
fn join_saver(saver: thread::JoinHandle<()>) -> bool {
    match saver.join() {
        Ok(()) => true,
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::warn!(%reason, "Inventory saver thread panicked");
            eprintln!("Warning: periodic inventory saver panicked: {}", reason);
            false
        }
    }
}

fn cmd_status(storage: &Path) -> Result<()> {
    let inventory = load_inventory(storage)?;
    let inventory = inventory.read();
    let summary = inventory.summary();

    println!("Dead Code Collector");
    println!("===================");
    println!();
    println!("Inventory:   {}", storage.display());
    println!(
        "Logs:        {}.<date>",
        deadcode_core::logging::log_file_path().display()
    );
    println!("Since:       {}", inventory.since.format("%d %b %y %H:%M UTC"));
    println!("Classes:     {}", summary.total());
    println!("Dead:        {}", summary.dead);
    println!("Active:      {}", summary.active);

    if summary.total() == 0 {
        println!();
        println!("No classes tracked yet. Seed the class list with 'reset'.");
    }

    Ok(())
}

fn cmd_dead(storage: &Path) -> Result<()> {
    let inventory = load_inventory(storage)?;
    let inventory = inventory.read();
    let dead = inventory.dead();

    println!("Dead classes: {}", dead.len());
    println!();
    for class in dead {
        println!("{}", class);
    }
    Ok(())
}

fn cmd_active(storage: &Path) -> Result<()> {
    let inventory = load_inventory(storage)?;
    let inventory = inventory.read();
    let active = inventory.active();

    println!("Active classes: {}", active.len());
    println!();
    println!("{:>10}  {}", "Loads", "Class");
    println!("{:-<60}", "");
    for (class, count) in active {
        println!("{:>10}  {}", count, class);
    }
    Ok(())
}

fn cmd_reset(storage: &Path, file: Option<&Path>) -> Result<()> {
    let classes = read_classes(file)?;
    let _lock = storage_lock::acquire(storage)?;
    let inventory = load_inventory(storage)?;
    inventory.write().reset(&classes);
    save_inventory(&inventory, storage)?;

    tracing::info!(classes = classes.len(), "Inventory reset");
    println!("Reset inventory with {} class(es)", classes.len());
    Ok(())
}

fn cmd_remove(storage: &Path, file: Option<&Path>) -> Result<()> {
    let classes = read_classes(file)?;
    let _lock = storage_lock::acquire(storage)?;
    let inventory = load_inventory(storage)?;
    let removed = {
        let mut inventory = inventory.write();
        classes.iter().filter(|class| inventory.remove(class)).count()
    };
    save_inventory(&inventory, storage)?;

    tracing::info!(removed, "Classes removed from inventory");
    println!("Removed {} of {} class(es)", removed, classes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_saver_reports_panic() {
        let saver = thread::spawn(|| panic!("disk on fire"));
        assert!(!join_saver(saver));

        let saver = thread::spawn(|| {});
        assert!(join_saver(saver));
    }

    #[test]
    fn test_read_classes_trims_and_skips_blank_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("classes.txt");
        fs::write(&file, "  App\\Foo \n\n\tApp\\Bar\n").unwrap();
        assert_eq!(read_classes(Some(&file)).unwrap(), vec!["App\\Foo", "App\\Bar"]);
    }
}
