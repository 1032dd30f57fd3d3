//! deadcode-emit - report class loads to a deadcode collector
//!
//! Reads fully-qualified class names from stdin, one per line, and feeds each
//! to the emitter as a first-time class load. At end of input the emitter is
//! shut down, sending whatever is still buffered.
//!
//! Typical use is piping a class loader trace into it:
//!
//! ```text
//! app --trace-class-loading | deadcode-emit --allow 'App\'
//! ```

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use deadcode_core::config::EmitterConfig;
use deadcode_core::{Config, Emitter, EmitterHandle, Transport};

#[derive(Parser)]
#[command(name = "deadcode-emit")]
#[command(about = "Report class loads read from stdin to a deadcode collector")]
#[command(version)]
struct Args {
    /// Config file (default: $XDG_CONFIG_HOME/deadcode/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Collector host
    #[arg(long)]
    host: Option<String>,

    /// Collector port
    #[arg(long)]
    port: Option<u16>,

    /// Packet size in bytes (auto-flush threshold and per-packet cap)
    #[arg(long)]
    packet_size: Option<usize>,

    /// Only report classes containing this namespace (repeatable)
    #[arg(long = "allow", value_name = "NAMESPACE")]
    allowed_namespaces: Vec<String>,

    /// Mirror log output to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Command line flags win over the config file
    fn apply(&self, config: &mut EmitterConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(packet_size) = self.packet_size {
            config.packet_size = packet_size;
        }
        if !self.allowed_namespaces.is_empty() {
            config.allowed_namespaces = self.allowed_namespaces.clone();
        }
    }
}

/// Feed each class name from `input` to the hooks.
///
/// Bad input never aborts the run: a line that is not UTF-8 is skipped, and a
/// read error ends the input early. The caller still shuts the emitter down.
fn report_classes<R: BufRead, T: Transport>(mut input: R, hooks: &EmitterHandle<T>) {
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => line_no += 1,
            Err(e) => {
                tracing::warn!(error = %e, line = line_no + 1, "Failed to read stdin, stopping");
                eprintln!("Warning: failed to read stdin after line {}: {}", line_no, e);
                break;
            }
        }

        match std::str::from_utf8(&buf) {
            Ok(line) => {
                let class = line.trim();
                if !class.is_empty() {
                    hooks.on_class_loaded(class);
                }
            }
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "Skipping class name that is not UTF-8");
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    let _log_guard = deadcode_core::logging::init(&config.logging, args.verbose)
        .context("failed to initialize logging")?;

    args.apply(&mut config.emitter);
    config
        .emitter
        .validate()
        .context("invalid emitter configuration")?;

    if !config.emitter.enabled {
        tracing::info!("Emitter disabled, not reporting class loads");
        println!("Emitter is disabled in config.toml; nothing sent.");
        return Ok(());
    }

    tracing::info!(
        host = %config.emitter.host,
        port = config.emitter.port,
        packet_size = config.emitter.packet_size,
        namespaces = ?config.emitter.allowed_namespaces,
        "deadcode-emit starting"
    );

    let hooks = EmitterHandle::new(Emitter::from_config(&config.emitter));

    report_classes(io::stdin().lock(), &hooks);
    hooks.on_shutdown();

    let stats = hooks.stats();
    println!("Classes reported: {}", stats.records_accepted);
    println!("Classes filtered: {}", stats.records_filtered);
    println!("Packets sent:     {}", stats.packets_sent);
    if stats.packets_failed > 0 {
        println!("Packets failed:   {}", stats.packets_failed);
    }

    tracing::info!(
        accepted = stats.records_accepted,
        filtered = stats.records_filtered,
        flushes = stats.flushes,
        packets_sent = stats.packets_sent,
        packets_failed = stats.packets_failed,
        "deadcode-emit finished"
    );

    Ok(())
}
