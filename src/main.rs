//! `shortcut-kit` - drive the sync engine from a terminal.
//!
//! The home screen is simulated by `<data_dir>/native_bridge.json`; edit it
//! (or use `home unpin` / `home tap`) to see reconciliation and usage
//! aggregation at work.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use shortcut_kit::bridge::FileBridge;
use shortcut_kit::config;
use shortcut_kit::kv::KvStore;
use shortcut_kit::logging;
use shortcut_kit::shortcuts::{ShortcutDraft, ShortcutIcon, ShortcutKind, ShortcutPatch};
use shortcut_kit::sync::{PassReport, SyncEngine};

#[derive(Debug, Parser)]
#[command(name = "shortcut-kit", version, about = "Home-screen shortcut sync engine")]
struct Cli {
    /// Config file (default: ~/.shortcut-kit/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory from the config
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// List stored shortcuts.
    List,
    /// Create a shortcut and wait for its pin verification.
    Add {
        #[arg(long)]
        name: String,
        /// file, link, contact, message, slideshow or text
        #[arg(long)]
        kind: ShortcutKind,
        #[arg(long, default_value = "")]
        uri: String,
        #[arg(long)]
        emoji: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long = "image")]
        images: Vec<String>,
    },
    /// Rename a shortcut.
    Rename { id: String, name: String },
    /// Delete a shortcut (unpins it and records a tombstone).
    Delete { id: String },
    /// Record a tap from inside the app.
    Tap { id: String },
    /// Run the cold-start pass.
    Sync {
        /// Bypass the minimum interval, as on first launch
        #[arg(long)]
        first_launch: bool,
    },
    /// Show usage statistics.
    Stats {
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Print a backup snapshot to stdout.
    Export,
    /// List pending tombstones, optionally acknowledging some.
    Tombstones {
        #[arg(long = "ack")]
        ack: Vec<String>,
    },
    /// Act on the simulated home screen.
    Home {
        #[command(subcommand)]
        cmd: HomeCommand,
    },
}

#[derive(Debug, clap::Subcommand)]
enum HomeCommand {
    /// Drag an icon off the home screen.
    Unpin { id: String },
    /// Tap an icon on the home screen.
    Tap { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };
    let _log_guard = logging::init(&config.get_log_dir());

    let data_dir = cli.data_dir.clone().unwrap_or_else(|| config.get_data_dir());
    let kv = KvStore::new(&data_dir);
    let bridge = Arc::new(FileBridge::new(
        kv.clone(),
        config.get_sync().recently_created_window(),
    ));
    let engine = SyncEngine::open(kv, bridge.clone(), &config)
        .with_context(|| format!("Failed to open data dir {}", data_dir.display()))?;

    run(cli.cmd, &engine, &bridge).await?;
    engine.flush_caches().context("Failed to write caches")?;
    Ok(())
}

async fn run(cmd: Command, engine: &SyncEngine, bridge: &FileBridge) -> Result<()> {
    match cmd {
        Command::List => {
            for s in engine.store().load().await? {
                println!("{}  {:<9} {:>5}  {}", s.id, s.kind, s.usage_count, s.name);
            }
        }
        Command::Add {
            name,
            kind,
            uri,
            emoji,
            phone,
            text,
            images,
        } => {
            let mut draft = ShortcutDraft::new(name, kind, uri);
            if let Some(value) = emoji {
                draft.icon = ShortcutIcon::Emoji { value };
            }
            draft.details.phone_number = phone;
            draft.details.text_body = text;
            draft.details.image_uris = images;

            let created = engine.create_shortcut(draft).await?;
            println!("created {}", created.shortcut.id);
            let outcome = created
                .verification
                .await
                .context("Pin verification task failed")?;
            match outcome.into_pinned(&created.shortcut.id) {
                Ok(true) => println!("pin confirmed"),
                Ok(false) => println!("pin not confirmed yet"),
                Err(e) => println!("{}", e.user_message()),
            }
        }
        Command::Rename { id, name } => {
            let updated = engine.update_shortcut(&id, ShortcutPatch::rename(name)).await?;
            println!("renamed {} to {}", updated.id, updated.name);
        }
        Command::Delete { id } => {
            let outcome = engine.delete_shortcut(&id).await?;
            println!("deleted {}", id);
            if outcome.requires_manual_removal {
                println!("remove the icon from your home screen manually");
            }
        }
        Command::Tap { id } => {
            engine.record_tap(&id).await?;
        }
        Command::Sync { first_launch } => {
            let report = engine.on_cold_start(first_launch).await?;
            print_report(&report);
        }
        Command::Stats { top } => {
            let stats = engine.stats(top).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Export => {
            let snapshot = engine.export_backup().await?;
            println!("{}", snapshot.to_json_pretty()?);
        }
        Command::Tombstones { ack } => {
            if !ack.is_empty() {
                let removed = engine.acknowledge_tombstones(&ack).await?;
                info!(removed = removed, "Tombstones acknowledged");
            }
            for t in engine.pending_tombstones().await? {
                println!("{}  {}", t.shortcut_id, t.deleted_at);
            }
        }
        Command::Home { cmd } => match cmd {
            HomeCommand::Unpin { id } => bridge.simulate_unpin(&id).await?,
            HomeCommand::Tap { id } => {
                bridge
                    .simulate_tap(&id, chrono::Utc::now().timestamp_millis())
                    .await?
            }
        },
    }
    Ok(())
}

fn print_report(report: &PassReport) {
    println!("trigger: {}", report.trigger.as_str());
    println!("reconcile: {}", report.reconcile.label());
    if let Some(usage) = &report.usage {
        println!("native taps: {} ({} applied)", usage.recorded, usage.applied);
    }
    if report.dismissed_notifications > 0 {
        println!("dismissed notifications: {}", report.dismissed_notifications);
    }
}
