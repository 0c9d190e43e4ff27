use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn, LevelFilter};

use wstreemap::config::{MapConfig, MessageGrouping};
use wstreemap::replay::{summary, Replay};
use wstreemap::treemap::ChannelNodeObserver;
use wstreemap::WebSocketTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Full indented tree
    Dump,
    /// One line per host
    Summary,
}

/// Build the WebSocket tree map of a recorded proxy capture.
#[derive(Debug, Parser)]
#[command(name = "wstreemap", version, about)]
struct Args {
    /// Capture file, one JSON event per line
    capture: PathBuf,

    /// Configuration file (defaults to the per-user wstreemap.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured message grouping (flat, by-kind)
    #[arg(long)]
    grouping: Option<MessageGrouping>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Dump)]
    format: OutputFormat,

    /// Print every node as it is added
    #[arg(long)]
    watch: bool,
}

fn main() -> Result<()> {
    // Set default logging environment variable if not already set
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info,wstreemap=debug");
    }

    pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .filter_module("wstreemap", LevelFilter::Debug)
        .parse_default_env()
        .init();

    let args = Args::parse();
    info!("Starting wstreemap v{}", env!("CARGO_PKG_VERSION"));

    let mut config = MapConfig::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(grouping) = args.grouping {
        config.message_grouping = grouping;
    }

    let map = WebSocketTreeMap::new(&config);
    map.create_tree();

    let watcher = if args.watch {
        let (observer, receiver) = ChannelNodeObserver::unbounded();
        let id = map.add_node_observer(Arc::new(observer));
        let handle = thread::spawn(move || {
            for batch in receiver {
                for event in batch {
                    let parent = event.parent.map_or_else(|| "-".to_string(), |p| p.to_string());
                    println!("+ {} {} (parent {}, index {}) {}", event.kind, event.node, parent, event.index, event.name);
                }
            }
        });
        Some((id, handle))
    } else {
        None
    };

    let file = File::open(&args.capture)
        .with_context(|| format!("Failed to open capture {}", args.capture.display()))?;
    let mut replay = Replay::new(&map);
    let stats = replay
        .replay_reader(BufReader::new(file))
        .with_context(|| format!("Failed to read capture {}", args.capture.display()))?;
    info!(
        "Replayed {} events, {} hosts in tree",
        stats.events,
        map.host_count()
    );
    if stats.skipped > 0 {
        warn!("{} malformed capture lines were skipped", stats.skipped);
    }

    // Dropping the observer closes the channel and ends the watcher.
    if let Some((id, handle)) = watcher {
        map.remove_node_observer(id);
        if handle.join().is_err() {
            warn!("Watcher thread panicked");
        }
    }

    match args.format {
        OutputFormat::Dump => print!("{}", map.export()),
        OutputFormat::Summary => print!("{}", summary(&map)),
    }
    Ok(())
}
