mod app;
mod hierarchy;
mod util;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::{DependencyAtlasApp, ExploreSettings, MAX_DEPTH};
use crate::hierarchy::HttpHierarchySource;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the hierarchy backend.
    #[arg(
        long,
        env = "DEPENDENCY_ATLAS_BACKEND",
        default_value = "http://127.0.0.1:5000/"
    )]
    backend_url: String,

    /// Levels around the active node to fetch.
    #[arg(
        long,
        default_value_t = 2,
        value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_DEPTH))
    )]
    depth: u32,

    /// Initial focus; the backend picks one when omitted.
    #[arg(long)]
    active_node: Option<String>,

    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    /// Tracing filter directive, used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log: String,
}

fn init_tracing(directive: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter `{directive}`"))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log)?;

    let timeout = Duration::from_millis(args.timeout_ms);
    let source = HttpHierarchySource::new(&args.backend_url, timeout)
        .with_context(|| format!("failed to set up a client for {}", args.backend_url))?;
    info!(backend = source.base_url(), depth = args.depth, "starting");

    let settings = ExploreSettings::new(args.depth);
    let active_node = args.active_node.unwrap_or_default();
    let source = Arc::new(source);

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "dependency-atlas",
        options,
        Box::new(move |cc| {
            Ok(Box::new(DependencyAtlasApp::new(
                cc,
                source,
                settings,
                active_node,
            )))
        }),
    )
    .map_err(|error| anyhow!("window loop failed: {error}"))
}
