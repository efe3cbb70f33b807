//! dompick CLI
//!
//! Drives the picker over a captured page document: load a JSON dump, show
//! the hover hierarchy at a point, or pick the element there and print its
//! serialized payload.

use anyhow::Context;
use clap::Parser;
use dompick::dom::{PageDocument, PageEvent};
use dompick::page::PageRuntime;
use dompick::relay::Command;
use dompick::select::SelectorEngine;
use dompick::serialize::CaptureOptions;
use dompick::OverlayTheme;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dompick")]
#[command(version)]
#[command(about = "Pick an element from a captured page document", long_about = None)]
struct Cli {
    /// Path to a page document dump (JSON)
    dump: PathBuf,

    /// Viewport x coordinate of the pointer
    #[arg(long, short = 'x')]
    x: f64,

    /// Viewport y coordinate of the pointer
    #[arg(long, short = 'y')]
    y: f64,

    /// Show the hover overlay hierarchy instead of picking
    #[arg(long)]
    hover: bool,

    /// Use the compact 10k HTML cap instead of the 50k default
    #[arg(long)]
    compact: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let json = std::fs::read_to_string(&cli.dump)
        .with_context(|| format!("Failed to read {}", cli.dump.display()))?;
    let document = PageDocument::from_json(&json)?;

    let capture = if cli.compact { CaptureOptions::compact() } else { CaptureOptions::default() };
    let engine = SelectorEngine::new(OverlayTheme::default(), capture);
    let mut page = PageRuntime::with_engine(document, engine);

    page.handle_command(&Command::StartSelection);
    page.inject(PageEvent::PointerMove { x: cli.x, y: cli.y });

    if cli.hover {
        let snapshot = page.snapshot_engine();
        println!("{}", serde_json::to_string_pretty(&snapshot.overlays)?);
        return Ok(());
    }

    match page.inject(PageEvent::Click { x: cli.x, y: cli.y }) {
        Some(payload) => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
        None => anyhow::bail!("No selectable element at ({}, {})", cli.x, cli.y),
    }
}
