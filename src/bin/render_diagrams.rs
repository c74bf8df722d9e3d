// src/bin/render_diagrams.rs

use anyhow::Result;
use clap::Parser;
use perfscope::render;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Batch-render PlantUML diagrams to PNG")]
struct Args {
    /// Directory tree holding the .puml sources.
    #[arg(long, default_value = "docs/diagrams")]
    diagrams: PathBuf,

    /// Path to plantuml.jar.
    #[arg(long, default_value = "plantuml.jar")]
    jar: PathBuf,

    /// Concurrent renderer invocations.
    #[arg(long, default_value_t = render::DEFAULT_WORKERS)]
    workers: usize,

    /// Where to write the JSON outcome summary.
    #[arg(long, default_value = "render-summary.json")]
    summary: PathBuf,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Args::parse();

    let sources = render::discover_sources(&args.diagrams)?;
    if sources.is_empty() {
        info!("no .puml files under {}; nothing to do", args.diagrams.display());
        return Ok(());
    }
    info!("{} diagrams to render", sources.len());

    let summary = render::render_all(&args.jar, sources, args.workers)?;

    let json = serde_json::to_string_pretty(&summary)?;
    let mut file = File::create(&args.summary)?;
    file.write_all(json.as_bytes())?;

    println!(
        "Rendered {}/{} diagrams ({} failed); summary written to {}",
        summary.rendered,
        summary.total,
        summary.failed,
        args.summary.display()
    );

    Ok(())
}
