use anyhow::Result;
use clap::Parser;
use perfscope::dashboard::{self, Dashboard};
use perfscope::report::load;
use perfscope::trend::Projection;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Render the stress-test performance dashboard")]
struct Args {
    /// Markdown report produced by the stress-test runner.
    #[arg(long, default_value = load::REPORT_FILE)]
    report: PathBuf,

    /// Also write the full dashboard (metrics, trend curve, raw rows) as JSON.
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Args::parse();

    // ─── 2) read the report ──────────────────────────────────────────
    let content = match load::read_report(&args.report)? {
        Some(content) => content,
        None => {
            error!(
                "{} not found. Please run the stress test first.",
                args.report.display()
            );
            return Ok(());
        }
    };

    // ─── 3) load each table on its own ───────────────────────────────
    // A bad column in one table still leaves the other usable.
    let batches = match load::parse_batches(&content) {
        Ok(batches) => batches,
        Err(e) => {
            error!("batch progression table unusable: {:#}", e);
            Vec::new()
        }
    };
    let details = match load::parse_details(&content) {
        Ok(details) => details,
        Err(e) => {
            error!("detailed metrics table unusable: {:#}", e);
            Vec::new()
        }
    };

    // ─── 4) build and show the dashboard ─────────────────────────────
    let dash = dashboard::build(&batches, &details);
    print_dashboard(&dash);

    if let Some(path) = &args.json {
        let json = serde_json::to_string_pretty(&dash)?;
        fs::write(path, json)?;
        info!("wrote dashboard json to {}", path.display());
    }

    Ok(())
}

fn print_dashboard(dash: &Dashboard) {
    match &dash.batch {
        Some(batch) => {
            println!("=== Batch Scalability ===");
            match batch.summary.max_stable_users {
                Some(users) => println!("Max stable concurrent users: {}", users),
                None => println!("Max stable concurrent users: none (no batch passed)"),
            }
            println!("Peak latency observed:       {} ms", batch.summary.peak_latency_ms);
            println!("Total batches run:           {}", batch.summary.batches_run);

            match batch.trend.as_ref().map(|t| t.projection) {
                Some(Projection::Predicted(users)) => println!(
                    "Prediction: based on current trends, the system could theoretically \
                     handle {} users before hitting {} ms latency.",
                    users, batch.threshold_ms
                ),
                Some(Projection::Unknown) => println!(
                    "Prediction: unknown; the trend never reaches {} ms beyond the \
                     observed range.",
                    batch.threshold_ms
                ),
                None => println!("Not enough batches for a trend projection."),
            }
        }
        None => println!("No batch progression data found in report."),
    }

    println!();
    match &dash.detail {
        Some(detail) => {
            println!("=== Detailed Metrics ({} users) ===", detail.users);
            println!(
                "{:<10} {:>7} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9}",
                "operation", "samples", "min", "q1", "median", "q3", "max", "mean"
            );
            for s in &detail.stats {
                println!(
                    "{:<10} {:>7} {:>9.1} {:>9.1} {:>9.1} {:>9.1} {:>9.1} {:>9.1}",
                    s.operation, s.samples, s.min, s.q1, s.median, s.q3, s.max, s.mean
                );
            }
        }
        None => println!("No detailed metrics found in report."),
    }
}
