use anyhow::{Context, Result};
use tracing::info;

use crate::aggregate::aggregate;
use crate::cli::AggregateArgs;

pub fn run(args: AggregateArgs) -> Result<()> {
    let summary = aggregate(&args.results)?;
    info!(
        files = args.results.len(),
        groups = summary.groups.len(),
        "aggregated results"
    );

    if args.json {
        let rendered = serde_json::to_string_pretty(&summary.report())
            .context("failed to serialize aggregate report")?;
        println!("{rendered}");
        return Ok(());
    }

    println!("\n=== Model Benchmark Percentage Scores ===");
    for line in summary.percentage_lines() {
        println!("{line}");
    }
    Ok(())
}
