//! `outfitsync apply` — Apply commands from text without asking a model.

use outfitsync_pipeline::{apply_batch, BatchReport};

use super::{text_or_stdin, CliResult, Workspace};
use crate::Target;

pub async fn run(target: &Target, text: Option<String>) -> CliResult {
    let text = text_or_stdin(text)?;
    let ws = Workspace::open(target).await?;
    ws.require_bound()?;

    let report = apply_batch(ws.manager(), &text);
    if report.summary().is_some() {
        ws.persist().await?;
    }
    print_report(&report);
    Ok(())
}

pub fn print_report(report: &BatchReport) {
    for applied in &report.successful {
        println!("  ✅ {}", applied.message);
    }
    for command in &report.unchanged {
        println!("  ➖ {command} (already so)");
    }
    for low in &report.low_confidence {
        println!("  ⚠️  {} (confidence {})", low.command, low.confidence);
    }
    for failed in &report.failed {
        println!("  ❌ {} ({})", failed.raw, failed.reason);
    }
    match report.summary() {
        Some(summary) => println!("{summary}"),
        None if report.total() == 0 => println!("No commands found"),
        None => println!("No outfit changes"),
    }
}
