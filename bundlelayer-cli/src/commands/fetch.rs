//! Fetch command - acquire bundles through the provider.

use std::sync::Arc;

use bundlelayer::jobs::{JobInfo, JobStatus};
use bundlelayer::manifest::BundleLoad;
use bundlelayer::{AssetProvider, BundleAcquisitionProvider};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::oneshot;
use tracing::debug;

use super::SourceArgs;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Bundles to fetch; dependencies are added automatically
    #[arg(value_name = "BUNDLE")]
    pub bundles: Vec<String>,
}

pub async fn run(args: FetchArgs) -> Result<(), CliError> {
    let provider = BundleAcquisitionProvider::new();
    provider.open(args.source.to_config()).await?;

    let load = if args.bundles.is_empty() {
        let invalidated = provider.get_invalidated_bundles()?;
        BundleLoad::new(invalidated.into_iter().map(|info| info.name))
    } else {
        BundleLoad::new(args.bundles)
    };

    if load.is_empty() {
        println!("{} Nothing to fetch", style("✓").green());
        provider.close();
        return Ok(());
    }
    debug!(bundles = ?load.names(), "Requesting load");

    let (done_tx, done_rx) = oneshot::channel();
    let jobs = provider.ensure_bundles(
        &load,
        Box::new(move || {
            let _ = done_tx.send(());
        }),
    )?;

    if jobs.is_empty() {
        println!("{} All requested bundles are valid locally", style("✓").green());
        provider.close();
        return Ok(());
    }

    let progress = progress_bar(jobs.len() as u64);
    for job in &jobs {
        let job = Arc::clone(job);
        let progress = progress.clone();
        tokio::spawn(async move {
            job.wait().await;
            progress.set_message(job.name().to_string());
            progress.inc(1);
        });
    }

    let barrier = done_rx.await;
    progress.finish_and_clear();
    barrier.map_err(|_| CliError::Interrupted)?;

    let failed = report(&jobs);
    provider.close();

    if failed > 0 {
        return Err(CliError::FetchFailed {
            failed,
            total: jobs.len(),
        });
    }
    println!("{} Fetched {} bundles", style("✓").green(), jobs.len());
    Ok(())
}

fn progress_bar(len: u64) -> ProgressBar {
    let progress = ProgressBar::new(len);
    let style = ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress.set_style(style);
    progress
}

/// Print one line per job and return how many did not succeed.
fn report(jobs: &[Arc<JobInfo>]) -> usize {
    let mut failed = 0;
    for job in jobs {
        match job.status() {
            JobStatus::Succeeded => println!(
                "  {} {} ({:.1}s)",
                style("✓").green(),
                job.name(),
                job.elapsed().as_secs_f64()
            ),
            status => {
                failed += 1;
                let reason = job.error().unwrap_or_default();
                println!("  {} {} [{}] {}", style("✗").red(), job.name(), status, reason);
            }
        }
    }
    failed
}
