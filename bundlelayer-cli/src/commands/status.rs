//! Status command - show the manifest and what needs fetching.

use bundlelayer::{AssetProvider, BundleAcquisitionProvider};
use console::style;

use super::{format_size, SourceArgs};
use crate::error::CliError;

pub async fn run(args: SourceArgs) -> Result<(), CliError> {
    let provider = BundleAcquisitionProvider::new();
    provider.open(args.to_config()).await?;

    let manifest = provider.manifest()?;
    let source = provider.manifest_source()?;
    let store = provider.store()?;
    let invalidated = provider.get_invalidated_bundles()?;

    println!("{}", style("Manifest").bold());
    println!("  Build:   {}", manifest.build());
    if !manifest.tag().is_empty() {
        println!("  Tag:     {}", manifest.tag());
    }
    println!("  Source:  {}", source);
    println!("  Bundles: {}", manifest.len());
    println!();
    println!("{}", style("Store").bold());
    println!("  Path:    {}", store.root().display());
    println!("  Bundles: {}", store.len());
    println!();

    if invalidated.is_empty() {
        println!("{} All bundles are valid locally", style("✓").green());
    } else {
        let total: u64 = invalidated.iter().map(|info| info.size).sum();
        println!(
            "{} ({} bundles, {})",
            style("Needs fetch").yellow().bold(),
            invalidated.len(),
            format_size(total)
        );
        for info in &invalidated {
            println!("  {:>10}  {}", format_size(info.size), info.name);
        }
    }

    provider.close();
    Ok(())
}
