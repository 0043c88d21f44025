//! CLI command implementations.

pub mod fetch;
pub mod pack;
pub mod status;

use std::path::PathBuf;
use std::time::Duration;

use bundlelayer::config::{DEFAULT_MAX_CONCURRENT_DOWNLOADS, DEFAULT_TIMEOUT_SECS};
use bundlelayer::ProviderConfig;
use clap::Args;

/// Where bundles come from and where fetched bundles are kept.
#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Directory (or URI) holding the bundles shipped with the application
    #[arg(long, value_name = "ROOT")]
    pub local: String,

    /// Remote root URI serving manifest.json and the bundle files
    #[arg(long, value_name = "URI")]
    pub remote: Option<String>,

    /// Store directory for fetched bundles [default: user cache directory]
    #[arg(long, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Maximum number of concurrent bundle transfers
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_CONCURRENT_DOWNLOADS)]
    pub max_downloads: usize,

    /// Skip size/checksum verification of fetched bundles
    #[arg(long)]
    pub no_verify: bool,
}

impl SourceArgs {
    /// Map the flags onto a provider configuration.
    pub fn to_config(&self) -> ProviderConfig {
        let mut config = ProviderConfig::new(expand_home(&self.local))
            .with_timeout(Duration::from_secs(self.timeout))
            .with_max_concurrent_downloads(self.max_downloads)
            .with_verify_checksums(!self.no_verify);

        if let Some(remote) = &self.remote {
            config = config.with_remote_root(remote.clone());
        }
        if let Some(store) = &self.store {
            config = config.with_store_dir(expand_home(&store.to_string_lossy()));
        }
        config
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().into_owned(),
        _ => path.to_string(),
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{:.1} {}", value, unit)
}
