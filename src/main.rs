mod error;
mod mirror;
mod models;
mod modpath;
mod network;
mod storage;
mod ui;
mod writer;

use clap::Parser;
use mirror::{fetch_index, mirror_modules};
use network::{HttpSource, VulnSource};
use std::{process, sync::Arc};
use storage::Store;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use ui::{cli::Args, output::print_run_summary};

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let store = match Store::create(&args.output_dir) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to create output directories: {}", e);
            process::exit(1);
        }
    };

    let source: Arc<dyn VulnSource> = Arc::new(HttpSource::new(&args.base_url));

    info!("⏳ Downloading index from '{}' ...", args.base_url);
    let index = match fetch_index(source.as_ref(), &store) {
        Ok(i) => i,
        Err(e) => {
            error!("Failed to get index: {}", e);
            process::exit(1);
        }
    };
    if index.is_empty() {
        warn!("Index lists no modules, nothing to mirror");
    } else {
        info!("⏬ Index downloaded, found {} modules", index.len());
    }

    let options = args.mirror_options();
    let summary = smol::block_on(mirror_modules(source, Arc::clone(&store), &index, &options));

    print_run_summary(&summary, store.root());
}
