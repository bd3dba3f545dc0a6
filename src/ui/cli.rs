//! Command-line interface module.
//!
//! Every option defaults to the behaviour of a plain mirror run, so running
//! the binary without arguments mirrors `https://vuln.go.dev` into `./data`.

use crate::mirror::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_FETCH_TIMEOUT, MirrorOptions};
use crate::network::DEFAULT_BASE_URL;
use clap::Parser;
use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

/// Mirror a Go vulnerability database to local disk
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory the mirror is written to
    #[arg(short = 'o', long = "output-dir", default_value = "data")]
    pub output_dir: PathBuf,

    /// Root URL of the vulnerability database
    #[arg(short = 'u', long = "base-url", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Timeout in seconds for fetching the reports of one module
    #[arg(short = 't', long = "timeout-secs", default_value_t = DEFAULT_FETCH_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Capacity of the queue between fetchers and the writer
    #[arg(short = 'c', long = "channel-capacity", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: NonZeroUsize,

    /// Maximum number of module fetches in flight (unbounded when omitted)
    #[arg(short = 'j', long = "max-concurrent")]
    pub max_concurrent: Option<NonZeroUsize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn mirror_options(&self) -> MirrorOptions {
        MirrorOptions {
            fetch_timeout: Duration::from_secs(self.timeout_secs),
            channel_capacity: self.channel_capacity,
            max_concurrent: self.max_concurrent,
        }
    }
}
