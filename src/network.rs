//! Network operations for downloading vulnerability data.
//!
//! This module handles fetching the module index and the per-module report
//! lists from a Go vulnerability database laid out as static JSON files:
//! `<base>/index.json` and `<base>/<escaped module path>.json`.

use crate::error::{MirrorError, Result};
use crate::models::report::Entry;
use std::time::Duration;
use tracing::debug;

/// Root of the public Go vulnerability database
pub const DEFAULT_BASE_URL: &str = "https://vuln.go.dev";

/// Upper bound on any response body we are willing to buffer
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Remote side of the mirror.
///
/// Implementations are called from blocking worker threads, one call per
/// module, so they must be shareable across threads.
pub trait VulnSource: Send + Sync {
    /// Returns the raw index body, unparsed.
    fn index_body(&self) -> Result<Vec<u8>>;

    /// Returns every entry published for `module`. `escaped` is the already
    /// escaped form of the module path and `timeout` bounds the whole call.
    fn module_reports(&self, module: &str, escaped: &str, timeout: Duration)
        -> Result<Vec<Entry>>;
}

pub struct HttpSource {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        HttpSource {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn index_url(&self) -> String {
        format!("{}/index.json", self.base_url)
    }

    pub fn module_url(&self, escaped: &str) -> String {
        format!("{}/{}.json", self.base_url, escaped)
    }
}

fn transport(url: &str, e: ureq::Error) -> MirrorError {
    MirrorError::Transport {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

impl VulnSource for HttpSource {
    fn index_body(&self) -> Result<Vec<u8>> {
        let url = self.index_url();
        debug!("Downloading index from '{}'", url);

        let mut response = self.agent.get(&url).call().map_err(|e| transport(&url, e))?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(MirrorError::Status { url, status });
        }

        response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()
            .map_err(|e| transport(&url, e))
    }

    fn module_reports(
        &self,
        module: &str,
        escaped: &str,
        timeout: Duration,
    ) -> Result<Vec<Entry>> {
        let url = self.module_url(escaped);
        debug!("Downloading reports for '{}' from '{}'", module, url);

        let mut response = self
            .agent
            .get(&url)
            .config()
            .timeout_global(Some(timeout))
            .build()
            .call()
            .map_err(|e| match e {
                ureq::Error::Timeout(_) => MirrorError::Timeout {
                    module: module.to_string(),
                    after: timeout,
                },
                e => transport(&url, e),
            })?;

        match response.status().as_u16() {
            200 => {}
            // The database only publishes files for modules that have reports.
            404 => return Ok(Vec::new()),
            status => return Err(MirrorError::Status { url, status }),
        }

        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()
            .map_err(|e| transport(&url, e))?;

        Ok(serde_json::from_slice(&body)?)
    }
}
