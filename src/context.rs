//! The explicit context threaded through discovery stages — the typed
//! replacement for the original implementation's global `data` bag.

use std::collections::HashSet;
use std::sync::Arc;

use crate::cache::Cache;
use crate::fingerprint::Catalog;
use crate::request::Requester;
use crate::results::Results;

#[derive(Debug, Clone)]
pub struct StageOptions {
    pub batch_size: usize,
    pub stop_after: usize,
    pub run_all: bool,
    pub match_all: bool,
    pub subdomains: bool,
    pub quiet: bool,
    pub verbosity: u8,
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            batch_size: 20,
            stop_after: 1,
            run_all: false,
            match_all: false,
            subdomains: true,
            quiet: false,
            verbosity: 0,
        }
    }
}

pub struct ScanContext {
    pub requester: Arc<Requester>,
    pub catalog: Arc<Catalog>,
    pub cache: Arc<Cache>,
    pub results: Results,
    /// Digests of known "soft 404" pages, populated by the ErrorPage stage.
    pub error_pages: HashSet<String>,
    pub base_url: String,
    pub target_host: String,
    pub options: StageOptions,
    /// CMS names confirmed so far, in detection order.
    pub detected_cms: Vec<String>,
    /// Lower-cased OS family names seen in `Server` header parentheticals —
    /// drives the OS stage's family-prioritization weight boost.
    pub server_families: HashSet<String>,
    pub ip: Option<String>,
}

impl ScanContext {
    #[must_use]
    pub fn new(
        requester: Arc<Requester>,
        catalog: Arc<Catalog>,
        cache: Arc<Cache>,
        base_url: String,
        target_host: String,
        options: StageOptions,
    ) -> Self {
        Self {
            requester,
            catalog,
            cache,
            results: Results::new(),
            error_pages: HashSet::new(),
            base_url,
            target_host,
            options,
            detected_cms: Vec::new(),
            server_families: HashSet::new(),
            ip: None,
        }
    }
}

pub trait Stage {
    async fn run(&self, ctx: &mut ScanContext) -> crate::error::Result<()>;
}
