//! Scans every cached response's headers; `Server` lines contribute
//! `pkg/version` tokens to the `platform` score as weight-1 evidence.

use std::collections::HashSet;

use crate::context::{ScanContext, Stage};
use crate::discovery::server_header::{parse_pkg_version_pairs, split_server_line};
use crate::error::Result;
use crate::results::VersionInput;

pub struct HeadersStage;

impl Stage for HeadersStage {
    async fn run(&self, ctx: &mut ScanContext) -> Result<()> {
        let base_url = ctx.base_url.clone();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for response in ctx.cache.get_responses() {
            for (header, value) in &response.headers {
                if !seen.insert((header.clone(), value.clone())) {
                    continue;
                }
                if header != "server" {
                    continue;
                }
                let (_, rest) = split_server_line(value);
                for (pkg, version) in parse_pkg_version_pairs(&rest) {
                    ctx.results.add(&base_url, "platform", &pkg, VersionInput::Version(version), None, 1.0);
                }
            }
        }
        Ok(())
    }
}
