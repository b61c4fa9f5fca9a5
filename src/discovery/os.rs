//! Combines `Server` header OS hints with already-scored platform versions
//! to guess the host operating system, boosting fingerprints whose family
//! was already seen in a `Server` parenthetical.
//!
//! Grounded on `DiscoverOS` (`original_source/classes2/discovery.py`):
//! `search_and_prioritize_os` accumulates a local `(os_name, os_version) ->
//! weight` counter across both sources, then `finalize` emits every entry
//! tied at the maximum accumulated weight.

use std::collections::HashMap;

use crate::context::{ScanContext, Stage};
use crate::discovery::server_header::{parse_pkg_version_pairs, split_server_line};
use crate::error::Result;
use crate::results::VersionInput;

pub struct OsStage;

impl Stage for OsStage {
    async fn run(&self, ctx: &mut ScanContext) -> Result<()> {
        let mut counter: HashMap<(String, String), f64> = HashMap::new();

        for response in ctx.cache.get_responses() {
            let Some(server) = response.header("server") else { continue };
            let (os_hint, rest) = split_server_line(server);
            if let Some(os_hint) = os_hint {
                ctx.server_families.insert(os_hint.to_lowercase());
            }
            for (pkg, version) in parse_pkg_version_pairs(&rest) {
                search_and_prioritize(ctx, &mut counter, &pkg.to_lowercase(), &version.to_lowercase());
            }
        }

        for (pkg, mut version) in ctx.results.scored_versions("platform") {
            if pkg == "ASP.NET" {
                version = if version.starts_with("4.5") {
                    version.chars().take(5).collect()
                } else {
                    version.chars().take(3).collect()
                };
            }
            search_and_prioritize(ctx, &mut counter, &pkg, &version);
        }

        let Some(&max_count) = counter
            .values()
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        else {
            return Ok(());
        };
        let base_url = ctx.base_url.clone();
        for ((os_name, os_version), count) in &counter {
            if (*count - max_count).abs() < f64::EPSILON {
                ctx.results.add(&base_url, "os", os_name, VersionInput::Version(os_version.clone()), None, *count);
            }
        }
        Ok(())
    }
}

fn search_and_prioritize(
    ctx: &ScanContext,
    counter: &mut HashMap<(String, String), f64>,
    pkg_name: &str,
    pkg_version: &str,
) {
    for fp in &ctx.catalog.os {
        if fp.pkg_name != pkg_name || fp.pkg_version != pkg_version {
            continue;
        }
        let multiplier = if ctx.server_families.contains(&fp.os_name.to_lowercase()) { 100.0 } else { 1.0 };
        *counter.entry((fp.os_name.clone(), fp.os_version.clone())).or_insert(0.0) += fp.weight * multiplier;
    }
}
