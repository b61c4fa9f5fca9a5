//! Tries every empty-`url` `cms`/`platform` fingerprint against every cached
//! response. The matcher back-fills an empty `url` with the response's full
//! URL (see [`crate::matcher`]); the original back-fills the response's path
//! only in this specific stage, but since the matcher's global back-fill
//! already applies everywhere, this stage simply consumes the already
//! back-filled (full-URL) value rather than re-deriving a path-only one.

use std::collections::HashSet;

use crate::context::{ScanContext, Stage};
use crate::error::Result;
use crate::matcher::Matcher;
use crate::results::VersionInput;

pub struct UrlLessStage;

impl Stage for UrlLessStage {
    async fn run(&self, ctx: &mut ScanContext) -> Result<()> {
        let fps: Vec<_> = ctx
            .catalog
            .cms
            .iter()
            .chain(ctx.catalog.platform.iter())
            .filter(|fp| fp.url.is_empty())
            .cloned()
            .collect();
        if fps.is_empty() {
            return Ok(());
        }

        let mut seen: HashSet<(String, String)> = HashSet::new();
        let matcher = Matcher::new(&ctx.error_pages);
        for response in ctx.cache.get_responses() {
            for matched in matcher.get_result(&fps, &response) {
                let fp = matched.fp;
                let key = (fp.name.clone(), fp.output.clone());
                if !seen.insert(key) && !fp.show_all_detections {
                    continue;
                }
                let category = if ctx.catalog.cms.iter().any(|c| c.name == fp.name) {
                    "cms"
                } else {
                    "platform"
                };
                let version = if fp.output.is_empty() {
                    VersionInput::True
                } else {
                    VersionInput::Version(fp.output.clone())
                };
                ctx.results.add(response.url.as_str(), category, &fp.name, version, Some(&fp), fp.weight);
            }
        }
        Ok(())
    }
}
