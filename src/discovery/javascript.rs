//! Matches `js/*` fingerprints against cached responses that look like
//! JavaScript (by Content-Type or `.js` URL suffix). No new probes — this
//! stage only reads what earlier stages (especially [`crate::discovery::more`])
//! already populated in the cache.

use crate::context::{ScanContext, Stage};
use crate::error::Result;
use crate::matcher::Matcher;
use crate::results::VersionInput;

pub struct JavaScriptStage;

impl Stage for JavaScriptStage {
    async fn run(&self, ctx: &mut ScanContext) -> Result<()> {
        let matcher = Matcher::new(&ctx.error_pages);
        for response in ctx.cache.get_responses() {
            let is_js = response
                .header("content-type")
                .map(|ct| ct.to_ascii_lowercase().contains("javascript"))
                .unwrap_or(false)
                || response.url.ends_with(".js");
            if !is_js {
                continue;
            }
            for matched in matcher.get_result(&ctx.catalog.js, &response) {
                let fp = matched.fp;
                let version = if fp.output.is_empty() {
                    VersionInput::True
                } else {
                    VersionInput::Version(fp.output.clone())
                };
                ctx.results.add(response.url.as_str(), "javascript", &fp.name, version, Some(&fp), fp.weight);
            }
        }
        Ok(())
    }
}
