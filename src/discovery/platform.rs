//! Detects platform components (language runtimes, web servers, frameworks).
//!
//! Like [`crate::discovery::cms`] but without version-pinning sub-passes or a
//! stop criterion: the whole `platform/*` queue drains in `batch_size` chunks.

use crate::context::{ScanContext, Stage};
use crate::discovery::queue::FingerprintQueue;
use crate::error::Result;
use crate::matcher::Matcher;
use crate::results::VersionInput;

pub struct PlatformStage;

impl Stage for PlatformStage {
    async fn run(&self, ctx: &mut ScanContext) -> Result<()> {
        let mut queue = FingerprintQueue::from_fingerprints(&ctx.catalog.platform);
        let batch_size = ctx.options.batch_size;

        while !queue.is_empty() {
            let groups = queue.pop_batch(batch_size);
            let probed = ctx.requester.run(&ctx.base_url, groups, false, false).await;
            for (group, response) in &probed {
                let Some(response) = response else { continue };
                let matcher = Matcher::new(&ctx.error_pages);
                for matched in matcher.get_result(group, response) {
                    let fp = matched.fp;
                    let version = if fp.output.is_empty() {
                        VersionInput::True
                    } else {
                        VersionInput::Version(fp.output.clone())
                    };
                    ctx.results.add(response.url.as_str(), "platform", &fp.name, version, Some(&fp), fp.weight);
                }
            }
        }
        Ok(())
    }
}
