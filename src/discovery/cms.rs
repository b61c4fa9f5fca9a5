//! Detects the CMS in use and pins its version.
//!
//! Grounded on `DiscoverCMS.run`/`get_queue` (`original_source/classes2/discovery.py`):
//! the full `cms/*` fingerprint set is probed in `batch_size` URL-groups at a
//! time; the first time a name is seen, every other still-queued fingerprint
//! for that name is pulled out and probed immediately as a dedicated
//! version-pinning pass. Stops once `stop_after` distinct names are found,
//! the queue drains, or `run_all` is set (which ignores `stop_after`).

use crate::context::{ScanContext, Stage};
use crate::discovery::queue::FingerprintQueue;
use crate::error::Result;
use crate::matcher::Matcher;
use crate::results::VersionInput;

pub struct CmsStage;

impl Stage for CmsStage {
    async fn run(&self, ctx: &mut ScanContext) -> Result<()> {
        let mut queue = FingerprintQueue::from_fingerprints(&ctx.catalog.cms);
        let batch_size = ctx.options.batch_size;
        let run_all = ctx.options.run_all;
        let stop_after = ctx.options.stop_after;

        while !queue.is_empty() {
            if !run_all && ctx.detected_cms.len() >= stop_after {
                break;
            }
            let groups = queue.pop_batch(batch_size);
            let probed = ctx.requester.run(&ctx.base_url, groups, false, false).await;

            let mut newly_detected = Vec::new();
            for (group, response) in &probed {
                let Some(response) = response else { continue };
                let matcher = Matcher::new(&ctx.error_pages);
                for matched in matcher.get_result(group, response) {
                    let fp = matched.fp;
                    if !ctx.detected_cms.contains(&fp.name) && !newly_detected.contains(&fp.name) {
                        newly_detected.push(fp.name.clone());
                    }
                    record_match(ctx, &fp, response.url.as_str());
                }
            }

            for name in newly_detected {
                if ctx.detected_cms.contains(&name) {
                    continue;
                }
                ctx.detected_cms.push(name.clone());
                let pin_groups = queue.extract_by_name(&name);
                if pin_groups.is_empty() {
                    continue;
                }
                let pinned = ctx.requester.run(&ctx.base_url, pin_groups, false, false).await;
                for (group, response) in &pinned {
                    let Some(response) = response else { continue };
                    let matcher = Matcher::new(&ctx.error_pages);
                    for matched in matcher.get_result(group, response) {
                        record_match(ctx, &matched.fp, response.url.as_str());
                    }
                }
            }
        }
        Ok(())
    }
}

fn record_match(ctx: &mut ScanContext, fp: &crate::fingerprint::Fingerprint, url: &str) {
    let version = if fp.output.is_empty() {
        VersionInput::True
    } else {
        VersionInput::Version(fp.output.clone())
    };
    ctx.results.add(url, "cms", &fp.name, version, Some(fp), fp.weight);
}
