//! Probes the known-missing URLs from `error_pages.json` and collects their
//! digests into `ctx.error_pages`, so later stages can reclassify soft-404s.
//!
//! Grounded on `DiscoverErrorPages` (`original_source/classes2/discovery.py`),
//! with one deliberate deviation: the original builds one single-fingerprint
//! group per error-page fingerprint (`[[fp] for fp in self.fps]`), which can
//! issue two concurrent requests to the same URL if two fingerprints share
//! one. Grouping by URL through [`FingerprintQueue`] avoids that race while
//! still visiting every fingerprint and collecting its digests.

use crate::context::{ScanContext, Stage};
use crate::discovery::queue::FingerprintQueue;
use crate::error::Result;

pub struct ErrorPageStage;

impl Stage for ErrorPageStage {
    async fn run(&self, ctx: &mut ScanContext) -> Result<()> {
        let mut queue = FingerprintQueue::from_fingerprints(&ctx.catalog.error_pages);
        let groups = queue.pop_all();
        if groups.is_empty() {
            return Ok(());
        }
        let results = ctx.requester.run(&ctx.base_url, groups, true, false).await;
        for (_, response) in results {
            let Some(response) = response else { continue };
            ctx.error_pages.insert(response.md5_404.clone());
            ctx.error_pages.insert(response.md5_404_text.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use crate::fingerprint::{Catalog, Fingerprint, FpCode, MatchKind};
    use crate::request::{Requester, RequesterConfig};
    use std::path::PathBuf;
    use std::sync::Arc;
    use url::Url;

    fn fp(url: &str) -> Fingerprint {
        Fingerprint {
            kind: MatchKind::String { needle: String::new() },
            url: url.to_string(),
            name: "404".into(),
            output: String::new(),
            code: FpCode::Any,
            weight: 1.0,
            note: None,
            show_all_detections: false,
        }
    }

    #[tokio::test]
    async fn collects_digests_from_nonexistent_pages() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/does-not-exist-xyz")
            .with_status(404)
            .with_body("Not Found")
            .create_async()
            .await;

        let cache = Arc::new(Cache::new(PathBuf::from("/tmp/webfp-errpage-test"), crate::cache::DEFAULT_TTL_SECS));
        let requester = Arc::new(Requester::new(RequesterConfig::default(), cache.clone()));
        let url = Url::parse(&server.url()).unwrap();
        requester.set_scope(url.scheme(), url.host_str().unwrap());

        let mut catalog = Catalog::default();
        catalog.error_pages = vec![fp("/does-not-exist-xyz")];

        let mut ctx = ScanContext::new(
            requester,
            Arc::new(catalog),
            cache,
            server.url(),
            url.host_str().unwrap().to_string(),
            Default::default(),
        );
        ErrorPageStage.run(&mut ctx).await.unwrap();
        assert_eq!(ctx.error_pages.len(), 2);
    }
}
