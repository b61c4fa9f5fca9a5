//! Probes `interesting.json` URLs (backups, config dumps, admin panels) and
//! records soft-404-filtered hits via each fingerprint's `note`.

use crate::context::{ScanContext, Stage};
use crate::discovery::queue::FingerprintQueue;
use crate::error::Result;
use crate::matcher::Matcher;
use crate::results::VersionInput;

pub struct InterestingStage;

impl Stage for InterestingStage {
    async fn run(&self, ctx: &mut ScanContext) -> Result<()> {
        let mut queue = FingerprintQueue::from_fingerprints(&ctx.catalog.interesting);
        let groups = queue.pop_all();
        if groups.is_empty() {
            return Ok(());
        }
        let root_text_digest = ctx.cache.get(&ctx.base_url).map(|r| r.md5_404_text);
        let probed = ctx.requester.run(&ctx.base_url, groups, false, false).await;
        for (group, response) in &probed {
            let Some(response) = response else { continue };
            if ctx.error_pages.contains(&response.md5_404) || ctx.error_pages.contains(&response.md5_404_text) {
                continue;
            }
            if root_text_digest.as_deref() == Some(response.md5_404_text.as_str()) {
                continue;
            }
            let matcher = Matcher::new(&ctx.error_pages);
            for matched in matcher.get_result(group, response) {
                let fp = matched.fp;
                ctx.results.add(response.url.as_str(), "interesting", &fp.name, VersionInput::Null, Some(&fp), fp.weight);
            }
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

    fn note_fp(url: &str, note: &str) -> Fingerprint {
        Fingerprint {
            kind: MatchKind::String { needle: String::new() },
            url: url.to_string(),
            name: String::new(),
            output: String::new(),
            code: FpCode::Exact(200),
            weight: 1.0,
            note: Some(note.to_string()),
            show_all_detections: false,
        }
    }

    #[tokio::test]
    async fn s2_soft_404_suppresses_interesting_hit() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/admin.php")
            .with_status(200)
            .with_body("Not Found: nothing here")
            .create_async()
            .await;

        let cache = Arc::new(Cache::new(PathBuf::from("/tmp/webfp-interesting-test"), crate::cache::DEFAULT_TTL_SECS));
        let requester = Arc::new(Requester::new(RequesterConfig::default(), cache.clone()));
        let url = Url::parse(&server.url()).unwrap();
        requester.set_scope(url.scheme(), url.host_str().unwrap());

        let digest = crate::cache::response::hex_md5(
            crate::cache::response::canonicalize("Not Found: nothing here").as_bytes(),
        );

        let mut catalog = Catalog::default();
        catalog.interesting = vec![note_fp("/admin.php", "admin panel")];

        let mut ctx = ScanContext::new(
            requester,
            Arc::new(catalog),
            cache,
            server.url(),
            url.host_str().unwrap().to_string(),
            Default::default(),
        );
        ctx.error_pages.insert(digest);
        InterestingStage.run(&mut ctx).await.unwrap();
        assert!(ctx.results.interesting.is_empty());
    }
}
