//! Optional `-m`/`match_all` pass: matches every `cms`/`platform`
//! fingerprint against every cached response, independent of its own `url`.
//! No new network I/O — purely a second look at what's already cached.

use crate::context::{ScanContext, Stage};
use crate::error::Result;
use crate::matcher::Matcher;
use crate::results::VersionInput;

pub struct AllCmsStage;

impl Stage for AllCmsStage {
    async fn run(&self, ctx: &mut ScanContext) -> Result<()> {
        let matcher = Matcher::new(&ctx.error_pages);
        let responses = ctx.cache.get_responses();
        for (category, fps) in [("cms", &ctx.catalog.cms), ("platform", &ctx.catalog.platform)] {
            for response in &responses {
                for matched in matcher.get_result(fps, response) {
                    let fp = matched.fp;
                    let version = if fp.output.is_empty() {
                        VersionInput::True
                    } else {
                        VersionInput::Version(fp.output.clone())
                    };
                    ctx.results.add(response.url.as_str(), category, &fp.name, version, Some(&fp), fp.weight);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, Response};
    use crate::fingerprint::{Catalog, Fingerprint, FpCode, MatchKind};
    use crate::request::{Requester, RequesterConfig};
    use std::path::PathBuf;
    use std::sync::Arc;

    #[tokio::test]
    async fn matches_without_new_probes() {
        let cache = Arc::new(Cache::new(PathBuf::from("/tmp/webfp-allcms-test"), crate::cache::DEFAULT_TTL_SECS));
        let response = Response::new(
            "http://a.test/readme.html".into(),
            "http".into(),
            "a.test".into(),
            200,
            vec![],
            b"Version 5.1".to_vec(),
            false,
        );
        cache.put("http://a.test/readme.html".into(), response);

        let requester = Arc::new(Requester::new(RequesterConfig::default(), cache.clone()));
        let mut catalog = Catalog::default();
        catalog.cms = vec![Fingerprint {
            kind: MatchKind::String { needle: "Version 5.1".into() },
            url: "/readme.html".into(),
            name: "WordPress".into(),
            output: "5.1".into(),
            code: FpCode::Exact(200),
            weight: 1.0,
            note: None,
            show_all_detections: false,
        }];

        let mut ctx = ScanContext::new(
            requester,
            Arc::new(catalog),
            cache,
            "http://a.test/".into(),
            "a.test".into(),
            Default::default(),
        );
        AllCmsStage.run(&mut ctx).await.unwrap();
        ctx.results.update();
        assert_eq!(ctx.results.versions_for("cms", "WordPress"), vec!["5.1"]);
    }
}
