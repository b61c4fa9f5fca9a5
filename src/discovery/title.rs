//! Fetches the site root and records its `<title>`.

use regex::Regex;
use std::sync::OnceLock;

use crate::context::{ScanContext, Stage};
use crate::error::Result;
use crate::fingerprint::{Fingerprint, FpCode, MatchKind};

static TITLE_RE: OnceLock<Regex> = OnceLock::new();

fn title_re() -> &'static Regex {
    TITLE_RE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap())
}

pub struct TitleStage;

impl Stage for TitleStage {
    async fn run(&self, ctx: &mut ScanContext) -> Result<()> {
        let fp = Fingerprint {
            kind: MatchKind::String { needle: String::new() },
            url: String::new(),
            name: String::new(),
            output: String::new(),
            code: FpCode::Any,
            weight: 1.0,
            note: None,
            show_all_detections: false,
        };
        let groups = vec![vec![fp]];
        let results = ctx.requester.run(&ctx.base_url, groups, false, false).await;
        let Some((_, Some(response))) = results.into_iter().next() else {
            return Ok(());
        };
        if let Some(caps) = title_re().captures(&response.text) {
            let title = caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
            if !title.is_empty() {
                ctx.results.site_info.title = Some(title);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use crate::fingerprint::Catalog;
    use crate::request::{Requester, RequesterConfig};
    use std::path::PathBuf;
    use std::sync::Arc;
    use url::Url;

    #[tokio::test]
    async fn extracts_title_from_root_response() {
        let mut server = mockito::Server::new_async().await;
        server.mock("HEAD", "/").with_status(200).create_async().await;
        server
            .mock("GET", "/")
            .with_status(200)
            .with_body("<html><head><title> Example Site </title></head></html>")
            .create_async()
            .await;

        let cache = Arc::new(Cache::new(PathBuf::from("/tmp/webfp-title-test"), crate::cache::DEFAULT_TTL_SECS));
        let requester = Arc::new(Requester::new(RequesterConfig::default(), cache.clone()));
        let url = Url::parse(&server.url()).unwrap();
        requester.set_scope(url.scheme(), url.host_str().unwrap());

        let mut ctx = ScanContext::new(
            requester,
            Arc::new(Catalog::default()),
            cache,
            server.url(),
            url.host_str().unwrap().to_string(),
            Default::default(),
        );
        TitleStage.run(&mut ctx).await.unwrap();
        assert_eq!(ctx.results.site_info.title.as_deref(), Some("Example Site"));
    }
}
