//! Records distinct cookie names seen in cached `Set-Cookie` headers.

use crate::context::{ScanContext, Stage};
use crate::error::Result;

pub struct CookiesStage;

impl Stage for CookiesStage {
    async fn run(&self, ctx: &mut ScanContext) -> Result<()> {
        for response in ctx.cache.get_responses() {
            let Some(value) = response.header("set-cookie") else { continue };
            let Some(name) = value.split('=').next() else { continue };
            let name = name.trim();
            if !name.is_empty() {
                ctx.results.site_info.cookies.insert(name.to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, Response};
    use crate::fingerprint::Catalog;
    use crate::request::{Requester, RequesterConfig};
    use std::path::PathBuf;
    use std::sync::Arc;

    #[tokio::test]
    async fn extracts_cookie_name_before_equals() {
        let cache = Arc::new(Cache::new(PathBuf::from("/tmp/webfp-cookies-test"), crate::cache::DEFAULT_TTL_SECS));
        let response = Response::new(
            "http://a.test/".into(),
            "http".into(),
            "a.test".into(),
            200,
            vec![("set-cookie".into(), " PHPSESSID=abc123; Path=/".into())],
            b"ok".to_vec(),
            false,
        );
        cache.put("http://a.test/".into(), response);

        let requester = Arc::new(Requester::new(RequesterConfig::default(), cache.clone()));
        let mut ctx = ScanContext::new(
            requester,
            Arc::new(Catalog::default()),
            cache,
            "http://a.test/".into(),
            "a.test".into(),
            Default::default(),
        );
        CookiesStage.run(&mut ctx).await.unwrap();
        assert!(ctx.results.site_info.cookies.contains("PHPSESSID"));
    }
}
