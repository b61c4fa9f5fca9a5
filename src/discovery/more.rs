//! Crawls cached HTML responses for `script[src]`/`img[src]`/`link[href]`
//! and a raw `src="..."` regex fallback, then probes the discovered URLs to
//! populate the cache for later stages (JavaScript in particular).
//!
//! Grounded on `DiscoverMore` (`original_source/classes2/discovery.py`).
//! REDESIGN FLAG (c): the original's HTML-parser pass and regex-fallback
//! pass can both add the same URL, double-probing it; both passes feed one
//! `HashSet` here before any request is issued.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::context::{ScanContext, Stage};
use crate::error::Result;
use crate::fingerprint::{Fingerprint, FpCode, MatchKind};

static SRC_RE: OnceLock<Regex> = OnceLock::new();

fn src_re() -> &'static Regex {
    SRC_RE.get_or_init(|| Regex::new(r#"src=["']([^"']+)["']"#).unwrap())
}

pub struct MoreStage;

impl Stage for MoreStage {
    async fn run(&self, ctx: &mut ScanContext) -> Result<()> {
        let mut discovered: HashSet<String> = HashSet::new();

        for response in ctx.cache.get_responses() {
            if response.crawled_response {
                continue;
            }
            let Some(content_type) = response.header("content-type") else { continue };
            if !content_type.to_ascii_lowercase().contains("text/html") {
                continue;
            }

            let document = Html::parse_document(&response.text);
            for selector_src in [
                ("script", "src"),
                ("img", "src"),
                ("link", "href"),
            ] {
                let (tag, attr) = selector_src;
                let Ok(selector) = Selector::parse(tag) else { continue };
                for el in document.select(&selector) {
                    if let Some(value) = el.value().attr(attr) {
                        discovered.insert(value.to_string());
                    }
                }
            }

            for caps in src_re().captures_iter(&response.text) {
                discovered.insert(caps[1].to_string());
            }
        }

        let groups: Vec<Vec<Fingerprint>> = discovered
            .into_iter()
            .filter(|raw| !raw.starts_with("data:"))
            .filter_map(|raw| resolve(&ctx.base_url, &raw))
            .map(|resolved| {
                vec![Fingerprint {
                    kind: MatchKind::String { needle: String::new() },
                    url: resolved,
                    name: String::new(),
                    output: String::new(),
                    code: FpCode::Any,
                    weight: 1.0,
                    note: None,
                    show_all_detections: false,
                }]
            })
            .collect();

        if groups.is_empty() {
            return Ok(());
        }
        ctx.requester.run(&ctx.base_url, groups, false, true).await;
        Ok(())
    }
}

/// Resolve a discovered `src`/`href` value against the base URL; the
/// fingerprint's own `url` field is used verbatim as the probe path by the
/// requester, so resolution happens here into an absolute URL up front.
fn resolve(base_url: &str, raw: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    base.join(raw).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, Response};
    use crate::fingerprint::Catalog;
    use crate::request::{Requester, RequesterConfig};
    use std::path::PathBuf;
    use std::sync::Arc;
    use url::Url;

    #[tokio::test]
    async fn html_and_regex_passes_dedupe_into_one_probe() {
        let mut server = mockito::Server::new_async().await;
        let js_mock = server
            .mock("GET", "/app.js")
            .with_status(200)
            .with_body("var x = 1;")
            .expect(1)
            .create_async()
            .await;

        let cache = Arc::new(Cache::new(PathBuf::from("/tmp/webfp-more-test"), crate::cache::DEFAULT_TTL_SECS));
        let requester = Arc::new(Requester::new(RequesterConfig::default(), cache.clone()));
        let url = Url::parse(&server.url()).unwrap();
        requester.set_scope(url.scheme(), url.host_str().unwrap());

        let root_html = r#"<html><body><script src="/app.js"></script></body></html>"#;
        let root = Response::new(
            server.url(),
            url.scheme().to_string(),
            url.host_str().unwrap().to_string(),
            200,
            vec![("content-type".into(), "text/html".into())],
            root_html.as_bytes().to_vec(),
            false,
        );
        cache.put(server.url(), root);

        let mut ctx = ScanContext::new(
            requester,
            Arc::new(Catalog::default()),
            cache,
            server.url(),
            url.host_str().unwrap().to_string(),
            Default::default(),
        );
        MoreStage.run(&mut ctx).await.unwrap();
        js_mock.assert_async().await;
    }
}
