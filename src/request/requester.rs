//! Concurrent, scope-restricted HTTP client.
//!
//! Grounded on the teacher's `DomainLimiter` pattern (`Arc<Semaphore>`
//! permit-acquire loop): the "fixed-size worker pool of `threads`" of the
//! concurrency design is a single semaphore sized to `threads`, since a
//! `Requester` instance only ever serves one host per scan.

use std::sync::{Arc, RwLock};

use reqwest::redirect::Policy;
use url::Url;

use crate::cache::{Cache, Response};
use crate::fingerprint::Fingerprint;

#[derive(Debug, Clone)]
pub struct RequesterConfig {
    pub threads: usize,
    pub proxy: Option<String>,
    pub user_agent: String,
    pub prefix: String,
}

impl Default for RequesterConfig {
    fn default() -> Self {
        Self {
            threads: 10,
            proxy: None,
            user_agent: "Mozilla/5.0 (compatible; webfp/0.1)".to_string(),
            prefix: String::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RequesterError {
    #[error("unknown host {host}: {source}")]
    UnknownHost {
        host: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid target URL {url}")]
    InvalidUrl { url: String },
}

type Scope = Arc<RwLock<Option<(String, String)>>>;

/// One fingerprint group together with the probe's outcome.
pub type ProbeResult = (Vec<Fingerprint>, Option<Response>);

pub struct Requester {
    discovery_client: reqwest::Client,
    probe_client: reqwest::Client,
    scope: Scope,
    prefix: String,
    semaphore: Arc<tokio::sync::Semaphore>,
    cache: Arc<Cache>,
}

/// `true` iff a redirect hop would leave the given `(scheme, host)` scope.
fn leaves_scope(url: &reqwest::Url, scope: &(String, String)) -> bool {
    url.scheme() != scope.0 || url.host_str().unwrap_or_default() != scope.1
}

impl Requester {
    #[must_use]
    pub fn new(config: RequesterConfig, cache: Arc<Cache>) -> Self {
        let mut discovery_builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(Policy::limited(10));
        if let Some(proxy) = config.proxy.as_deref().and_then(|p| reqwest::Proxy::all(p).ok()) {
            discovery_builder = discovery_builder.proxy(proxy);
        }
        let discovery_client = discovery_builder.build().unwrap_or_else(|_| reqwest::Client::new());

        let scope: Scope = Arc::new(RwLock::new(None));
        let scope_for_policy = scope.clone();
        let mut probe_builder = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .redirect(Policy::custom(move |attempt| {
                let current = scope_for_policy.read().unwrap();
                match &*current {
                    Some(s) if leaves_scope(attempt.url(), s) => attempt.stop(),
                    _ => attempt.follow(),
                }
            }));
        if let Some(proxy) = config.proxy.as_deref().and_then(|p| reqwest::Proxy::all(p).ok()) {
            probe_builder = probe_builder.proxy(proxy);
        }
        let probe_client = probe_builder.build().unwrap_or_else(|_| reqwest::Client::new());

        Self {
            discovery_client,
            probe_client,
            scope,
            prefix: config.prefix,
            semaphore: Arc::new(tokio::sync::Semaphore::new(config.threads.max(1))),
            cache,
        }
    }

    /// Lock the requester to a single `(scheme, host)` scope. Must be
    /// called before `run()`; every probe group resolving outside this
    /// scope is dropped silently.
    pub fn set_scope(&self, scheme: &str, host: &str) {
        *self.scope.write().unwrap() = Some((scheme.to_string(), host.to_string()));
    }

    /// Issue a GET for `url` with unrestricted redirect-following, to
    /// discover where the target actually resolves. Returns `(redirected,
    /// new_base)`, `redirected` true iff the final scheme+host differ from
    /// the request's. Populates the cache under both the original and the
    /// resolved URLs.
    pub async fn detect_redirect(&self, url: &str) -> Result<(bool, String), RequesterError> {
        let original = Url::parse(url).map_err(|_| RequesterError::InvalidUrl { url: url.to_string() })?;

        let resp = self
            .discovery_client
            .get(url)
            .send()
            .await
            .map_err(|source| RequesterError::UnknownHost {
                host: original.host_str().unwrap_or_default().to_string(),
                source,
            })?;

        let final_url = resp.url().clone();
        let redirected = final_url.scheme() != original.scheme()
            || final_url.host_str() != original.host_str();

        let headers = header_pairs(resp.headers());
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        let response = Response::new(
            final_url.to_string(),
            final_url.scheme().to_string(),
            final_url.host_str().unwrap_or_default().to_string(),
            status,
            headers,
            body,
            false,
        );
        self.cache.put(url.to_string(), response.clone());
        self.cache.put(final_url.to_string(), response);

        Ok((redirected, format!("{}://{}", final_url.scheme(), final_url.host_str().unwrap_or_default())))
    }

    /// Probe every group concurrently, bounded by the `threads` semaphore.
    /// `bypass_head_optimization` disables the HEAD-before-GET shortcut —
    /// set by the ErrorPage stage, which deliberately probes URLs expected
    /// to 404 and needs the body even when a 200-only fingerprint's HEAD
    /// check would otherwise have skipped the GET. `mark_crawled` flags
    /// every resulting `Response::crawled_response` — set by the More
    /// stage so a later pass over the cache skips resources it discovered.
    pub async fn run(
        &self,
        base_url: &str,
        groups: Vec<Vec<Fingerprint>>,
        bypass_head_optimization: bool,
        mark_crawled: bool,
    ) -> Vec<ProbeResult> {
        let (tx, rx) = crossbeam_channel::bounded::<ProbeResult>(groups.len().max(1));
        let mut handles = Vec::with_capacity(groups.len());

        for group in groups {
            let semaphore = self.semaphore.clone();
            let cache = self.cache.clone();
            let client = self.probe_client.clone();
            let scope = self.scope.clone();
            let prefix = self.prefix.clone();
            let base_url = base_url.to_string();
            let tx = tx.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await;
                let response = probe_group(
                    &client,
                    &cache,
                    &scope,
                    &prefix,
                    &base_url,
                    &group,
                    bypass_head_optimization,
                    mark_crawled,
                )
                .await;
                let _ = tx.send((group, response));
            }));
        }
        drop(tx);

        for handle in handles {
            let _ = handle.await;
        }

        rx.try_iter().collect()
    }
}

async fn probe_group(
    client: &reqwest::Client,
    cache: &Cache,
    scope: &Scope,
    prefix: &str,
    base_url: &str,
    group: &[Fingerprint],
    bypass_head_optimization: bool,
    mark_crawled: bool,
) -> Option<Response> {
    let shared_path = group.first()?.url.clone();
    let requested_url = resolve_url(base_url, prefix, &shared_path)?;

    let target = scope.read().unwrap().clone()?;
    let parsed = Url::parse(&requested_url).ok()?;
    if leaves_scope(&parsed, &target) {
        return None;
    }

    if let Some(cached) = cache.get(&requested_url) {
        return Some(cached);
    }

    let can_use_head = !bypass_head_optimization && group.iter().all(Fingerprint::expects_200_only);

    if can_use_head {
        let head = client.head(&requested_url).send().await.ok()?;
        if head.status().as_u16() != 200 {
            return None;
        }
    }

    let resp = client.get(&requested_url).send().await.ok()?;
    let final_url = resp.url().clone();
    if leaves_scope(&final_url, &target) {
        return None;
    }
    if resp.status().is_redirection() {
        // The custom redirect policy stopped following because the next hop
        // left scope; a same-origin chain would have resolved further.
        return None;
    }

    let status = resp.status().as_u16();
    let headers = header_pairs(resp.headers());
    let body = resp.bytes().await.ok()?.to_vec();
    let response = Response::new(
        final_url.to_string(),
        final_url.scheme().to_string(),
        final_url.host_str().unwrap_or_default().to_string(),
        status,
        headers,
        body,
        mark_crawled,
    );
    cache.put(requested_url, response.clone());
    cache.put(final_url.to_string(), response.clone());
    Some(response)
}

fn resolve_url(base_url: &str, prefix: &str, path: &str) -> Option<String> {
    if path.is_empty() {
        return Some(base_url.to_string());
    }
    let base = Url::parse(base_url).ok()?;
    base.join(&format!("{prefix}{path}")).ok().map(|u| u.to_string())
}

fn header_pairs(headers: &reqwest::header::HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| (k.as_str().to_ascii_lowercase(), v.to_str().unwrap_or_default().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::DEFAULT_TTL_SECS;
    use crate::fingerprint::{FpCode, MatchKind};
    use std::path::PathBuf;

    fn fp(url: &str, code: FpCode) -> Fingerprint {
        Fingerprint {
            kind: MatchKind::String { needle: "x".into() },
            url: url.to_string(),
            name: "Test".into(),
            output: "test".into(),
            code,
            weight: 1.0,
            note: None,
            show_all_detections: false,
        }
    }

    #[tokio::test]
    async fn head_optimization_skips_get_on_non_200_head() {
        let mut server = mockito::Server::new_async().await;
        let head_mock = server
            .mock("HEAD", "/secret")
            .with_status(404)
            .create_async()
            .await;
        let get_mock = server
            .mock("GET", "/secret")
            .with_status(200)
            .with_body("should not be fetched")
            .expect(0)
            .create_async()
            .await;

        let cache = Arc::new(Cache::new(PathBuf::from("/tmp/webfp-req-test"), DEFAULT_TTL_SECS));
        let requester = Requester::new(RequesterConfig::default(), cache.clone());
        let url = Url::parse(&server.url()).unwrap();
        requester.set_scope(url.scheme(), url.host_str().unwrap());

        let groups = vec![vec![fp("/secret", FpCode::Exact(200))]];
        let results = requester.run(&server.url(), groups, false, false).await;

        head_mock.assert_async().await;
        get_mock.assert_async().await;
        assert_eq!(results.len(), 1);
        assert!(results[0].1.is_none());
    }

    #[tokio::test]
    async fn out_of_scope_group_is_dropped_without_request() {
        let server = mockito::Server::new_async().await;
        let cache = Arc::new(Cache::new(PathBuf::from("/tmp/webfp-req-test2"), DEFAULT_TTL_SECS));
        let requester = Requester::new(RequesterConfig::default(), cache);
        requester.set_scope("http", "scoped.test");

        let groups = vec![vec![fp("/x", FpCode::Exact(200))]];
        let results = requester.run(&server.url(), groups, false, false).await;
        assert!(results[0].1.is_none());
    }

    #[tokio::test]
    async fn second_request_for_same_url_is_served_from_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/once")
            .with_status(200)
            .with_body("hi")
            .expect(1)
            .create_async()
            .await;

        let cache = Arc::new(Cache::new(PathBuf::from("/tmp/webfp-req-test3"), DEFAULT_TTL_SECS));
        let requester = Requester::new(RequesterConfig::default(), cache);
        let url = Url::parse(&server.url()).unwrap();
        requester.set_scope(url.scheme(), url.host_str().unwrap());

        let groups = vec![vec![fp("/once", FpCode::Any)]];
        let _ = requester.run(&server.url(), groups.clone(), false, false).await;
        let results = requester.run(&server.url(), groups, false, false).await;

        mock.assert_async().await;
        assert!(results[0].1.is_some());
    }
}
