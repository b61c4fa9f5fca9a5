//! Optional subdomain brute-force over the catalog's candidate label list.
//!
//! Deliberately bypasses the shared `Requester`/cache: per spec, subdomain
//! lookups use their own 1-second HTTP timeout and a throwaway plain client,
//! grounded on `DiscoverSubdomains` (`original_source/classes2/discovery.py`),
//! which does the same to keep wildcard-DNS probing cheap and independent of
//! the main scan's scope/cache machinery.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::context::{ScanContext, Stage};
use crate::error::Result;

static TITLE_RE: OnceLock<Regex> = OnceLock::new();

fn title_re() -> &'static Regex {
    TITLE_RE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap())
}

const CONTROL_LABEL: &str = "random98f092f0b7";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Probe {
    title: String,
    ip: String,
}

pub struct SubdomainsStage;

impl Stage for SubdomainsStage {
    async fn run(&self, ctx: &mut ScanContext) -> Result<()> {
        if !ctx.options.subdomains || ctx.catalog.subdomains.is_empty() {
            return Ok(());
        }

        let Some(apex) = apex_domain(&ctx.target_host) else {
            return Ok(());
        };
        let client = match reqwest::Client::builder().timeout(Duration::from_secs(1)).build() {
            Ok(c) => c,
            Err(_) => return Ok(()),
        };

        for (scheme, port) in [("http", 80u16), ("https", 443u16)] {
            let control_host = format!("{CONTROL_LABEL}.{apex}");
            let Some(control) = probe_label(&client, scheme, &control_host, port).await else { continue };

            for label in &ctx.catalog.subdomains {
                let host = format!("{label}.{apex}");
                let Some(probe) = probe_label(&client, scheme, &host, port).await else { continue };
                if probe == control {
                    continue;
                }
                let url = if port == default_port(scheme) {
                    format!("{scheme}://{host}")
                } else {
                    format!("{scheme}://{host}:{port}")
                };
                ctx.results.add_subdomain(&url, &probe.title, &probe.ip);
            }
        }
        Ok(())
    }
}

fn default_port(scheme: &str) -> u16 {
    if scheme == "https" {
        443
    } else {
        80
    }
}

/// The last two dot-separated labels of `host`, with any `:port` suffix
/// stripped first.
fn apex_domain(host: &str) -> Option<String> {
    let host = host.split(':').next().unwrap_or(host);
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return None;
    }
    Some(labels[labels.len() - 2..].join("."))
}

async fn probe_label(client: &reqwest::Client, scheme: &str, host: &str, port: u16) -> Option<Probe> {
    let lookup = format!("{host}:{port}");
    let mut addrs = tokio::net::lookup_host(lookup).await.ok()?;
    let addr = addrs.next()?;
    let ip = addr.ip().to_string();

    let url = if port == default_port(scheme) {
        format!("{scheme}://{host}/")
    } else {
        format!("{scheme}://{host}:{port}/")
    };
    let resp = client.get(&url).send().await.ok()?;
    let body = resp.text().await.unwrap_or_default();
    let mut title = title_re()
        .captures(&body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    if title.chars().count() > 50 {
        title = title.chars().take(50).collect::<String>() + "...";
    }
    Some(Probe { title, ip })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apex_domain_strips_port_and_subdomains() {
        assert_eq!(apex_domain("www.example.com:8080").as_deref(), Some("example.com"));
        assert_eq!(apex_domain("example.com").as_deref(), Some("example.com"));
        assert_eq!(apex_domain("localhost"), None);
    }
}
