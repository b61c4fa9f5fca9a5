//! Looks up CVE-details rows for each detected `(name, version)` pair,
//! skipping names that occurred 6 or more times across the version-bearing
//! categories (a crowded vendor list is treated as noisy rather than
//! authoritative, per `DiscoverVulnerabilities` in
//! `original_source/classes2/discovery.py`).

use std::collections::HashMap;

use crate::context::{ScanContext, Stage};
use crate::error::Result;

pub struct VulnerabilitiesStage;

impl Stage for VulnerabilitiesStage {
    async fn run(&self, ctx: &mut ScanContext) -> Result<()> {
        let versions = ctx.results.get_versions();

        let mut vendors: HashMap<String, usize> = HashMap::new();
        for (name, _) in &versions {
            *vendors.entry(name.clone()).or_insert(0) += 1;
        }

        for (name, version) in &versions {
            if vendors.get(name).copied().unwrap_or(0) > 5 {
                continue;
            }
            for fp in &ctx.catalog.vulnerabilities {
                if &fp.name == name && &fp.version == version {
                    ctx.results.add_vulnerability(name, version, fp.num_vulns, &fp.link);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use crate::fingerprint::{Catalog, VulnerabilityFingerprint};
    use crate::request::{Requester, RequesterConfig};
    use crate::results::VersionInput;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[tokio::test]
    async fn looks_up_vulnerabilities_for_detected_version() {
        let cache = Arc::new(Cache::new(PathBuf::from("/tmp/webfp-vuln-test"), crate::cache::DEFAULT_TTL_SECS));
        let requester = Arc::new(Requester::new(RequesterConfig::default(), cache.clone()));
        let mut catalog = Catalog::default();
        catalog.vulnerabilities = vec![VulnerabilityFingerprint {
            name: "WordPress".into(),
            version: "5.1".into(),
            num_vulns: 3,
            link: "https://example.test/cve".into(),
        }];

        let mut ctx = ScanContext::new(
            requester,
            Arc::new(catalog),
            cache,
            "http://a.test/".into(),
            "a.test".into(),
            Default::default(),
        );
        ctx.results.add("http://a.test/", "cms", "WordPress", VersionInput::Version("5.1".into()), None, 1.0);
        ctx.results.update();

        VulnerabilitiesStage.run(&mut ctx).await.unwrap();
        let entry = ctx.results.vulnerabilities.get(&("WordPress".to_string(), "5.1".to_string())).unwrap();
        assert_eq!(entry.count, 3);
    }
}
