//! Looks up companion tools registered in the translator dictionary for each
//! detected CMS.

use crate::context::{ScanContext, Stage};
use crate::error::Result;

pub struct ToolsStage;

impl Stage for ToolsStage {
    async fn run(&self, ctx: &mut ScanContext) -> Result<()> {
        let Some(cms_names) = ctx.results.results.get("cms").cloned() else {
            return Ok(());
        };
        for cms_name in cms_names.keys() {
            let tools: Vec<(String, String)> = ctx
                .catalog
                .dictionary
                .tools_for(cms_name)
                .into_iter()
                .map(|t| (t.name.clone(), t.link.clone()))
                .collect();
            for (name, link) in tools {
                ctx.results.add_tool(&name, cms_name, &link);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use crate::fingerprint::dictionary::{Dictionary, DictionaryEntry, ToolEntry};
    use crate::fingerprint::Catalog;
    use crate::request::{Requester, RequesterConfig};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[tokio::test]
    async fn looks_up_tools_for_detected_cms() {
        let cache = Arc::new(Cache::new(PathBuf::from("/tmp/webfp-tools-test"), crate::cache::DEFAULT_TTL_SECS));
        let requester = Arc::new(Requester::new(RequesterConfig::default(), cache.clone()));

        let mut entries = HashMap::new();
        entries.insert(
            "wordpress".to_string(),
            DictionaryEntry {
                name: "WordPress".into(),
                tool: vec![ToolEntry { name: "WPScan".into(), link: "https://wpscan.test".into() }],
            },
        );
        let mut catalog = Catalog::default();
        catalog.dictionary = Dictionary(entries);

        let mut ctx = ScanContext::new(
            requester,
            Arc::new(catalog),
            cache,
            "http://a.test/".into(),
            "a.test".into(),
            Default::default(),
        );
        ctx.results.results.entry("cms".into()).or_default().insert("WordPress".into(), vec!["5.1".into()]);

        ToolsStage.run(&mut ctx).await.unwrap();
        assert!(ctx.results.tools.contains_key("WPScan"));
    }
}
