//! Serializes the top-level array of per-site reports (spec §6).

use std::path::Path;

use crate::output::SiteReport;

pub fn to_string(reports: &[SiteReport]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(reports)
}

pub fn write_to_file(reports: &[SiteReport], path: &Path) -> anyhow::Result<()> {
    let text = to_string(reports)?;
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{SiteInfoOut, Statistics};

    #[test]
    fn serializes_as_top_level_array() {
        let report = SiteReport {
            statistics: Statistics { start_time: "2026-01-01T00:00:00Z".into(), run_time: 1.5, urls: 3, fingerprints: 10 },
            site_info: SiteInfoOut {
                url: "http://a.test/".into(),
                title: Some("A".into()),
                cookies: vec!["PHPSESSID".into()],
                ip: Some("127.0.0.1".into()),
                error: None,
            },
            data: Vec::new(),
        };
        let text = to_string(&[report]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value.is_array());
        assert_eq!(value[0]["site_info"]["url"], "http://a.test/");
    }
}
