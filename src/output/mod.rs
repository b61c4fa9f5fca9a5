//! Output formatters: the JSON schema of spec §6 and a plain-text summary.
//! Both are thin translators from [`crate::results::Results`] — the full
//! color/verbosity printer remains an external collaborator.

pub mod json;
pub mod pretty;

use serde::Serialize;

use crate::results::Results;

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub start_time: String,
    pub run_time: f64,
    pub urls: usize,
    pub fingerprints: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteInfoOut {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub cookies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DataEntry {
    Versioned {
        category: String,
        name: String,
        version: Vec<String>,
    },
    Vulnerability {
        category: String,
        name: String,
        version: String,
        link: String,
        vulnerability_count: u32,
    },
    Tool {
        category: String,
        name: String,
        version: String,
    },
    Subdomain {
        category: String,
        name: String,
        title: String,
        ip: String,
    },
    Interesting {
        category: String,
        name: String,
        note: String,
        weight: f64,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub statistics: Statistics,
    pub site_info: SiteInfoOut,
    pub data: Vec<DataEntry>,
}

impl SiteReport {
    /// Build a report from a finalized [`Results`]. `start_time`/`run_time`
    /// come from the orchestrator, which owns the wall-clock around the
    /// stage sequence; `urls`/`fingerprints` are scan-scope counters handed
    /// in separately since `Results` itself doesn't track them.
    #[must_use]
    pub fn from_results(
        url: String,
        start_time: String,
        run_time: f64,
        urls: usize,
        fingerprints: usize,
        results: &Results,
    ) -> Self {
        let mut data = Vec::new();

        for category in ["cms", "javascript", "platform", "os"] {
            if let Some(names) = results.results.get(category) {
                let mut names: Vec<_> = names.iter().collect();
                names.sort_by(|a, b| a.0.cmp(b.0));
                for (name, versions) in names {
                    data.push(DataEntry::Versioned {
                        category: category.to_string(),
                        name: name.clone(),
                        version: versions.clone(),
                    });
                }
            }
        }

        let mut vulns: Vec<_> = results.vulnerabilities.iter().collect();
        vulns.sort_by(|a, b| a.0.cmp(b.0));
        for ((name, version), entry) in vulns {
            data.push(DataEntry::Vulnerability {
                category: "vulnerability".to_string(),
                name: name.clone(),
                version: version.clone(),
                link: entry.link.clone(),
                vulnerability_count: entry.count,
            });
        }

        let mut tools: Vec<_> = results.tools.iter().collect();
        tools.sort_by(|a, b| a.0.cmp(b.0));
        for (tool_name, entry) in tools {
            data.push(DataEntry::Tool {
                category: "tools".to_string(),
                name: tool_name.clone(),
                version: entry.cms.clone(),
            });
        }

        let mut subdomains: Vec<_> = results.subdomains.iter().collect();
        subdomains.sort_by(|a, b| a.0.cmp(b.0));
        for (host, entry) in subdomains {
            data.push(DataEntry::Subdomain {
                category: "subdomains".to_string(),
                name: host.clone(),
                title: entry.title.clone(),
                ip: entry.ip.clone(),
            });
        }

        let mut interesting: Vec<_> = results.interesting.iter().collect();
        interesting.sort_by(|a, b| a.0.cmp(b.0));
        for (url, notes) in interesting {
            let mut notes: Vec<_> = notes.iter().collect();
            notes.sort_by(|a, b| a.0.cmp(b.0));
            for (note, weight) in notes {
                data.push(DataEntry::Interesting {
                    category: "interesting".to_string(),
                    name: url.clone(),
                    note: note.clone(),
                    weight: *weight,
                });
            }
        }

        Self {
            statistics: Statistics { start_time, run_time, urls, fingerprints },
            site_info: SiteInfoOut {
                url,
                title: results.site_info.title.clone(),
                cookies: {
                    let mut c: Vec<_> = results.site_info.cookies.iter().cloned().collect();
                    c.sort();
                    c
                },
                ip: results.site_info.ip.clone(),
                error: None,
            },
            data,
        }
    }

    /// A report for a target whose host could not be resolved at all —
    /// per spec §7, surfaced as a typed error but recorded as a normal
    /// (empty) site entry so a multi-target run continues.
    #[must_use]
    pub fn error(url: String, error: String) -> Self {
        Self {
            statistics: Statistics { start_time: String::new(), run_time: 0.0, urls: 0, fingerprints: 0 },
            site_info: SiteInfoOut { url, title: None, cookies: Vec::new(), ip: None, error: Some(error) },
            data: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_report_has_no_data() {
        let report = SiteReport::error("http://dead.test/".into(), "unknown host".into());
        assert!(report.data.is_empty());
        assert_eq!(report.site_info.error.as_deref(), Some("unknown host"));
    }
}
