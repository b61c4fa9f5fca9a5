//! Weighted evidence aggregation: accumulates per-category scores as stages
//! run, then finalizes them into tie-broken version lists.

use std::collections::{HashMap, HashSet};

use crate::fingerprint::Fingerprint;

/// The version argument to [`Results::add`]. Mirrors the three shapes the
/// original aggregator accepted in place of a plain version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionInput {
    /// No version at all — only the fingerprint's `note` (if any) is recorded.
    Null,
    /// Presence without a version (tracked with zero weight so the name
    /// still appears, but never wins a tie against a versioned match).
    Empty,
    /// Same as `Empty`; kept distinct to mirror the Python `True` sentinel.
    True,
    Version(String),
}

#[derive(Debug, Clone, Default)]
pub struct VulnerabilityEntry {
    pub count: u32,
    pub link: String,
}

#[derive(Debug, Clone, Default)]
pub struct ToolEntry {
    pub cms: String,
    pub link: String,
}

#[derive(Debug, Clone, Default)]
pub struct SubdomainEntry {
    pub title: String,
    pub ip: String,
}

#[derive(Debug, Clone, Default)]
pub struct SiteInfo {
    pub ip: Option<String>,
    pub title: Option<String>,
    pub cookies: HashSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Results {
    scores: HashMap<String, HashMap<String, HashMap<String, f64>>>,
    md5_matches: HashMap<String, HashMap<(String, String), HashMap<String, u64>>>,

    pub results: HashMap<String, HashMap<String, Vec<String>>>,
    pub vulnerabilities: HashMap<(String, String), VulnerabilityEntry>,
    pub tools: HashMap<String, ToolEntry>,
    pub subdomains: HashMap<String, SubdomainEntry>,
    pub interesting: HashMap<String, HashMap<String, f64>>,
    pub site_info: SiteInfo,
}

fn match_type_of(fp: &Fingerprint) -> &'static str {
    match &fp.kind {
        crate::fingerprint::MatchKind::Md5 { .. } => "md5",
        crate::fingerprint::MatchKind::String { .. } => "string",
        crate::fingerprint::MatchKind::Regex { .. } => "regex",
        crate::fingerprint::MatchKind::Header { .. } => "header",
    }
}

impl Results {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one piece of evidence. `url` identifies the response the
    /// evidence came from (required for digest inverse-weighting, which
    /// operates per-URL).
    pub fn add(
        &mut self,
        url: &str,
        category: &str,
        name: &str,
        version: VersionInput,
        fp: Option<&Fingerprint>,
        default_weight: f64,
    ) {
        if let Some(fp) = fp
            && let Some(note) = &fp.note
        {
            let weight = fp.weight;
            *self
                .interesting
                .entry(url.to_string())
                .or_default()
                .entry(note.clone())
                .or_insert(0.0) += weight;
        }

        let match_type = fp.map(match_type_of).unwrap_or("string");
        let weight = fp.map(|f| f.weight).unwrap_or(default_weight);

        if match_type == "md5" {
            let version_key = match version {
                VersionInput::Null => return,
                VersionInput::Empty | VersionInput::True => String::new(),
                VersionInput::Version(v) => v,
            };
            *self
                .md5_matches
                .entry(url.to_string())
                .or_default()
                .entry((category.to_string(), name.to_string()))
                .or_default()
                .entry(version_key)
                .or_insert(0) += 1;
            return;
        }

        match version {
            VersionInput::Null => {}
            VersionInput::Empty | VersionInput::True => {
                self.scores
                    .entry(category.to_string())
                    .or_default()
                    .entry(name.to_string())
                    .or_default()
                    .entry(String::new())
                    .or_insert(0.0);
            }
            VersionInput::Version(v) => {
                *self
                    .scores
                    .entry(category.to_string())
                    .or_default()
                    .entry(name.to_string())
                    .or_default()
                    .entry(v)
                    .or_insert(0.0) += weight;
            }
        }
    }

    pub fn add_vulnerability(&mut self, name: &str, version: &str, num: u32, link: &str) {
        self.vulnerabilities.insert(
            (name.to_string(), version.to_string()),
            VulnerabilityEntry { count: num, link: link.to_string() },
        );
    }

    pub fn add_tool(&mut self, tool_name: &str, cms: &str, link: &str) {
        self.tools.insert(
            tool_name.to_string(),
            ToolEntry { cms: cms.to_string(), link: link.to_string() },
        );
    }

    pub fn add_subdomain(&mut self, host: &str, title: &str, ip: &str) {
        self.subdomains.insert(
            host.to_string(),
            SubdomainEntry { title: title.to_string(), ip: ip.to_string() },
        );
    }

    /// Finalize: fold digest hits into scores via the inverse-weight rule,
    /// then resolve each (category, name) to its tied-for-top version list.
    pub fn update(&mut self) {
        for per_cat_name in self.md5_matches.values() {
            for ((category, name), versions) in per_cat_name {
                let total: u64 = versions.values().sum();
                if total == 0 {
                    continue;
                }
                for (version, count) in versions {
                    if *count == 0 {
                        continue;
                    }
                    *self
                        .scores
                        .entry(category.clone())
                        .or_default()
                        .entry(name.clone())
                        .or_default()
                        .entry(version.clone())
                        .or_insert(0.0) += 1.0 / total as f64;
                }
            }
        }

        for (category, names) in &self.scores {
            for (name, versions) in names {
                let mut entries: Vec<(String, f64)> =
                    versions.iter().map(|(v, s)| (v.clone(), *s)).collect();
                entries.sort_by(|a, b| {
                    b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
                });
                if entries.len() > 1 && entries[0].0.is_empty() {
                    let empty = entries.remove(0);
                    entries.push(empty);
                }
                let Some(top_score) = entries.first().map(|(_, s)| *s) else { continue };
                let mut tied: Vec<String> = entries
                    .iter()
                    .filter(|(_, s)| (*s - top_score).abs() < f64::EPSILON)
                    .map(|(v, _)| v.clone())
                    .collect();
                tied.sort();
                self.results
                    .entry(category.clone())
                    .or_default()
                    .insert(name.clone(), tied);
            }
        }
    }

    /// `(name, version)` pairs across the four version-bearing categories.
    #[must_use]
    pub fn get_versions(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for category in ["cms", "javascript", "os", "platform"] {
            if let Some(names) = self.results.get(category) {
                for (name, versions) in names {
                    for version in versions {
                        out.push((name.clone(), version.clone()));
                    }
                }
            }
        }
        out
    }

    /// `(name, version)` pairs scored so far in `category`, before
    /// finalization. Used by the OS stage, which cross-references already
    /// accumulated platform scores (`find_match_in_results` in the
    /// original) rather than the finalized, tie-broken `results`.
    #[must_use]
    pub fn scored_versions(&self, category: &str) -> Vec<(String, String)> {
        self.scores
            .get(category)
            .map(|names| {
                names
                    .iter()
                    .flat_map(|(name, versions)| versions.keys().map(move |v| (name.clone(), v.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn versions_for(&self, category: &str, name: &str) -> Vec<String> {
        self.results
            .get(category)
            .and_then(|names| names.get(name))
            .cloned()
            .unwrap_or_default()
    }
}
