//! Typed fingerprint records.
//!
//! A [`Fingerprint`] is the Rust counterpart of the dynamic dictionaries the
//! original catalog used on disk: `type` becomes [`MatchKind`], `code`
//! becomes [`FpCode`], and the `header`-with-nested-match shape becomes
//! [`MatchKind::Header`] wrapping the same two sub-kinds it could carry.

use regex::Regex;
use serde::Deserialize;

/// The HTTP status a fingerprint expects, or "any".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FpCode {
    Exact(u16),
    Any,
}

impl Default for FpCode {
    fn default() -> Self {
        FpCode::Exact(200)
    }
}

#[derive(Debug, Clone)]
pub enum MatchKind {
    Md5 { digest: String },
    String { needle: String },
    Regex { pattern: Regex },
    Header { header: String, inner: Box<MatchKind> },
}

/// A single test against a response. Decorated with `name` at catalog load
/// time (resolved from the dictionary), not read from the raw JSON record.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    pub kind: MatchKind,
    /// Path to probe. Empty means "match against any already-cached response".
    pub url: String,
    pub name: String,
    /// Human-readable label; may contain one `%s` filled from a regex capture.
    pub output: String,
    pub code: FpCode,
    pub weight: f64,
    pub note: Option<String>,
    pub show_all_detections: bool,
}

impl Fingerprint {
    #[must_use]
    pub fn expects_200_only(&self) -> bool {
        matches!(self.code, FpCode::Exact(200))
    }
}

/// A CVE-details vulnerability record. Unlike the other catalog groups this
/// is not a [`Fingerprint`] at all — it carries no `type`/`match`/`url`, just
/// a name (dictionary-resolved, like the other categories), the CMS version
/// it applies to, and a vulnerability count with a reference link.
#[derive(Debug, Clone)]
pub struct VulnerabilityFingerprint {
    pub name: String,
    pub version: String,
    pub num_vulns: u32,
    pub link: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawVulnerability {
    pub version: String,
    pub num_vulns: u32,
    #[serde(default)]
    pub link: String,
}

/// An OS-detection record: a (package, version) pair that, when observed
/// together, implies an operating-system (name, version).
#[derive(Debug, Clone, Deserialize)]
pub struct OsFingerprint {
    pub pkg_name: String,
    pub pkg_version: String,
    pub os_name: String,
    pub os_version: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Raw on-disk shape of a single fingerprint record, as read from a catalog
/// JSON file before `name` resolution and `ext` expansion.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFingerprint {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub output: String,
    pub code: Option<RawCode>,
    #[serde(rename = "match")]
    pub match_: Option<String>,
    pub header: Option<String>,
    pub weight: Option<f64>,
    pub note: Option<String>,
    pub ext: Option<Vec<String>>,
    #[serde(default)]
    pub show_all_detections: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCode {
    Num(u16),
    Any(String),
}

impl RawCode {
    #[must_use]
    pub fn to_fp_code(&self) -> FpCode {
        match self {
            RawCode::Num(n) => FpCode::Exact(*n),
            RawCode::Any(s) if s.eq_ignore_ascii_case("any") => FpCode::Any,
            RawCode::Any(s) => s.parse::<u16>().map(FpCode::Exact).unwrap_or(FpCode::Any),
        }
    }
}
