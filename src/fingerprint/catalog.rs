//! Loads the on-disk fingerprint tree into typed, in-memory groups.
//!
//! Directory layout (relative to a configured data directory):
//! `cms/{md5,regex,string,header}/`, `js/{md5,regex}/`,
//! `platform/{md5,regex,string,header}/`, `vulnerabilities/cvedetails/`,
//! `os/`, plus `dictionary.json`, `error_pages.json`, `interesting.json`,
//! `subdomains.json`.

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::{Result, WigError};
use crate::fingerprint::dictionary::Dictionary;
use crate::fingerprint::model::{
    Fingerprint, FpCode, MatchKind, OsFingerprint, RawFingerprint, RawVulnerability,
    VulnerabilityFingerprint,
};

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub cms: Vec<Fingerprint>,
    pub js: Vec<Fingerprint>,
    pub platform: Vec<Fingerprint>,
    pub vulnerabilities: Vec<VulnerabilityFingerprint>,
    pub os: Vec<OsFingerprint>,
    pub error_pages: Vec<Fingerprint>,
    pub interesting: Vec<Fingerprint>,
    pub subdomains: Vec<String>,
    pub dictionary: Dictionary,
}

impl Catalog {
    /// Load the full catalog from `data_dir`. A missing data directory or a
    /// missing dictionary entry for a named category file is fatal
    /// (`WigError::Configuration`); an unreadable individual JSON file is
    /// skipped with a warning.
    pub fn load(data_dir: &Path) -> Result<Self> {
        if !data_dir.is_dir() {
            return Err(WigError::Configuration(format!(
                "fingerprint data directory not found: {}",
                data_dir.display()
            )));
        }

        let dictionary = load_dictionary(&data_dir.join("dictionary.json"))?;

        let mut catalog = Catalog {
            dictionary,
            ..Default::default()
        };

        for kind in ["md5", "regex", "string", "header"] {
            let dir = data_dir.join("cms").join(kind);
            catalog
                .cms
                .extend(load_named_group(&dir, kind, &catalog.dictionary)?);
        }
        for kind in ["md5", "regex"] {
            let dir = data_dir.join("js").join(kind);
            catalog
                .js
                .extend(load_named_group(&dir, kind, &catalog.dictionary)?);
        }
        for kind in ["md5", "regex", "string", "header"] {
            let dir = data_dir.join("platform").join(kind);
            catalog
                .platform
                .extend(load_named_group(&dir, kind, &catalog.dictionary)?);
        }
        let vuln_dir = data_dir.join("vulnerabilities").join("cvedetails");
        catalog.vulnerabilities = load_vulnerabilities(&vuln_dir, &catalog.dictionary)?;

        catalog.os = load_os_dir(&data_dir.join("os"))?;

        catalog.error_pages = load_plain_array(&data_dir.join("error_pages.json"))?;
        catalog.interesting = load_interesting(&data_dir.join("interesting.json"))?;
        catalog.subdomains = load_subdomains(&data_dir.join("subdomains.json"))?;

        Ok(catalog)
    }
}

fn load_dictionary(path: &Path) -> Result<Dictionary> {
    if !path.is_file() {
        return Err(WigError::Configuration(format!(
            "missing dictionary file: {}",
            path.display()
        )));
    }
    let text = fs::read_to_string(path).map_err(|e| {
        WigError::Configuration(format!("cannot read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&text).map_err(|source| WigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load every `*.json` file in `dir`, where `kind` (one of
/// `md5`/`string`/`regex`/`header`) determines which [`MatchKind`] variant
/// each record becomes. Each file's basename (without extension) must have
/// a dictionary entry; a missing entry is a fatal configuration error.
fn load_named_group(dir: &Path, kind: &str, dictionary: &Dictionary) -> Result<Vec<Fingerprint>> {
    let mut out = Vec::new();
    if !dir.is_dir() {
        return Ok(out);
    }
    for entry in fs::read_dir(dir)
        .map_err(|e| WigError::Configuration(format!("cannot read {}: {e}", dir.display())))?
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("skipping unreadable directory entry in {}: {e}", dir.display());
                continue;
            }
        };
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let basename = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let name = match dictionary.name_for(&basename) {
            Some(n) => n.to_string(),
            None => {
                return Err(WigError::Configuration(format!(
                    "no dictionary entry for fingerprint file {basename}"
                )));
            }
        };
        let raws: Vec<RawFingerprint> = match read_json_array(&path) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("skipping malformed fingerprint file {}: {e}", path.display());
                continue;
            }
        };
        for raw in raws {
            match build_fingerprint(raw, kind, &name) {
                Ok(fp) => out.push(fp),
                Err(e) => log::warn!("skipping malformed fingerprint in {}: {e}", path.display()),
            }
        }
    }
    Ok(out)
}

fn read_json_array<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn build_fingerprint(raw: RawFingerprint, dir_kind: &str, name: &str) -> anyhow::Result<Fingerprint> {
    let type_ = raw.type_.clone().unwrap_or_else(|| dir_kind.to_string());
    let kind = build_match_kind(&type_, raw.match_.as_deref(), raw.header.as_deref())?;
    Ok(Fingerprint {
        kind,
        url: raw.url,
        name: name.to_string(),
        output: raw.output,
        code: raw.code.as_ref().map(RawFingerprint::code_to_fp_code).unwrap_or_default(),
        weight: raw.weight.unwrap_or(1.0),
        note: raw.note,
        show_all_detections: raw.show_all_detections,
    })
}

impl RawFingerprint {
    fn code_to_fp_code(code: &crate::fingerprint::model::RawCode) -> FpCode {
        code.to_fp_code()
    }
}

fn build_match_kind(type_: &str, match_: Option<&str>, header: Option<&str>) -> anyhow::Result<MatchKind> {
    let inner = match type_ {
        "md5" => MatchKind::Md5 {
            digest: match_.unwrap_or_default().to_lowercase(),
        },
        "string" => MatchKind::String {
            needle: match_.unwrap_or_default().to_string(),
        },
        "regex" => MatchKind::Regex {
            pattern: Regex::new(match_.unwrap_or_default())?,
        },
        other => anyhow::bail!("unknown fingerprint type {other}"),
    };
    match header {
        Some(h) => Ok(MatchKind::Header {
            header: h.to_string(),
            inner: Box::new(inner),
        }),
        None => Ok(inner),
    }
}

/// Load `vulnerabilities/cvedetails/*.json`. Each file's basename resolves a
/// CMS name through the dictionary, same as `load_named_group`, but the
/// records themselves carry `version`/`num_vulns`/`link` rather than a
/// `type`/`match`/`url` triple.
fn load_vulnerabilities(dir: &Path, dictionary: &Dictionary) -> Result<Vec<VulnerabilityFingerprint>> {
    let mut out = Vec::new();
    if !dir.is_dir() {
        return Ok(out);
    }
    for entry in fs::read_dir(dir)
        .map_err(|e| WigError::Configuration(format!("cannot read {}: {e}", dir.display())))?
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("skipping unreadable directory entry in {}: {e}", dir.display());
                continue;
            }
        };
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let basename = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let name = match dictionary.name_for(&basename) {
            Some(n) => n.to_string(),
            None => {
                return Err(WigError::Configuration(format!(
                    "no dictionary entry for vulnerability file {basename}"
                )));
            }
        };
        let raws: Vec<RawVulnerability> = match read_json_array(&path) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("skipping malformed vulnerability file {}: {e}", path.display());
                continue;
            }
        };
        out.extend(raws.into_iter().map(|raw| VulnerabilityFingerprint {
            name: name.clone(),
            version: raw.version,
            num_vulns: raw.num_vulns,
            link: raw.link,
        }));
    }
    Ok(out)
}

fn load_os_dir(dir: &Path) -> Result<Vec<OsFingerprint>> {
    let mut out = Vec::new();
    if !dir.is_dir() {
        return Ok(out);
    }
    for entry in fs::read_dir(dir)
        .map_err(|e| WigError::Configuration(format!("cannot read {}: {e}", dir.display())))?
    {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match read_json_array::<OsFingerprint>(&path) {
            Ok(mut v) => out.append(&mut v),
            Err(e) => log::warn!("skipping malformed OS fingerprint file {}: {e}", path.display()),
        }
    }
    Ok(out)
}

fn load_plain_array(path: &Path) -> Result<Vec<Fingerprint>> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let raws: Vec<RawFingerprint> = match read_json_array(path) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("skipping malformed file {}: {e}", path.display());
            return Ok(Vec::new());
        }
    };
    let mut out = Vec::new();
    for raw in raws {
        let type_ = raw.type_.clone().unwrap_or_else(|| "string".to_string());
        match build_fingerprint(raw, &type_, "") {
            Ok(fp) => out.push(fp),
            Err(e) => log::warn!("skipping malformed record in {}: {e}", path.display()),
        }
    }
    Ok(out)
}

/// `interesting.json` records may carry an `ext` array, which expands into
/// one sibling fingerprint per extension with `url` suffixed by `.ext`.
fn load_interesting(path: &Path) -> Result<Vec<Fingerprint>> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let raws: Vec<RawFingerprint> = match read_json_array(path) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("skipping malformed file {}: {e}", path.display());
            return Ok(Vec::new());
        }
    };
    let mut out = Vec::new();
    for raw in raws {
        let type_ = raw.type_.clone().unwrap_or_else(|| "string".to_string());
        if let Some(exts) = raw.ext.clone() {
            for ext in exts {
                let mut copy = raw.clone();
                copy.url = format!("{}.{ext}", copy.url);
                match build_fingerprint(copy, &type_, "") {
                    Ok(fp) => out.push(fp),
                    Err(e) => log::warn!("skipping malformed interesting record in {}: {e}", path.display()),
                }
            }
        } else {
            match build_fingerprint(raw, &type_, "") {
                Ok(fp) => out.push(fp),
                Err(e) => log::warn!("skipping malformed interesting record in {}: {e}", path.display()),
            }
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(untagged)]
enum SubdomainRecord {
    Name(String),
    Object { name: String },
}

fn load_subdomains(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let records: Vec<SubdomainRecord> = match read_json_array(path) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("skipping malformed file {}: {e}", path.display());
            return Ok(Vec::new());
        }
    };
    Ok(records
        .into_iter()
        .map(|r| match r {
            SubdomainRecord::Name(n) => n,
            SubdomainRecord::Object { name } => name,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(path: &Path, content: &str) {
        let mut f = fs::File::create(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn missing_data_dir_is_configuration_error() {
        let err = Catalog::load(Path::new("/nonexistent/path/for/test")).unwrap_err();
        assert!(matches!(err, WigError::Configuration(_)));
    }

    #[test]
    fn missing_dictionary_entry_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("dictionary.json"), "{}");
        fs::create_dir_all(dir.path().join("cms/regex")).unwrap();
        write(
            &dir.path().join("cms/regex/wordpress.json"),
            r#"[{"type":"regex","url":"/readme.html","match":"Version ([0-9.]+)","output":"%s"}]"#,
        );
        let err = Catalog::load(dir.path()).unwrap_err();
        assert!(matches!(err, WigError::Configuration(_)));
    }

    #[test]
    fn loads_cms_fingerprints_and_resolves_name() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("dictionary.json"),
            r#"{"wordpress": {"name": "WordPress"}}"#,
        );
        fs::create_dir_all(dir.path().join("cms/regex")).unwrap();
        write(
            &dir.path().join("cms/regex/wordpress.json"),
            r#"[{"type":"regex","url":"/readme.html","match":"Version ([0-9.]+)","output":"%s"}]"#,
        );
        let catalog = Catalog::load(dir.path()).unwrap();
        assert_eq!(catalog.cms.len(), 1);
        assert_eq!(catalog.cms[0].name, "WordPress");
    }

    #[test]
    fn interesting_ext_expansion() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("dictionary.json"), "{}");
        write(
            &dir.path().join("interesting.json"),
            r#"[{"type":"string","url":"/backup","match":"","output":"backup file","ext":["zip","tar.gz"]}]"#,
        );
        let catalog = Catalog::load(dir.path()).unwrap();
        assert_eq!(catalog.interesting.len(), 2);
        assert_eq!(catalog.interesting[0].url, "/backup.zip");
        assert_eq!(catalog.interesting[1].url, "/backup.tar.gz");
    }
}
