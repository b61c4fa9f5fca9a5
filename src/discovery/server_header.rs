//! Shared `Server` header parsing for the Headers and OS stages.
//!
//! Grounded on `ExtractHeaders._split_server_line` and
//! `DiscoverOS.find_match_in_headers`
//! (`original_source/classes2/{headers,discovery}.py`): a parenthesized
//! segment, if present, is the OS hint; everything else splits on spaces
//! into `pkg/version` tokens.

/// Splits a `Server` header value into an optional OS hint (the
/// parenthesized segment, with the RHEL rename hack applied) and the
/// remaining `pkg/version`-bearing line with the parenthetical removed.
#[must_use]
pub fn split_server_line(line: &str) -> (Option<String>, String) {
    let Some(open) = line.find('(') else {
        return (None, line.to_string());
    };
    let Some(close) = line.find(')') else {
        return (None, line.to_string());
    };
    if close < open {
        return (None, line.to_string());
    }
    let mut os = line[open + 1..close].to_string();
    if os == "Red Hat" {
        os = "Red Hat Enterprise Linux".to_string();
    }
    let before = line[..open].trim_end();
    let after = &line[close + 1..];
    let rest = format!("{before}{after}");
    (Some(os), rest)
}

/// Splits a `pkg/version pkg2/version2 ...` line into `(pkg, version)`
/// pairs, skipping any token that isn't exactly one `/`.
#[must_use]
pub fn parse_pkg_version_pairs(line: &str) -> Vec<(String, String)> {
    line.split(' ')
        .filter_map(|part| {
            let mut split = part.splitn(2, '/');
            let pkg = split.next()?;
            let version = split.next()?;
            if version.contains('/') {
                return None;
            }
            Some((pkg.to_string(), version.to_string()))
        })
        .collect()
}
