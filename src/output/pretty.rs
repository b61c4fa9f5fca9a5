//! A minimal human-readable summary, sufficient to exercise the orchestrator
//! end-to-end. The full color/verbosity printer is an external collaborator
//! per spec's explicit non-goal.

use std::fmt::Write as _;

use crate::output::{DataEntry, SiteReport};

#[must_use]
pub fn render(report: &SiteReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[+] {}", report.site_info.url);
    if let Some(error) = &report.site_info.error {
        let _ = writeln!(out, "    error: {error}");
        return out;
    }
    if let Some(title) = &report.site_info.title {
        let _ = writeln!(out, "    title: {title}");
    }
    if let Some(ip) = &report.site_info.ip {
        let _ = writeln!(out, "    ip: {ip}");
    }
    if !report.site_info.cookies.is_empty() {
        let _ = writeln!(out, "    cookies: {}", report.site_info.cookies.join(", "));
    }
    for entry in &report.data {
        match entry {
            DataEntry::Versioned { category, name, version } => {
                let _ = writeln!(out, "    [{category}] {name} {}", version.join(" / "));
            }
            DataEntry::Vulnerability { name, version, vulnerability_count, link, .. } => {
                let _ = writeln!(out, "    [vulnerability] {name} {version}: {vulnerability_count} known ({link})");
            }
            DataEntry::Tool { name, version, .. } => {
                let _ = writeln!(out, "    [tools] {name} (for {version})");
            }
            DataEntry::Subdomain { name, title, ip, .. } => {
                let _ = writeln!(out, "    [subdomains] {name} -- {title} ({ip})");
            }
            DataEntry::Interesting { name, note, weight, .. } => {
                let _ = writeln!(out, "    [interesting] {name}: {note} (weight {weight})");
            }
        }
    }
    let _ = writeln!(
        out,
        "    scanned {} url(s) against {} fingerprint(s) in {:.2}s",
        report.statistics.urls, report.statistics.fingerprints, report.statistics.run_time
    );
    out
}
