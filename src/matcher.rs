//! Evaluates fingerprints against a response: the four match kinds plus the
//! shared 404-class gate.

use std::collections::HashSet;

use crate::cache::Response;
use crate::fingerprint::{Fingerprint, FpCode, MatchKind};

/// A matched fingerprint, with an empty `url` back-filled from the
/// response's URL (used by the UrlLess stage, whose fingerprints carry no
/// `url` of their own).
#[derive(Debug, Clone)]
pub struct MatchedFingerprint {
    pub fp: Fingerprint,
}

pub struct Matcher<'a> {
    pub error_pages: &'a HashSet<String>,
}

impl<'a> Matcher<'a> {
    #[must_use]
    pub fn new(error_pages: &'a HashSet<String>) -> Self {
        Self { error_pages }
    }

    /// Evaluate every fingerprint in `fps` against `response`, returning the
    /// subset that match.
    #[must_use]
    pub fn get_result(&self, fps: &[Fingerprint], response: &Response) -> Vec<MatchedFingerprint> {
        fps.iter()
            .filter_map(|fp| self.match_one(fp, response))
            .collect()
    }

    fn match_one(&self, fp: &Fingerprint, response: &Response) -> Option<MatchedFingerprint> {
        if !self.check_page(fp, response) {
            return None;
        }

        let matched = self.match_kind(&fp.kind, response)?;

        let mut copy = fp.clone();
        if copy.url.is_empty() {
            copy.url = response.url.clone();
        }
        if let Some(capture) = matched.capture
            && copy.output.contains("%s")
        {
            copy.output = copy.output.replacen("%s", &capture, 1);
        }
        Some(MatchedFingerprint { fp: copy })
    }

    /// `_check_page`: reconciles the fingerprint's expected status against
    /// the response's actual (possibly soft-404-reclassified) status.
    fn check_page(&self, fp: &Fingerprint, response: &Response) -> bool {
        let is_404 = response.status == 404 || self.error_pages.contains(&response.md5_404);
        match fp.code {
            FpCode::Any => true,
            FpCode::Exact(code) => !(is_404 ^ (code == 404)),
        }
    }

    fn match_kind(&self, kind: &MatchKind, response: &Response) -> Option<MatchOutcome> {
        match kind {
            MatchKind::Md5 { digest } => (digest.eq_ignore_ascii_case(&response.md5)).then_some(MatchOutcome::none()),
            MatchKind::String { needle } => {
                if response.is_image() {
                    return None;
                }
                response.text.contains(needle.as_str()).then_some(MatchOutcome::none())
            }
            MatchKind::Regex { pattern } => {
                if response.is_image() {
                    return None;
                }
                let caps = pattern.captures(&response.text)?;
                let capture = caps.get(1).map(|m| m.as_str().to_string());
                Some(MatchOutcome { capture })
            }
            MatchKind::Header { header, inner } => {
                let value = response.header(header)?;
                self.match_header_inner(inner, value)
            }
        }
    }

    fn match_header_inner(&self, inner: &MatchKind, value: &str) -> Option<MatchOutcome> {
        match inner {
            MatchKind::String { needle } => value.contains(needle.as_str()).then_some(MatchOutcome::none()),
            MatchKind::Regex { pattern } => {
                let caps = pattern.captures(value)?;
                let capture = caps.get(1).map(|m| m.as_str().to_string());
                Some(MatchOutcome { capture })
            }
            MatchKind::Md5 { digest } => (digest.eq_ignore_ascii_case(value)).then_some(MatchOutcome::none()),
            MatchKind::Header { .. } => None,
        }
    }
}

struct MatchOutcome {
    capture: Option<String>,
}

impl MatchOutcome {
    fn none() -> Self {
        Self { capture: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn response(status: u16, body: &str, content_type: Option<&str>) -> Response {
        let headers = content_type
            .map(|ct| vec![("content-type".to_string(), ct.to_string())])
            .unwrap_or_default();
        Response::new(
            "http://a.test/x".into(),
            "http".into(),
            "a.test".into(),
            status,
            headers,
            body.as_bytes().to_vec(),
            false,
        )
    }

    fn regex_fp(pattern: &str, output: &str) -> Fingerprint {
        Fingerprint {
            kind: MatchKind::Regex { pattern: Regex::new(pattern).unwrap() },
            url: String::new(),
            name: "WordPress".into(),
            output: output.into(),
            code: FpCode::Exact(200),
            weight: 1.0,
            note: None,
            show_all_detections: false,
        }
    }

    #[test]
    fn regex_match_substitutes_capture_into_output() {
        let error_pages = HashSet::new();
        let matcher = Matcher::new(&error_pages);
        let fp = regex_fp(r"Version ([0-9.]+)", "%s");
        let resp = response(200, "Version 5.1 is installed", Some("text/html"));
        let matches = matcher.get_result(&[fp], &resp);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].fp.output, "5.1");
    }

    #[test]
    fn status_gate_rejects_non_200_without_soft_404() {
        let error_pages = HashSet::new();
        let matcher = Matcher::new(&error_pages);
        let fp = regex_fp(r"Version ([0-9.]+)", "%s");
        let resp = response(500, "Version 5.1 is installed", Some("text/html"));
        assert!(matcher.get_result(&[fp], &resp).is_empty());
    }

    #[test]
    fn status_gate_accepts_soft_404_reclassified_as_404() {
        let resp = response(200, "whatever", Some("text/html"));
        let mut error_pages = HashSet::new();
        error_pages.insert(resp.md5_404.clone());

        let fp = Fingerprint {
            code: FpCode::Exact(404),
            ..regex_fp(r"whatever", "hit")
        };
        let matcher = Matcher::new(&error_pages);
        assert_eq!(matcher.get_result(&[fp], &resp).len(), 1);
    }

    #[test]
    fn image_responses_never_produce_string_or_regex_matches() {
        let error_pages = HashSet::new();
        let matcher = Matcher::new(&error_pages);
        let fp = regex_fp(r"Version ([0-9.]+)", "%s");
        let resp = response(200, "Version 5.1", Some("image/png"));
        assert!(matcher.get_result(&[fp], &resp).is_empty());
    }

    #[test]
    fn image_responses_can_still_match_digests() {
        let error_pages = HashSet::new();
        let matcher = Matcher::new(&error_pages);
        let resp = response(200, "binarydata", Some("image/png"));
        let fp = Fingerprint {
            kind: MatchKind::Md5 { digest: resp.md5.clone() },
            ..regex_fp("unused", "hit")
        };
        assert_eq!(matcher.get_result(&[fp], &resp).len(), 1);
    }
}
