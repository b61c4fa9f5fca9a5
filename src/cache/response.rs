//! The [`Response`] type and the canonicalization used to compute stable
//! "soft 404" digests.

use md5::{Digest, Md5};
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub url: String,
    pub scheme: String,
    pub host: String,
    pub status: u16,
    /// Lower-cased header names, original values, in receipt order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub text: String,
    pub md5: String,
    pub md5_404: String,
    pub md5_404_text: String,
    pub id: String,
    pub crawled_response: bool,
}

impl Response {
    #[must_use]
    pub fn new(
        url: String,
        scheme: String,
        host: String,
        status: u16,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
        crawled_response: bool,
    ) -> Self {
        let text = decode_body(&body, &headers);
        let md5 = hex_md5(&body);
        let md5_404 = hex_md5(canonicalize(&text).as_bytes());
        let md5_404_text = hex_md5(canonicalize(&visible_text(&text)).as_bytes());
        Self {
            url,
            scheme,
            host,
            status,
            headers,
            body,
            text,
            md5,
            md5_404,
            md5_404_text,
            id: random_id(),
            crawled_response,
        }
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
            .map(|(_, v)| v.as_str())
    }

    /// The conservative default from the matcher design: an image unless a
    /// `Content-Type` is present and doesn't start with `image/`.
    #[must_use]
    pub fn is_image(&self) -> bool {
        match self.header("content-type") {
            None => true,
            Some(ct) => ct.to_ascii_lowercase().starts_with("image/"),
        }
    }
}

/// Charset handling per the match design: an explicit `charset=` on the
/// `Content-Type` wins; otherwise ISO-8859-1 (a lossless byte→codepoint
/// decode) for any `text/*` body; otherwise a replace-errors UTF-8 decode.
fn decode_body(body: &[u8], headers: &[(String, String)]) -> String {
    let content_type = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        .map(|(_, v)| v.as_str());

    if let Some(ct) = content_type
        && let Some(charset) = ct
            .split(';')
            .find_map(|part| part.trim().strip_prefix("charset="))
    {
        let charset = charset.trim_matches('"').to_ascii_lowercase();
        if charset == "utf-8" || charset == "utf8" {
            return String::from_utf8_lossy(body).into_owned();
        }
        if charset == "iso-8859-1" || charset == "latin1" {
            return decode_iso_8859_1(body);
        }
    }

    let is_text = content_type
        .map(|ct| ct.to_ascii_lowercase().starts_with("text/"))
        .unwrap_or(false);

    if is_text {
        decode_iso_8859_1(body)
    } else {
        String::from_utf8_lossy(body).into_owned()
    }
}

/// ISO-8859-1 maps every byte 1:1 to the Unicode code point of the same
/// value, so this decode can never fail.
fn decode_iso_8859_1(body: &[u8]) -> String {
    body.iter().map(|&b| b as char).collect()
}

/// Strip HTML tags, keeping only visible text — used to produce
/// `md5_404_text` as distinct from the raw-HTML `md5_404`.
#[must_use]
pub fn visible_text(html: &str) -> String {
    let document = scraper::Html::parse_document(html);
    document
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
}

struct Canon {
    time: Regex,
    ampm: Regex,
    epoch13: Regex,
    digits8: Regex,
    digits6: Regex,
    iso_dash: Regex,
    iso_slash: Regex,
    dmy_dash: Regex,
    dmy_slash: Regex,
    dmy_dash_2: Regex,
    dmy_slash_2: Regex,
    abs_path: Regex,
    win_path: Regex,
}

static CANON: OnceLock<Canon> = OnceLock::new();

fn canon() -> &'static Canon {
    CANON.get_or_init(|| Canon {
        time: Regex::new(r"\b\d{1,2}:\d{2}(:\d{2})?\b").unwrap(),
        ampm: Regex::new(r"(?i)\b[ap]\.?m\.?\b").unwrap(),
        epoch13: Regex::new(r"\b\d{13}\b").unwrap(),
        digits8: Regex::new(r"\b\d{8}\b").unwrap(),
        digits6: Regex::new(r"\b\d{6}\b").unwrap(),
        iso_dash: Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").unwrap(),
        iso_slash: Regex::new(r"\b\d{4}/\d{2}/\d{2}\b").unwrap(),
        dmy_dash: Regex::new(r"\b\d{2}-\d{2}-\d{4}\b").unwrap(),
        dmy_slash: Regex::new(r"\b\d{2}/\d{2}/\d{4}\b").unwrap(),
        dmy_dash_2: Regex::new(r"\b\d{2}-\d{2}-\d{2}\b").unwrap(),
        dmy_slash_2: Regex::new(r"\b\d{2}/\d{2}/\d{2}\b").unwrap(),
        abs_path: Regex::new(r"/\S+").unwrap(),
        win_path: Regex::new(r"[a-zA-Z]:\\\S+").unwrap(),
    })
}

/// Strip time-of-day, date, and path tokens so that two renderings of the
/// same "not found" template (which typically differ only in a timestamp or
/// a requested path) canonicalize to the same digest.
#[must_use]
pub fn canonicalize(input: &str) -> String {
    let c = canon();
    let mut s = input.to_string();
    s = c.time.replace_all(&s, "").into_owned();
    s = c.ampm.replace_all(&s, "").into_owned();
    s = c.epoch13.replace_all(&s, "").into_owned();
    s = c.digits8.replace_all(&s, "").into_owned();
    s = c.iso_dash.replace_all(&s, "").into_owned();
    s = c.iso_slash.replace_all(&s, "").into_owned();
    s = c.dmy_dash.replace_all(&s, "").into_owned();
    s = c.dmy_slash.replace_all(&s, "").into_owned();
    s = c.digits6.replace_all(&s, "").into_owned();
    s = c.dmy_dash_2.replace_all(&s, "").into_owned();
    s = c.dmy_slash_2.replace_all(&s, "").into_owned();
    s = c.win_path.replace_all(&s, "").into_owned();
    s = c.abs_path.replace_all(&s, "").into_owned();
    s
}

#[must_use]
pub fn hex_md5(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn random_id() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::rng();
    (0..16)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_strips_time_and_date_tokens() {
        let a = canonicalize("Not Found at 14:32:09 on 2024-01-05, path /missing/page");
        let b = canonicalize("Not Found at 09:01:00 on 2023-11-20, path /other/page");
        assert_eq!(a, b);
    }

    #[test]
    fn digests_are_stable_for_same_body() {
        let r1 = Response::new(
            "http://a.test/x".into(),
            "http".into(),
            "a.test".into(),
            200,
            vec![("content-type".into(), "text/plain".into())],
            b"hello world".to_vec(),
            false,
        );
        let r2 = Response::new(
            "http://a.test/y".into(),
            "http".into(),
            "a.test".into(),
            200,
            vec![("content-type".into(), "text/plain".into())],
            b"hello world".to_vec(),
            false,
        );
        assert_eq!(r1.md5, r2.md5);
        assert_ne!(r1.id, r2.id);
    }

    #[test]
    fn image_default_is_true_without_content_type() {
        let r = Response::new(
            "http://a.test/x".into(),
            "http".into(),
            "a.test".into(),
            200,
            vec![],
            b"binary".to_vec(),
            false,
        );
        assert!(r.is_image());
    }
}
