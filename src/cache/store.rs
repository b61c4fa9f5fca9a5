//! Per-host, TTL-bounded response cache.
//!
//! All reads and writes go through one [`parking_lot::Mutex`] guarding the
//! whole map — not a sharded/lock-free map — so that `contains` always
//! reflects the most recently completed `put`, per the single-lock
//! invariant.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::cache::response::Response;

pub const DEFAULT_TTL_SECS: u64 = 86_400;

pub struct Cache {
    host: String,
    cache_dir: PathBuf,
    ttl_secs: u64,
    cache_name: Mutex<String>,
    map: Mutex<HashMap<String, Response>>,
}

impl Cache {
    #[must_use]
    pub fn new(cache_dir: PathBuf, ttl_secs: u64) -> Self {
        Self {
            host: String::new(),
            cache_dir,
            ttl_secs,
            cache_name: Mutex::new(String::new()),
            map: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_host(&mut self, host: &str) {
        self.host = host.to_string();
        *self.cache_name.lock() = format!("{}_-_{}.cache", sanitize_host(host), now_secs());
    }

    #[must_use]
    pub fn get(&self, url: &str) -> Option<Response> {
        self.map.lock().get(url).cloned()
    }

    pub fn put(&self, url: String, response: Response) {
        self.map.lock().insert(url, response);
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.map.lock().contains_key(url)
    }

    /// Distinct responses held, counted by `Response::id` rather than by
    /// key, since a response is indexed under both its requested URL and
    /// its final post-redirect URL.
    #[must_use]
    pub fn size_distinct_ids(&self) -> usize {
        let map = self.map.lock();
        let mut ids: Vec<&str> = map.values().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Every distinct response currently held, deduplicated by `id` since a
    /// response is indexed under both its requested and final URL. Used by
    /// the discovery stages that scan the whole cache (JavaScript, UrlLess,
    /// Cookies, Headers, OS, AllCMS, More).
    #[must_use]
    pub fn get_responses(&self) -> Vec<Response> {
        let map = self.map.lock();
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::with_capacity(map.len());
        for response in map.values() {
            if seen.insert(response.id.clone()) {
                out.push(response.clone());
            }
        }
        out
    }

    /// Persist the current map under this instance's `cache_name`. Any
    /// other existing file for the same host (matched by the sanitized host
    /// prefix before `_-_`) is removed first.
    pub fn save(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.cache_dir)?;
        let prefix = format!("{}_-_", sanitize_host(&self.host));
        let cache_name = self.cache_name.lock().clone();
        if let Ok(entries) = fs::read_dir(&self.cache_dir) {
            for entry in entries.flatten() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.starts_with(&prefix) && *name != cache_name {
                    let _ = fs::remove_file(entry.path());
                }
            }
        }
        let map = self.map.lock();
        let serialized = serde_json::to_vec(&*map)?;
        fs::write(self.cache_dir.join(&cache_name), serialized)?;
        Ok(())
    }

    /// No-op unless a cache file for the current host exists and is younger
    /// than `ttl_secs`. On success, this instance adopts that file's name so
    /// a later `save()` overwrites it in place rather than creating a new
    /// dated file.
    pub fn load(&mut self) -> anyhow::Result<()> {
        let prefix = format!("{}_-_", sanitize_host(&self.host));
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return Ok(());
        };
        let mut candidate: Option<(PathBuf, String, u64)> = None;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(&prefix) || !name.ends_with(".cache") {
                continue;
            }
            if let Some(created) = parse_created(&name, &prefix) {
                candidate = Some((entry.path(), name, created));
                break;
            }
        }
        let Some((path, name, created)) = candidate else {
            return Ok(());
        };
        if now_secs().saturating_sub(created) >= self.ttl_secs {
            return Ok(());
        }
        let data = fs::read(&path)?;
        let loaded: HashMap<String, Response> = serde_json::from_slice(&data)?;
        *self.map.lock() = loaded;
        *self.cache_name.lock() = name;
        Ok(())
    }

    /// Startup sweep: delete every `*.cache` file in `cache_dir` older than
    /// `ttl_secs`, regardless of host.
    pub fn sweep_expired(cache_dir: &Path, ttl_secs: u64) {
        let Ok(entries) = fs::read_dir(cache_dir) else {
            return;
        };
        let now = now_secs();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(idx) = name.rfind("_-_") else {
                continue;
            };
            let Some(created) = parse_created(&name, &name[..=idx + 2]) else {
                continue;
            };
            if now.saturating_sub(created) > ttl_secs {
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}

fn parse_created(name: &str, prefix: &str) -> Option<u64> {
    let rest = name.strip_prefix(prefix)?;
    let rest = rest.strip_suffix(".cache")?;
    rest.parse::<u64>().ok()
}

/// `/` is dropped entirely, `:` becomes `..`.
#[must_use]
pub fn sanitize_host(host: &str) -> String {
    host.replace('/', "").replace(':', "..")
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response(url: &str) -> Response {
        Response::new(
            url.to_string(),
            "http".into(),
            "example.com".into(),
            200,
            vec![],
            b"hi".to_vec(),
            false,
        )
    }

    #[test]
    fn sanitize_matches_spec_rule() {
        assert_eq!(sanitize_host("example.com:8080"), "example.com..8080");
        assert_eq!(sanitize_host("a/b:c"), "ab..c");
    }

    #[test]
    fn put_then_get_round_trips() {
        let mut cache = Cache::new(PathBuf::from("/tmp/webfp-test-cache-unused"), DEFAULT_TTL_SECS);
        cache.set_host("example.com");
        cache.put("http://example.com/".into(), sample_response("http://example.com/"));
        assert!(cache.contains("http://example.com/"));
        assert!(cache.get("http://example.com/").is_some());
        assert!(!cache.contains("http://example.com/missing"));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = Cache::new(dir.path().to_path_buf(), DEFAULT_TTL_SECS);
        cache.set_host("example.com");
        cache.put("http://example.com/".into(), sample_response("http://example.com/"));
        cache.save().unwrap();

        let mut reloaded = Cache::new(dir.path().to_path_buf(), DEFAULT_TTL_SECS);
        reloaded.set_host("example.com");
        reloaded.load().unwrap();
        assert!(reloaded.contains("http://example.com/"));
    }

    #[test]
    fn stale_cache_file_is_ignored_by_load() {
        let dir = tempfile::tempdir().unwrap();
        let stale_name = format!("example.com_-_{}.cache", now_secs().saturating_sub(DEFAULT_TTL_SECS + 10));
        fs::write(dir.path().join(&stale_name), b"{}").unwrap();

        let mut cache = Cache::new(dir.path().to_path_buf(), DEFAULT_TTL_SECS);
        cache.set_host("example.com");
        cache.load().unwrap();
        assert!(!cache.contains("http://example.com/"));
    }

    #[test]
    fn sweep_expired_removes_old_files_regardless_of_host() {
        let dir = tempfile::tempdir().unwrap();
        let stale = format!("other.test_-_{}.cache", now_secs().saturating_sub(DEFAULT_TTL_SECS + 10));
        let fresh = format!("other.test_-_{}.cache", now_secs());
        fs::write(dir.path().join(&stale), b"{}").unwrap();
        fs::write(dir.path().join(&fresh), b"{}").unwrap();

        Cache::sweep_expired(dir.path(), DEFAULT_TTL_SECS);

        assert!(!dir.path().join(&stale).exists());
        assert!(dir.path().join(&fresh).exists());
    }
}
