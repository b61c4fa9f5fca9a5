//! Per-URL fingerprint grouping shared by the CMS and Platform stages.
//!
//! Grounded on `DiscoverCMS.get_queue` (`original_source/classes2/discovery.py`):
//! fingerprints are grouped by the URL they probe so one probe serves every
//! fingerprint sharing it, then handed out in fixed-size batches.

use std::collections::HashMap;

use crate::fingerprint::Fingerprint;

/// Fingerprints bucketed by the URL they probe, in first-seen order.
pub struct FingerprintQueue {
    order: Vec<String>,
    groups: HashMap<String, Vec<Fingerprint>>,
}

impl FingerprintQueue {
    #[must_use]
    pub fn from_fingerprints(fps: &[Fingerprint]) -> Self {
        let mut order = Vec::new();
        let mut groups: HashMap<String, Vec<Fingerprint>> = HashMap::new();
        for fp in fps {
            let entry = groups.entry(fp.url.clone());
            if let std::collections::hash_map::Entry::Vacant(_) = entry {
                order.push(fp.url.clone());
            }
            entry.or_default().push(fp.clone());
        }
        Self { order, groups }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Pop up to `n` URL-groups off the front of the queue.
    pub fn pop_batch(&mut self, n: usize) -> Vec<Vec<Fingerprint>> {
        let take = n.min(self.order.len());
        self.order
            .drain(..take)
            .filter_map(|url| self.groups.remove(&url))
            .collect()
    }

    /// Pop every remaining URL-group.
    pub fn pop_all(&mut self) -> Vec<Vec<Fingerprint>> {
        self.pop_batch(self.order.len())
    }

    /// Remove every fingerprint named `name` from the queue, regardless of
    /// which URL-group it lives in, and return the survivors re-grouped by
    /// URL. A URL whose entire group matched `name` is dropped from the
    /// queue entirely; a URL with some matching and some non-matching
    /// fingerprints keeps only the non-matching ones.
    pub fn extract_by_name(&mut self, name: &str) -> Vec<Vec<Fingerprint>> {
        let mut extracted = Vec::new();
        let mut still_empty = Vec::new();
        for url in &self.order {
            let Some(group) = self.groups.get_mut(url) else { continue };
            let (matching, remaining): (Vec<_>, Vec<_>) =
                group.drain(..).partition(|fp| fp.name == name);
            if !matching.is_empty() {
                extracted.push(matching);
            }
            if remaining.is_empty() {
                still_empty.push(url.clone());
            } else {
                *group = remaining;
            }
        }
        let drop: std::collections::HashSet<_> = still_empty.into_iter().collect();
        self.order.retain(|url| !drop.contains(url));
        for url in &drop {
            self.groups.remove(url);
        }
        extracted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::{FpCode, MatchKind};

    fn fp(name: &str, url: &str) -> Fingerprint {
        Fingerprint {
            kind: MatchKind::String { needle: "x".into() },
            url: url.to_string(),
            name: name.to_string(),
            output: String::new(),
            code: FpCode::Exact(200),
            weight: 1.0,
            note: None,
            show_all_detections: false,
        }
    }

    #[test]
    fn groups_by_shared_url() {
        let fps = vec![fp("A", "/x"), fp("B", "/x"), fp("C", "/y")];
        let mut q = FingerprintQueue::from_fingerprints(&fps);
        assert_eq!(q.len(), 2);
        let batch = q.pop_batch(1);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].len(), 2);
        assert!(q.is_empty() == false);
        let rest = q.pop_all();
        assert_eq!(rest.len(), 1);
        assert!(q.is_empty());
    }

    #[test]
    fn extract_by_name_drops_exhausted_url_but_keeps_siblings() {
        let fps = vec![fp("A", "/x"), fp("B", "/x"), fp("A", "/y")];
        let mut q = FingerprintQueue::from_fingerprints(&fps);
        let extracted = q.extract_by_name("A");
        assert_eq!(extracted.iter().map(Vec::len).sum::<usize>(), 2);
        // /x still has B pending, /y is gone entirely.
        assert_eq!(q.len(), 1);
        let rest = q.pop_all();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].len(), 1);
        assert_eq!(rest[0][0].name, "B");
    }
}
