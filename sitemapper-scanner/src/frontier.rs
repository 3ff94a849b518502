use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::Mutex;

/// Point-in-time copy of every frontier collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierSnapshot {
    pub known: HashSet<String>,
    pub queue: HashSet<String>,
    pub crawled: HashSet<String>,
    pub failed: HashSet<String>,
    pub external: HashSet<String>,
}

/// Collection sizes as reported to the collaborator layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierCounts {
    pub known: usize,
    pub crawled: usize,
    pub external: usize,
    pub failed: usize,
    pub queued: usize,
}

impl FrontierCounts {
    /// Every known URL has been fetched or has failed.
    pub fn is_complete(&self) -> bool {
        self.known == self.crawled + self.failed
    }
}

#[derive(Debug, Default)]
struct FrontierSets {
    known: HashSet<String>,
    queue: HashSet<String>,
    crawled: HashSet<String>,
    failed: HashSet<String>,
    external: HashSet<String>,
}

/// Shared URL store driving a crawl.
///
/// One lock covers all five collections, so each operation is atomic with
/// respect to every other. `queue` is unordered: `try_dequeue` hands out an
/// arbitrary element.
#[derive(Debug, Default)]
pub struct Frontier {
    sets: Mutex<FrontierSets>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frontier whose only known and queued URL is `root_url`.
    pub fn seeded(root_url: &str) -> Self {
        let mut sets = FrontierSets::default();
        sets.known.insert(root_url.to_string());
        sets.queue.insert(root_url.to_string());
        Self {
            sets: Mutex::new(sets),
        }
    }

    /// Drop all state and start over from `root_url`.
    pub async fn seed(&self, root_url: &str) {
        let mut sets = self.sets.lock().await;
        *sets = FrontierSets::default();
        sets.known.insert(root_url.to_string());
        sets.queue.insert(root_url.to_string());
    }

    pub async fn try_dequeue(&self) -> Option<String> {
        let mut sets = self.sets.lock().await;
        let url = sets.queue.iter().next().cloned()?;
        sets.queue.remove(&url);
        Some(url)
    }

    /// Queue `candidate` unless it is already known. Returns `true` when new.
    pub async fn admit(&self, candidate: String) -> bool {
        let mut sets = self.sets.lock().await;
        if sets.known.contains(&candidate) {
            return false;
        }
        sets.known.insert(candidate.clone());
        sets.queue.insert(candidate);
        true
    }

    pub async fn mark_crawled(&self, url: String) {
        let mut sets = self.sets.lock().await;
        sets.queue.remove(&url);
        sets.failed.remove(&url);
        sets.known.insert(url.clone());
        sets.crawled.insert(url);
    }

    pub async fn mark_failed(&self, url: String) {
        let mut sets = self.sets.lock().await;
        sets.queue.remove(&url);
        sets.crawled.remove(&url);
        sets.known.insert(url.clone());
        sets.failed.insert(url);
    }

    pub async fn mark_external(&self, candidate: String) {
        self.sets.lock().await.external.insert(candidate);
    }

    pub async fn snapshot(&self) -> FrontierSnapshot {
        let sets = self.sets.lock().await;
        FrontierSnapshot {
            known: sets.known.clone(),
            queue: sets.queue.clone(),
            crawled: sets.crawled.clone(),
            failed: sets.failed.clone(),
            external: sets.external.clone(),
        }
    }

    /// Replace all state with persisted collections.
    ///
    /// `known` is rebuilt as `crawled ∪ queue ∪ failed`; external links stay
    /// outside it.
    pub async fn restore(
        &self,
        crawled: HashSet<String>,
        queue: HashSet<String>,
        external: HashSet<String>,
        failed: HashSet<String>,
    ) {
        let mut sets = self.sets.lock().await;
        let known = crawled
            .iter()
            .chain(queue.iter())
            .chain(failed.iter())
            .cloned()
            .collect();

        *sets = FrontierSets {
            known,
            queue,
            crawled,
            failed,
            external,
        };
    }

    pub async fn counts(&self) -> FrontierCounts {
        let sets = self.sets.lock().await;
        FrontierCounts {
            known: sets.known.len(),
            crawled: sets.crawled.len(),
            external: sets.external.len(),
            failed: sets.failed.len(),
            queued: sets.queue.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(urls: &[&str]) -> HashSet<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    fn assert_disjoint_and_complete(snapshot: &FrontierSnapshot) {
        assert!(snapshot.queue.is_disjoint(&snapshot.crawled));
        assert!(snapshot.queue.is_disjoint(&snapshot.failed));
        assert!(snapshot.crawled.is_disjoint(&snapshot.failed));

        let union: HashSet<String> = snapshot
            .queue
            .iter()
            .chain(snapshot.crawled.iter())
            .chain(snapshot.failed.iter())
            .cloned()
            .collect();
        assert_eq!(union, snapshot.known);
    }

    #[tokio::test]
    async fn test_admit_rejects_duplicates() {
        let frontier = Frontier::seeded("http://example.com");

        assert!(frontier.admit("http://example.com/a".to_string()).await);
        assert!(!frontier.admit("http://example.com/a".to_string()).await);
        assert!(!frontier.admit("http://example.com".to_string()).await);

        let counts = frontier.counts().await;
        assert_eq!(counts.known, 2);
        assert_eq!(counts.queued, 2);
    }

    #[tokio::test]
    async fn test_dequeued_url_is_never_readmitted() {
        let frontier = Frontier::seeded("http://example.com");

        let url = frontier.try_dequeue().await.unwrap();
        assert!(frontier.try_dequeue().await.is_none());
        assert!(!frontier.admit(url.clone()).await);

        frontier.mark_crawled(url.clone()).await;
        assert!(!frontier.admit(url).await);
        assert!(frontier.try_dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_marks_keep_collections_disjoint() {
        let frontier = Frontier::seeded("http://example.com");
        frontier.admit("http://example.com/a".to_string()).await;
        frontier.admit("http://example.com/b".to_string()).await;

        while let Some(url) = frontier.try_dequeue().await {
            if url.ends_with("/b") {
                frontier.mark_failed(url).await;
            } else {
                frontier.mark_crawled(url).await;
            }
        }
        frontier.mark_external("http://other.com".to_string()).await;

        let snapshot = frontier.snapshot().await;
        assert_disjoint_and_complete(&snapshot);
        assert_eq!(snapshot.crawled.len(), 2);
        assert_eq!(snapshot.failed, set(&["http://example.com/b"]));
        assert!(!snapshot.known.contains("http://other.com"));

        let counts = frontier.counts().await;
        assert!(counts.is_complete());
        assert_eq!(counts.external, 1);
    }

    #[tokio::test]
    async fn test_counts_incomplete_while_in_flight() {
        let frontier = Frontier::seeded("http://example.com");
        let url = frontier.try_dequeue().await.unwrap();

        // Popped but not yet marked
        assert!(!frontier.counts().await.is_complete());

        frontier.mark_crawled(url).await;
        assert!(frontier.counts().await.is_complete());
    }

    #[tokio::test]
    async fn test_restore_rebuilds_known() {
        let frontier = Frontier::new();
        frontier
            .restore(
                set(&["http://example.com"]),
                set(&["http://example.com/next"]),
                set(&["http://other.com"]),
                set(&["http://example.com/broken"]),
            )
            .await;

        let snapshot = frontier.snapshot().await;
        assert_eq!(snapshot.known.len(), 3);
        assert!(!snapshot.known.contains("http://other.com"));
        assert_disjoint_and_complete(&snapshot);

        assert!(!frontier.admit("http://example.com/broken".to_string()).await);
        assert_eq!(
            frontier.try_dequeue().await.as_deref(),
            Some("http://example.com/next")
        );
    }

    #[tokio::test]
    async fn test_seed_resets_state() {
        let frontier = Frontier::new();
        frontier
            .restore(
                set(&["http://example.com", "http://example.com/a"]),
                HashSet::new(),
                set(&["http://other.com"]),
                HashSet::new(),
            )
            .await;

        frontier.seed("http://example.com").await;
        let counts = frontier.counts().await;
        assert_eq!(counts.known, 1);
        assert_eq!(counts.queued, 1);
        assert_eq!(counts.crawled, 0);
        assert_eq!(counts.external, 0);
    }
}
