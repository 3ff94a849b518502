use crate::error::Result;
use crate::item::{ChangeFreq, SitemapItem};
use crate::robots::RobotsRules;
use crate::root::RootDescriptor;
use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const DEFAULT_CHANGEFREQ: ChangeFreq = ChangeFreq::Monthly;

pub type UpdateCallback = Arc<dyn Fn(&[SitemapItem]) + Send + Sync>;

/// Unrounded priority for a URL `depth` separators below the root.
pub fn priority_value(depth: usize) -> f64 {
    match depth {
        0 => 0.9,
        1 => 0.7,
        d => 1.0 / d as f64,
    }
}

/// Priority string stored on a new item, one decimal place.
pub fn priority_for_depth(depth: usize) -> String {
    format!("{:.1}", priority_value(depth))
}

#[derive(Default)]
struct BuildState {
    pending: Vec<String>,
    items: Vec<SitemapItem>,
    dropped: usize,
}

struct BuildContext {
    root: RootDescriptor,
    robots: Option<Arc<RobotsRules>>,
    build_date: String,
    state: Mutex<BuildState>,
    stop: AtomicBool,
    idle_interval: Duration,
}

impl BuildContext {
    fn item_for(&self, url: String) -> SitemapItem {
        let depth = self.root.depth_of(&url);
        SitemapItem {
            url,
            lastmod: self.build_date.clone(),
            changefreq: DEFAULT_CHANGEFREQ,
            priority: priority_for_depth(depth),
        }
    }
}

/// Turns the crawled URL set into sitemap items with the same worker-pool
/// shape as the crawler.
///
/// URLs that robots.txt disallows for all agents are dropped and count as
/// processed, so the build finishes once `items + dropped` reaches the number
/// of URLs submitted.
pub struct SitemapBuilder {
    build_date: String,
    workers: usize,
    idle_interval: Duration,
    poll_interval: Duration,
    robots: Option<Arc<RobotsRules>>,
    update_callback: Option<UpdateCallback>,
}

impl SitemapBuilder {
    /// `build_date` becomes every item's `lastmod`.
    pub fn new(build_date: impl Into<String>) -> Self {
        Self {
            build_date: build_date.into(),
            workers: crate::crawler::DEFAULT_WORKERS,
            idle_interval: crate::crawler::DEFAULT_IDLE_INTERVAL,
            poll_interval: crate::crawler::DEFAULT_POLL_INTERVAL,
            robots: None,
            update_callback: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_robots(mut self, robots: RobotsRules) -> Self {
        self.robots = Some(Arc::new(robots));
        self
    }

    /// Called at each poll with the items appended since the previous call.
    pub fn with_update_callback(mut self, callback: UpdateCallback) -> Self {
        self.update_callback = Some(callback);
        self
    }

    pub async fn build<I>(&self, root: &RootDescriptor, urls: I) -> Result<Vec<SitemapItem>>
    where
        I: IntoIterator<Item = String>,
    {
        let mut pending: Vec<String> = urls.into_iter().collect();
        pending.sort_unstable_by(|a, b| b.cmp(a));
        pending.dedup();
        let submitted = pending.len();

        info!(
            "Building sitemap for {} from {} URLs with {} workers",
            root, submitted, self.workers
        );

        let context = Arc::new(BuildContext {
            root: root.clone(),
            robots: self.robots.clone(),
            build_date: self.build_date.clone(),
            state: Mutex::new(BuildState {
                pending,
                ..Default::default()
            }),
            stop: AtomicBool::new(false),
            idle_interval: self.idle_interval,
        });

        let handles: Vec<_> = (0..self.workers)
            .map(|worker_id| {
                let context = context.clone();
                tokio::spawn(async move { run_worker(worker_id, context).await })
            })
            .collect();

        let mut reported = 0;
        loop {
            tokio::time::sleep(self.poll_interval).await;

            let (fresh, done) = {
                let state = context.state.lock().await;
                let fresh = state.items[reported..].to_vec();
                (fresh, state.items.len() + state.dropped == submitted)
            };

            if !fresh.is_empty() {
                reported += fresh.len();
                if let Some(ref callback) = self.update_callback {
                    callback(&fresh);
                }
            }

            if done {
                break;
            }
        }

        context.stop.store(true, Ordering::SeqCst);
        for result in join_all(handles).await {
            result?;
        }

        let mut state = context.state.lock().await;
        info!(
            "Sitemap built: {} items, {} excluded by robots.txt",
            state.items.len(),
            state.dropped
        );
        Ok(std::mem::take(&mut state.items))
    }
}

async fn run_worker(worker_id: usize, context: Arc<BuildContext>) {
    debug!("Sitemap worker {} started", worker_id);

    while !context.stop.load(Ordering::SeqCst) {
        let next = context.state.lock().await.pending.pop();
        let Some(url) = next else {
            tokio::time::sleep(context.idle_interval).await;
            continue;
        };

        if let Some(ref robots) = context.robots
            && !robots.is_allowed(&url)
        {
            debug!("[Worker {}] robots.txt excludes {}", worker_id, url);
            context.state.lock().await.dropped += 1;
            continue;
        }

        let item = context.item_for(url);
        context.state.lock().await.items.push(item);
    }

    debug!("Sitemap worker {} exiting", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_builder() -> SitemapBuilder {
        SitemapBuilder::new("2024-05-01")
            .with_workers(3)
            .with_idle_interval(Duration::from_millis(5))
            .with_poll_interval(Duration::from_millis(10))
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_priority_fixed_levels() {
        assert_eq!(priority_for_depth(0), "0.9");
        assert_eq!(priority_for_depth(1), "0.7");
        assert_eq!(priority_for_depth(2), "0.5");
        assert_eq!(priority_for_depth(3), "0.3");
        assert_eq!(priority_for_depth(10), "0.1");
    }

    #[test]
    fn test_priority_strictly_decreases_past_depth_one() {
        for depth in 2..50 {
            assert!(priority_value(depth + 1) < priority_value(depth));
        }
    }

    #[tokio::test]
    async fn test_build_assigns_defaults() {
        let root = RootDescriptor::parse("http://example.com").unwrap();
        let mut items = fast_builder()
            .build(
                &root,
                urls(&[
                    "http://example.com",
                    "http://example.com/about",
                    "http://example.com/blog/2024/post",
                ]),
            )
            .await
            .unwrap();
        items.sort_by(|a, b| a.url.cmp(&b.url));

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].priority, "0.9");
        assert_eq!(items[1].priority, "0.7");
        assert_eq!(items[2].priority, "0.3");
        for item in &items {
            assert_eq!(item.lastmod, "2024-05-01");
            assert_eq!(item.changefreq, ChangeFreq::Monthly);
        }
    }

    #[tokio::test]
    async fn test_robots_exclusions_do_not_stall() {
        let root = RootDescriptor::parse("http://example.com").unwrap();
        let robots = RobotsRules::parse("User-agent: *\nDisallow: /private\n");

        let items = fast_builder()
            .with_robots(robots)
            .build(
                &root,
                urls(&[
                    "http://example.com",
                    "http://example.com/private/a",
                    "http://example.com/private/b",
                ]),
            )
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "http://example.com");
    }

    #[tokio::test]
    async fn test_build_with_no_urls() {
        let root = RootDescriptor::parse("http://example.com").unwrap();
        let items = fast_builder().build(&root, Vec::new()).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_update_callback_sees_every_item() {
        let root = RootDescriptor::parse("http://example.com").unwrap();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();

        let items = fast_builder()
            .with_update_callback(Arc::new(move |fresh: &[SitemapItem]| {
                sink.lock().unwrap().extend(fresh.iter().map(|i| i.url.clone()));
            }))
            .build(
                &root,
                urls(&["http://example.com/a", "http://example.com/b", "http://example.com/c"]),
            )
            .await
            .unwrap();

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, urls(&["http://example.com/a", "http://example.com/b", "http://example.com/c"]));
        assert_eq!(items.len(), 3);
    }
}
