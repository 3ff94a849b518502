use crate::classify::{Classification, classify};
use crate::error::Result;
use crate::extract::extract_links;
use crate::fetch::PageFetcher;
use crate::frontier::{Frontier, FrontierCounts, FrontierSnapshot};
use crate::root::RootDescriptor;
use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(5);

pub type ProgressCallback = Arc<dyn Fn(FrontierCounts) + Send + Sync>;
pub type SnapshotCallback = Arc<dyn Fn(&FrontierSnapshot) + Send + Sync>;

/// Why a crawl run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStatus {
    /// Every known URL was crawled or failed.
    Completed,
    /// The pause flag was raised before the frontier drained.
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlOutcome {
    pub status: CrawlStatus,
    pub counts: FrontierCounts,
}

struct WorkerContext {
    fetcher: PageFetcher,
    root: RootDescriptor,
    frontier: Arc<Frontier>,
    stop: AtomicBool,
    idle_interval: Duration,
}

/// Worker pool that drains a [`Frontier`].
///
/// Workers never decide when the crawl is over. The orchestrator loop in
/// [`Crawler::crawl`] polls the frontier, and raises the stop flag once every
/// known URL is settled or a pause was requested.
pub struct Crawler {
    fetcher: PageFetcher,
    workers: usize,
    idle_interval: Duration,
    poll_interval: Duration,
    snapshot_interval: Duration,
    pause: Arc<AtomicBool>,
    progress_callback: Option<ProgressCallback>,
    snapshot_callback: Option<SnapshotCallback>,
}

impl Crawler {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self {
            fetcher,
            workers: DEFAULT_WORKERS,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            pause: Arc::new(AtomicBool::new(false)),
            progress_callback: None,
            snapshot_callback: None,
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

    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = interval;
        self
    }

    /// Share an externally owned pause flag, e.g. one set from a signal handler.
    pub fn with_pause_handle(mut self, pause: Arc<AtomicBool>) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_snapshot_callback(mut self, callback: SnapshotCallback) -> Self {
        self.snapshot_callback = Some(callback);
        self
    }

    /// Flag that, once set, makes the running crawl wind down and return
    /// [`CrawlStatus::Paused`].
    pub fn pause_handle(&self) -> Arc<AtomicBool> {
        self.pause.clone()
    }

    pub async fn crawl(&self, root: &RootDescriptor, frontier: Arc<Frontier>) -> Result<CrawlOutcome> {
        info!("Starting crawl of {} with {} workers", root, self.workers);

        let context = Arc::new(WorkerContext {
            fetcher: self.fetcher.clone(),
            root: root.clone(),
            frontier: frontier.clone(),
            stop: AtomicBool::new(false),
            idle_interval: self.idle_interval,
        });

        let handles: Vec<_> = (0..self.workers)
            .map(|worker_id| {
                let context = context.clone();
                tokio::spawn(async move { run_worker(worker_id, context).await })
            })
            .collect();

        let mut last_snapshot = Instant::now();
        let status = loop {
            tokio::time::sleep(self.poll_interval).await;

            let counts = frontier.counts().await;
            if let Some(ref callback) = self.progress_callback {
                callback(counts);
            }

            if counts.is_complete() {
                break CrawlStatus::Completed;
            }
            if self.pause.load(Ordering::SeqCst) {
                break CrawlStatus::Paused;
            }

            if last_snapshot.elapsed() >= self.snapshot_interval {
                self.emit_snapshot(&frontier).await;
                last_snapshot = Instant::now();
            }
        };

        debug!("Stopping workers ({:?})", status);
        context.stop.store(true, Ordering::SeqCst);
        for result in join_all(handles).await {
            result?;
        }

        // After the join, so URLs that were in flight are settled
        self.emit_snapshot(&frontier).await;

        let counts = frontier.counts().await;
        info!(
            "Crawl {:?}: {} known, {} crawled, {} failed, {} external",
            status, counts.known, counts.crawled, counts.failed, counts.external
        );

        Ok(CrawlOutcome { status, counts })
    }

    async fn emit_snapshot(&self, frontier: &Frontier) {
        if let Some(ref callback) = self.snapshot_callback {
            let snapshot = frontier.snapshot().await;
            callback(&snapshot);
        }
    }
}

async fn run_worker(worker_id: usize, context: Arc<WorkerContext>) {
    debug!("Worker {} started", worker_id);

    while !context.stop.load(Ordering::SeqCst) {
        let Some(url) = context.frontier.try_dequeue().await else {
            tokio::time::sleep(context.idle_interval).await;
            continue;
        };

        match context.fetcher.fetch(&url).await {
            Ok(html) => {
                let links = extract_links(&html, &context.root);
                debug!("[Worker {}] {} links on {}", worker_id, links.len(), url);

                for link in links {
                    match classify(&context.root, &link) {
                        Classification::External => context.frontier.mark_external(link).await,
                        Classification::Internal => {
                            context.frontier.admit(link).await;
                        }
                    }
                }
                context.frontier.mark_crawled(url).await;
            }
            Err(e) => {
                warn!("[Worker {}] Failed to fetch {}: {}", worker_id, url, e);
                context.frontier.mark_failed(url).await;
            }
        }
    }

    debug!("Worker {} exiting", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn fast_crawler(workers: usize) -> Crawler {
        Crawler::new(PageFetcher::with_options(5, "utf-8").unwrap())
            .with_workers(workers)
            .with_idle_interval(Duration::from_millis(10))
            .with_poll_interval(Duration::from_millis(20))
            .with_snapshot_interval(Duration::from_millis(50))
    }

    async fn mount_page(server: &MockServer, route: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(body.as_bytes().to_vec()),
            )
            .mount(server)
            .await;
    }

    async fn mount_small_site(server: &MockServer) {
        mount_page(
            server,
            "/",
            r#"<html><body>
                <a href="/about">About</a>
                <a href="http://other.com/page">Elsewhere</a>
            </body></html>"#,
        )
        .await;
        mount_page(
            server,
            "/about",
            r#"<html><body><a href="/about">Self</a><a href="/broken">Broken</a></body></html>"#,
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_crawl_small_site() {
        let mock_server = MockServer::start().await;
        mount_small_site(&mock_server).await;

        let root = RootDescriptor::parse(&mock_server.uri()).unwrap();
        let frontier = Arc::new(Frontier::seeded(root.url()));

        let outcome = fast_crawler(2).crawl(&root, frontier.clone()).await.unwrap();
        assert_eq!(outcome.status, CrawlStatus::Completed);

        let snapshot = frontier.snapshot().await;
        let expected_crawled: HashSet<String> =
            [root.url().to_string(), format!("{}/about", root.url())].into();
        assert_eq!(snapshot.crawled, expected_crawled);
        assert_eq!(snapshot.failed, [format!("{}/broken", root.url())].into());
        assert_eq!(snapshot.external, ["http://other.com/page".to_string()].into());
        assert!(snapshot.queue.is_empty());

        assert_eq!(outcome.counts.known, 3);
        assert!(outcome.counts.is_complete());
    }

    #[tokio::test]
    async fn test_crawl_of_settled_frontier_is_noop() {
        let mock_server = MockServer::start().await;
        mount_small_site(&mock_server).await;

        let root = RootDescriptor::parse(&mock_server.uri()).unwrap();
        let frontier = Arc::new(Frontier::seeded(root.url()));
        fast_crawler(4).crawl(&root, frontier.clone()).await.unwrap();
        let first = frontier.snapshot().await;

        let requests_before = mock_server.received_requests().await.unwrap().len();
        let outcome = fast_crawler(4).crawl(&root, frontier.clone()).await.unwrap();

        assert_eq!(outcome.status, CrawlStatus::Completed);
        assert_eq!(frontier.snapshot().await, first);
        assert_eq!(
            mock_server.received_requests().await.unwrap().len(),
            requests_before
        );
    }

    #[tokio::test]
    async fn test_many_workers_fetch_each_page_once() {
        let mock_server = MockServer::start().await;

        let links: String = (0..20)
            .map(|i| format!(r#"<a href="/page{}">{}</a>"#, i, i))
            .collect();
        mount_page(&mock_server, "/", &links).await;
        for i in 0..20 {
            // Every page links back to every other page
            mount_page(&mock_server, &format!("/page{}", i), &links).await;
        }

        let root = RootDescriptor::parse(&mock_server.uri()).unwrap();
        let frontier = Arc::new(Frontier::seeded(root.url()));
        let outcome = fast_crawler(8).crawl(&root, frontier.clone()).await.unwrap();

        assert_eq!(outcome.counts.crawled, 21);
        assert_eq!(outcome.counts.failed, 0);
        assert_eq!(mock_server.received_requests().await.unwrap().len(), 21);
    }

    #[tokio::test]
    async fn test_progress_and_snapshot_callbacks() {
        let mock_server = MockServer::start().await;
        mount_small_site(&mock_server).await;

        let root = RootDescriptor::parse(&mock_server.uri()).unwrap();
        let frontier = Arc::new(Frontier::seeded(root.url()));

        let progress = Arc::new(Mutex::new(Vec::new()));
        let snapshots = Arc::new(Mutex::new(Vec::new()));
        let progress_sink = progress.clone();
        let snapshot_sink = snapshots.clone();

        fast_crawler(2)
            .with_progress_callback(Arc::new(move |counts: FrontierCounts| {
                progress_sink.lock().unwrap().push(counts);
            }))
            .with_snapshot_callback(Arc::new(move |snapshot: &FrontierSnapshot| {
                snapshot_sink.lock().unwrap().push(snapshot.clone());
            }))
            .crawl(&root, frontier.clone())
            .await
            .unwrap();

        assert!(!progress.lock().unwrap().is_empty());

        // The last snapshot is the settled state
        let snapshots = snapshots.lock().unwrap();
        assert_eq!(snapshots.last().unwrap(), &frontier.snapshot().await);
    }

    #[tokio::test]
    async fn test_pause_stops_crawl_and_keeps_queue() {
        let mock_server = MockServer::start().await;

        let links: String = (0..10)
            .map(|i| format!(r#"<a href="/slow{}">{}</a>"#, i, i))
            .collect();
        mount_page(&mock_server, "/", &links).await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html></html>")
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&mock_server)
            .await;

        let root = RootDescriptor::parse(&mock_server.uri()).unwrap();
        let frontier = Arc::new(Frontier::seeded(root.url()));
        let crawler = fast_crawler(1);
        let pause = crawler.pause_handle();

        let pauser = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            pause.store(true, Ordering::SeqCst);
        });

        let outcome = crawler.crawl(&root, frontier.clone()).await.unwrap();
        pauser.await.unwrap();

        assert_eq!(outcome.status, CrawlStatus::Paused);
        assert!(!outcome.counts.is_complete());
        assert!(outcome.counts.queued > 0);

        // Nothing in flight after the join
        let snapshot = frontier.snapshot().await;
        assert_eq!(
            snapshot.known.len(),
            snapshot.queue.len() + snapshot.crawled.len() + snapshot.failed.len()
        );
    }
}
