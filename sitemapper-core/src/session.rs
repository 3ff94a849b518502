use crate::config::ProjectConfig;
use crate::error::{ProjectError, Result};
use crate::project::ProjectStore;
use crate::sitemap::{SortSpec, WorkingState};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use sitemapper_scanner::crawler::{
    DEFAULT_IDLE_INTERVAL, DEFAULT_POLL_INTERVAL, DEFAULT_SNAPSHOT_INTERVAL, ProgressCallback,
    SnapshotCallback,
};
use sitemapper_scanner::sitemap::UpdateCallback;
use sitemapper_scanner::{
    CrawlOutcome, Crawler, Frontier, FrontierCounts, FrontierSnapshot, PageFetcher,
    RootDescriptor, SitemapBuilder, SitemapItem,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// Loop intervals handed to the crawler and the sitemap builder.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    pub idle: Duration,
    pub poll: Duration,
    pub snapshot: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            idle: DEFAULT_IDLE_INTERVAL,
            poll: DEFAULT_POLL_INTERVAL,
            snapshot: DEFAULT_SNAPSHOT_INTERVAL,
        }
    }
}

/// One open project: its config, root descriptor and in-memory frontier.
///
/// Owns persistence. The crawler reports snapshots through a callback and the
/// session writes them to the project's state files.
pub struct Session {
    store: ProjectStore,
    config: ProjectConfig,
    root: RootDescriptor,
    frontier: Arc<Frontier>,
    pause: Arc<AtomicBool>,
    show_progress: bool,
    timing: Timing,
}

impl Session {
    /// Start a new project in `dir` for `root_url`.
    pub fn create(dir: impl Into<PathBuf>, root_url: &str) -> Result<Self> {
        let root = RootDescriptor::parse(root_url)?;
        let store = ProjectStore::new(dir);
        let config = ProjectConfig::new(root.url());
        store.create(&config)?;
        info!("Created project for {} at {}", root, store.dir().display());

        let frontier = Frontier::seeded(root.url());
        Ok(Self::assemble(store, config, root, frontier))
    }

    /// Open an existing project and restore its frontier from disk.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let store = ProjectStore::new(dir);
        let config = store.load_config()?;
        let root = RootDescriptor::parse(&config.root_url)?;

        let frontier = Frontier::new();
        store.load_frontier()?.restore_into(&frontier).await;

        Ok(Self::assemble(store, config, root, frontier))
    }

    fn assemble(store: ProjectStore, config: ProjectConfig, root: RootDescriptor, frontier: Frontier) -> Self {
        Self {
            store,
            config,
            root,
            frontier: Arc::new(frontier),
            pause: Arc::new(AtomicBool::new(false)),
            show_progress: false,
            timing: Timing::default(),
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn root(&self) -> &RootDescriptor {
        &self.root
    }

    /// Apply run settings and persist them to `project.json`.
    pub fn configure(
        &mut self,
        threads: Option<usize>,
        use_robots: Option<bool>,
        timeout_secs: Option<u64>,
    ) -> Result<()> {
        if let Some(threads) = threads {
            self.config.threads = threads.max(1);
        }
        if let Some(use_robots) = use_robots {
            self.config.use_robots = use_robots;
        }
        if let Some(timeout_secs) = timeout_secs {
            self.config.timeout_secs = timeout_secs;
        }
        self.store.save_config(&self.config)
    }

    /// Setting this flag pauses a running crawl.
    pub fn pause_handle(&self) -> Arc<AtomicBool> {
        self.pause.clone()
    }

    pub async fn counts(&self) -> FrontierCounts {
        self.frontier.counts().await
    }

    /// Forget all crawl progress and start again from the root URL.
    pub async fn restart(&self) -> Result<()> {
        self.frontier.seed(self.root.url()).await;
        self.store.save_frontier(&self.frontier.snapshot().await)
    }

    fn fetcher(&self) -> Result<PageFetcher> {
        Ok(PageFetcher::with_options(
            self.config.timeout_secs,
            &self.config.encoding,
        )?)
    }

    fn spinner(&self, message: &str) -> Option<Arc<ProgressBar>> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(message.to_string());
        Some(Arc::new(pb))
    }

    /// Crawl until the frontier is settled or the pause flag is raised.
    pub async fn crawl(&self) -> Result<CrawlOutcome> {
        self.pause.store(false, Ordering::SeqCst);
        let spinner = self.spinner("Starting crawl...");

        let progress_spinner = spinner.clone();
        let progress_callback: ProgressCallback = Arc::new(move |counts: FrontierCounts| {
            if let Some(ref pb) = progress_spinner {
                pb.set_message(format!(
                    "Crawling... {} known, {} crawled, {} external, {} failed",
                    counts.known, counts.crawled, counts.external, counts.failed
                ));
            }
        });

        let store = self.store.clone();
        let snapshot_callback: SnapshotCallback = Arc::new(move |snapshot: &FrontierSnapshot| {
            if let Err(e) = store.save_frontier(snapshot) {
                warn!("Failed to save crawl state: {}", e);
            }
        });

        let crawler = Crawler::new(self.fetcher()?)
            .with_workers(self.config.threads)
            .with_idle_interval(self.timing.idle)
            .with_poll_interval(self.timing.poll)
            .with_snapshot_interval(self.timing.snapshot)
            .with_pause_handle(self.pause.clone())
            .with_progress_callback(progress_callback)
            .with_snapshot_callback(snapshot_callback);

        let result = crawler.crawl(&self.root, self.frontier.clone()).await;

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        Ok(result?)
    }

    /// Build sitemap items for every known URL and store them as the new
    /// working state, ordered by URL.
    pub async fn build_sitemap(&self) -> Result<WorkingState> {
        let counts = self.frontier.counts().await;
        if counts.queued > 0 {
            return Err(ProjectError::NotFullyCrawled(counts.queued));
        }

        let urls = self.frontier.snapshot().await.known;
        let build_date = Local::now().format("%Y-%m-%d").to_string();

        let mut builder = SitemapBuilder::new(build_date)
            .with_workers(self.config.threads)
            .with_idle_interval(self.timing.idle)
            .with_poll_interval(self.timing.poll);

        if self.config.use_robots {
            let robots = self.fetcher()?.fetch_robots(&self.root).await?;
            builder = builder.with_robots(robots);
        }

        let spinner = self.spinner("Building sitemap...");
        let built = Arc::new(AtomicUsize::new(0));
        if let Some(ref pb) = spinner {
            let pb = pb.clone();
            let total = urls.len();
            let update_callback: UpdateCallback = Arc::new(move |fresh: &[SitemapItem]| {
                let done = built.fetch_add(fresh.len(), Ordering::Relaxed) + fresh.len();
                pb.set_message(format!("Building sitemap... {}/{} pages", done, total));
            });
            builder = builder.with_update_callback(update_callback);
        }

        let items = builder.build(&self.root, urls).await;
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        let state = WorkingState::from_build(items?)?;
        self.store.save_working_state(&state)?;
        Ok(state)
    }

    pub fn load_sitemap(&self) -> Result<WorkingState> {
        self.store.load_working_state()
    }

    /// Re-sort the stored items. The stored state is untouched on failure.
    pub fn sort_sitemap(&self, spec: SortSpec) -> Result<WorkingState> {
        let mut state = self.store.load_working_state()?;
        state.sort(spec)?;
        self.store.save_working_state(&state)?;
        Ok(state)
    }

    /// Change one field of the item for `url`, after validation.
    pub fn edit_item(&self, url: &str, field: &str, value: &str) -> Result<SitemapItem> {
        let mut state = self.store.load_working_state()?;
        let item = state.edit(url, field, value)?.clone();
        self.store.save_working_state(&state)?;
        Ok(item)
    }

    /// Write `sitemap.xml` from the stored items.
    pub fn export_sitemap(&self) -> Result<PathBuf> {
        let state = self.store.load_working_state()?;
        let path = self.store.write_sitemap_xml(&state)?;
        info!("Wrote {} items to {}", state.items.len(), path.display());
        Ok(path)
    }
}
