use crate::config::ProjectConfig;
use crate::error::{ProjectError, Result};
use crate::sitemap::{WorkingState, render_xml};
use chrono::{DateTime, Local};
use sitemapper_scanner::{Frontier, FrontierSnapshot};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE: &str = "project.json";
pub const CRAWLED_FILE: &str = "webpages.txt";
pub const QUEUE_FILE: &str = "queue.txt";
pub const EXTERNAL_FILE: &str = "external_links.txt";
pub const FAILED_FILE: &str = "failed_links.txt";
pub const TMP_DIR: &str = "tmp";
pub const WORKING_STATE_FILE: &str = "tmp_save_sitemap.txt";
pub const SITEMAP_FILE: &str = "sitemap.xml";

/// The four persisted frontier collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredFrontier {
    pub crawled: HashSet<String>,
    pub queue: HashSet<String>,
    pub external: HashSet<String>,
    pub failed: HashSet<String>,
}

impl StoredFrontier {
    pub async fn restore_into(self, frontier: &Frontier) {
        frontier
            .restore(self.crawled, self.queue, self.external, self.failed)
            .await;
    }
}

/// File layout of one project directory.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    dir: PathBuf,
}

impl ProjectStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn working_state_path(&self) -> PathBuf {
        self.dir.join(TMP_DIR).join(WORKING_STATE_FILE)
    }

    pub fn sitemap_path(&self) -> PathBuf {
        self.dir.join(SITEMAP_FILE)
    }

    pub fn exists(&self) -> bool {
        self.config_path().is_file()
    }

    /// Lay out a new project: directories, config and a frontier holding
    /// only the root URL.
    pub fn create(&self, config: &ProjectConfig) -> Result<()> {
        let tmp_dir = self.dir.join(TMP_DIR);
        fs::create_dir_all(&tmp_dir).map_err(|e| ProjectError::io(&tmp_dir, e))?;
        self.save_config(config)?;

        let frontier = FrontierSnapshot {
            queue: [config.root_url.clone()].into(),
            known: [config.root_url.clone()].into(),
            ..Default::default()
        };
        self.save_frontier(&frontier)
    }

    pub fn load_config(&self) -> Result<ProjectConfig> {
        if !self.exists() {
            return Err(ProjectError::NotAProject(self.dir.clone()));
        }
        ProjectConfig::load(&self.config_path())
    }

    pub fn save_config(&self, config: &ProjectConfig) -> Result<()> {
        config.save(&self.config_path())
    }

    pub fn save_frontier(&self, snapshot: &FrontierSnapshot) -> Result<()> {
        write_url_set(&self.dir.join(CRAWLED_FILE), &snapshot.crawled)?;
        write_url_set(&self.dir.join(QUEUE_FILE), &snapshot.queue)?;
        write_url_set(&self.dir.join(EXTERNAL_FILE), &snapshot.external)?;
        write_url_set(&self.dir.join(FAILED_FILE), &snapshot.failed)?;
        debug!(
            "Saved frontier to {} ({} crawled, {} queued)",
            self.dir.display(),
            snapshot.crawled.len(),
            snapshot.queue.len()
        );
        Ok(())
    }

    /// Read all four frontier files. Any missing file is an error.
    pub fn load_frontier(&self) -> Result<StoredFrontier> {
        Ok(StoredFrontier {
            crawled: read_url_set(&self.dir.join(CRAWLED_FILE))?,
            queue: read_url_set(&self.dir.join(QUEUE_FILE))?,
            external: read_url_set(&self.dir.join(EXTERNAL_FILE))?,
            failed: read_url_set(&self.dir.join(FAILED_FILE))?,
        })
    }

    /// A working-state file exists and is not empty.
    pub fn has_working_state(&self) -> bool {
        fs::metadata(self.working_state_path())
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    pub fn working_state_modified(&self) -> Option<DateTime<Local>> {
        let modified = fs::metadata(self.working_state_path())
            .and_then(|meta| meta.modified())
            .ok()?;
        Some(DateTime::<Local>::from(modified))
    }

    pub fn save_working_state(&self, state: &WorkingState) -> Result<()> {
        let path = self.working_state_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ProjectError::io(parent, e))?;
        }
        fs::write(&path, state.encode()).map_err(|e| ProjectError::io(&path, e))
    }

    pub fn load_working_state(&self) -> Result<WorkingState> {
        if !self.has_working_state() {
            return Err(ProjectError::NoSitemap);
        }
        let path = self.working_state_path();
        let content = fs::read_to_string(&path).map_err(|e| ProjectError::io(&path, e))?;
        WorkingState::decode(&content)
    }

    pub fn write_sitemap_xml(&self, state: &WorkingState) -> Result<PathBuf> {
        let path = self.sitemap_path();
        let xml = render_xml(&state.items).map_err(|e| ProjectError::io(&path, e))?;
        fs::write(&path, xml).map_err(|e| ProjectError::io(&path, e))?;
        Ok(path)
    }
}

/// One URL per line, sorted so that saves are reproducible.
fn write_url_set(path: &Path, urls: &HashSet<String>) -> Result<()> {
    let mut lines: Vec<&str> = urls.iter().map(String::as_str).collect();
    lines.sort_unstable();

    let mut content = lines.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    fs::write(path, content).map_err(|e| ProjectError::io(path, e))
}

fn read_url_set(path: &Path) -> Result<HashSet<String>> {
    if !path.is_file() {
        return Err(ProjectError::MissingFile(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|e| ProjectError::io(path, e))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
