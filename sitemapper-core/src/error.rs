use sitemapper_scanner::ScanError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing project file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("No project found at {}", .0.display())]
    NotAProject(PathBuf),

    #[error("Invalid project config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Malformed sitemap state on line {line}: {reason}")]
    MalformedState { line: usize, reason: String },

    #[error("The project hasn't been completely crawled ({0} URLs still queued)")]
    NotFullyCrawled(usize),

    #[error("No sitemap has been built for this project yet")]
    NoSitemap,

    #[error("No sitemap item with URL {0}")]
    UnknownItem(String),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Sort(#[from] SortError),
}

impl ProjectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProjectError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A rejected sitemap field edit. Each variant names the field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("lastmod must be a YYYY-MM-DD date after 1900, got {0:?}")]
    Lastmod(String),

    #[error("changefreq must be one of hourly, daily, weekly, monthly, yearly, always, never or empty, got {0:?}")]
    Changefreq(String),

    #[error("priority must be a number between 0.0 and 1.0, got {0:?}")]
    Priority(String),

    #[error("{0:?} is not an editable field (lastmod, changefreq, priority)")]
    UnknownField(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SortError {
    #[error("Unknown sort field: {0}")]
    UnknownField(String),

    #[error("Unknown sort direction {0:?} (expected asc or desc)")]
    UnknownDirection(String),

    #[error("Cannot sort by priority: {url} has priority {priority:?}")]
    MalformedPriority { url: String, priority: String },
}

pub type Result<T> = std::result::Result<T, ProjectError>;
