pub mod classify;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod frontier;
pub mod item;
pub mod robots;
pub mod root;
pub mod sitemap;

pub use classify::{Classification, classify};
pub use crawler::{CrawlOutcome, CrawlStatus, Crawler};
pub use error::ScanError;
pub use fetch::PageFetcher;
pub use frontier::{Frontier, FrontierCounts, FrontierSnapshot};
pub use item::{ChangeFreq, SitemapItem};
pub use robots::RobotsRules;
pub use root::RootDescriptor;
pub use sitemap::SitemapBuilder;
