use colored::Colorize;

pub mod config;
pub mod error;
pub mod project;
pub mod session;
pub mod sitemap;

pub use config::ProjectConfig;
pub use error::{ProjectError, SortError, ValidationError};
pub use project::ProjectStore;
pub use session::{Session, Timing};
pub use sitemap::{SortField, SortKey, SortSpec, WorkingState};

const BANNER: &str = r#"
     _ _
 ___(_) |_ ___ _ __ ___   __ _ _ __  _ __   ___ _ __
/ __| | __/ _ \ '_ ` _ \ / _` | '_ \| '_ \ / _ \ '__|
\__ \ | ||  __/ | | | | | (_| | |_) | |_) |  __/ |
|___/_|\__\___|_| |_| |_|\__,_| .__/| .__/ \___|_|
                              |_|   |_|
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "crawl a site, map its pages".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
