use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use sitemapper_core::error::SortError;
use sitemapper_core::project::ProjectStore;
use sitemapper_core::session::Session;
use sitemapper_core::sitemap::{SortField, SortKey, SortSpec, WorkingState};
use sitemapper_scanner::{CrawlStatus, FrontierCounts, RootDescriptor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

// Helper functions

/// Expand `~` in a user-supplied project directory.
pub fn expand_project_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Parse one `--by` value: `field`, `field:asc` or `field:desc`.
pub fn parse_sort_arg(arg: &str) -> std::result::Result<SortKey, SortError> {
    let (field, direction) = match arg.split_once(':') {
        Some((field, direction)) => (field, direction),
        None => (arg, "asc"),
    };

    let field: SortField = field.trim().to_lowercase().parse()?;
    match direction.trim().to_lowercase().as_str() {
        "asc" => Ok(SortKey::ascending(field)),
        "desc" => Ok(SortKey::descending(field)),
        other => Err(SortError::UnknownDirection(other.to_string())),
    }
}

pub fn parse_sort_args<'a>(
    args: impl IntoIterator<Item = &'a str>,
) -> std::result::Result<SortSpec, SortError> {
    args.into_iter()
        .map(parse_sort_arg)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(SortSpec)
}

/// Open the project in `dir`, creating it when `url` is given and no project
/// exists yet.
pub async fn open_or_create_session(dir: &Path, url: Option<&str>) -> Result<Session> {
    let store = ProjectStore::new(dir);

    if store.exists() {
        let session = Session::open(dir)
            .await
            .with_context(|| format!("Failed to open project at {}", dir.display()))?;

        if let Some(url) = url {
            let requested = RootDescriptor::parse(url)?;
            if requested.url() != session.root().url() {
                bail!(
                    "Project at {} crawls {}, not {}",
                    dir.display(),
                    session.root(),
                    requested
                );
            }
        }
        return Ok(session);
    }

    match url {
        Some(url) => Session::create(dir, url)
            .with_context(|| format!("Failed to create project at {}", dir.display())),
        None => bail!(
            "No project at {}. Pass --url to start a new crawl",
            dir.display()
        ),
    }
}

async fn open_session(dir: &Path) -> Result<Session> {
    Session::open(dir)
        .await
        .with_context(|| format!("Failed to open project at {}", dir.display()))
}

fn project_dir(args: &ArgMatches) -> PathBuf {
    let raw = args
        .get_one::<String>("project")
        .map(String::as_str)
        .unwrap_or(".");
    expand_project_dir(raw)
}

/// Raise `pause` on Ctrl-C so the crawl winds down and saves its state.
fn pause_on_ctrl_c(pause: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "\n{} Pausing, waiting for workers to finish their current page...",
                "⏸".yellow().bold()
            );
            pause.store(true, Ordering::SeqCst);
        }
    });
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_counts(counts: &FrontierCounts) {
    println!("  {} {}", "Known:".bright_white(), counts.known);
    println!("  {} {}", "Crawled:".bright_white(), counts.crawled.to_string().green());
    println!("  {} {}", "Queued:".bright_white(), counts.queued);
    println!("  {} {}", "Failed:".bright_white(), counts.failed.to_string().red());
    println!("  {} {}", "External:".bright_white(), counts.external);
}

fn print_items(state: &WorkingState) {
    let sort: Vec<String> = state
        .sort
        .keys()
        .iter()
        .map(|key| format!("{} {}", key.field, if key.descending { "desc" } else { "asc" }))
        .collect();
    println!(
        "{} {}",
        "Sorted by:".bright_white(),
        if sort.is_empty() { "-".to_string() } else { sort.join(", ") }
    );
    println!();

    for item in &state.items {
        println!(
            "  {:<60} {:<10} {:<8} {}",
            item.url,
            item.lastmod,
            item.changefreq.as_str(),
            item.priority
        );
    }
}

// Command handlers

pub async fn handle_crawl(args: &ArgMatches) -> Result<()> {
    let dir = project_dir(args);
    let url = args.get_one::<String>("url").map(String::as_str);
    let threads = args.get_one::<usize>("threads").copied();
    let timeout = args.get_one::<u64>("timeout").copied();
    let restart = args.get_flag("restart");

    let mut session = open_or_create_session(&dir, url).await?.with_progress(true);
    session.configure(threads, None, timeout)?;

    if restart {
        debug!("Restarting crawl of {}", session.root());
        session.restart().await?;
    }

    print_divider();
    println!("{} {}", "  CRAWLING".bright_white().bold(), session.root());
    print_divider();
    println!("{} Workers: {}", "→".blue(), session.config().threads);
    println!("{} Project: {}", "→".blue(), dir.display());
    println!("{} Press Ctrl-C to pause\n", "→".blue());

    pause_on_ctrl_c(session.pause_handle());
    let outcome = session.crawl().await?;

    match outcome.status {
        CrawlStatus::Completed => println!("{} Crawl complete!\n", "✓".green().bold()),
        CrawlStatus::Paused => println!(
            "{} Crawl paused. Run the same command again to resume.\n",
            "⏸".yellow().bold()
        ),
    }
    print_counts(&outcome.counts);
    Ok(())
}

pub async fn handle_sitemap(args: &ArgMatches) -> Result<()> {
    let dir = project_dir(args);
    let threads = args.get_one::<usize>("threads").copied();
    let use_robots = args.get_flag("no-robots").then_some(false);

    let mut session = open_session(&dir).await?.with_progress(true);
    session.configure(threads, use_robots, None)?;

    if session.config().use_robots {
        println!("{} Following robots.txt rules", "→".blue());
    }
    let state = session.build_sitemap().await?;

    println!(
        "{} Sitemap built with {} pages\n",
        "✓".green().bold(),
        state.items.len()
    );
    println!(
        "Default values were given for lastmod, changefreq and priority. Review them with \
         {} before running {}.",
        "edit".bright_cyan(),
        "export".bright_cyan()
    );
    Ok(())
}

pub async fn handle_sort(args: &ArgMatches) -> Result<()> {
    let dir = project_dir(args);
    let spec = parse_sort_args(
        args.get_many::<String>("by")
            .into_iter()
            .flatten()
            .map(String::as_str),
    )?;

    let session = open_session(&dir).await?;
    let state = session.sort_sitemap(spec)?;
    print_items(&state);
    Ok(())
}

pub async fn handle_edit(args: &ArgMatches) -> Result<()> {
    let dir = project_dir(args);
    let (Some(url), Some(field), Some(value)) = (
        args.get_one::<String>("url"),
        args.get_one::<String>("field"),
        args.get_one::<String>("value"),
    ) else {
        bail!("--url, --field and --value are required");
    };

    let session = open_session(&dir).await?;
    let item = session.edit_item(url, field, value)?;
    println!(
        "{} {} {} = {:?}",
        "✓".green().bold(),
        item.url,
        field.bright_white(),
        value
    );
    Ok(())
}

pub async fn handle_export(args: &ArgMatches) -> Result<()> {
    let dir = project_dir(args);
    let session = open_session(&dir).await?;
    let path = session.export_sitemap()?;
    println!("{} Wrote {}", "✓".green().bold(), path.display());
    Ok(())
}

pub async fn handle_status(args: &ArgMatches) -> Result<()> {
    let dir = project_dir(args);
    let session = open_session(&dir).await?;
    let counts = session.counts().await;

    print_divider();
    println!("{} {}", "  PROJECT".bright_white().bold(), session.root());
    print_divider();
    print_counts(&counts);
    println!();

    if counts.queued == 0 {
        println!("{} Fully crawled", "✓".green().bold());
    } else {
        println!("{} Crawl incomplete, resume with {}", "⚠".yellow().bold(), "crawl".bright_cyan());
    }

    let store = session.store();
    match store.working_state_modified() {
        Some(modified) if store.has_working_state() => println!(
            "{} Sitemap items last saved {}",
            "✓".green().bold(),
            modified.format("%Y-%m-%d %H:%M:%S")
        ),
        _ => println!("{} No sitemap built yet", "•".yellow()),
    }
    Ok(())
}
