use crate::CLAP_STYLING;
use clap::{arg, command};

fn project_arg() -> clap::Arg {
    arg!(-p --"project" <DIR>)
        .required(true)
        .help("The project directory holding crawl state and the sitemap")
}

fn threads_arg() -> clap::Arg {
    arg!(-t --"threads" <NUM_WORKERS>)
        .required(false)
        .help("The number of async worker 'threads' in the worker pool (saved to the project)")
        .value_parser(clap::value_parser!(usize))
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitemapper")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitemapper")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Log worker activity to stderr").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl a site from its root URL, following internal links only. Resumes a \
                paused crawl when the project already exists.",
                )
                .arg(project_arg())
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("The root URL to crawl. Required when the project doesn't exist yet"),
                )
                .arg(threads_arg())
                .arg(
                    arg!(--"restart")
                        .required(false)
                        .help("Discard previous crawl progress and start again from the root URL")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Request timeout in seconds (saved to the project)")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .subcommand(
            command!("sitemap")
                .about(
                    "Build the sitemap item list from a fully crawled project. Replaces any \
                previous edits.",
                )
                .arg(project_arg())
                .arg(threads_arg())
                .arg(
                    arg!(--"no-robots")
                        .required(false)
                        .help("Include pages that robots.txt disallows")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("sort")
                .about("Reorder the sitemap items")
                .arg(project_arg())
                .arg(
                    arg!(-b --"by" <FIELD>)
                        .required(true)
                        .num_args(1..)
                        .action(clap::ArgAction::Append)
                        .help(
                            "Sort key as field[:asc|desc], primary key first. Fields: url, \
                        lastmod, changefreq, priority",
                        ),
                ),
        )
        .subcommand(
            command!("edit")
                .about("Change one field of a sitemap item")
                .arg(project_arg())
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The URL of the item to edit"),
                )
                .arg(
                    arg!(-f --"field" <FIELD>)
                        .required(true)
                        .help("The field to change")
                        .value_parser(["lastmod", "changefreq", "priority"]),
                )
                .arg(
                    arg!(-v --"value" <VALUE>)
                        .required(true)
                        .allow_hyphen_values(true)
                        .help("The new value. An empty string clears the field"),
                ),
        )
        .subcommand(
            command!("export")
                .about("Write sitemap.xml into the project directory")
                .arg(project_arg()),
        )
        .subcommand(
            command!("status")
                .about("Show crawl counts and sitemap state for a project")
                .arg(project_arg()),
        )
}
