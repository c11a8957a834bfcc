use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tables::sources::JsonDirSource;
use tables::{CourseId, FetchPool, TableCache, TableStore};
use util::config::AppConfig;
use util::logging::init_logging;

mod commands;

#[derive(Parser, Debug)]
#[command(version, about = "Course tables from scraped learning-management dumps")]
struct Args {
    /// Course id. Defaults to COURSE_ID
    #[arg(long, global = true)]
    course: Option<String>,
    /// Directory of raw JSON dumps. Defaults to SOURCE_ROOT
    #[arg(long, global = true)]
    source: Option<String>,
    /// Directory of cache blobs. Defaults to CACHE_ROOT
    #[arg(long, global = true)]
    cache: Option<String>,
    /// Concurrent upstream fetches. Defaults to FETCH_WORKERS
    #[arg(long, global = true)]
    workers: Option<usize>,
    /// Tracing filter, e.g. "tables=debug". Defaults to LOG_LEVEL
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Groups bucketed by number of approved assignments
    Results {
        /// Restrict to these assignment ids (repeatable)
        #[arg(long = "assignment")]
        assignments: Vec<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List assignments with their approval counts
    Assignments,
    /// Member emails of every group
    Emails,
    /// Groups of one assignment by grading state
    Status { assignment: String },
    /// Most recent grading touching the groups of these students
    Grader {
        #[arg(required = true)]
        students: Vec<String>,
    },
    /// Drop the cached tables and rebuild from the source
    Update,
    /// Delete cache blobs
    Invalidate {
        /// Every course, not just the selected one
        #[arg(long)]
        all: bool,
    },
}

impl Args {
    /// Push command-line overrides into the global config.
    fn apply_overrides(&self) {
        if let Some(course) = &self.course {
            AppConfig::set_course_id(course.clone());
        }
        if let Some(source) = &self.source {
            AppConfig::set_source_root(source.clone());
        }
        if let Some(cache) = &self.cache {
            AppConfig::set_cache_root(cache.clone());
        }
        if let Some(workers) = self.workers {
            AppConfig::set_fetch_workers(workers);
        }
        if let Some(filter) = &self.log_level {
            AppConfig::set_log_level(filter.clone());
        }
    }
}

fn selected_course(config: &AppConfig) -> Result<CourseId> {
    if config.course_id.trim().is_empty() {
        bail!("no course selected: pass --course or set COURSE_ID");
    }
    Ok(CourseId::from(config.course_id.trim()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    args.apply_overrides();

    let config = AppConfig::global();
    let _log_guard = init_logging(&config);

    let cache = TableCache::from_config();
    if let Command::Invalidate { all: true } = args.command {
        let removed = cache.invalidate_all().context("clearing cache")?;
        println!("Removed {removed} cached course(s)");
        return Ok(());
    }

    let course = selected_course(&config)?;
    info!(course = %course, workers = config.fetch_workers, "{:?}", args.command);
    let store = TableStore::new(
        Arc::new(JsonDirSource::from_config()),
        FetchPool::from_config(),
    )
    .with_cache(cache.clone());

    match args.command {
        Command::Invalidate { .. } => {
            let removed = cache
                .invalidate(&course)
                .with_context(|| format!("invalidating course {course}"))?;
            if removed {
                println!("Removed cached tables of course {course}");
            } else {
                println!("Nothing cached for course {course}");
            }
        }
        Command::Update => {
            let tables = store.update(&course).await?;
            println!("{}", commands::summary(&tables));
        }
        Command::Results { assignments, json } => {
            let tables = store.tables(&course).await?;
            let report = commands::results(&tables, &assignments)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{report}");
            }
        }
        Command::Assignments => {
            let tables = store.tables(&course).await?;
            print!("{}", commands::assignments(&tables));
        }
        Command::Emails => {
            let tables = store.tables(&course).await?;
            print!("{}", commands::emails(&tables));
        }
        Command::Status { assignment } => {
            let tables = store.tables(&course).await?;
            print!("{}", commands::status(&tables, &assignment)?);
        }
        Command::Grader { students } => {
            let tables = store.tables(&course).await?;
            println!("{}", commands::grader(&tables, &students));
        }
    }
    Ok(())
}
