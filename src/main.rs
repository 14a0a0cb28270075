use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bili_comments::config::Config;
use bili_comments::crawler::{
    collector_from_config, CollectionReport, CommentClient, PageMode, ResourceResolver, VideoRef,
};
use bili_comments::error::ErrorClassify;
use bili_comments::models::{Progress, SortOrder};
use bili_comments::storage::{JsonWriter, OutputFormat};
use bili_comments::utils::{single_line, truncate_text};

#[derive(Parser)]
#[command(
    name = "bili-comments",
    version,
    about = "Collect the comment thread of a Bilibili video",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML configuration file (environment variables are used otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect comments of a video
    Collect {
        /// Video URL, BV id or av id
        input: String,

        /// Maximum number of pages to fetch
        #[arg(short, long, conflicts_with = "all")]
        pages: Option<u32>,

        /// Fetch every available page
        #[arg(long, default_value = "false")]
        all: bool,

        /// Sort order (time, likes, replies)
        #[arg(short, long)]
        sort: Option<String>,

        /// Output file path (.json report or .jsonl records)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write records as JSON lines regardless of extension
        #[arg(long, default_value = "false")]
        jsonl: bool,
    },

    /// Show the id and title of a video
    Info {
        /// Video URL, BV id or av id
        input: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;

    // Initialize tracing/logging
    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    match cli.command {
        Commands::Collect {
            input,
            pages,
            all,
            sort,
            output,
            jsonl,
        } => {
            tracing::info!(
                input = %input,
                pages = ?pages,
                all = %all,
                sort = ?sort,
                output = ?output,
                "Starting collect command"
            );
            collect(config, input, pages, all, sort, output, jsonl).await?;
        }

        Commands::Info { input } => {
            tracing::info!(input = %input, "Starting info command");
            info(config, input).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::from_env().context("Failed to load config from environment"),
    }
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("bili_comments=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("bili_comments={level},warn"))
            .context("Invalid log level")?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

async fn collect(
    mut config: Config,
    input: String,
    pages: Option<u32>,
    all: bool,
    sort: Option<String>,
    output: Option<PathBuf>,
    jsonl: bool,
) -> Result<()> {
    if let Some(sort) = sort {
        config.collector.sort =
            SortOrder::parse(&sort).with_context(|| format!("Unknown sort order: {sort}"))?;
    }

    let mode = if all {
        PageMode::All
    } else {
        PageMode::Bounded(pages.unwrap_or(config.collector.default_pages))
    };

    let credential = config.credential();
    let collector = collector_from_config(&config).context("Failed to create collector")?;

    let report_progress =
        |progress: &Progress| println!("{progress} ({:.0}%)", progress.ratio() * 100.0);
    let report = match collector
        .collect(&input, mode, credential.as_ref(), &report_progress)
        .await
    {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(
                category = e.category().as_str(),
                recoverable = e.is_recoverable(),
                error = %e,
                "Collection failed"
            );
            if e.is_recoverable() {
                eprintln!("The failure looks temporary; try again later.");
            }
            return Err(e.into());
        }
    };

    print_summary(&report);

    match output {
        Some(path) => {
            let mut writer = JsonWriter::new(&path);
            if jsonl {
                writer = writer.with_format(OutputFormat::JsonLines);
            }
            let written = writer
                .write(&report)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Saved {written} records to {}", path.display());
        }
        None => print_records(&report),
    }

    Ok(())
}

async fn info(config: Config, input: String) -> Result<()> {
    let video = VideoRef::parse(&input)?;
    let client = CommentClient::from_config(&config).context("Failed to create client")?;
    let credential = config.credential();

    let resource = client.resolve(&video, credential.as_ref()).await?;

    println!("Title: {}", resource.title);
    println!("  BV id: {}", resource.bvid);
    println!("  av id: {}", resource.id);
    Ok(())
}

fn print_summary(report: &CollectionReport) {
    print!("{}", format_summary(report));
}

fn format_summary(report: &CollectionReport) -> String {
    let stats = &report.stats;
    let mut lines = vec![
        format!("\n{}", report.title),
        format!(
            "  Records: {} ({} comments, {} nested replies)",
            report.len(),
            stats.top_level,
            stats.nested_replies
        ),
    ];

    if let Some(level) = report.average_author_level() {
        lines.push(format!("  Average user level: {level:.2}"));
    }

    lines.push(format!(
        "  Pages: {} planned of {} available ({} ok, {} empty, {} failed, {} skipped)",
        report.plan.target_pages,
        report.plan.available_pages,
        stats.succeeded_pages.len(),
        stats.empty_pages.len(),
        stats.failed_pages.len(),
        stats.skipped_pages.len()
    ));

    if !stats.is_complete() {
        lines.push(format!("  Incomplete: failed pages {:?}", stats.failed_pages));
    }

    if report.is_empty() {
        lines.push(
            "  No comments were returned. The thread may be empty, or the request was \
             blocked by risk control; try again later or with a SESSDATA cookie."
                .to_string(),
        );
    }

    let mut summary = lines.join("\n");
    summary.push('\n');
    summary
}

fn print_records(report: &CollectionReport) {
    for record in &report.records {
        println!(
            "{}  {:<16} likes={:<6} replies={:<4} {}",
            record.formatted_time(),
            truncate_text(&record.author, 16),
            record.likes,
            record.reply_count,
            truncate_text(&single_line(&record.content), 80)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bili_comments::crawler::{CollectStats, PaginationPlan};
    use bili_comments::models::CommentRecord;
    use chrono::{TimeZone, Utc};

    fn record(id: &str, level: Option<u8>) -> CommentRecord {
        CommentRecord {
            comment_id: id.to_string(),
            author: format!("user{id}"),
            author_sex: None,
            author_level: level,
            content: "hello".to_string(),
            likes: 1,
            posted_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            reply_count: 0,
            floor: None,
            is_nested_reply: false,
        }
    }

    fn report(records: Vec<CommentRecord>) -> CollectionReport {
        CollectionReport {
            title: "demo".to_string(),
            resource_id: 1,
            bvid: "BV17x411w7KC".to_string(),
            plan: PaginationPlan {
                total_count: records.len() as u64,
                available_pages: 1,
                target_pages: 1,
            },
            stats: CollectStats {
                succeeded_pages: vec![1],
                top_level: records.len(),
                ..Default::default()
            },
            records,
        }
    }

    #[test]
    fn test_summary_shows_average_level() {
        let summary = format_summary(&report(vec![record("1", Some(5)), record("2", Some(2))]));

        assert!(summary.contains("Records: 2"));
        assert!(summary.contains("Average user level: 3.50"));
        assert!(!summary.contains("No comments were returned"));
    }

    #[test]
    fn test_summary_warns_on_empty_result() {
        let summary = format_summary(&report(vec![]));

        assert!(summary.contains("Records: 0"));
        assert!(summary.contains("No comments were returned"));
        assert!(summary.contains("risk control"));
        assert!(!summary.contains("Average user level"));
    }
}
