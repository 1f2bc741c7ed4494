use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use shared::filters::{
    dedupe_by_id, default_keywords, filter_by_date, filter_by_keywords, sort_by_newest,
};
use shared::{
    load_digest_json, save_digest_json, ArxivClient, Config, DigestData, LlmClient, ReportBuilder,
    RunMetadata, RunSettings, Summarizer,
};
use tracing_subscriber::EnvFilter;

/// About a century; longer windows reach before arXiv existed.
const MAX_DAYS_BACK: i64 = 36_500;

const DEFAULT_QUERY: &str = "all:energy OR all:renewable OR all:solar OR all:wind OR all:battery";

#[derive(Parser)]
#[command(name = "paper-scout")]
#[command(about = "Fetch recent arXiv papers, filter them, summarize them with an LLM, and write a Markdown digest")]
struct Args {
    /// arXiv search query
    #[arg(short, long, default_value = DEFAULT_QUERY)]
    query: String,

    /// Number of days to look back
    #[arg(
        short,
        long,
        default_value = "7",
        value_parser = clap::value_parser!(i64).range(0..=MAX_DAYS_BACK)
    )]
    days: i64,

    /// Maximum number of papers to fetch
    #[arg(short, long, default_value = "20", value_parser = clap::value_parser!(u64).range(1..))]
    max_papers: u64,

    /// Maximum number of papers to summarize (default: all filtered papers)
    #[arg(short = 's', long)]
    max_summarize: Option<usize>,

    /// Directory for the generated report
    #[arg(short, long, default_value = "reports")]
    output_dir: PathBuf,

    /// Keywords to match in title or abstract (default: built-in energy-tech terms)
    #[arg(short, long, num_args = 1..)]
    keywords: Vec<String>,

    /// Disable keyword filtering (date filtering still applies)
    #[arg(long)]
    no_filter: bool,

    /// Papers summarized at once
    #[arg(long, default_value = "1")]
    concurrency: usize,

    /// Also write the results as JSON
    #[arg(long)]
    json: bool,

    /// Rebuild the report from a previous JSON export instead of fetching
    #[arg(long, value_name = "PATH", conflicts_with = "json")]
    from_json: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn settings_from_args(args: &Args) -> RunSettings {
    let keywords = if args.keywords.is_empty() {
        default_keywords()
    } else {
        args.keywords.clone()
    };

    RunSettings {
        query: args.query.clone(),
        days_back: args.days,
        max_papers: args.max_papers as usize,
        max_summarize: args.max_summarize,
        keywords,
        keyword_filter: !args.no_filter,
        output_dir: args.output_dir.clone(),
        concurrency: args.concurrency.max(1),
    }
}

fn date_cutoff(now: DateTime<Utc>, days_back: i64) -> Result<DateTime<Utc>> {
    if !(0..=MAX_DAYS_BACK).contains(&days_back) {
        return Err(anyhow!(
            "--days must be between 0 and {}, got {}",
            MAX_DAYS_BACK,
            days_back
        ));
    }
    Duration::try_days(days_back)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| anyhow!("--days {} reaches outside the supported date range", days_back))
}

fn rebuild_report(path: &Path, output_dir: &Path) -> Result<()> {
    println!("📖 Reading exported run: {}", path.display());
    let data = load_digest_json(path).context("Failed to load exported run")?;

    println!("📝 Rebuilding report for {} papers...", data.results.len());
    let report = ReportBuilder::build(&data.results, &data.metadata);
    let report_path = ReportBuilder::write(&report, output_dir, data.metadata.generated_at)
        .context("Failed to write report")?;

    println!("\n✅ Report saved to: {}", report_path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Some(path) = &args.from_json {
        return rebuild_report(path, &args.output_dir);
    }

    let config = Config::from_env()?;
    let settings = settings_from_args(&args);

    let now = Utc::now();
    let cutoff = date_cutoff(now, settings.days_back)?;
    let mut metadata = RunMetadata::new(now, settings.clone());

    println!("📚 Fetching up to {} papers from arXiv...", settings.max_papers);
    let arxiv = ArxivClient::new(config.arxiv_endpoint.clone())?;
    let fetched = arxiv
        .fetch_recent(&settings.query, settings.max_papers)
        .await
        .context("Failed to fetch papers from arXiv")?;

    let fetched_count = fetched.len();
    let papers = dedupe_by_id(fetched);
    if papers.len() < fetched_count {
        tracing::info!(
            dropped = fetched_count - papers.len(),
            "Dropped duplicate paper ids"
        );
    }
    metadata.total_fetched = papers.len();
    println!("✓ Found {} papers", papers.len());

    println!("\n🔍 Filtering...");
    let papers = filter_by_date(papers, cutoff);
    metadata.total_after_date = papers.len();
    println!(
        "  {} published in the past {} days",
        papers.len(),
        settings.days_back
    );

    let papers = if settings.keyword_filter {
        let kept = filter_by_keywords(papers, &settings.keywords);
        println!("  {} match at least one keyword", kept.len());
        kept
    } else {
        println!("  Keyword filter disabled");
        papers
    };
    let papers = sort_by_newest(papers);
    metadata.total_filtered = papers.len();

    let results = if papers.is_empty() {
        println!("\nNo papers passed the filters.");
        Vec::new()
    } else {
        let selected = settings
            .max_summarize
            .map_or(papers.len(), |max| max.min(papers.len()));
        println!(
            "\n🤖 Summarizing {} papers with {} ({})...",
            selected, config.provider, config.model
        );

        let focus = if args.keywords.is_empty() {
            "energy technology".to_string()
        } else {
            settings.keywords.join(", ")
        };
        let summarizer = Summarizer::new(LlmClient::from_config(&config)?)
            .with_focus(focus)
            .with_concurrency(settings.concurrency);
        summarizer
            .summarize_all(papers, settings.max_summarize)
            .await
    };

    metadata.record_results(&results);
    println!(
        "✓ Successfully summarized {}/{} papers",
        metadata.total_succeeded(),
        metadata.total_summarized
    );

    println!("\n📝 Generating report...");
    let report = ReportBuilder::build(&results, &metadata);
    let report_path = ReportBuilder::write(&report, &settings.output_dir, now)
        .context("Failed to write report")?;

    if args.json {
        let data = DigestData::new(metadata, results);
        let json_path = save_digest_json(&data, &settings.output_dir)
            .context("Failed to write JSON export")?;
        println!("✓ JSON saved to: {}", json_path.display());
    }

    println!("\n✅ Report saved to: {}", report_path.display());

    Ok(())
}
