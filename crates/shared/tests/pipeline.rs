use chrono::{Duration, TimeZone, Utc};
use shared::arxiv::parse_feed;
use shared::filters::{filter_by_date, filter_by_keywords, sort_by_newest};
use shared::{
    CompletionClient, ReportBuilder, Result, RunMetadata, RunSettings, ScoutError, Summarizer,
};
use std::path::PathBuf;
use tempfile::TempDir;

const GOOD_RESPONSE: &str = "Summary:
A cheaper electrolyte for flow batteries.

Key Innovations:
- Iron-based redox couple

Relevance Score: 9";

/// Answers from a fixed script keyed on the paper title in the prompt.
struct ScriptedClient;

impl CompletionClient for ScriptedClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if prompt.contains("Title: Garbled") {
            Ok("The model went off script here.".to_string())
        } else if prompt.contains("Title: Offline") {
            Err(ScoutError::Summarization("connection reset".to_string()))
        } else {
            Ok(GOOD_RESPONSE.to_string())
        }
    }
}

fn entry(id: &str, title: &str, summary: &str, published: &str) -> String {
    format!(
        "<entry><id>http://arxiv.org/abs/{id}</id><published>{published}</published>\
         <title>{title}</title><summary>{summary}</summary>\
         <author><name>Grace Hopper</name></author></entry>"
    )
}

fn feed(entries: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\"?><feed xmlns=\"http://www.w3.org/2005/Atom\">{}</feed>",
        entries.concat()
    )
}

fn settings(days_back: i64) -> RunSettings {
    RunSettings {
        query: "all:battery".to_string(),
        days_back,
        max_papers: 20,
        max_summarize: None,
        keywords: vec!["battery".to_string()],
        keyword_filter: true,
        output_dir: PathBuf::from("reports"),
        concurrency: 1,
    }
}

#[test]
fn date_filter_keeps_today_and_yesterday() {
    let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
    let fmt = |d: chrono::DateTime<Utc>| d.to_rfc3339();
    let xml = feed(&[
        entry("1", "Today", "battery", &fmt(now)),
        entry("2", "Yesterday", "battery", &fmt(now - Duration::days(1))),
        entry("3", "Old", "battery", &fmt(now - Duration::days(10))),
    ]);

    let papers = parse_feed(&xml).unwrap().papers;
    let kept = filter_by_date(papers, now - Duration::days(7));

    let titles: Vec<&str> = kept.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Today", "Yesterday"]);
}

#[test]
fn keyword_filter_matches_abstract() {
    let xml = feed(&[entry(
        "1",
        "Electrochemistry notes",
        "A battery with a new anode",
        "2026-03-15T00:00:00Z",
    )]);
    let papers = parse_feed(&xml).unwrap().papers;

    assert_eq!(filter_by_keywords(papers.clone(), &["battery".to_string()]).len(), 1);
    assert!(filter_by_keywords(papers, &["solar".to_string()]).is_empty());
}

#[tokio::test]
async fn failed_summary_still_produces_full_report() {
    let now = Utc::now();
    let published = now.to_rfc3339();
    let xml = feed(&[
        entry("1", "Flow Battery", "battery electrolyte", &published),
        entry("2", "Garbled", "battery modelling", &published),
        entry("3", "Offline", "battery recycling", &published),
        entry("4", "Battery Aging", "battery aging", &published),
    ]);

    let fetched = parse_feed(&xml).unwrap().papers;
    let mut metadata = RunMetadata::new(now, settings(7));
    metadata.total_fetched = fetched.len();

    let papers = filter_by_date(fetched, now - Duration::days(7));
    metadata.total_after_date = papers.len();
    let papers = sort_by_newest(filter_by_keywords(papers, &metadata.settings.keywords));
    metadata.total_filtered = papers.len();

    let results = Summarizer::new(ScriptedClient).summarize_all(papers, None).await;
    metadata.record_results(&results);

    assert_eq!(results.len(), 4);
    let garbled = results.iter().find(|r| r.paper.title == "Garbled").unwrap();
    assert!(garbled.error.is_some());
    assert!(garbled.key_innovations.is_empty());
    assert_eq!(metadata.total_failed, 2);

    let report = ReportBuilder::build(&results, &metadata);
    assert!(report.contains("Flow Battery"));
    assert!(report.contains("Battery Aging"));
    assert!(report.contains("Iron-based redox couple"));
    assert_eq!(report.matches("⚠️ **Summarization failed:**").count(), 2);
    assert!(report.contains("connection reset"));

    let temp = TempDir::new().unwrap();
    let path = ReportBuilder::write(&report, temp.path(), now).unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), report);
}

#[tokio::test]
async fn zero_papers_still_writes_report() {
    let now = Utc::now();
    let xml = feed(&[entry("1", "Ancient", "battery", "2001-01-01T00:00:00Z")]);

    let fetched = parse_feed(&xml).unwrap().papers;
    let mut metadata = RunMetadata::new(now, settings(7));
    metadata.total_fetched = fetched.len();
    let papers = filter_by_date(fetched, now - Duration::days(7));
    metadata.total_after_date = papers.len();
    metadata.total_filtered = papers.len();

    let results = Summarizer::new(ScriptedClient).summarize_all(papers, None).await;
    metadata.record_results(&results);

    let report = ReportBuilder::build(&results, &metadata);
    assert!(report.contains("Zero papers were found"));
    assert!(report.contains("| Papers fetched | 1 |"));

    let temp = TempDir::new().unwrap();
    let out = temp.path().join("fresh");
    let path = ReportBuilder::write(&report, &out, now).unwrap();
    assert!(path.exists());
}
