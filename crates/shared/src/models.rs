use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// One paper as returned by the listing API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub published: Option<DateTime<Utc>>,
    pub abs_link: Option<Url>,
    pub pdf_link: Option<Url>,
    pub categories: BTreeSet<String>,
}

impl PaperRecord {
    /// A record with only the identifying fields filled in.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: Vec::new(),
            abstract_text: String::new(),
            published: None,
            abs_link: None,
            pdf_link: None,
            categories: BTreeSet::new(),
        }
    }
}

/// The summarizer's output for a single paper.
///
/// Failed summaries keep their place in the run: `error` is set and the
/// remaining fields stay at their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResult {
    pub paper: PaperRecord,
    pub short_summary: String,
    pub key_innovations: Vec<String>,
    pub novel_methods: Vec<String>,
    pub potential_applications: Vec<String>,
    pub keywords: Vec<String>,
    /// 0 to 10.
    pub relevance_score: f32,
    pub error: Option<String>,
}

impl SummaryResult {
    pub fn failed(paper: PaperRecord, error: impl Into<String>) -> Self {
        Self {
            paper,
            short_summary: String::new(),
            key_innovations: Vec::new(),
            novel_methods: Vec::new(),
            potential_applications: Vec::new(),
            keywords: Vec::new(),
            relevance_score: 0.0,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// User-facing knobs for a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    pub query: String,
    pub days_back: i64,
    pub max_papers: usize,
    pub max_summarize: Option<usize>,
    pub keywords: Vec<String>,
    pub keyword_filter: bool,
    pub output_dir: PathBuf,
    pub concurrency: usize,
}

/// Run-level facts shown in the report header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub generated_at: DateTime<Utc>,
    pub total_fetched: usize,
    pub total_after_date: usize,
    pub total_filtered: usize,
    pub total_summarized: usize,
    pub total_failed: usize,
    /// Filtered papers cut by `max_summarize`.
    pub total_omitted: usize,
    pub settings: RunSettings,
}

impl RunMetadata {
    pub fn new(generated_at: DateTime<Utc>, settings: RunSettings) -> Self {
        Self {
            generated_at,
            total_fetched: 0,
            total_after_date: 0,
            total_filtered: 0,
            total_summarized: 0,
            total_failed: 0,
            total_omitted: 0,
            settings,
        }
    }

    /// Fills the summarization counts from the stage's output.
    pub fn record_results(&mut self, results: &[SummaryResult]) {
        self.total_summarized = results.len();
        self.total_failed = results.iter().filter(|r| !r.is_success()).count();
        self.total_omitted = self.total_filtered.saturating_sub(results.len());
    }

    pub fn total_succeeded(&self) -> usize {
        self.total_summarized - self.total_failed
    }
}

/// Everything one run produced, as exported to JSON.
#[derive(Debug, Serialize, Deserialize)]
pub struct DigestData {
    pub version: String,
    pub metadata: RunMetadata,
    pub results: Vec<SummaryResult>,
}

impl DigestData {
    pub fn new(metadata: RunMetadata, results: Vec<SummaryResult>) -> Self {
        Self {
            version: "1.0".to_string(),
            metadata,
            results,
        }
    }
}
