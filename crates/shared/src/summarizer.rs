use std::future::Future;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{Config, Provider};
use crate::error::{Result, ScoutError};
use crate::models::{PaperRecord, SummaryResult};

/// Longest abstract (in bytes) embedded in a prompt.
const MAX_ABSTRACT_BYTES: usize = 10_000;
const MAX_KEYWORDS: usize = 8;
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// A text-generation service: one prompt in, generated text out.
pub trait CompletionClient {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()
        .map_err(|e| ScoutError::Config(format!("Failed to create HTTP client: {}", e)))
}

fn summarization_error(context: &str, e: impl std::fmt::Display) -> ScoutError {
    ScoutError::Summarization(format!("{}: {}", context, e))
}

// ==================== Anthropic ====================

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    text: String,
}

pub struct ClaudeClient {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_key,
            model,
        })
    }
}

impl CompletionClient for ClaudeClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| summarization_error("Failed to send request to Claude API", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(ScoutError::Summarization(format!(
                "Claude API error {}: {}",
                status, error_text
            )));
        }

        let claude_response = response
            .json::<ClaudeResponse>()
            .await
            .map_err(|e| summarization_error("Failed to parse Claude API response", e))?;

        Ok(claude_response
            .content
            .into_iter()
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

// ==================== Gemini ====================

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<GeminiContent>,
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_key,
            model,
        })
    }
}

impl CompletionClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let url = format!("{}/{}:generateContent", GEMINI_URL, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| summarization_error("Failed to send request to Gemini API", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(ScoutError::Summarization(format!(
                "Gemini API error {}: {}",
                status, error_text
            )));
        }

        let gemini_response = response
            .json::<GeminiResponse>()
            .await
            .map_err(|e| summarization_error("Failed to parse Gemini API response", e))?;

        let text = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ScoutError::Summarization(
                "Gemini API returned no candidates".to_string(),
            ));
        }
        Ok(text)
    }
}

/// The configured backend.
pub enum LlmClient {
    Claude(ClaudeClient),
    Gemini(GeminiClient),
}

impl LlmClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let key = config.api_key.clone();
        let model = config.model.clone();
        Ok(match config.provider {
            Provider::Anthropic => LlmClient::Claude(ClaudeClient::new(key, model)?),
            Provider::Gemini => LlmClient::Gemini(GeminiClient::new(key, model)?),
        })
    }
}

impl CompletionClient for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        match self {
            LlmClient::Claude(client) => client.complete(prompt).await,
            LlmClient::Gemini(client) => client.complete(prompt).await,
        }
    }
}

// ==================== Prompt & Parsing ====================

/// Sections parsed out of a model response.
#[derive(Debug, Default, PartialEq)]
pub struct Insight {
    pub summary: String,
    pub key_innovations: Vec<String>,
    pub novel_methods: Vec<String>,
    pub potential_applications: Vec<String>,
    pub keywords: Vec<String>,
    pub relevance_score: f32,
}

impl Insight {
    fn into_result(self, paper: PaperRecord) -> SummaryResult {
        SummaryResult {
            paper,
            short_summary: self.summary,
            key_innovations: self.key_innovations,
            novel_methods: self.novel_methods,
            potential_applications: self.potential_applications,
            keywords: self.keywords,
            relevance_score: self.relevance_score,
            error: None,
        }
    }
}

fn truncate_to_boundary(content: &str, max: usize) -> &str {
    if content.len() <= max {
        return content;
    }
    let mut end = max;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

pub fn build_prompt(paper: &PaperRecord, focus: &str) -> String {
    format!(
        r#"You are an expert research analyst specializing in {focus}. Analyze the arXiv paper below and write an insight-oriented summary.

RULES:
1. Do NOT rewrite the abstract - identify what is genuinely new
2. Use ONLY the title and abstract - no external knowledge
3. The summary must be 2-4 sentences
4. Each bullet point must be under 25 words
5. Keywords must be specific technical terms, not generic words
6. Rate relevance to {focus} from 0 (unrelated) to 10 (directly applicable)

Title: {title}

Abstract:
{abstract_text}

Format your response EXACTLY as:
Summary:
<2-4 sentences on what is new and why it matters>

Key Innovations:
- <innovation>
- <innovation>

Novel Methods:
- <method or technique>

Potential Applications:
- <application>

Keywords:
keyword1, keyword2, keyword3

Relevance Score: <number from 0 to 10>"#,
        focus = focus,
        title = paper.title,
        abstract_text = truncate_to_boundary(&paper.abstract_text, MAX_ABSTRACT_BYTES),
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Summary,
    Innovations,
    Methods,
    Applications,
    Keywords,
    Score,
}

/// Recognizes a section header, tolerating markdown decoration such as
/// `## Key Innovations` or `**Relevance Score:** 7`.
fn section_header(line: &str) -> Option<(Section, &str)> {
    let cleaned = line.trim_start_matches(['#', '*', ' ']);
    let (label, rest) = cleaned.split_once(':')?;
    let label = label.trim_end_matches(['*', ' ']).to_ascii_lowercase();
    let section = match label.as_str() {
        "summary" | "insight summary" => Section::Summary,
        "key innovations" | "innovations" => Section::Innovations,
        "novel methods" | "novel methods / techniques" | "methods" => Section::Methods,
        "potential applications" | "applications" => Section::Applications,
        "keywords" | "extracted keywords" => Section::Keywords,
        "relevance score" | "relevance" => Section::Score,
        _ => return None,
    };
    Some((section, rest.trim_start_matches('*').trim()))
}

fn strip_bullet(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix(['-', '*', '•']) {
        return Some(rest.trim());
    }
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &trimmed[digits..];
        if let Some(rest) = rest.strip_prefix(['.', ')']) {
            return Some(rest.trim());
        }
    }
    None
}

/// Accepts `7`, `7.5`, `7/10` and `**8** out of 10`.
fn parse_score(text: &str) -> Option<f32> {
    let cleaned = text.trim().trim_start_matches('*');
    let number: String = cleaned
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    number.trim_end_matches('.').parse::<f32>().ok()
}

/// Parses a structured model response. The error is a human-readable
/// reason when the text does not follow the requested format.
pub fn parse_response(text: &str) -> std::result::Result<Insight, String> {
    let mut insight = Insight::default();
    let mut summary_lines: Vec<String> = Vec::new();
    let mut score: Option<f32> = None;
    let mut saw_score = false;
    let mut section: Option<Section> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let content = match section_header(trimmed) {
            Some((next, rest)) => {
                section = Some(next);
                if next == Section::Score {
                    saw_score = true;
                }
                if rest.is_empty() {
                    continue;
                }
                rest
            }
            None => trimmed,
        };

        match section {
            Some(Section::Summary) => summary_lines.push(content.to_string()),
            Some(Section::Innovations) => push_bullet(&mut insight.key_innovations, content),
            Some(Section::Methods) => push_bullet(&mut insight.novel_methods, content),
            Some(Section::Applications) => {
                push_bullet(&mut insight.potential_applications, content)
            }
            Some(Section::Keywords) => {
                let body = strip_bullet(content).unwrap_or(content);
                insight.keywords.extend(
                    body.split(',')
                        .map(|k| k.trim().trim_matches('*').trim())
                        .filter(|k| !k.is_empty())
                        .map(str::to_string),
                );
            }
            Some(Section::Score) => {
                if score.is_none() {
                    score = parse_score(content);
                }
            }
            None => {}
        }
    }

    insight.summary = summary_lines.join(" ").trim().to_string();
    insight.keywords.truncate(MAX_KEYWORDS);

    if insight.summary.is_empty() {
        return Err("missing summary section".to_string());
    }
    let score = match score {
        Some(score) => score,
        None if saw_score => return Err("relevance score is not a number".to_string()),
        None => return Err("missing relevance score".to_string()),
    };
    if !(0.0..=10.0).contains(&score) {
        return Err(format!("relevance score {} is outside 0-10", score));
    }
    insight.relevance_score = score;

    Ok(insight)
}

fn push_bullet(items: &mut Vec<String>, line: &str) {
    if let Some(item) = strip_bullet(line).filter(|item| !item.is_empty()) {
        items.push(item.to_string());
    }
}

/// Applies the `max_summarize` cap in input order.
pub fn cap_papers(mut papers: Vec<PaperRecord>, max: Option<usize>) -> Vec<PaperRecord> {
    if let Some(max) = max {
        papers.truncate(max);
    }
    papers
}

// ==================== Summarizer ====================

pub struct Summarizer<C> {
    client: C,
    focus: String,
    concurrency: usize,
}

impl<C: CompletionClient> Summarizer<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            focus: "energy technology".to_string(),
            concurrency: 1,
        }
    }

    /// Research area the relevance score is measured against.
    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = focus.into();
        self
    }

    /// Papers in flight at once. 1 keeps the stage strictly sequential.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Summarizes one paper. Failures are recorded on the result, never returned.
    pub async fn summarize(&self, paper: PaperRecord) -> SummaryResult {
        if paper.abstract_text.trim().is_empty() {
            tracing::warn!(id = %paper.id, "Paper has no abstract, skipping summarization");
            return SummaryResult::failed(paper, "No abstract available for summarization");
        }

        let prompt = build_prompt(&paper, &self.focus);
        match self.client.complete(&prompt).await {
            Ok(text) => match parse_response(&text) {
                Ok(insight) => insight.into_result(paper),
                Err(reason) => {
                    tracing::warn!(id = %paper.id, "Unparseable summary: {}", reason);
                    SummaryResult::failed(paper, format!("Unparseable response: {}", reason))
                }
            },
            Err(e) => {
                tracing::warn!(id = %paper.id, "Failed to summarize: {}", e);
                let message = match e {
                    ScoutError::Summarization(message) => message,
                    other => other.to_string(),
                };
                SummaryResult::failed(paper, message)
            }
        }
    }

    /// Summarizes the first `max` papers (all when `None`), returning one
    /// result per paper in input order.
    pub async fn summarize_all(
        &self,
        papers: Vec<PaperRecord>,
        max: Option<usize>,
    ) -> Vec<SummaryResult> {
        let selected = cap_papers(papers, max);
        let total = selected.len();

        stream::iter(selected.into_iter().enumerate())
            .map(|(index, paper)| async move {
                tracing::info!("Summarizing paper {}/{}: {}", index + 1, total, paper.title);
                self.summarize(paper).await
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
