use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Client;
use url::Url;

use crate::error::{Result, ScoutError};
use crate::models::PaperRecord;

/// Largest page requested from the listing API in one call.
const PAGE_SIZE: usize = 100;

/// One parsed page of the Atom feed.
#[derive(Debug, Default)]
pub struct FeedPage {
    /// `opensearch:totalResults`, when the feed reports it.
    pub total_results: Option<usize>,
    /// Number of `<entry>` elements seen, including ones that were skipped.
    pub entries_seen: usize,
    pub papers: Vec<PaperRecord>,
}

pub struct ArxivClient {
    client: Client,
    endpoint: Url,
}

impl ArxivClient {
    pub fn new(endpoint: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("paper-scout/0.1 (arXiv digest)")
            .build()
            .map_err(|e| {
                ScoutError::SourceUnavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, endpoint })
    }

    /// Fetches up to `max_results` of the most recently submitted papers
    /// matching `query`, newest first, paging as needed.
    pub async fn fetch_recent(&self, query: &str, max_results: usize) -> Result<Vec<PaperRecord>> {
        if max_results == 0 {
            return Err(ScoutError::InvalidRequest(
                "max_results must be greater than zero".to_string(),
            ));
        }
        if query.trim().is_empty() {
            return Err(ScoutError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }

        let mut papers = Vec::new();
        let mut start = 0;

        while papers.len() < max_results {
            let count = (max_results - papers.len()).min(PAGE_SIZE);
            let page = self.fetch_page(query, start, count).await?;

            tracing::debug!(
                start,
                count,
                entries = page.entries_seen,
                total = ?page.total_results,
                "Fetched arXiv page"
            );

            let seen = page.entries_seen;
            papers.extend(page.papers);
            start += seen;

            if seen < count {
                break;
            }
            if page.total_results.is_some_and(|total| start >= total) {
                break;
            }
        }

        papers.truncate(max_results);
        tracing::info!(query, fetched = papers.len(), "Fetched papers from arXiv");
        Ok(papers)
    }

    async fn fetch_page(&self, query: &str, start: usize, count: usize) -> Result<FeedPage> {
        let url = self.page_url(query, start, count);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/atom+xml, application/xml;q=0.9")
            .send()
            .await
            .map_err(|e| ScoutError::SourceUnavailable(format!("Request to arXiv failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(ScoutError::SourceUnavailable(format!(
                "arXiv API returned error: {} - {}",
                status,
                preview(&error_text)
            )));
        }

        let body = response.text().await.map_err(|e| {
            ScoutError::SourceUnavailable(format!("Failed to read arXiv response: {}", e))
        })?;

        parse_feed(&body)
    }

    fn page_url(&self, query: &str, start: usize, count: usize) -> String {
        let separator = if self.endpoint.query().is_some() { '&' } else { '?' };
        format!(
            "{}{}search_query={}&start={}&max_results={}&sortBy=submittedDate&sortOrder=descending",
            self.endpoint,
            separator,
            urlencoding::encode(query.trim()),
            start,
            count
        )
    }
}

fn preview(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(200) {
        Some((end, _)) => format!("{}…", &trimmed[..end]),
        None => trimmed.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
    TotalResults,
}

#[derive(Default)]
struct EntryBuilder {
    id_url: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    abs_href: Option<String>,
    pdf_href: Option<String>,
    categories: BTreeSet<String>,
}

impl EntryBuilder {
    fn on_element(&mut self, e: &BytesStart<'_>) {
        match e.local_name().as_ref() {
            b"link" => {
                let rel = attr(e, b"rel");
                let kind = attr(e, b"type");
                let title = attr(e, b"title");
                let href = attr(e, b"href");
                if title.as_deref() == Some("pdf") || kind.as_deref() == Some("application/pdf") {
                    self.pdf_href = href;
                } else if rel.as_deref().unwrap_or("alternate") == "alternate" {
                    self.abs_href = href;
                }
            }
            b"category" | b"primary_category" => {
                if let Some(term) = attr(e, b"term").filter(|t| !t.trim().is_empty()) {
                    self.categories.insert(term.trim().to_string());
                }
            }
            _ => {}
        }
    }

    fn set(&mut self, field: Field, text: String) {
        match field {
            Field::Id => self.id_url = text,
            Field::Title => self.title = text,
            Field::Summary => self.summary = text,
            Field::Published => self.published = text,
            Field::AuthorName => {
                if !text.is_empty() {
                    self.authors.push(text);
                }
            }
            Field::TotalResults => {}
        }
    }

    fn is_api_error(&self) -> bool {
        self.id_url.contains("/api/errors")
    }

    /// Builds the record, filling gaps with defaults. `None` only when no
    /// identifier can be recovered at all.
    fn finish(self) -> Option<PaperRecord> {
        let id = arxiv_id_from_url(&self.id_url)
            .or_else(|| self.abs_href.as_deref().and_then(arxiv_id_from_url))
            .or_else(|| (!self.id_url.is_empty()).then(|| self.id_url.clone()))?;

        let published = if self.published.is_empty() {
            tracing::warn!(id = %id, "Entry has no published date");
            None
        } else {
            match DateTime::parse_from_rfc3339(&self.published) {
                Ok(dt) => Some(dt.with_timezone(&Utc)),
                Err(e) => {
                    tracing::warn!(
                        id = %id,
                        value = %self.published,
                        "Unparseable published date: {}",
                        e
                    );
                    None
                }
            }
        };

        let abs_link = self
            .abs_href
            .as_deref()
            .and_then(parse_link)
            .or_else(|| Url::parse(&format!("https://arxiv.org/abs/{}", id)).ok());
        let pdf_link = self
            .pdf_href
            .as_deref()
            .and_then(parse_link)
            .or_else(|| Url::parse(&format!("https://arxiv.org/pdf/{}", id)).ok());

        Some(PaperRecord {
            id,
            title: self.title,
            authors: self.authors,
            abstract_text: self.summary,
            published,
            abs_link,
            pdf_link,
            categories: self.categories,
        })
    }
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn parse_link(href: &str) -> Option<Url> {
    Url::parse(href.trim()).ok()
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `http://arxiv.org/abs/2401.01234v1` → `2401.01234v1`
pub fn arxiv_id_from_url(url: &str) -> Option<String> {
    let u = url.trim();
    let i = u.rfind("/abs/")?;
    let id = u[i + "/abs/".len()..].trim_matches('/').trim();
    (!id.is_empty()).then(|| id.to_string())
}

/// Parses one Atom response from the listing API.
///
/// Individual entries degrade to default values; only a document that is
/// not a well-formed Atom feed is rejected.
pub fn parse_feed(xml: &str) -> Result<FeedPage> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut page = FeedPage::default();
    let mut saw_feed = false;
    let mut entry: Option<EntryBuilder> = None;
    let mut in_author = false;
    let mut field: Option<Field> = None;
    let mut text = String::new();
    let mut api_error: Option<String> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            ScoutError::Parse(format!(
                "malformed XML at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => {
                let name = e.local_name();
                if !saw_feed {
                    if name.as_ref() != b"feed" {
                        return Err(ScoutError::Parse(format!(
                            "expected an Atom <feed> root, found <{}>",
                            String::from_utf8_lossy(name.as_ref())
                        )));
                    }
                    saw_feed = true;
                    continue;
                }

                text.clear();
                field = None;
                match (name.as_ref(), entry.is_some()) {
                    (b"entry", _) => {
                        entry = Some(EntryBuilder::default());
                        in_author = false;
                    }
                    (b"totalResults", false) => field = Some(Field::TotalResults),
                    (b"id", true) => field = Some(Field::Id),
                    (b"title", true) => field = Some(Field::Title),
                    (b"summary", true) => field = Some(Field::Summary),
                    (b"published", true) => field = Some(Field::Published),
                    (b"author", true) => in_author = true,
                    (b"name", true) if in_author => field = Some(Field::AuthorName),
                    (_, true) => {
                        if let Some(builder) = entry.as_mut() {
                            builder.on_element(&e);
                        }
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if !saw_feed {
                    return Err(ScoutError::Parse(
                        "expected an Atom <feed> root, found an empty element".to_string(),
                    ));
                }
                if let Some(builder) = entry.as_mut() {
                    builder.on_element(&e);
                }
            }
            Event::Text(t) => {
                if field.is_some() {
                    let chunk = t
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    text.push_str(&chunk);
                }
            }
            Event::CData(c) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) => {
                let name = e.local_name();
                if let Some(current) = field.take() {
                    let value = normalize_ws(&text);
                    text.clear();
                    match current {
                        Field::TotalResults => page.total_results = value.parse().ok(),
                        other => {
                            if let Some(builder) = entry.as_mut() {
                                builder.set(other, value);
                            }
                        }
                    }
                }

                match name.as_ref() {
                    b"author" => in_author = false,
                    b"entry" => {
                        if let Some(builder) = entry.take() {
                            page.entries_seen += 1;
                            if builder.is_api_error() {
                                api_error = Some(builder.summary.clone());
                            } else {
                                match builder.finish() {
                                    Some(paper) => page.papers.push(paper),
                                    None => {
                                        tracing::warn!("Skipping feed entry without an identifier")
                                    }
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_feed {
        return Err(ScoutError::Parse("response contained no Atom feed".to_string()));
    }

    if let Some(message) = api_error {
        return Err(ScoutError::SourceUnavailable(format!(
            "arXiv rejected the query: {}",
            message
        )));
    }

    Ok(page)
}
