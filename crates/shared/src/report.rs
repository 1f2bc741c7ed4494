use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{Result, ScoutError};
use crate::models::{RunMetadata, SummaryResult};

/// How many papers the executive summary highlights.
const TOP_PICKS: usize = 3;

pub struct ReportBuilder;

impl ReportBuilder {
    /// Base name shared by the Markdown report and the JSON export.
    pub fn file_stem(date: DateTime<Utc>) -> String {
        format!("arxiv-digest-{}", date.format("%Y%m%d-%H%M%S"))
    }

    fn format_date(date: Option<DateTime<Utc>>) -> String {
        match date {
            Some(dt) => dt.format("%-d %b %Y").to_string(),
            None => "Unknown".to_string(),
        }
    }

    fn format_score(score: f32) -> String {
        if score.fract() == 0.0 {
            format!("{:.0}/10", score)
        } else {
            format!("{:.1}/10", score)
        }
    }

    /// Keeps titles and list items on one line so they cannot break the
    /// surrounding Markdown structure.
    fn inline(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn build(results: &[SummaryResult], metadata: &RunMetadata) -> String {
        let mut md = String::new();

        md.push_str("# arXiv Research Digest\n\n");
        md.push_str(&format!(
            "_Generated {}_\n\n",
            metadata.generated_at.format("%A, %-d %B %Y at %H:%M UTC")
        ));

        Self::push_run_table(&mut md, metadata);
        Self::push_executive_summary(&mut md, results, metadata);

        if !results.is_empty() {
            md.push_str("## Papers\n\n");
            for (index, result) in results.iter().enumerate() {
                Self::push_paper(&mut md, index + 1, result);
            }
        }

        md
    }

    fn push_run_table(md: &mut String, metadata: &RunMetadata) {
        let settings = &metadata.settings;
        let keyword_line = if settings.keyword_filter {
            settings.keywords.join(", ")
        } else {
            "disabled".to_string()
        };
        let max_summarize = settings
            .max_summarize
            .map(|n| n.to_string())
            .unwrap_or_else(|| "all".to_string());

        md.push_str("## Run\n\n");
        md.push_str("| Setting | Value |\n");
        md.push_str("|---|---|\n");
        md.push_str(&format!("| Query | `{}` |\n", settings.query));
        md.push_str(&format!("| Days back | {} |\n", settings.days_back));
        md.push_str(&format!("| Max papers | {} |\n", settings.max_papers));
        md.push_str(&format!("| Max summarized | {} |\n", max_summarize));
        md.push_str(&format!("| Keywords | {} |\n", keyword_line));
        md.push_str(&format!("| Papers fetched | {} |\n", metadata.total_fetched));
        md.push_str(&format!("| After date filter | {} |\n", metadata.total_after_date));
        md.push_str(&format!("| After keyword filter | {} |\n", metadata.total_filtered));
        md.push_str(&format!("| Summarized | {} |\n", metadata.total_summarized));
        md.push_str(&format!("| Failed | {} |\n", metadata.total_failed));
        md.push_str(&format!("| Omitted by cap | {} |\n\n", metadata.total_omitted));
    }

    fn push_executive_summary(md: &mut String, results: &[SummaryResult], metadata: &RunMetadata) {
        md.push_str("## Executive Summary\n\n");

        if metadata.total_filtered == 0 {
            md.push_str(&format!(
                "Zero papers were found matching the filters in the last {} days. \
                 Try widening the date window, changing the query, \
                 or passing different keywords.\n\n",
                metadata.settings.days_back
            ));
            return;
        }

        if results.is_empty() {
            md.push_str(&format!(
                "{} papers matched the filters, but all of them were left out \
                 by the summarization cap.\n\n",
                metadata.total_filtered
            ));
            return;
        }

        let succeeded: Vec<&SummaryResult> = results.iter().filter(|r| r.is_success()).collect();

        md.push_str(&format!(
            "{} of {} papers were summarized successfully",
            succeeded.len(),
            results.len()
        ));
        if metadata.total_failed > 0 {
            md.push_str(&format!(" ({} failed)", metadata.total_failed));
        }
        md.push('.');
        if metadata.total_omitted > 0 {
            md.push_str(&format!(
                " {} further matching papers were left out by the summarization cap.",
                metadata.total_omitted
            ));
        }
        md.push_str("\n\n");

        if succeeded.is_empty() {
            md.push_str("No summaries are available for this run.\n\n");
            return;
        }

        let average =
            succeeded.iter().map(|r| r.relevance_score).sum::<f32>() / succeeded.len() as f32;
        md.push_str(&format!("Average relevance: **{:.1}/10**\n\n", average));

        let mut ranked = succeeded;
        ranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

        md.push_str("**Top papers:**\n\n");
        for result in ranked.iter().take(TOP_PICKS) {
            md.push_str(&format!(
                "- **{}** ({}): {}\n",
                Self::inline(&result.paper.title),
                Self::format_score(result.relevance_score),
                Self::inline(&result.short_summary)
            ));
        }
        md.push('\n');
    }

    fn push_paper(md: &mut String, number: usize, result: &SummaryResult) {
        let paper = &result.paper;
        let title = if paper.title.trim().is_empty() {
            "(untitled)".to_string()
        } else {
            Self::inline(&paper.title)
        };

        md.push_str(&format!("### {}. {}\n\n", number, title));

        if !paper.authors.is_empty() {
            md.push_str(&format!("- **Authors:** {}\n", paper.authors.join(", ")));
        }
        md.push_str(&format!("- **Published:** {}\n", Self::format_date(paper.published)));
        match &paper.abs_link {
            Some(link) => md.push_str(&format!("- **arXiv:** [{}]({})\n", paper.id, link)),
            None => md.push_str(&format!("- **arXiv:** {}\n", paper.id)),
        }
        if let Some(pdf) = &paper.pdf_link {
            md.push_str(&format!("- **PDF:** <{}>\n", pdf));
        }
        if !paper.categories.is_empty() {
            let categories: Vec<&str> = paper.categories.iter().map(String::as_str).collect();
            md.push_str(&format!("- **Categories:** {}\n", categories.join(", ")));
        }

        match &result.error {
            None => {
                md.push_str(&format!(
                    "- **Relevance:** {}\n\n",
                    Self::format_score(result.relevance_score)
                ));
                md.push_str(&format!("**Summary:** {}\n\n", result.short_summary));
                Self::push_list(md, "Key Innovations", &result.key_innovations);
                Self::push_list(md, "Novel Methods", &result.novel_methods);
                Self::push_list(md, "Potential Applications", &result.potential_applications);
                if !result.keywords.is_empty() {
                    md.push_str(&format!("**Keywords:** {}\n\n", result.keywords.join(", ")));
                }
            }
            Some(error) => {
                md.push('\n');
                md.push_str(&format!(
                    "> ⚠️ **Summarization failed:** {}\n\n",
                    Self::inline(error)
                ));
            }
        }

        md.push_str("---\n\n");
    }

    fn push_list(md: &mut String, heading: &str, items: &[String]) {
        if items.is_empty() {
            return;
        }
        md.push_str(&format!("**{}:**\n\n", heading));
        for item in items {
            md.push_str(&format!("- {}\n", Self::inline(item)));
        }
        md.push('\n');
    }

    /// Writes the report into `dir`, creating the directory if needed.
    pub fn write(content: &str, dir: &Path, date: DateTime<Utc>) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| ScoutError::io(dir, e))?;

        let filepath = dir.join(format!("{}.md", Self::file_stem(date)));
        fs::write(&filepath, content).map_err(|e| ScoutError::io(&filepath, e))?;

        Ok(filepath)
    }
}
