//! Pure, order-preserving filters over fetched papers.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::models::PaperRecord;

/// Built-in keywords used when the caller supplies none.
pub fn default_keywords() -> Vec<String> {
    [
        "energy",
        "renewable",
        "solar",
        "wind",
        "battery",
        "storage",
        "grid",
        "power",
        "efficiency",
        "sustainable",
        "photovoltaic",
        "turbine",
        "fuel cell",
        "hydrogen",
        "electric",
        "generation",
        "transmission",
        "distribution",
    ]
    .iter()
    .map(|k| k.to_string())
    .collect()
}

/// Keeps papers published at or after `cutoff`. Undated papers are dropped.
pub fn filter_by_date(papers: Vec<PaperRecord>, cutoff: DateTime<Utc>) -> Vec<PaperRecord> {
    papers
        .into_iter()
        .filter(|paper| paper.published.is_some_and(|published| published >= cutoff))
        .collect()
}

/// Keeps papers whose title or abstract contains at least one keyword,
/// ignoring case. An empty keyword list matches nothing.
pub fn filter_by_keywords(papers: Vec<PaperRecord>, keywords: &[String]) -> Vec<PaperRecord> {
    let needles: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    papers
        .into_iter()
        .filter(|paper| matches_keywords(paper, &needles))
        .collect()
}

fn matches_keywords(paper: &PaperRecord, needles: &[String]) -> bool {
    // Title and abstract are joined directly, with no separator.
    let haystack = format!("{}{}", paper.title, paper.abstract_text).to_lowercase();
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}

/// Newest first; undated papers sink to the end. Ties keep input order.
pub fn sort_by_newest(mut papers: Vec<PaperRecord>) -> Vec<PaperRecord> {
    papers.sort_by(|a, b| b.published.cmp(&a.published));
    papers
}

/// Drops repeated ids, keeping the first occurrence.
pub fn dedupe_by_id(papers: Vec<PaperRecord>) -> Vec<PaperRecord> {
    let mut seen = HashSet::new();
    papers
        .into_iter()
        .filter(|paper| seen.insert(paper.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn paper(
        id: &str,
        title: &str,
        abstract_text: &str,
        published: Option<DateTime<Utc>>,
    ) -> PaperRecord {
        let mut p = PaperRecord::new(id, title);
        p.abstract_text = abstract_text.to_string();
        p.published = published;
        p
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn ids(papers: &[PaperRecord]) -> Vec<&str> {
        papers.iter().map(|p| p.id.as_str()).collect()
    }

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    // ==================== Date Filter Tests ====================

    #[test]
    fn test_date_filter_keeps_last_week() {
        let papers = vec![
            paper("today", "A", "", Some(now())),
            paper("yesterday", "B", "", Some(now() - Duration::days(1))),
            paper("old", "C", "", Some(now() - Duration::days(10))),
        ];
        let cutoff = now() - Duration::days(7);

        let kept = filter_by_date(papers, cutoff);
        assert_eq!(ids(&kept), vec!["today", "yesterday"]);
    }

    #[test]
    fn test_date_filter_is_inclusive_at_cutoff() {
        let cutoff = now() - Duration::days(7);
        let kept = filter_by_date(vec![paper("edge", "A", "", Some(cutoff))], cutoff);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_date_filter_drops_undated() {
        let kept = filter_by_date(vec![paper("undated", "A", "", None)], now());
        assert!(kept.is_empty());
    }

    #[test]
    fn test_date_filter_preserves_order() {
        let papers = vec![
            paper("b", "", "", Some(now() - Duration::days(2))),
            paper("x", "", "", Some(now() - Duration::days(30))),
            paper("a", "", "", Some(now())),
            paper("c", "", "", Some(now() - Duration::days(1))),
        ];
        let kept = filter_by_date(papers, now() - Duration::days(7));
        assert_eq!(ids(&kept), vec!["b", "a", "c"]);
    }

    // ==================== Keyword Filter Tests ====================

    #[test]
    fn test_keyword_in_abstract_matches() {
        let papers = vec![paper("1", "Grid models", "A new battery chemistry", Some(now()))];
        assert_eq!(filter_by_keywords(papers.clone(), &kw(&["battery"])).len(), 1);
        assert!(filter_by_keywords(papers, &kw(&["solar"])).is_empty());
    }

    #[test]
    fn test_keyword_in_title_matches() {
        let papers = vec![paper("1", "Offshore Wind Forecasting", "We propose a model.", None)];
        assert_eq!(filter_by_keywords(papers, &kw(&["wind"])).len(), 1);
    }

    #[test]
    fn test_keyword_match_ignores_case() {
        let papers = vec![paper("1", "", "HYDROGEN electrolysis at scale", None)];
        assert_eq!(filter_by_keywords(papers, &kw(&["Hydrogen"])).len(), 1);
    }

    #[test]
    fn test_keyword_matches_substring() {
        let papers = vec![paper("1", "", "Photovoltaics in deserts", None)];
        assert_eq!(filter_by_keywords(papers, &kw(&["photovoltaic"])).len(), 1);
    }

    #[test]
    fn test_multi_word_keyword() {
        let papers = vec![
            paper("1", "", "A solid oxide fuel cell stack", None),
            paper("2", "", "A fuel pump and a cell tower", None),
        ];
        let kept = filter_by_keywords(papers, &kw(&["fuel cell"]));
        assert_eq!(ids(&kept), vec!["1"]);
    }

    #[test]
    fn test_keyword_matched_over_joined_title_and_abstract() {
        let papers = vec![
            paper("1", "Thermal Sol", "ar storage in molten salt", None),
            paper("2", "Tandem solar", " cells on silicon", None),
            paper("3", "Tandem solar", "cells on silicon", None),
        ];
        assert_eq!(ids(&filter_by_keywords(papers.clone(), &kw(&["solar"]))), vec!["1", "2", "3"]);
        assert_eq!(ids(&filter_by_keywords(papers, &kw(&["solar cell"]))), vec!["2"]);
    }

    #[test]
    fn test_empty_keywords_match_nothing() {
        let papers = vec![paper("1", "Energy", "energy energy", None)];
        assert!(filter_by_keywords(papers.clone(), &[]).is_empty());
        assert!(filter_by_keywords(papers, &kw(&["", "  "])).is_empty());
    }

    #[test]
    fn test_keyword_filter_is_idempotent() {
        let papers = vec![
            paper("1", "", "battery", None),
            paper("2", "", "quantum", None),
            paper("3", "Solar", "", None),
        ];
        let keywords = kw(&["battery", "solar"]);
        let once = filter_by_keywords(papers, &keywords);
        let twice = filter_by_keywords(once.clone(), &keywords);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_filters_commute() {
        let papers = vec![
            paper("1", "", "battery", Some(now())),
            paper("2", "", "battery", Some(now() - Duration::days(20))),
            paper("3", "", "topology", Some(now())),
            paper("4", "Grid", "", Some(now() - Duration::days(3))),
            paper("5", "", "grid", None),
        ];
        let keywords = kw(&["battery", "grid"]);
        let cutoff = now() - Duration::days(7);

        let date_first = filter_by_keywords(filter_by_date(papers.clone(), cutoff), &keywords);
        let keywords_first = filter_by_date(filter_by_keywords(papers, &keywords), cutoff);

        assert_eq!(date_first, keywords_first);
        assert_eq!(ids(&date_first), vec!["1", "4"]);
    }

    #[test]
    fn test_default_keywords_are_energy_terms() {
        let keywords = default_keywords();
        assert_eq!(keywords.len(), 18);
        assert!(keywords.contains(&"fuel cell".to_string()));
        assert!(keywords.contains(&"battery".to_string()));
    }

    // ==================== Ordering and Dedup Tests ====================

    #[test]
    fn test_sort_by_newest_puts_undated_last() {
        let papers = vec![
            paper("undated", "", "", None),
            paper("old", "", "", Some(now() - Duration::days(5))),
            paper("new", "", "", Some(now())),
        ];
        assert_eq!(ids(&sort_by_newest(papers)), vec!["new", "old", "undated"]);
    }

    #[test]
    fn test_sort_by_newest_is_stable() {
        let papers = vec![
            paper("first", "", "", Some(now())),
            paper("second", "", "", Some(now())),
        ];
        assert_eq!(ids(&sort_by_newest(papers)), vec!["first", "second"]);
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let papers = vec![
            paper("1", "first copy", "", None),
            paper("2", "", "", None),
            paper("1", "second copy", "", None),
        ];
        let kept = dedupe_by_id(papers);
        assert_eq!(ids(&kept), vec!["1", "2"]);
        assert_eq!(kept[0].title, "first copy");
    }
}
