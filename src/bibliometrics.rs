//! Bibliometric analysis of Scopus search results.
//!
//! Flattens raw Scopus entries into [`Record`] rows and computes the
//! descriptive statistics shown by the dashboard: overview metrics,
//! publications per year, top authors, top journals and frequent title terms.

use crate::error::{BiblioError, Result};
use crate::scopus::SearchResult;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Authors/journals listed in the rankings
pub const TOP_N: usize = 15;

/// Title terms listed in the rankings
pub const TOP_TERMS: usize = 20;

/// Words ignored when counting title terms
pub const STOPWORDS: &[&str] = &[
    "a", "as", "o", "os", "de", "da", "das", "do", "dos", "e", "em", "no", "na", "nos", "nas",
    "um", "uma", "para", "por", "com", "the", "and", "for", "in", "on", "of", "to",
];

/// One normalized Scopus document.
///
/// Column names match the dashboard's CSV/XLSX exports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    pub titulo: String,
    pub autor: String,
    pub data: String,
    pub periodico: String,
    pub tipo: String,
    pub citacoes: i64,
    pub doi: String,
    pub url_scopus: String,
    pub ano: Option<i32>,
}

/// CSV/XLSX column order
pub const RECORD_COLUMNS: &[&str] = &[
    "titulo", "autor", "data", "periodico", "tipo", "citacoes", "doi", "url_scopus", "ano",
];

/// Headline metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Overview {
    pub documents: usize,
    pub total_citations: i64,
    pub mean_citations: f64,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub publications: usize,
}

/// A label with its number of occurrences
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranked {
    pub label: String,
    pub count: usize,
}

/// Everything the dashboard renders for one search
#[derive(Debug, Clone, Default, Serialize)]
pub struct BibliometricReport {
    /// Hits reported by Scopus (may exceed `records.len()`)
    pub total_results: usize,
    pub overview: Overview,
    pub by_year: Vec<YearCount>,
    pub top_authors: Vec<Ranked>,
    pub top_journals: Vec<Ranked>,
    pub top_terms: Vec<Ranked>,
    pub records: Vec<Record>,
}

/// String value of a field, stringifying numbers
fn text_field(entry: &Value, key: &str) -> String {
    match entry.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Citation count; anything unparseable counts as zero
fn citation_field(entry: &Value) -> i64 {
    match entry.get("citedby-count") {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Year of a `YYYY-MM-DD` (or bare `YYYY`) cover date
pub fn parse_year(date: &str) -> Option<i32> {
    let date = date.trim();
    if let Ok(d) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Some(d.year());
    }
    if date.len() == 4 && date.chars().all(|c| c.is_ascii_digit()) {
        return date.parse().ok();
    }
    None
}

/// Flatten raw Scopus entries into records
pub fn normalize_entries(entries: &[Value]) -> Vec<Record> {
    entries
        .iter()
        .map(|entry| {
            let data = text_field(entry, "prism:coverDate");
            Record {
                titulo: text_field(entry, "dc:title"),
                autor: text_field(entry, "dc:creator"),
                ano: parse_year(&data),
                data,
                periodico: text_field(entry, "prism:publicationName"),
                tipo: text_field(entry, "subtypeDescription"),
                citacoes: citation_field(entry),
                doi: text_field(entry, "prism:doi"),
                url_scopus: text_field(entry, "prism:url"),
            }
        })
        .collect()
}

/// Headline metrics over all records
pub fn overview(records: &[Record]) -> Overview {
    let documents = records.len();
    let total_citations: i64 = records.iter().map(|r| r.citacoes).sum();
    let mean_citations = if documents == 0 {
        0.0
    } else {
        total_citations as f64 / documents as f64
    };
    let years = records.iter().filter_map(|r| r.ano);

    Overview {
        documents,
        total_citations,
        mean_citations,
        first_year: years.clone().min(),
        last_year: years.max(),
    }
}

/// Publications per year, ascending
pub fn publications_by_year(records: &[Record]) -> Vec<YearCount> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for year in records.iter().filter_map(|r| r.ano) {
        *counts.entry(year).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(year, publications)| YearCount { year, publications })
        .collect()
}

/// Most frequent labels, descending; ties keep first-seen order
fn most_common<'a, I>(labels: I, top_n: usize) -> Vec<Ranked>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        let count = counts.entry(label).or_insert(0);
        if *count == 0 {
            order.push(label);
        }
        *count += 1;
    }

    let mut ranked: Vec<Ranked> = order
        .into_iter()
        .map(|label| Ranked {
            label: label.to_string(),
            count: counts.get(label).copied().unwrap_or(0),
        })
        .collect();
    // Stable sort keeps insertion order among equal counts
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(top_n);
    ranked
}

/// Most frequent non-empty authors
pub fn top_authors(records: &[Record], top_n: usize) -> Vec<Ranked> {
    most_common(
        records.iter().map(|r| r.autor.as_str()).filter(|a| !a.is_empty()),
        top_n,
    )
}

/// Most frequent non-empty journals
pub fn top_journals(records: &[Record], top_n: usize) -> Vec<Ranked> {
    most_common(
        records.iter().map(|r| r.periodico.as_str()).filter(|p| !p.is_empty()),
        top_n,
    )
}

/// Most frequent words of three or more letters in the titles, minus stopwords
pub fn top_terms(records: &[Record], top_n: usize) -> Result<Vec<Ranked>> {
    let word_regex =
        Regex::new(r"[A-Za-zÀ-ÖØ-öø-ÿ]{3,}").map_err(|e| BiblioError::Parse(e.to_string()))?;
    let stopwords: HashSet<&str> = STOPWORDS.iter().copied().collect();

    let lowered: Vec<String> = records.iter().map(|r| r.titulo.to_lowercase()).collect();
    let tokens = lowered
        .iter()
        .flat_map(|title| word_regex.find_iter(title).map(|m| m.as_str()))
        .filter(|token| !stopwords.contains(token));

    Ok(most_common(tokens, top_n))
}

/// Full dashboard report for a search result
pub fn analyze(result: &SearchResult) -> Result<BibliometricReport> {
    let records = normalize_entries(&result.entries);
    Ok(BibliometricReport {
        total_results: result.total_results,
        overview: overview(&records),
        by_year: publications_by_year(&records),
        top_authors: top_authors(&records, TOP_N),
        top_journals: top_journals(&records, TOP_N),
        top_terms: top_terms(&records, TOP_TERMS)?,
        records,
    })
}
