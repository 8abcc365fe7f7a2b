//! Structural extraction and scoring of a fetched page.

pub mod rules;
pub mod scoring;

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use url::Url;

use super::html::ParsedPage;
use super::types::{
    HeadingCounts, KeywordCount, KeywordDensity, SeoRecord, TrackedKeyword, round_to,
};
use rules::{
    MAX_IGNORED_KEYWORD_CHARS, MAX_TITLE_CHARS, MIN_SENTENCE_CHARS, SENTENCE_TERMINATORS,
    SHORT_CONTENT_WORDS, TOP_KEYWORD_LIMIT, is_stop_word,
};

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

/// Everything the scores are computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFacts {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub headings: HeadingCounts,
    pub word_count: usize,
    pub internal_links: usize,
    pub external_links: usize,
    pub image_count: usize,
    pub images_missing_alt: usize,
    pub has_viewport_meta: bool,
    pub has_favicon: bool,
    pub duplicate_percentage: f64,
    pub top_keywords: Vec<KeywordCount>,
}

impl PageFacts {
    pub fn extract(page: &ParsedPage, target_url: &str) -> Self {
        let text = page.visible_text();
        let (internal_links, external_links) = link_breakdown(page, target_url);
        let (image_count, images_missing_alt) = image_alt_stats(page);

        Self {
            title: extract_title(page),
            meta_description: extract_meta_description(page),
            headings: heading_counts(page),
            word_count: count_words(&text),
            internal_links,
            external_links,
            image_count,
            images_missing_alt,
            has_viewport_meta: page.exists(r#"meta[name="viewport"]"#),
            has_favicon: page.exists(r#"link[rel~="icon"]"#),
            duplicate_percentage: duplicate_percentage(&text),
            top_keywords: top_keywords(&text),
        }
    }
}

/// Extracts, scores and assembles the SEO snapshot for a parsed page.
pub fn analyze(
    page: &ParsedPage,
    target_url: &str,
    tracked: &[String],
    checked_at: DateTime<Utc>,
) -> SeoRecord {
    let facts = PageFacts::extract(page, target_url);
    let scores = scoring::score(&facts);
    let text = page.visible_text();

    SeoRecord {
        has_missing_meta_description: facts.meta_description.is_none(),
        has_missing_title: facts.title.is_none(),
        has_missing_h1: facts.headings.h1 == 0,
        has_multiple_h1: facts.headings.h1 > 1,
        has_short_content: facts.word_count < SHORT_CONTENT_WORDS,
        keyword_density: keyword_density(&facts.top_keywords, facts.word_count),
        tracked_keywords: tracked_keywords(&text, tracked, facts.word_count),
        title: facts.title,
        meta_description: facts.meta_description,
        headings: facts.headings,
        word_count: facts.word_count,
        internal_links: facts.internal_links,
        external_links: facts.external_links,
        image_count: facts.image_count,
        images_missing_alt: facts.images_missing_alt,
        has_viewport_meta: facts.has_viewport_meta,
        has_favicon: facts.has_favicon,
        top_keywords: facts.top_keywords,
        duplicate_percentage: facts.duplicate_percentage,
        seo_friendliness_score: scores.seo_friendliness,
        content_quality_score: scores.content_quality,
        google_terms_score: scores.google_terms,
        seo_score: scores.overall,
        google_terms_issues: scores.google_terms_issues,
        broken_links: 0,
        error: None,
        checked_at,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn extract_title(page: &ParsedPage) -> Option<String> {
    non_empty(page.first_text("title"))
        .map(|title| title.chars().take(MAX_TITLE_CHARS).collect())
}

fn extract_meta_description(page: &ParsedPage) -> Option<String> {
    non_empty(page.first_attr(r#"meta[name="description"]"#, "content"))
}

fn heading_counts(page: &ParsedPage) -> HeadingCounts {
    HeadingCounts {
        h1: page.count("h1"),
        h2: page.count("h2"),
        h3: page.count("h3"),
        h4: page.count("h4"),
        h5: page.count("h5"),
        h6: page.count("h6"),
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Links whose host is missing or equal to the target host are internal.
fn link_breakdown(page: &ParsedPage, target_url: &str) -> (usize, usize) {
    let base = Url::parse(target_url).ok();
    let target_host = base
        .as_ref()
        .and_then(|u| u.host_str())
        .map(str::to_ascii_lowercase);

    let mut internal = 0usize;
    let mut external = 0usize;
    for el in page.select("a[href]") {
        let href = el.value().attr("href").unwrap_or_default().trim();
        match link_host(href, base.as_ref()) {
            Some(host) if Some(&host) != target_host.as_ref() => external += 1,
            _ => internal += 1,
        }
    }
    (internal, external)
}

fn link_host(href: &str, base: Option<&Url>) -> Option<String> {
    let resolved = match Url::parse(href) {
        Ok(url) => url,
        Err(_) => base?.join(href).ok()?,
    };
    resolved
        .host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_ascii_lowercase)
}

fn image_alt_stats(page: &ParsedPage) -> (usize, usize) {
    let images = page.select("img");
    let missing_alt = images
        .iter()
        .filter(|el| el.value().attr("alt").is_none_or(str::is_empty))
        .count();
    (images.len(), missing_alt)
}

/// Lower-cased keyword candidates; a different split than `count_words`.
fn keyword_tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|word| word.chars().count() > MAX_IGNORED_KEYWORD_CHARS && !is_stop_word(word))
}

/// Most frequent keywords, ties kept in first-seen order.
pub fn top_keywords(text: &str) -> Vec<KeywordCount> {
    let mut order: Vec<KeywordCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for word in keyword_tokens(text) {
        match index.get(&word) {
            Some(&i) => order[i].count += 1,
            None => {
                index.insert(word.clone(), order.len());
                order.push(KeywordCount {
                    keyword: word,
                    count: 1,
                });
            }
        }
    }
    // Stable sort keeps first-seen order among equal counts.
    order.sort_by(|a, b| b.count.cmp(&a.count));
    order.truncate(TOP_KEYWORD_LIMIT);
    order
}

pub fn keyword_density(keywords: &[KeywordCount], word_count: usize) -> Vec<KeywordDensity> {
    keywords
        .iter()
        .map(|kw| KeywordDensity {
            keyword: kw.keyword.clone(),
            percentage: if word_count == 0 {
                0.0
            } else {
                round_to(100.0 * kw.count as f64 / word_count as f64, 2)
            },
        })
        .collect()
}

pub fn duplicate_percentage(text: &str) -> f64 {
    let sentences = text
        .split(SENTENCE_TERMINATORS)
        .map(|s| s.trim().to_lowercase())
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .collect::<Vec<_>>();
    if sentences.is_empty() {
        return 0.0;
    }
    let unique = sentences.iter().collect::<HashSet<_>>().len();
    round_to(100.0 * (1.0 - unique as f64 / sentences.len() as f64), 1)
}

/// Substring occurrences of each owner keyword in the lower-cased text.
fn tracked_keywords(text: &str, tracked: &[String], word_count: usize) -> Vec<TrackedKeyword> {
    let lower = text.to_lowercase();
    tracked
        .iter()
        .filter_map(|keyword| {
            let needle = keyword.trim().to_lowercase();
            if needle.is_empty() {
                return None;
            }
            let count = lower.matches(needle.as_str()).count();
            Some(TrackedKeyword {
                keyword: keyword.trim().to_string(),
                count,
                density: round_to(100.0 * count as f64 / word_count.max(1) as f64, 2),
            })
        })
        .collect()
}

/// The first `limit` anchors, keeping those that point at an absolute http(s) URL.
pub fn sample_outbound_links(page: &ParsedPage, limit: usize) -> Vec<String> {
    page.select("a[href]")
        .into_iter()
        .take(limit)
        .filter_map(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|href| href.starts_with("http://") || href.starts_with("https://"))
        .map(ToString::to_string)
        .collect()
}
