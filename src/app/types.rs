use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub u64);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A website registered for monitoring. Loaded from the sites file and never
/// mutated while a check is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredSite {
    pub id: SiteId,
    pub name: String,
    pub url: String,
    #[serde(default = "default_check_interval")]
    pub check_interval_minutes: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_check_interval() -> u32 {
    5
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Up,
    Slow,
    Down,
    Timeout,
}

impl Liveness {
    pub fn label(self) -> &'static str {
        match self {
            Liveness::Up => "up",
            Liveness::Slow => "slow",
            Liveness::Down => "down",
            Liveness::Timeout => "timeout",
        }
    }

    /// The page answered with a usable response, fast or not.
    pub fn is_reachable(self) -> bool {
        matches!(self, Liveness::Up | Liveness::Slow)
    }
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UptimeRecord {
    pub status_code: Option<u16>,
    pub response_time_seconds: f64,
    pub liveness: Liveness,
    pub error_message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingCounts {
    pub h1: usize,
    pub h2: usize,
    pub h3: usize,
    pub h4: usize,
    pub h5: usize,
    pub h6: usize,
}

impl HeadingCounts {
    pub fn as_array(&self) -> [usize; 6] {
        [self.h1, self.h2, self.h3, self.h4, self.h5, self.h6]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordDensity {
    pub keyword: String,
    pub percentage: f64,
}

/// Occurrences of an owner-supplied keyword in the page text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedKeyword {
    pub keyword: String,
    pub count: usize,
    pub density: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeoRecord {
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
    pub has_missing_meta_description: bool,
    pub has_missing_title: bool,
    pub has_missing_h1: bool,
    pub has_multiple_h1: bool,
    pub has_short_content: bool,
    pub top_keywords: Vec<KeywordCount>,
    pub keyword_density: Vec<KeywordDensity>,
    #[serde(default)]
    pub tracked_keywords: Vec<TrackedKeyword>,
    pub duplicate_percentage: f64,
    pub seo_friendliness_score: u8,
    pub content_quality_score: u8,
    pub google_terms_score: u8,
    pub seo_score: u8,
    pub google_terms_issues: Vec<String>,
    #[serde(default)]
    pub broken_links: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl SeoRecord {
    /// The all-zero record stored when a reachable page could not be analyzed.
    pub fn degraded(error: impl Into<String>, checked_at: DateTime<Utc>) -> Self {
        Self {
            title: None,
            meta_description: None,
            headings: HeadingCounts::default(),
            word_count: 0,
            internal_links: 0,
            external_links: 0,
            image_count: 0,
            images_missing_alt: 0,
            has_viewport_meta: false,
            has_favicon: false,
            has_missing_meta_description: true,
            has_missing_title: true,
            has_missing_h1: true,
            has_multiple_h1: false,
            has_short_content: true,
            top_keywords: Vec::new(),
            keyword_density: Vec::new(),
            tracked_keywords: Vec::new(),
            duplicate_percentage: 0.0,
            seo_friendliness_score: 0,
            content_quality_score: 0,
            google_terms_score: 0,
            seo_score: 0,
            google_terms_issues: Vec::new(),
            broken_links: 0,
            error: Some(error.into()),
            checked_at,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Uptime,
    Seo,
}

impl ReportKind {
    pub fn label(self) -> &'static str {
        match self {
            ReportKind::Uptime => "uptime",
            ReportKind::Seo => "seo",
        }
    }
}

pub type RecordId = u64;

/// A persisted record together with its store-assigned identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<T> {
    pub id: RecordId,
    pub site_id: SiteId,
    pub record: T,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReportEntry {
    Uptime(Stored<UptimeRecord>),
    Seo(Stored<SeoRecord>),
}

impl ReportEntry {
    pub fn id(&self) -> RecordId {
        match self {
            ReportEntry::Uptime(stored) => stored.id,
            ReportEntry::Seo(stored) => stored.id,
        }
    }

    pub fn checked_at(&self) -> DateTime<Utc> {
        match self {
            ReportEntry::Uptime(stored) => stored.record.checked_at,
            ReportEntry::Seo(stored) => stored.record.checked_at,
        }
    }
}

/// Outcome of a single `run_check` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckSummary {
    pub site_id: SiteId,
    pub site_name: String,
    pub url: String,
    pub liveness: Liveness,
    pub status_code: Option<u16>,
    pub response_time_seconds: f64,
    pub uptime_record_id: RecordId,
    pub seo_record_id: Option<RecordId>,
    pub seo_score: Option<u8>,
}

/// Rounds `value` to `decimals` places, half away from zero.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
