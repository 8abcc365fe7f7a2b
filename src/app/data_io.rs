use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;
use clap::ValueEnum;
use url::Url;

use super::error::ConfigError;
use super::types::{MonitoredSite, ReportEntry, ReportKind, SeoRecord, SiteId, Stored, UptimeRecord};

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum DataFormat {
    Csv,
    Json,
}

pub fn detect_data_format(path: &str, fallback: DataFormat) -> DataFormat {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".json") {
        DataFormat::Json
    } else if lower.ends_with(".csv") {
        DataFormat::Csv
    } else {
        fallback
    }
}

pub fn load_sites_from_file(path: &str) -> Result<Vec<MonitoredSite>, ConfigError> {
    let sites = match detect_data_format(path, DataFormat::Csv) {
        DataFormat::Csv => load_sites_from_csv(path)?,
        DataFormat::Json => load_sites_from_json(path)?,
    };

    for site in &sites {
        validate_site_url(site).map_err(|message| ConfigError::SitesFormat {
            path: path.to_string(),
            message,
        })?;
    }
    Ok(sites)
}

fn validate_site_url(site: &MonitoredSite) -> Result<(), String> {
    let url = Url::parse(site.url.trim())
        .map_err(|err| format!("site {}: invalid url {:?}: {err}", site.id, site.url))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("site {}: unsupported scheme {other:?}", site.id)),
    }
}

fn sites_io(path: &str) -> impl FnOnce(io::Error) -> ConfigError + '_ {
    move |source| ConfigError::SitesIo {
        path: path.to_string(),
        source,
    }
}

fn sites_format(path: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::SitesFormat {
        path: path.to_string(),
        message: message.into(),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => None,
        "1" | "true" | "yes" | "y" | "active" => Some(true),
        "0" | "false" | "no" | "n" | "inactive" => Some(false),
        _ => None,
    }
}

fn load_sites_from_csv(path: &str) -> Result<Vec<MonitoredSite>, ConfigError> {
    let mut reader =
        csv::Reader::from_path(path).map_err(|err| sites_format(path, err.to_string()))?;
    let headers = reader
        .headers()
        .map_err(|err| sites_format(path, err.to_string()))?
        .clone();
    let mut index = HashMap::<String, usize>::new();
    for (idx, header) in headers.iter().enumerate() {
        index.insert(header.trim().to_ascii_lowercase(), idx);
    }

    let mut sites = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|err| sites_format(path, err.to_string()))?;
        let get = |names: &[&str]| -> String {
            for name in names {
                if let Some(idx) = index.get(*name)
                    && let Some(value) = record.get(*idx)
                {
                    return value.trim().to_string();
                }
            }
            String::new()
        };

        let url = get(&["url"]);
        if url.is_empty() {
            continue;
        }
        let id = get(&["id", "site_id"])
            .parse::<u64>()
            .map_err(|_| sites_format(path, format!("row {}: missing or invalid id", row + 1)))?;
        let name = get(&["name"]);

        sites.push(MonitoredSite {
            id: SiteId(id),
            name: if name.is_empty() { url.clone() } else { name },
            url,
            check_interval_minutes: get(&["check_interval_minutes", "check_interval", "interval"])
                .parse::<u32>()
                .unwrap_or(5),
            is_active: parse_flag(&get(&["is_active", "active"])).unwrap_or(true),
            keywords: get(&["keywords"])
                .split('|')
                .map(str::trim)
                .filter(|kw| !kw.is_empty())
                .map(ToString::to_string)
                .collect(),
        });
    }

    Ok(sites)
}

fn load_sites_from_json(path: &str) -> Result<Vec<MonitoredSite>, ConfigError> {
    let content = fs::read_to_string(path).map_err(sites_io(path))?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str::<Vec<MonitoredSite>>(&content)
        .map_err(|err| sites_format(path, err.to_string()))
}

fn quality_bucket(seo_score: u8) -> &'static str {
    match seo_score {
        85..=100 => "excellent",
        70..=84 => "good",
        50..=69 => "warning",
        _ => "critical",
    }
}

const UPTIME_HEADERS: [&str; 7] = [
    "id",
    "site_id",
    "checked_at",
    "liveness",
    "status_code",
    "response_time_seconds",
    "error_message",
];

const SEO_HEADERS: [&str; 31] = [
    "id",
    "site_id",
    "checked_at",
    "seo_score",
    "quality_bucket",
    "seo_friendliness_score",
    "content_quality_score",
    "google_terms_score",
    "title",
    "meta_description",
    "word_count",
    "h1_count",
    "h2_count",
    "h3_count",
    "h4_count",
    "h5_count",
    "h6_count",
    "internal_links",
    "external_links",
    "image_count",
    "images_missing_alt",
    "has_viewport_meta",
    "has_favicon",
    "duplicate_percentage",
    "broken_links",
    "top_keywords",
    "keyword_density",
    "tracked_keywords",
    "issue_count",
    "google_terms_issues",
    "error",
];

fn uptime_csv_row(stored: &Stored<UptimeRecord>) -> Vec<String> {
    let record = &stored.record;
    vec![
        stored.id.to_string(),
        stored.site_id.to_string(),
        record.checked_at.to_rfc3339(),
        record.liveness.label().to_string(),
        record
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_default(),
        format!("{:.2}", record.response_time_seconds),
        record.error_message.clone().unwrap_or_default(),
    ]
}

fn seo_csv_row(stored: &Stored<SeoRecord>) -> Vec<String> {
    let record = &stored.record;
    let [h1, h2, h3, h4, h5, h6] = record.headings.as_array();
    vec![
        stored.id.to_string(),
        stored.site_id.to_string(),
        record.checked_at.to_rfc3339(),
        record.seo_score.to_string(),
        quality_bucket(record.seo_score).to_string(),
        record.seo_friendliness_score.to_string(),
        record.content_quality_score.to_string(),
        record.google_terms_score.to_string(),
        record.title.clone().unwrap_or_default(),
        record.meta_description.clone().unwrap_or_default(),
        record.word_count.to_string(),
        h1.to_string(),
        h2.to_string(),
        h3.to_string(),
        h4.to_string(),
        h5.to_string(),
        h6.to_string(),
        record.internal_links.to_string(),
        record.external_links.to_string(),
        record.image_count.to_string(),
        record.images_missing_alt.to_string(),
        record.has_viewport_meta.to_string(),
        record.has_favicon.to_string(),
        format!("{:.1}", record.duplicate_percentage),
        record.broken_links.to_string(),
        record
            .top_keywords
            .iter()
            .map(|kw| format!("{}:{}", kw.keyword, kw.count))
            .collect::<Vec<_>>()
            .join("|"),
        record
            .keyword_density
            .iter()
            .map(|kw| format!("{}:{:.2}", kw.keyword, kw.percentage))
            .collect::<Vec<_>>()
            .join("|"),
        record
            .tracked_keywords
            .iter()
            .map(|kw| format!("{}:{}", kw.keyword, kw.count))
            .collect::<Vec<_>>()
            .join("|"),
        record.google_terms_issues.len().to_string(),
        record.google_terms_issues.join("|"),
        record.error.clone().unwrap_or_default(),
    ]
}

/// Writes history entries of a single kind as CSV.
pub fn write_history_csv<W: Write>(
    writer: W,
    kind: ReportKind,
    entries: &[ReportEntry],
) -> io::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    match kind {
        ReportKind::Uptime => writer.write_record(UPTIME_HEADERS)?,
        ReportKind::Seo => writer.write_record(SEO_HEADERS)?,
    }
    for entry in entries {
        match (kind, entry) {
            (ReportKind::Uptime, ReportEntry::Uptime(stored)) => {
                writer.write_record(uptime_csv_row(stored))?
            }
            (ReportKind::Seo, ReportEntry::Seo(stored)) => {
                writer.write_record(seo_csv_row(stored))?
            }
            _ => {}
        }
    }
    writer.flush()
}

pub fn write_history_json<W: Write>(mut writer: W, entries: &[ReportEntry]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, entries).map_err(io::Error::other)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

pub fn export_history(
    output_path: &Path,
    format: DataFormat,
    kind: ReportKind,
    entries: &[ReportEntry],
) -> io::Result<()> {
    let file = File::create(output_path)?;
    match format {
        DataFormat::Csv => write_history_csv(file, kind, entries),
        DataFormat::Json => write_history_json(file, entries),
    }
}

pub fn default_export_path(site: SiteId, kind: ReportKind, format: DataFormat) -> String {
    let ts = Utc::now().format("%Y%m%d_%H%M%S");
    match format {
        DataFormat::Csv => format!("site{site}_{}_{ts}.csv", kind.label()),
        DataFormat::Json => format!("site{site}_{}_{ts}.json", kind.label()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use chrono::Utc;

    use super::*;
    use crate::app::types::Liveness;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_sites_from_csv_with_aliases() {
        let file = write_temp(
            ".csv",
            "id,name,url,interval,active,keywords\n\
             1,Docs,https://docs.example.com,10,yes,uptime|status\n\
             2,,https://shop.example.com,,false,\n\
             3,Blank,,,,\n",
        );
        let sites = load_sites_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].id, SiteId(1));
        assert_eq!(sites[0].check_interval_minutes, 10);
        assert_eq!(sites[0].keywords, vec!["uptime", "status"]);
        assert!(sites[0].is_active);
        assert_eq!(sites[1].name, "https://shop.example.com");
        assert_eq!(sites[1].check_interval_minutes, 5);
        assert!(!sites[1].is_active);
    }

    #[test]
    fn loads_sites_from_json() {
        let file = write_temp(
            ".json",
            r#"[{"id": 4, "name": "Blog", "url": "https://blog.example.com", "is_active": false}]"#,
        );
        let sites = load_sites_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(sites.len(), 1);
        assert!(!sites[0].is_active);
    }

    #[test]
    fn rejects_bad_site_urls() {
        let file = write_temp(".csv", "id,url\n1,ftp://files.example.com\n");
        let err = load_sites_from_file(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));

        let file = write_temp(".csv", "id,url\nabc,https://x.example\n");
        assert!(load_sites_from_file(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn missing_sites_file_is_an_error() {
        assert!(load_sites_from_file("/definitely/not/here.json").is_err());
        assert!(load_sites_from_file("/definitely/not/here.csv").is_err());
    }

    #[test]
    fn uptime_history_csv() {
        let entries = vec![ReportEntry::Uptime(Stored {
            id: 7,
            site_id: SiteId(2),
            record: UptimeRecord {
                status_code: None,
                response_time_seconds: 10.0,
                liveness: Liveness::Timeout,
                error_message: Some("request timed out after 10.00s".to_string()),
                checked_at: Utc::now(),
            },
        })];
        let mut out = Vec::new();
        write_history_csv(&mut out, ReportKind::Uptime, &entries).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(UPTIME_HEADERS.join(",").as_str()));
        let row = lines.next().unwrap();
        assert!(row.starts_with("7,2,"));
        assert!(row.contains(",timeout,,10.00,request timed out after 10.00s"));
    }

    #[test]
    fn seo_history_csv_has_one_column_per_header() {
        let mut record = SeoRecord::degraded("boom", Utc::now());
        record.seo_score = 72;
        let entries = vec![ReportEntry::Seo(Stored {
            id: 1,
            site_id: SiteId(1),
            record,
        })];
        let mut out = Vec::new();
        write_history_csv(&mut out, ReportKind::Seo, &entries).unwrap();

        let mut reader = csv::Reader::from_reader(out.as_slice());
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(row.len(), SEO_HEADERS.len());
        assert_eq!(&row[4], "good");
        assert_eq!(&row[30], "boom");
    }

    #[test]
    fn json_history_is_an_array() {
        let mut out = Vec::new();
        write_history_json(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim(), "[]");
    }

    #[test]
    fn format_detection_and_buckets() {
        assert_eq!(detect_data_format("a.JSON", DataFormat::Csv), DataFormat::Json);
        assert_eq!(detect_data_format("a.txt", DataFormat::Csv), DataFormat::Csv);
        assert_eq!(quality_bucket(100), "excellent");
        assert_eq!(quality_bucket(49), "critical");
        assert!(
            default_export_path(SiteId(3), ReportKind::Seo, DataFormat::Json).ends_with(".json")
        );
    }
}
