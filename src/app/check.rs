//! The check pipeline: fetch, classify, analyze, persist.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::config::MonitorConfig;
use super::error::{AnalysisError, CheckError};
use super::fetch::{FetchOutcome, Fetcher};
use super::html::ParsedPage;
use super::seo;
use super::sites::SiteRepository;
use super::store::ReportStore;
use super::types::{CheckSummary, Liveness, SeoRecord, SiteId, UptimeRecord};
use super::uptime::uptime_record;

/// Records produced by one fetch of one URL, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub uptime: UptimeRecord,
    pub seo: Option<SeoRecord>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<(SiteId, Result<CheckSummary, CheckError>)>,
    /// Checks whose task died before reporting back.
    pub aborted: usize,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_err()).count() + self.aborted
    }

    pub fn count_liveness(&self, liveness: Liveness) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| matches!(r, Ok(summary) if summary.liveness == liveness))
            .count()
    }
}

#[derive(Clone)]
pub struct Monitor {
    sites: Arc<dyn SiteRepository>,
    store: Arc<dyn ReportStore>,
    fetcher: Arc<dyn Fetcher>,
    config: Arc<MonitorConfig>,
}

impl Monitor {
    pub fn new(
        sites: Arc<dyn SiteRepository>,
        store: Arc<dyn ReportStore>,
        fetcher: Arc<dyn Fetcher>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            sites,
            store,
            fetcher,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ReportStore> {
        &self.store
    }

    /// Checks one site and appends its records. Nothing is written for a
    /// missing or inactive site.
    pub async fn run_check(&self, site_id: SiteId) -> Result<CheckSummary, CheckError> {
        let site = self.sites.get_active(site_id).await?;
        debug!(site_id = %site.id, url = %site.url, "checking site");

        let Assessment { uptime, seo } = self.assess(&site.url, &site.keywords).await;
        let liveness = uptime.liveness;
        let status_code = uptime.status_code;
        let response_time_seconds = uptime.response_time_seconds;

        let uptime_record_id = self.store.record_uptime(site.id, uptime).await?;
        let (seo_record_id, seo_score) = match seo {
            Some(record) => {
                let score = record.seo_score;
                (Some(self.store.record_seo(site.id, record).await?), Some(score))
            }
            None => (None, None),
        };

        info!(
            site_id = %site.id,
            site = %site.name,
            liveness = %liveness,
            status = ?status_code,
            response_time = response_time_seconds,
            seo_score = ?seo_score,
            "check finished"
        );

        Ok(CheckSummary {
            site_id: site.id,
            site_name: site.name,
            url: site.url,
            liveness,
            status_code,
            response_time_seconds,
            uptime_record_id,
            seo_record_id,
            seo_score,
        })
    }

    /// Checks every active site. A failing site never stops the others.
    pub async fn run_all_active(&self) -> BatchReport {
        let sites = self.sites.list_active().await;
        info!(sites = sites.len(), "starting batch check");

        let limit = Arc::new(Semaphore::new(self.config.max_concurrent_checks.max(1)));
        let mut checks = JoinSet::new();
        for site in sites {
            let monitor = self.clone();
            let limit = Arc::clone(&limit);
            checks.spawn(async move {
                let _permit = limit.acquire_owned().await.ok();
                (site.id, monitor.run_check(site.id).await)
            });
        }

        let mut report = BatchReport::default();
        while let Some(joined) = checks.join_next().await {
            match joined {
                Ok((site_id, result)) => {
                    if let Err(err) = &result {
                        warn!(site_id = %site_id, error = %err, "check failed");
                    }
                    report.results.push((site_id, result));
                }
                Err(err) => {
                    error!(error = %err, "check task aborted");
                    report.aborted += 1;
                }
            }
        }
        report.results.sort_by_key(|(site_id, _)| *site_id);

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "batch check finished"
        );
        report
    }

    /// Fetches and scores a URL without touching the store.
    pub async fn analyze_url(&self, url: &str, keywords: &[String]) -> Assessment {
        self.assess(url, keywords).await
    }

    async fn assess(&self, url: &str, keywords: &[String]) -> Assessment {
        let checked_at = Utc::now();
        let outcome = self.fetcher.fetch(url).await;
        let uptime = uptime_record(&outcome, &self.config.uptime, checked_at);

        let seo = match &outcome {
            FetchOutcome::Success {
                status_code, body, ..
            } if uptime.liveness.is_reachable() && (200..=299).contains(status_code) => {
                Some(self.score_page(url, body, keywords, checked_at).await)
            }
            _ => None,
        };

        Assessment { uptime, seo }
    }

    async fn score_page(
        &self,
        url: &str,
        body: &[u8],
        keywords: &[String],
        checked_at: DateTime<Utc>,
    ) -> SeoRecord {
        let sample = self.config.broken_link_sample;
        let (mut record, links) = match analyze_document(url, body, keywords, checked_at, sample) {
            Ok(analyzed) => analyzed,
            Err(err) => {
                warn!(url, error = %err, "seo analysis degraded");
                return SeoRecord::degraded(err.to_string(), checked_at);
            }
        };
        if !links.is_empty() {
            record.broken_links = self.count_broken_links(links).await;
        }
        record
    }

    async fn count_broken_links(&self, links: Vec<String>) -> usize {
        let mut probes = JoinSet::new();
        for link in links {
            let fetcher = Arc::clone(&self.fetcher);
            probes.spawn(async move { fetcher.fetch(&link).await });
        }

        let mut broken = 0;
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok(FetchOutcome::Success { status_code, .. }) if status_code < 400 => {}
                _ => broken += 1,
            }
        }
        broken
    }
}

/// Parses and scores a body. The parsed tree never outlives this call, so
/// callers can hold the result across awaits.
fn analyze_document(
    url: &str,
    body: &[u8],
    keywords: &[String],
    checked_at: DateTime<Utc>,
    link_sample: usize,
) -> Result<(SeoRecord, Vec<String>), AnalysisError> {
    let page = ParsedPage::parse(body)?;
    let record = seo::analyze(&page, url, keywords, checked_at);
    let links = seo::sample_outbound_links(&page, link_sample);
    Ok((record, links))
}
