use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, info};

use super::check::{BatchReport, Monitor};
use super::config::MonitorConfig;
use super::data_io::{
    DataFormat, default_export_path, detect_data_format, export_history, load_sites_from_file,
};
use super::error::{ConfigError, RunError};
use super::fetch::HttpFetcher;
use super::logging::{LogFormat, init_logging};
use super::sites::StaticSiteRepository;
use super::store::{JsonlReportStore, MemoryReportStore, ReportStore};
use super::types::{MonitoredSite, ReportKind, SiteId};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "sitewatch",
    version,
    about = "Uptime and on-page SEO checks for a list of websites"
)]
pub struct Cli {
    /// Sites file (CSV or JSON).
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "SITEWATCH_SITES",
        default_value = "sites.csv"
    )]
    sites: PathBuf,

    /// Directory holding the uptime and SEO history.
    #[arg(
        long,
        global = true,
        value_name = "DIR",
        env = "SITEWATCH_DATA_DIR",
        default_value = "sitewatch-data"
    )]
    data_dir: PathBuf,

    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<f64>,

    #[arg(long, global = true, value_name = "UA")]
    user_agent: Option<String>,

    /// Skip TLS certificate verification.
    #[arg(long, global = true, default_value_t = false)]
    insecure: bool,

    #[arg(long, global = true, value_name = "SECS")]
    slow_threshold: Option<f64>,

    #[arg(long, global = true, value_name = "N")]
    concurrency: Option<usize>,

    /// Outbound links probed per check; 0 disables broken-link counting.
    #[arg(long, global = true, value_name = "N")]
    link_sample: Option<usize>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, Clone)]
enum Command {
    /// Check one site and record the results.
    Check {
        #[arg(value_name = "SITE_ID")]
        site_id: u64,
    },
    /// Check every active site.
    CheckAll,
    /// Show recorded results, newest first.
    History {
        #[arg(value_name = "SITE_ID")]
        site_id: u64,
        #[arg(long, value_enum, default_value_t = ReportKind::Uptime)]
        kind: ReportKind,
        #[arg(long, value_name = "N", default_value_t = 20)]
        limit: usize,
    },
    /// Show the most recent SEO record.
    LatestSeo {
        #[arg(value_name = "SITE_ID")]
        site_id: u64,
    },
    /// Write the full history of one kind to a file.
    Export {
        #[arg(value_name = "SITE_ID")]
        site_id: u64,
        #[arg(long, value_enum)]
        kind: ReportKind,
        #[arg(long, value_enum, default_value_t = DataFormat::Csv)]
        format: DataFormat,
        #[arg(short, long, value_name = "FILE")]
        output: Option<String>,
    },
    /// Fetch and score a URL without recording anything.
    Analyze {
        #[arg(value_name = "URL")]
        url: String,
        #[arg(long = "keyword", value_name = "KEYWORD")]
        keywords: Vec<String>,
    },
}

impl Cli {
    fn monitor_config(&self) -> Result<MonitorConfig, ConfigError> {
        let mut config = MonitorConfig::from_env();
        if let Some(secs) = self.timeout {
            config.fetch.timeout_secs = secs;
        }
        if let Some(ua) = &self.user_agent {
            config.fetch.user_agent = Some(ua.clone());
        }
        if self.insecure {
            config.fetch.accept_invalid_certs = true;
        }
        if let Some(secs) = self.slow_threshold {
            config.uptime.slow_after_secs = secs;
        }
        if let Some(n) = self.concurrency {
            config.max_concurrent_checks = n;
        }
        if let Some(n) = self.link_sample {
            config.broken_link_sample = n;
        }
        config.validate()?;
        Ok(config)
    }
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_logging(cli.log_format, "info") {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    match execute(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<ExitCode, RunError> {
    match &cli.command {
        Command::Check { site_id } => {
            let store = open_store(&cli.data_dir).await?;
            let monitor = build_monitor(&cli, load_sites(&cli.sites)?, store)?;
            let summary = monitor.run_check(SiteId(*site_id)).await?;
            print_json(&summary)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::CheckAll => {
            let store = open_store(&cli.data_dir).await?;
            let monitor = build_monitor(&cli, load_sites(&cli.sites)?, store)?;
            let report = monitor.run_all_active().await;
            print_json(&batch_json(&report))?;
            if report.failed() > 0 {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Command::History {
            site_id,
            kind,
            limit,
        } => {
            let store = open_store(&cli.data_dir).await?;
            let entries = store.recent(SiteId(*site_id), *kind, *limit).await?;
            print_json(&entries)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::LatestSeo { site_id } => {
            let store = open_store(&cli.data_dir).await?;
            match store.latest_seo(SiteId(*site_id)).await? {
                Some(latest) => {
                    print_json(&latest)?;
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    info!(site_id, "no seo record yet");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Export {
            site_id,
            kind,
            format,
            output,
        } => {
            let store = open_store(&cli.data_dir).await?;
            let site_id = SiteId(*site_id);
            let entries = store.recent(site_id, *kind, usize::MAX).await?;
            let format = output
                .as_deref()
                .map(|path| detect_data_format(path, *format))
                .unwrap_or(*format);
            let output = output
                .clone()
                .unwrap_or_else(|| default_export_path(site_id, *kind, format));
            export_history(Path::new(&output), format, *kind, &entries).map_err(|source| {
                RunError::Io {
                    context: format!("writing {output}"),
                    source,
                }
            })?;
            info!(
                site_id = %site_id,
                entries = entries.len(),
                output = %output,
                "history exported"
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Analyze { url, keywords } => {
            let monitor = build_monitor(&cli, Vec::new(), Arc::new(MemoryReportStore::new()))?;
            let assessment = monitor.analyze_url(url, keywords).await;
            print_json(&assessment)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_sites(path: &Path) -> Result<Vec<MonitoredSite>, ConfigError> {
    let path = path.to_string_lossy();
    let sites = load_sites_from_file(&path)?;
    info!(path = %path, sites = sites.len(), "loaded sites");
    Ok(sites)
}

async fn open_store(dir: &Path) -> Result<Arc<dyn ReportStore>, RunError> {
    Ok(Arc::new(JsonlReportStore::open(dir).await?))
}

fn build_monitor(
    cli: &Cli,
    sites: Vec<MonitoredSite>,
    store: Arc<dyn ReportStore>,
) -> Result<Monitor, RunError> {
    let config = cli.monitor_config()?;
    let fetcher = HttpFetcher::new(&config.fetch)?;
    Ok(Monitor::new(
        Arc::new(StaticSiteRepository::new(sites)),
        store,
        Arc::new(fetcher),
        config,
    ))
}

fn batch_json(report: &BatchReport) -> Value {
    let results = report
        .results
        .iter()
        .map(|(site_id, result)| match result {
            Ok(summary) => json!({ "site_id": site_id, "ok": true, "summary": summary }),
            Err(err) => json!({ "site_id": site_id, "ok": false, "error": err.to_string() }),
        })
        .collect::<Vec<_>>();
    json!({
        "succeeded": report.succeeded(),
        "failed": report.failed(),
        "aborted": report.aborted,
        "results": results,
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), RunError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)
        .map_err(io::Error::other)
        .and_then(|()| writeln!(out))
        .map_err(|source| RunError::Io {
            context: "writing to stdout".to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "sitewatch",
            "--timeout",
            "3.5",
            "--slow-threshold",
            "1",
            "--link-sample",
            "0",
            "check",
            "7",
        ])
        .unwrap();
        let config = cli.monitor_config().unwrap();
        assert_eq!(config.fetch.timeout_secs, 3.5);
        assert_eq!(config.uptime.slow_after_secs, 1.0);
        assert_eq!(config.broken_link_sample, 0);
        assert!(matches!(cli.command, Command::Check { site_id: 7 }));
    }

    #[test]
    fn invalid_flags_fail_validation() {
        let cli = Cli::try_parse_from(["sitewatch", "--timeout", "0", "check-all"]).unwrap();
        assert!(cli.monitor_config().is_err());
    }

    #[test]
    fn analyze_collects_keywords() {
        let cli = Cli::try_parse_from([
            "sitewatch",
            "analyze",
            "https://example.com",
            "--keyword",
            "rust",
            "--keyword",
            "uptime",
        ])
        .unwrap();
        match cli.command {
            Command::Analyze { url, keywords } => {
                assert_eq!(url, "https://example.com");
                assert_eq!(keywords, vec!["rust", "uptime"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn batch_json_reports_errors_inline() {
        let mut report = BatchReport::default();
        report.results.push((
            SiteId(4),
            Err(crate::app::error::CheckError::SiteInactive(SiteId(4))),
        ));
        let value = batch_json(&report);
        assert_eq!(value["failed"], 1);
        assert_eq!(value["results"][0]["ok"], false);
        assert_eq!(value["results"][0]["error"], "site 4 is inactive");
    }
}
