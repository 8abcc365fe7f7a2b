pub mod check;
pub mod config;
pub mod data_io;
pub mod error;
pub mod fetch;
pub mod html;
pub mod logging;
pub mod runtime;
pub mod seo;
pub mod sites;
pub mod store;
pub mod types;
pub mod uptime;

pub use check::{Assessment, BatchReport, Monitor};
pub use config::{FetchConfig, MonitorConfig, UptimeThresholds};
pub use error::{AnalysisError, CheckError, ConfigError, StoreError};
pub use fetch::{FetchOutcome, Fetcher, HttpFetcher};
pub use sites::{SiteRepository, StaticSiteRepository};
pub use store::{JsonlReportStore, MemoryReportStore, ReportStore};
pub use types::{
    CheckSummary, Liveness, MonitoredSite, ReportEntry, ReportKind, SeoRecord, SiteId, Stored,
    UptimeRecord,
};
