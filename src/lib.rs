//! Periodic uptime and on-page SEO checks for a list of websites.
//!
//! [`Monitor`] drives a check: fetch the page through a [`Fetcher`], classify
//! liveness, score the HTML when the page is reachable, and append both
//! records to a [`ReportStore`].

pub mod app;

pub use app::*;
