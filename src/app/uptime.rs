use chrono::{DateTime, Utc};

use super::config::UptimeThresholds;
use super::fetch::FetchOutcome;
use super::types::{Liveness, UptimeRecord, round_to};

/// Response time as stored, rounded to 2 decimals. Classification reads the
/// same value so a stored `2.0` is never `up`.
pub fn response_time_secs(outcome: &FetchOutcome) -> f64 {
    round_to(outcome.elapsed().as_secs_f64(), 2)
}

pub fn classify(outcome: &FetchOutcome, thresholds: &UptimeThresholds) -> Liveness {
    match outcome {
        FetchOutcome::Success { status_code, .. } => {
            if !thresholds.is_healthy_status(*status_code) {
                Liveness::Down
            } else if response_time_secs(outcome) < thresholds.slow_after_secs {
                Liveness::Up
            } else {
                Liveness::Slow
            }
        }
        FetchOutcome::Timeout { .. } => Liveness::Timeout,
        FetchOutcome::NetworkError { .. } => Liveness::Down,
    }
}

pub fn uptime_record(
    outcome: &FetchOutcome,
    thresholds: &UptimeThresholds,
    checked_at: DateTime<Utc>,
) -> UptimeRecord {
    let liveness = classify(outcome, thresholds);
    let error_message = match outcome {
        FetchOutcome::Success { status_code, .. }
            if !thresholds.is_healthy_status(*status_code) =>
        {
            Some(format!("HTTP {status_code}"))
        }
        _ => outcome.error().map(|err| err.to_string()),
    };

    UptimeRecord {
        status_code: outcome.status_code(),
        response_time_seconds: response_time_secs(outcome),
        liveness,
        error_message,
        checked_at,
    }
}
