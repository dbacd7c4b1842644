//! Metrics and observability utilities
//!
//! Counter registration and recording helpers with standardized naming
//! conventions for the slug subsystem.

use metrics::{counter, describe_counter, Unit};

use crate::db::{HistoryOutcome, SweepReport};
use crate::slug::EntityKind;

/// Metrics prefix for all Waypost metrics
pub const METRICS_PREFIX: &str = "waypost";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_redirects_total", METRICS_PREFIX),
        Unit::Count,
        "Permanent redirects served from slug history"
    );

    describe_counter!(
        format!("{}_history_recorded_total", METRICS_PREFIX),
        Unit::Count,
        "Slug history rows written on rename"
    );

    describe_counter!(
        format!("{}_history_skipped_total", METRICS_PREFIX),
        Unit::Count,
        "Slug history writes refused to protect live content"
    );

    describe_counter!(
        format!("{}_slug_conflict_retries_total", METRICS_PREFIX),
        Unit::Count,
        "Slug regenerations after losing a uniqueness race"
    );

    describe_counter!(
        format!("{}_history_swept_total", METRICS_PREFIX),
        Unit::Count,
        "History rows deleted by the maintenance sweep"
    );

    tracing::info!("Metrics registered");
}

/// Record a redirect served for a historical slug
pub fn record_redirect(kind: EntityKind, transport: &'static str) {
    counter!(
        format!("{}_redirects_total", METRICS_PREFIX),
        "kind" => kind.as_str(),
        "transport" => transport
    )
    .increment(1);
}

/// Record the outcome of a history write
pub fn record_history_outcome(kind: EntityKind, outcome: HistoryOutcome) {
    match outcome {
        HistoryOutcome::Recorded => {
            counter!(
                format!("{}_history_recorded_total", METRICS_PREFIX),
                "kind" => kind.as_str()
            )
            .increment(1);
        }
        HistoryOutcome::Skipped(reason) => {
            counter!(
                format!("{}_history_skipped_total", METRICS_PREFIX),
                "kind" => kind.as_str(),
                "reason" => reason.as_str()
            )
            .increment(1);
        }
    }
}

/// Record a conflict-driven slug regeneration
pub fn record_conflict_retry(kind: EntityKind) {
    counter!(
        format!("{}_slug_conflict_retries_total", METRICS_PREFIX),
        "kind" => kind.as_str()
    )
    .increment(1);
}

/// Record the per-class counts of an applied sweep
pub fn record_sweep(report: &SweepReport) {
    for (class, count) in [
        ("invalid", report.invalid),
        ("orphaned", report.orphaned),
        ("collisions", report.collisions),
        ("redundant", report.redundant),
    ] {
        if count > 0 {
            counter!(
                format!("{}_history_swept_total", METRICS_PREFIX),
                "class" => class
            )
            .increment(count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SkipReason;

    #[test]
    fn test_recording_does_not_panic_without_exporter() {
        register_metrics();
        record_redirect(EntityKind::Post, "http");
        record_history_outcome(EntityKind::Tag, HistoryOutcome::Recorded);
        record_history_outcome(
            EntityKind::Country,
            HistoryOutcome::Skipped(SkipReason::DuplicateOldSlug),
        );
        record_conflict_retry(EntityKind::Post);
        record_sweep(&SweepReport {
            invalid: 1,
            orphaned: 0,
            collisions: 2,
            redundant: 0,
        });
    }
}
