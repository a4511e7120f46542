//! Parallel per-cell detection over a partitioned SST dataset.
//!
//! Grid cells are independent, so the batch maps the pure single-cell
//! detector over the partition list with rayon and collects results in
//! input order; scheduling never affects the output. Failed cells are
//! either skipped with a warning or, under the strict policy, abort the
//! batch with the first failing cell's cause after all cells have run.

use crate::core_types::events::MhwEvent;
use crate::core_types::grid::GridCell;
use crate::core_types::series::SstSeries;
use crate::detect::{detect_events, DetectError, DetectionConfig};
use rayon::prelude::*;
use tracing::{info, warn};

/// How to treat single-cell failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the cell's coordinates and cause, drop the cell, keep going.
    #[default]
    SkipAndWarn,
    /// Abort the batch with the first failing cell (input order).
    Strict,
}

/// Batch driver configuration.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub detection: DetectionConfig,
    pub policy: FailurePolicy,
    /// Bounded worker count; `None` uses the global rayon pool.
    pub workers: Option<usize>,
}

impl BatchConfig {
    pub fn new(detection: DetectionConfig) -> Self {
        BatchConfig {
            detection,
            policy: FailurePolicy::SkipAndWarn,
            workers: None,
        }
    }
}

/// A cell excluded from the batch output, with its cause.
#[derive(Debug)]
pub struct CellFailure {
    pub cell: GridCell,
    pub error: DetectError,
}

/// Result of a batch run: the concatenated event table plus the cells that
/// were skipped (always empty under `FailurePolicy::Strict`).
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub events: Vec<MhwEvent>,
    pub failures: Vec<CellFailure>,
}

/// Run marine heatwave detection over every cell of a partitioned dataset.
///
/// Events are concatenated in partition order, preserving each cell's
/// start-date sort; no cross-cell order is imposed beyond that.
///
/// # Errors
/// - `DetectError::InvalidParameter` if the detection configuration or the
///   worker count is out of range (checked once, before any cell runs)
/// - under `FailurePolicy::Strict`, the first failing cell's error
pub fn detect_batch(
    series_set: &[SstSeries],
    config: &BatchConfig,
) -> Result<BatchOutcome, DetectError> {
    config.detection.validate()?;

    let run = || {
        series_set
            .par_iter()
            .map(|series| detect_events(series, &config.detection))
            .collect::<Vec<_>>()
    };

    let results = match config.workers {
        Some(0) => {
            return Err(DetectError::InvalidParameter {
                name: "workers",
                message: "worker count must be at least 1".to_string(),
            })
        }
        Some(count) => rayon::ThreadPoolBuilder::new()
            .num_threads(count)
            .build()
            .map_err(|e| DetectError::InvalidParameter {
                name: "workers",
                message: format!("failed to build worker pool: {e}"),
            })?
            .install(run),
        None => run(),
    };

    let mut outcome = BatchOutcome::default();
    for (series, result) in series_set.iter().zip(results) {
        match result {
            Ok(events) => outcome.events.extend(events),
            Err(error) => match config.policy {
                FailurePolicy::Strict => return Err(error),
                FailurePolicy::SkipAndWarn => {
                    warn!(
                        lat = series.cell().lat(),
                        lon = series.cell().lon(),
                        %error,
                        "skipping grid cell"
                    );
                    outcome.failures.push(CellFailure {
                        cell: series.cell(),
                        error,
                    });
                }
            },
        }
    }

    info!(
        cells = series_set.len(),
        skipped = outcome.failures.len(),
        events = outcome.events.len(),
        "batch detection complete"
    );
    Ok(outcome)
}
