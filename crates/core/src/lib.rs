//! Marine Heatwave / Rapid Intensification Analysis Core
//!
//! Detection and compounding analysis for the co-occurrence of marine
//! heatwaves (MHWs) and rapid intensification (RI) of tropical cyclones in
//! the Gulf of Mexico and northwestern Caribbean.
//!
//! ## Pipeline
//!
//! 1. Per-cell seasonal climatology and percentile threshold (Hobday et al.
//!    2016), built over a fixed reference period
//! 2. Threshold-exceedance run detection with gap merging and
//!    minimum-duration filtering, parallelized over grid cells
//! 3. Rapid-intensification detection over best-track records
//!    (30 kt / 24 h, Kaplan & DeMaria 2003)
//! 4. Spatiotemporal compounding of MHW and RI events and conditional
//!    probability / multiplication-rate summaries
//!
//! Event tables are written as delimited flat files; plotting and mapping
//! are downstream consumers of those files, not part of this crate.

// Core types and utilities
pub mod core_types;

// Climatology construction and event detection
pub mod climatology;
pub mod detect;

// Parallel per-cell batch driver
pub mod batch;

// Rapid intensification and compounding
pub mod compound;
pub mod ri;

// Flat-file event tables
pub mod tables;

// Re-export core types
pub use core_types::{haversine_km, CompoundPair, DateRange, GridCell, MhwEvent, RiEvent};
pub use core_types::{SstSeries, StormCategory};

// Re-export the analysis surface
pub use batch::{detect_batch, BatchConfig, BatchOutcome, CellFailure, FailurePolicy};
pub use climatology::Climatology;
pub use compound::{
    compound_statistics, compounded_flags, match_events, CompoundStats, MatchConfig, MatchError,
};
pub use detect::{detect_events, detect_with_climatology, DetectError, DetectionConfig};
pub use ri::{detect_ri, storm_ri_rate, BestTrackPoint, RiConfig};
