//! Orchestration entry point for the MHW / RI compound analysis.
//!
//! Thin driver over `mhw-ri-core`: loads the flat input tables, runs one
//! pipeline stage per subcommand, writes the output tables consumed by the
//! downstream plotting and statistics scripts.

mod loader;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use mhw_ri_core::{
    compound_statistics, detect_batch, detect_ri, match_events, storm_ri_rate, tables,
    BatchConfig, DateRange, DetectionConfig, FailurePolicy, MatchConfig, RiConfig,
};
use std::error::Error;
use std::path::PathBuf;
use tracing::{info, warn};

/// Marine heatwave / rapid intensification compound analysis
#[derive(Parser, Debug)]
#[command(name = "analysis-headless")]
#[command(about = "Gulf of Mexico MHW/RI compound event analysis", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect marine heatwaves over a gridded SST table
    DetectMhw {
        /// Input SST table (date,lat,lon,sst)
        #[arg(long)]
        sst: PathBuf,

        /// Output MHW event table
        #[arg(long)]
        out: PathBuf,

        /// Climatology period start (YYYY-MM-DD)
        #[arg(long)]
        clim_start: NaiveDate,

        /// Climatology period end (YYYY-MM-DD)
        #[arg(long)]
        clim_end: NaiveDate,

        /// Threshold percentile
        #[arg(long, default_value_t = 90.0)]
        percentile: f64,

        /// Minimum event duration in days
        #[arg(long, default_value_t = 5)]
        min_duration: u32,

        /// Maximum below-threshold gap merged into an event, in days
        #[arg(long, default_value_t = 2)]
        max_gap: u32,

        /// Worker thread count (default: rayon's global pool)
        #[arg(long)]
        workers: Option<usize>,

        /// Abort on the first failing grid cell instead of skipping it
        #[arg(long)]
        strict: bool,
    },

    /// Detect rapid intensification episodes over best-track records
    DetectRi {
        /// Input best-track table (storm_id,name,time,lat,lon,wind_kt)
        #[arg(long)]
        track: PathBuf,

        /// Output RI event table
        #[arg(long)]
        out: PathBuf,

        /// Minimum wind increase in knots
        #[arg(long, default_value_t = 30.0)]
        threshold_kt: f64,

        /// Window the increase must occur within, in hours
        #[arg(long, default_value_t = 24)]
        window_hours: i64,
    },

    /// Match MHW and RI event tables into compound pairs
    MatchEvents {
        /// MHW event table written by detect-mhw
        #[arg(long)]
        mhw: PathBuf,

        /// RI event table written by detect-ri
        #[arg(long)]
        ri: PathBuf,

        /// Output compound pair table
        #[arg(long)]
        out: PathBuf,

        /// Maximum great-circle distance in km
        #[arg(long, default_value_t = 200.0)]
        max_distance_km: f64,

        /// Maximum lag in days between MHW activity and RI onset
        #[arg(long, default_value_t = 10)]
        max_lag_days: i64,

        /// Best-track table; enables the probability summary
        #[arg(long)]
        track: Option<PathBuf>,

        /// Output path for the probability summary JSON
        #[arg(long)]
        stats_out: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Args::parse().command {
        Command::DetectMhw {
            sst,
            out,
            clim_start,
            clim_end,
            percentile,
            min_duration,
            max_gap,
            workers,
            strict,
        } => {
            let series_set = loader::load_sst_table(&sst)?;

            let mut detection =
                DetectionConfig::new(DateRange::new(clim_start, clim_end));
            detection.percentile = percentile;
            detection.min_duration = min_duration;
            detection.max_gap = max_gap;

            let mut config = BatchConfig::new(detection);
            config.workers = workers;
            if strict {
                config.policy = FailurePolicy::Strict;
            }

            let outcome = detect_batch(&series_set, &config)?;
            tables::write_mhw_table(&out, &outcome.events)?;
            info!(
                events = outcome.events.len(),
                skipped_cells = outcome.failures.len(),
                "wrote MHW event table {}",
                out.display()
            );
        }

        Command::DetectRi {
            track,
            out,
            threshold_kt,
            window_hours,
        } => {
            let fixes = loader::load_best_track(&track)?;
            let events = detect_ri(
                &fixes,
                &RiConfig {
                    threshold_kt,
                    window_hours,
                },
            );
            tables::write_ri_table(&out, &events)?;
            info!(
                episodes = events.len(),
                "wrote RI event table {}",
                out.display()
            );
        }

        Command::MatchEvents {
            mhw,
            ri,
            out,
            max_distance_km,
            max_lag_days,
            track,
            stats_out,
        } => {
            let mhw_events = tables::read_mhw_table(&mhw)?;
            let ri_events = tables::read_ri_table(&ri)?;

            let pairs = match_events(
                &mhw_events,
                &ri_events,
                &MatchConfig {
                    max_distance_km,
                    max_lag_days,
                },
            )?;
            tables::write_compound_table(&out, &pairs)?;
            info!(
                pairs = pairs.len(),
                "wrote compound pair table {}",
                out.display()
            );

            match (track, stats_out) {
                (Some(track_path), Some(stats_path)) => {
                    let fixes = loader::load_best_track(&track_path)?;
                    let ri_events_all = detect_ri(&fixes, &RiConfig::default());
                    let p_ri = storm_ri_rate(&fixes, &ri_events_all);
                    let stats =
                        compound_statistics(&pairs, mhw_events.len(), ri_events.len(), p_ri)?;
                    tables::write_stats_json(&stats_path, &stats)?;
                    info!(
                        multiplication_rate = stats.multiplication_rate,
                        "wrote probability summary {}",
                        stats_path.display()
                    );
                }
                (None, None) => {}
                _ => warn!("--track and --stats-out must be given together; skipping summary"),
            }
        }
    }

    Ok(())
}
