//! Core types and utilities

pub mod events;
pub mod geo;
pub mod grid;
pub mod series;

pub use events::{CompoundPair, MhwEvent, RiEvent, StormCategory};
pub use geo::{haversine_km, EARTH_RADIUS_KM};
pub use grid::GridCell;
pub use series::{DateRange, SstSeries};
