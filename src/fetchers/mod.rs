//! Approach page fetcher implementations

pub mod bus_vision;

pub use bus_vision::BusVisionFetcher;
