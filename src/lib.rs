//! weatherdash library
//!
//! Fetchers for weather, air quality, geocoding, city photos and news; a
//! persistent stale-tolerant cache in front of them; an offline worker that
//! serves the application shell without a network and signals periodic
//! refreshes; and the HTTP API the dashboard calls.

pub mod cache;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod server;
pub mod weather_cache;
pub mod worker;
