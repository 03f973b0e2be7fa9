//! Command-line interface parsing for weatherdash
//!
//! This module handles parsing of CLI arguments using clap. Every subcommand
//! that takes a location goes through [`parse_location_arg`] so blank input is
//! rejected before any request is made.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::data::Units;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The location argument is empty or whitespace
    #[error("Invalid location: '{0}'. Enter a city name, e.g. \"London\" or \"Paris, FR\"")]
    InvalidLocation(String),
}

/// Weather dashboard with offline caching
#[derive(Parser, Debug)]
#[command(name = "weatherdash")]
#[command(about = "Weather, forecasts, air quality and headlines with offline caching")]
#[command(version)]
pub struct Cli {
    /// Unit system (overrides the config file)
    #[arg(long, global = true, value_enum)]
    pub units: Option<Units>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Cache directory (overrides config and WEATHERDASH_CACHE_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Current conditions for a location
    Current {
        #[arg(value_parser = parse_location_arg)]
        location: String,
    },
    /// Daily and hourly forecast for a location
    Forecast {
        #[arg(value_parser = parse_location_arg)]
        location: String,
    },
    /// Air quality index for a location
    Air {
        #[arg(value_parser = parse_location_arg)]
        location: String,
    },
    /// Suggest locations matching a partial name
    Search { query: String },
    /// Coordinates and timezone for a location
    Geocode {
        #[arg(value_parser = parse_location_arg)]
        location: String,
    },
    /// Weather, photo and local time for major world cities
    Cities,
    /// Top headlines
    News,
    /// Serve the news and subscription API
    Serve {
        /// Address to listen on (overrides the config file)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
    /// Show a location and refresh it whenever the offline worker signals an update
    Watch {
        #[arg(value_parser = parse_location_arg)]
        location: String,
    },
}

/// Parses a location argument, trimming surrounding whitespace
///
/// # Returns
/// * `Ok(String)` with the trimmed location
/// * `Err(CliError::InvalidLocation)` if nothing is left after trimming
pub fn parse_location_arg(s: &str) -> Result<String, CliError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(CliError::InvalidLocation(s.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location_arg_trims() {
        assert_eq!(parse_location_arg("  London ").unwrap(), "London");
        assert_eq!(parse_location_arg("Paris, FR").unwrap(), "Paris, FR");
    }

    #[test]
    fn test_parse_location_arg_blank() {
        let err = parse_location_arg("   ").unwrap_err();
        assert!(err.to_string().contains("Invalid location"));
    }

    #[test]
    fn test_cli_parse_current() {
        let cli = Cli::parse_from(["weatherdash", "current", "Tokyo"]);
        assert_eq!(
            cli.command,
            Command::Current {
                location: "Tokyo".to_string()
            }
        );
        assert!(cli.units.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["weatherdash", "forecast", "Oslo", "--units", "metric", "--json"]);
        assert_eq!(cli.units, Some(Units::Metric));
        assert!(cli.json);
    }

    #[test]
    fn test_cli_serve_bind() {
        let cli = Cli::parse_from(["weatherdash", "serve", "--bind", "0.0.0.0:8080"]);
        assert_eq!(
            cli.command,
            Command::Serve {
                bind: Some("0.0.0.0:8080".to_string())
            }
        );
    }

    #[test]
    fn test_cli_rejects_blank_location() {
        assert!(Cli::try_parse_from(["weatherdash", "current", " "]).is_err());
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["weatherdash"]).is_err());
    }

    #[test]
    fn test_cli_rejects_unknown_units() {
        assert!(Cli::try_parse_from(["weatherdash", "news", "--units", "kelvin"]).is_err());
    }
}
