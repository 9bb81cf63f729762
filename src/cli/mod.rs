//! Augur CLI
//!
//! Commands:
//! - `augur run` - one best trade (paper unless `--live`)
//! - `augur markets` - list tradeable markets
//! - `augur candidates` - relevance filter output for a thesis
//! - `augur forecast` - ask the superforecaster once

pub mod commands;

use clap::{Parser, Subcommand};

pub use commands::{ask_forecast, print_outcome, show_candidates, show_markets};

/// Prediction-market trading agent
#[derive(Parser, Debug)]
#[command(name = "augur")]
#[command(author, version, about = "Selects and executes one forecast-driven prediction-market trade")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration directory (default.toml plus $AUGUR_ENV.toml)
    #[arg(short, long, global = true, default_value = "config")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one trade cycle
    Run {
        /// Place real orders (also requires dry_run.enabled = false)
        #[arg(long)]
        live: bool,
        /// Override the configured trading thesis
        #[arg(short, long)]
        thesis: Option<String>,
    },
    /// List tradeable markets
    Markets {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Show markets the relevance filter keeps for a thesis
    Candidates {
        #[arg(short, long)]
        thesis: String,
    },
    /// Ask the superforecaster for one outcome probability
    Forecast {
        event_title: String,
        question: String,
        outcome: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::parse_from(["augur", "run", "--live", "--thesis", "rate cuts"]);
        match cli.command {
            Commands::Run { live, thesis } => {
                assert!(live);
                assert_eq!(thesis.as_deref(), Some("rate cuts"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.config, "config");
    }

    #[test]
    fn test_parse_forecast_positionals() {
        let cli = Cli::parse_from([
            "augur",
            "--config",
            "/etc/augur",
            "forecast",
            "Fed meeting",
            "Will the Fed cut?",
            "Yes",
        ]);
        assert_eq!(cli.config, "/etc/augur");
        assert!(matches!(cli.command, Commands::Forecast { ref outcome, .. } if outcome == "Yes"));
    }
}
