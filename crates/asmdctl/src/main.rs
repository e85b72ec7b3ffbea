//! asmdctl - filter music annotation corpora and materialize ground truth
//!
//! Subcommands:
//! - `asmdctl filter` - Print the filtered path list and chunk map
//! - `asmdctl score <row>` - Print the note matrix of a row
//! - `asmdctl pedal <row>` - Print pedal events or frames of a row
//! - `asmdctl generate <manifest>` - Merge partial records into ground-truth files
//! - `asmdctl config` - Print the effective configuration

use anyhow::{Context, Result};
use asmdconf::AsmdConfig;
use clap::{Parser, Subcommand};
use groundtruth::AlignmentKind;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "asmdctl")]
#[command(about = "Filter music annotation corpora and materialize ground truth")]
#[command(version)]
struct Cli {
    /// Config file replacing ./asmd.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Corpus description file (overrides paths.corpus)
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter the corpus and print rows and chunks as JSON
    Filter {
        #[command(flatten)]
        filter: commands::FilterArgs,
    },

    /// Print the score matrix of one row of the filtered path list
    Score {
        /// Row of the filtered path list
        row: usize,

        /// Alignment kinds to choose from (repeatable; defaults to scores.kinds)
        #[arg(long = "kind")]
        kinds: Vec<AlignmentKind>,

        #[command(flatten)]
        filter: commands::FilterArgs,
    },

    /// Print the pedal matrices of one row of the filtered path list
    Pedal {
        /// Row of the filtered path list
        row: usize,

        /// Print frame matrices instead of event matrices
        #[arg(long)]
        frames: bool,

        /// Frame length in seconds (overrides frames.frame_len)
        #[arg(long)]
        frame_len: Option<f64>,

        /// Hop size in seconds (overrides frames.hop)
        #[arg(long)]
        hop: Option<f64>,

        #[command(flatten)]
        filter: commands::FilterArgs,
    },

    /// Merge partial annotation files into ground-truth records
    Generate {
        /// Generation manifest (JSON)
        manifest: PathBuf,

        /// Datasets to leave untouched
        exclude: Vec<String>,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Also list the files and environment variables that were applied
        #[arg(long)]
        sources: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) =
        AsmdConfig::load_with_sources_from(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(corpus) = cli.corpus {
        config.paths.corpus = corpus;
    }

    // stdout carries JSON, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.telemetry.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Filter { filter } => {
            commands::filter(&config, filter)?;
        }
        Commands::Score { row, kinds, filter } => {
            commands::score(&config, filter, row, kinds)?;
        }
        Commands::Pedal {
            row,
            frames,
            frame_len,
            hop,
            filter,
        } => {
            let frame_len = frame_len.unwrap_or(config.frames.frame_len);
            let hop = hop.unwrap_or(config.frames.hop);
            if frames {
                commands::pedal_frames(&config, filter, row, frame_len, hop)?;
            } else {
                commands::pedal_events(&config, filter, row)?;
            }
        }
        Commands::Generate { manifest, exclude } => {
            commands::generate(&manifest, &exclude)?;
        }
        Commands::Config { sources: show } => {
            commands::show_config(&config, show.then_some(&sources));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn score_accepts_repeated_kinds() {
        let cli = Cli::parse_from([
            "asmdctl",
            "score",
            "3",
            "--kind",
            "precise_alignment",
            "--kind",
            "broad_alignment",
            "--dataset",
            "Bach10",
        ]);
        let Commands::Score { row, kinds, filter } = cli.command else {
            panic!("expected score command");
        };
        assert_eq!(row, 3);
        assert_eq!(kinds, vec![AlignmentKind::PreciseAlignment, AlignmentKind::BroadAlignment]);
        assert_eq!(filter.into_criteria().unwrap().datasets, vec!["Bach10"]);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(Cli::try_parse_from(["asmdctl", "score", "0", "--kind", "aligned"]).is_err());
    }
}
