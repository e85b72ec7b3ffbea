//! CLI command implementations

use anyhow::{bail, Context, Result};
use asmdconf::{AsmdConfig, ConfigSources};
use clap::Args;
use corpus::{Chunk, Corpus, FilterCriteria, GenerationManifest, PathRow, TracingPublisher};
use groundtruth::AlignmentKind;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Filter flags shared by every command that addresses rows.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// JSON file with filter criteria; flags below are applied on top
    #[arg(long)]
    criteria: Option<PathBuf>,

    /// Instrument the song must contain (repeatable; the set must match exactly)
    #[arg(long = "instrument")]
    instruments: Vec<String>,

    /// Keep only ensemble (true) or solo (false) datasets
    #[arg(long)]
    ensemble: Option<bool>,

    /// Do not return mixed recordings
    #[arg(long)]
    no_mixed: bool,

    /// Return source recordings of the first --instrument
    #[arg(long)]
    sources: bool,

    /// With --sources, return every source recording
    #[arg(long)]
    all_sources: bool,

    /// Substring of the composer name
    #[arg(long)]
    composer: Option<String>,

    /// Dataset to keep (repeatable)
    #[arg(long = "dataset")]
    datasets: Vec<String>,

    /// Group every song must belong to (repeatable)
    #[arg(long = "group")]
    groups: Vec<String>,

    /// Required annotation level, as kind=level (repeatable)
    #[arg(long = "gt", value_parser = parse_level)]
    ground_truth: Vec<(String, u8)>,
}

impl FilterArgs {
    pub fn into_criteria(self) -> Result<FilterCriteria> {
        let mut criteria = match &self.criteria {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read criteria file {}", path.display()))?;
                serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse criteria file {}", path.display()))?
            }
            None => FilterCriteria::default(),
        };

        if !self.instruments.is_empty() {
            criteria.instruments = self.instruments;
        }
        if self.ensemble.is_some() {
            criteria.ensemble = self.ensemble;
        }
        if self.no_mixed {
            criteria.mixed = false;
        }
        criteria.sources |= self.sources || self.all_sources;
        criteria.all_sources |= self.all_sources;
        if let Some(composer) = self.composer {
            criteria.composer = composer;
        }
        if !self.datasets.is_empty() {
            criteria.datasets = self.datasets;
        }
        criteria.groups.extend(self.groups);
        criteria.ground_truth.extend(self.ground_truth);

        Ok(criteria)
    }
}

fn parse_level(s: &str) -> Result<(String, u8), String> {
    let (kind, level) = s
        .split_once('=')
        .ok_or_else(|| format!("expected kind=level, got '{}'", s))?;
    let level: u8 = level
        .trim()
        .parse()
        .map_err(|_| format!("level must be 0, 1 or 2, got '{}'", level))?;
    if level > 2 {
        return Err(format!("level must be 0, 1 or 2, got {}", level));
    }
    Ok((kind.trim().to_string(), level))
}

fn load_filtered(config: &AsmdConfig, args: FilterArgs) -> Result<Corpus> {
    let criteria = args.into_criteria()?;
    let mut corpus = Corpus::load(&config.paths.corpus)
        .with_context(|| format!("Failed to load corpus {}", config.paths.corpus.display()))?;
    corpus.filter(&criteria);
    Ok(corpus)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let output = serde_json::to_string_pretty(value)?;
    println!("{}", output);
    Ok(())
}

#[derive(Serialize)]
struct FilterReport<'a> {
    rows: &'a [PathRow],
    chunks: &'a [Chunk],
}

/// Print the filtered path list and chunk map
pub fn filter(config: &AsmdConfig, args: FilterArgs) -> Result<()> {
    let corpus = load_filtered(config, args)?;
    info!(rows = corpus.len(), chunks = corpus.chunks().len(), "corpus filtered");
    print_json(&FilterReport {
        rows: corpus.rows(),
        chunks: corpus.chunks(),
    })
}

fn requested_kinds(config: &AsmdConfig, kinds: Vec<AlignmentKind>) -> Result<Vec<AlignmentKind>> {
    if !kinds.is_empty() {
        return Ok(kinds);
    }
    let parsed = config
        .scores
        .kinds
        .iter()
        .map(|k| k.parse::<AlignmentKind>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(anyhow::Error::msg)
        .context("Invalid scores.kinds in configuration")?;
    if parsed.is_empty() {
        bail!("No alignment kinds requested: pass --kind or set scores.kinds");
    }
    Ok(parsed)
}

/// Print the note matrix of a row as `[pitch, onset, offset, velocity, program, source]` arrays
pub fn score(config: &AsmdConfig, args: FilterArgs, row: usize, kinds: Vec<AlignmentKind>) -> Result<()> {
    let kinds = requested_kinds(config, kinds)?;
    let corpus = load_filtered(config, args)?;
    let matrix = corpus.score(row, &kinds)?;
    let rows: Vec<[f64; 6]> = matrix.rows().iter().map(|r| r.to_array()).collect();
    print_json(&rows)
}

/// Print one event matrix per ground-truth record
pub fn pedal_events(config: &AsmdConfig, args: FilterArgs, row: usize) -> Result<()> {
    let corpus = load_filtered(config, args)?;
    print_json(&corpus.pedal_events(row)?)
}

/// Print one frame matrix per ground-truth record
pub fn pedal_frames(config: &AsmdConfig, args: FilterArgs, row: usize, frame_len: f64, hop: f64) -> Result<()> {
    let corpus = load_filtered(config, args)?;
    print_json(&corpus.pedal_frames(row, frame_len, hop)?)
}

/// Merge partial records and write ground-truth files
pub fn generate(manifest: &Path, exclude: &[String]) -> Result<()> {
    let manifest = GenerationManifest::load(manifest)?;
    let written = corpus::generate::generate(&manifest, exclude, &TracingPublisher)?;
    info!(records = written.len(), "generation finished");
    print_json(&written)
}

/// Print the effective configuration, optionally with where it came from
pub fn show_config(config: &AsmdConfig, sources: Option<&ConfigSources>) {
    if let Some(sources) = sources {
        for file in &sources.files {
            println!("# loaded: {}", file.display());
        }
        for var in &sources.env_overrides {
            println!("# env: {}", var);
        }
        println!();
    }
    print!("{}", config.to_toml());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parses_kind_and_value() {
        assert_eq!(parse_level("precise_alignment=1"), Ok(("precise_alignment".to_string(), 1)));
        assert!(parse_level("precise_alignment").is_err());
        assert!(parse_level("score=3").is_err());
    }

    #[test]
    fn flags_overlay_criteria_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("criteria.json");
        std::fs::write(&path, r#"{"composer": "Bach", "groups": ["train"], "mixed": false}"#).unwrap();

        let criteria = FilterArgs {
            criteria: Some(path),
            groups: vec!["solo".into()],
            all_sources: true,
            ground_truth: vec![("score".into(), 1)],
            ..Default::default()
        }
        .into_criteria()
        .unwrap();

        assert_eq!(criteria.composer, "Bach");
        assert!(!criteria.mixed);
        assert!(criteria.sources && criteria.all_sources);
        assert_eq!(criteria.groups, vec!["train", "solo"]);
        assert_eq!(criteria.ground_truth.get("score"), Some(&1));
    }

    #[test]
    fn configured_kinds_are_used_when_none_given() {
        let mut config = AsmdConfig::default();
        config.scores.kinds = vec!["broad_alignment".into(), "score".into()];
        assert_eq!(
            requested_kinds(&config, Vec::new()).unwrap(),
            vec![AlignmentKind::BroadAlignment, AlignmentKind::Score]
        );

        config.scores.kinds = vec!["aligned".into()];
        assert!(requested_kinds(&config, Vec::new()).is_err());
    }
}
