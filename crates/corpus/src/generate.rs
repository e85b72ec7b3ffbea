//! Ground-truth generation from partial annotation files.
//!
//! Each format-specific converter leaves behind a JSON list of partial
//! records, one per source. Generation merges those lists per song, and
//! writes the canonical record chosen by each output file's name.

use crate::events::{CorpusEvent, EventPublisher};
use crate::{CorpusError, Result};
use groundtruth::{merge, GroundTruth, PartialRecord};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Describes which partial files feed which output records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationManifest {
    /// Root that every relative path below resolves against
    pub install_dir: PathBuf,
    pub datasets: Vec<ManifestDataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestDataset {
    pub name: String,
    pub songs: Vec<ManifestSong>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestSong {
    pub title: String,
    /// Output files, named `<stem>-<index>.json`
    pub ground_truth: Vec<PathBuf>,
    /// One partial-record list per source format
    #[serde(default)]
    pub partials: Vec<PathBuf>,
}

/// A record written by [`generate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedRecord {
    pub dataset: String,
    pub song: String,
    pub output: PathBuf,
    /// Position of the written record in the merged list
    pub index: usize,
}

impl GenerationManifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| CorpusError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&contents).map_err(|e| CorpusError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Record index encoded in an output path: the number after the last `-`
/// of the file stem. Paths without one map to the first record.
pub fn source_index(path: &Path) -> usize {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.rsplit_once('-'))
        .and_then(|(_, suffix)| suffix.parse().ok())
        .unwrap_or(0)
}

/// Merge partials and write every output record of every dataset not named
/// in `excluded`.
pub fn generate(
    manifest: &GenerationManifest,
    excluded: &[String],
    publisher: &dyn EventPublisher,
) -> Result<Vec<GeneratedRecord>> {
    let mut written = Vec::new();

    for dataset in &manifest.datasets {
        if excluded.contains(&dataset.name) {
            publisher.publish(CorpusEvent::DatasetSkipped {
                dataset: dataset.name.clone(),
            });
            continue;
        }

        publisher.publish(CorpusEvent::GenerationStarted {
            dataset: dataset.name.clone(),
        });

        for song in &dataset.songs {
            let records = merged_records(&manifest.install_dir, &dataset.name, song)?;
            if records.is_empty() && !song.ground_truth.is_empty() {
                return Err(CorpusError::SongStructure {
                    dataset: dataset.name.clone(),
                    song: song.title.clone(),
                    message: "partials produced no records".to_string(),
                });
            }

            for output in &song.ground_truth {
                let index = source_index(output).min(records.len() - 1);
                let path = manifest.install_dir.join(output);
                write_record(&path, &records[index])?;

                publisher.publish(CorpusEvent::RecordGenerated {
                    dataset: dataset.name.clone(),
                    song: song.title.clone(),
                    output: path.clone(),
                });
                written.push(GeneratedRecord {
                    dataset: dataset.name.clone(),
                    song: song.title.clone(),
                    output: path,
                    index,
                });
            }
        }
    }

    Ok(written)
}

fn merged_records(install_dir: &Path, dataset: &str, song: &ManifestSong) -> Result<Vec<GroundTruth>> {
    let lists = song
        .partials
        .iter()
        .map(|p| read_partials(&install_dir.join(p)))
        .collect::<Result<Vec<Vec<PartialRecord>>>>()?;

    debug!(dataset, song = %song.title, formats = lists.len(), "merging partials");
    let merged = merge(&lists).map_err(|e| CorpusError::SongStructure {
        dataset: dataset.to_string(),
        song: song.title.clone(),
        message: e.to_string(),
    })?;

    merged
        .iter()
        .map(|record| GroundTruth::from_merged(record).map_err(CorpusError::from))
        .collect()
}

fn read_partials(path: &Path) -> Result<Vec<PartialRecord>> {
    let contents = std::fs::read_to_string(path).map_err(|e| CorpusError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let value = serde_json::from_str(&contents).map_err(|e| CorpusError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(groundtruth::merge::partials_from_json(value)?)
}

fn write_record(path: &Path, record: &GroundTruth) -> Result<()> {
    let write_err = |e: std::io::Error| CorpusError::Write {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let json = serde_json::to_string(record).map_err(|e| write_err(e.into()))?;
    std::fs::write(path, json).map_err(write_err)
}
