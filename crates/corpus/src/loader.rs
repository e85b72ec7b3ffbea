//! Corpus description loading.
//!
//! The description is a JSON document listing datasets and their songs. A
//! song's ground truth is a list whose entries are either inline records or
//! paths, relative to `install_dir`, of JSON record files.

use crate::index::Corpus;
use crate::model::{Dataset, Song};
use crate::{CorpusError, Result};
use groundtruth::GroundTruth;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct Description {
    #[serde(default)]
    install_dir: Option<PathBuf>,
    datasets: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawDataset {
    name: String,
    #[serde(default = "default_true")]
    included: bool,
    ensemble: bool,
    ground_truth: BTreeMap<String, u8>,
    songs: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawSong {
    title: String,
    #[serde(default = "default_true")]
    included: bool,
    instruments: Vec<String>,
    #[serde(default)]
    composer: String,
    #[serde(default)]
    groups: BTreeSet<String>,
    ground_truth: Vec<Value>,
    #[serde(default)]
    recording: Option<PathHolder>,
    #[serde(default)]
    sources: Option<PathList>,
}

#[derive(Debug, Deserialize)]
struct PathHolder {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct PathList {
    path: Vec<PathBuf>,
}

fn default_true() -> bool {
    true
}

/// Read and decode a corpus description file.
///
/// Relative `install_dir` values resolve against the description's directory;
/// without one, the description's directory is used.
pub fn load_from_file(path: &Path) -> Result<Corpus> {
    let contents = std::fs::read_to_string(path).map_err(|e| CorpusError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let value: Value = serde_json::from_str(&contents).map_err(|e| CorpusError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let base = path.parent().unwrap_or(Path::new("."));
    let corpus = from_value(value, base)?;
    info!(
        path = %path.display(),
        datasets = corpus.datasets().len(),
        rows = corpus.len(),
        "corpus loaded"
    );
    Ok(corpus)
}

/// Decode a description already in memory. `base` anchors relative paths.
pub fn from_value(value: Value, base: &Path) -> Result<Corpus> {
    let description: Description =
        serde_json::from_value(value).map_err(|e| CorpusError::Parse {
            path: base.to_path_buf(),
            message: e.to_string(),
        })?;

    let install_dir = match description.install_dir {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => base.join(dir),
        None => base.to_path_buf(),
    };

    let mut builder = Corpus::builder(&install_dir);
    for (i, raw) in description.datasets.into_iter().enumerate() {
        let (dataset, songs) = decode_dataset(raw, i, &install_dir)?;
        debug!(dataset = %dataset.name, songs = songs.len(), "dataset decoded");
        builder = builder.dataset(dataset, songs);
    }
    Ok(builder.build())
}

fn label(value: &Value, key: &str, index: usize) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", index))
}

fn decode_dataset(value: Value, index: usize, install_dir: &Path) -> Result<(Dataset, Vec<Song>)> {
    let name = label(&value, "name", index);
    let raw: RawDataset = serde_json::from_value(value).map_err(|e| CorpusError::DatasetStructure {
        dataset: name.clone(),
        message: e.to_string(),
    })?;

    let songs = raw
        .songs
        .into_iter()
        .enumerate()
        .map(|(j, song)| decode_song(song, j, &name, install_dir))
        .collect::<Result<Vec<_>>>()?;

    let mut dataset = Dataset::new(raw.name);
    dataset.included = raw.included;
    dataset.ensemble = raw.ensemble;
    dataset.ground_truth = raw.ground_truth;
    Ok((dataset, songs))
}

fn decode_song(value: Value, index: usize, dataset: &str, install_dir: &Path) -> Result<Song> {
    let title = label(&value, "title", index);
    let structure = |message: String| CorpusError::SongStructure {
        dataset: dataset.to_string(),
        song: title.clone(),
        message,
    };

    let raw: RawSong = serde_json::from_value(value).map_err(|e| structure(e.to_string()))?;

    let ground_truth = raw
        .ground_truth
        .into_iter()
        .enumerate()
        .map(|(k, entry)| {
            resolve_ground_truth(entry, install_dir)
                .map_err(|message| structure(format!("ground_truth[{}]: {}", k, message)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Song {
        title: raw.title,
        included: raw.included,
        instruments: raw.instruments,
        composer: raw.composer,
        groups: raw.groups,
        ground_truth,
        recording: raw.recording.map(|r| r.path),
        sources: raw.sources.map(|s| s.path).unwrap_or_default(),
    })
}

fn resolve_ground_truth(entry: Value, install_dir: &Path) -> std::result::Result<GroundTruth, String> {
    let value = match entry {
        Value::String(relative) => {
            let path = install_dir.join(&relative);
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
            serde_json::from_str(&contents)
                .map_err(|e| format!("failed to parse {}: {}", path.display(), e))?
        }
        inline => inline,
    };
    GroundTruth::from_json(value).map_err(|e| e.to_string())
}
