use groundtruth::GroundTruth;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::path::PathBuf;

/// Address of a song in the corpus arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SongId {
    pub dataset: usize,
    pub song: usize,
}

/// A collection of songs sharing provenance and annotation levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub included: bool,
    pub ensemble: bool,
    /// Annotation kind → level (0 absent, 1 manual, 2 automatic)
    pub ground_truth: BTreeMap<String, u8>,
    /// Arena slots of this dataset's songs
    #[serde(skip)]
    pub(crate) songs: Range<usize>,
}

impl Dataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            included: true,
            ensemble: false,
            ground_truth: BTreeMap::new(),
            songs: 0..0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub title: String,
    pub included: bool,
    pub instruments: Vec<String>,
    pub composer: String,
    pub groups: BTreeSet<String>,
    /// One record per source, in instrument order
    pub ground_truth: Vec<GroundTruth>,
    /// Mixed recording
    pub recording: Option<PathBuf>,
    /// Per-instrument source recordings; empty when the song has none
    pub sources: Vec<PathBuf>,
}

impl Song {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            included: true,
            instruments: Vec::new(),
            composer: String::new(),
            groups: BTreeSet::new(),
            ground_truth: Vec::new(),
            recording: None,
            sources: Vec::new(),
        }
    }
}

/// Half-open row range `[start, end)` of the path list owned by one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub dataset: String,
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Source recordings selected for a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSelection {
    None,
    One(PathBuf),
    All(Vec<PathBuf>),
}

impl SourceSelection {
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            SourceSelection::None => &[],
            SourceSelection::One(path) => std::slice::from_ref(path),
            SourceSelection::All(paths) => paths,
        }
    }
}

/// Which of a song's ground-truth records a row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GtSelection {
    All,
    Source(usize),
}

/// One entry of the filtered path list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRow {
    pub song: SongId,
    pub mix: Option<PathBuf>,
    pub source: SourceSelection,
    pub ground_truth: GtSelection,
}
