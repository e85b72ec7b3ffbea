use crate::events::NullPublisher;
use crate::filter::FilterCriteria;
use crate::model::{Chunk, Dataset, GtSelection, PathRow, Song, SongId};
use crate::{CorpusError, Result};
use groundtruth::{pedal, score, AlignmentKind, GroundTruth, PedalEvent, PedalFrame, ScoreMatrix};
use std::path::{Path, PathBuf};

/// Dataset → song registry with the filtered path list and chunk map.
///
/// Songs live in one arena addressed by [`SongId`]; datasets own a range of
/// arena slots. Cloning the corpus copies the arena and the derived views,
/// which is what the copying filter relies on.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    install_dir: PathBuf,
    datasets: Vec<Dataset>,
    songs: Vec<Song>,
    pub(crate) rows: Vec<PathRow>,
    pub(crate) chunks: Vec<Chunk>,
}

/// Assembles a [`Corpus`] dataset by dataset.
#[derive(Debug, Default)]
pub struct CorpusBuilder {
    install_dir: PathBuf,
    datasets: Vec<Dataset>,
    songs: Vec<Song>,
}

impl CorpusBuilder {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
            ..Default::default()
        }
    }

    pub fn dataset(mut self, mut dataset: Dataset, songs: Vec<Song>) -> Self {
        let start = self.songs.len();
        self.songs.extend(songs);
        dataset.songs = start..self.songs.len();
        self.datasets.push(dataset);
        self
    }

    /// Finish and populate the path list with an unconstrained filter.
    pub fn build(self) -> Corpus {
        let mut corpus = Corpus {
            install_dir: self.install_dir,
            datasets: self.datasets,
            songs: self.songs,
            rows: Vec::new(),
            chunks: Vec::new(),
        };
        corpus.filter_with(&FilterCriteria::default(), &NullPublisher);
        corpus
    }
}

impl Corpus {
    pub fn builder(install_dir: impl Into<PathBuf>) -> CorpusBuilder {
        CorpusBuilder::new(install_dir)
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub(crate) fn datasets_mut(&mut self) -> &mut [Dataset] {
        &mut self.datasets
    }

    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.name == name)
    }

    pub fn songs_of(&self, dataset: usize) -> &[Song] {
        self.datasets
            .get(dataset)
            .map(|d| &self.songs[d.songs.clone()])
            .unwrap_or(&[])
    }

    pub fn song(&self, id: SongId) -> Option<&Song> {
        self.slot(id).map(|slot| &self.songs[slot])
    }

    pub(crate) fn song_mut(&mut self, id: SongId) -> Option<&mut Song> {
        self.slot(id).map(move |slot| &mut self.songs[slot])
    }

    fn slot(&self, id: SongId) -> Option<usize> {
        let range = &self.datasets.get(id.dataset)?.songs;
        (id.song < range.len()).then(|| range.start + id.song)
    }

    /// Filtered path list, in dataset then song order.
    pub fn rows(&self) -> &[PathRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One chunk per included dataset, partitioning `[0, len())`.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, dataset: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.dataset == dataset)
    }

    pub fn row(&self, row: usize) -> Result<&PathRow> {
        self.rows.get(row).ok_or(CorpusError::RowOutOfRange {
            row,
            len: self.rows.len(),
        })
    }

    pub fn dataset_of(&self, row: usize) -> Result<&Dataset> {
        let id = self.row(row)?.song;
        Ok(&self.datasets[id.dataset])
    }

    pub fn mix_path(&self, row: usize) -> Result<Option<&Path>> {
        Ok(self.row(row)?.mix.as_deref())
    }

    pub fn source_paths(&self, row: usize) -> Result<&[PathBuf]> {
        Ok(self.row(row)?.source.paths())
    }

    /// Ground-truth records selected for a row: every source, or only the
    /// target instrument's.
    pub fn ground_truths(&self, row: usize) -> Result<&[GroundTruth]> {
        let entry = self.row(row)?;
        let Some(song) = self.song(entry.song) else {
            return Ok(&[]);
        };
        Ok(match entry.ground_truth {
            GtSelection::All => &song.ground_truth,
            GtSelection::Source(i) => song.ground_truth.get(i..=i).unwrap_or(&[]),
        })
    }

    pub fn score(&self, row: usize, requested: &[AlignmentKind]) -> Result<ScoreMatrix> {
        Ok(score::score_matrix(self.ground_truths(row)?, requested))
    }

    pub fn score_duration(&self, row: usize) -> Result<f64> {
        Ok(score::score_duration(self.ground_truths(row)?))
    }

    pub fn pedal_events(&self, row: usize) -> Result<Vec<Vec<PedalEvent>>> {
        Ok(pedal::materialize_events(self.ground_truths(row)?))
    }

    pub fn pedal_frames(&self, row: usize, frame_len: f64, hop: f64) -> Result<Vec<Vec<PedalFrame>>> {
        Ok(pedal::materialize_frames(self.ground_truths(row)?, frame_len, hop)?)
    }
}
