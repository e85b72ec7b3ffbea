//! Corpus index and filter engine.
//!
//! A [`Corpus`] holds datasets, their songs and the songs' ground-truth
//! records. Filtering with [`FilterCriteria`] produces the path list: one
//! [`PathRow`] per kept song, grouped into one [`Chunk`] per included
//! dataset. Rows are then used to materialize scores and pedaling through
//! the `groundtruth` crate.
//!
//! ```
//! use corpus::{Corpus, Dataset, FilterCriteria, Song};
//!
//! let mut corpus = Corpus::builder("/data")
//!     .dataset(Dataset::new("Bach10"), vec![Song::new("01-AchGottundHerr")])
//!     .build();
//! assert_eq!(corpus.len(), 1);
//!
//! corpus.filter(&FilterCriteria { ensemble: Some(true), ..Default::default() });
//! assert!(corpus.is_empty());
//! ```

pub mod events;
pub mod filter;
pub mod generate;
pub mod index;
pub mod loader;
pub mod model;

pub use events::{CorpusEvent, EventPublisher, NullPublisher, TracingPublisher};
pub use filter::FilterCriteria;
pub use generate::{GeneratedRecord, GenerationManifest};
pub use index::{Corpus, CorpusBuilder};
pub use model::{Chunk, Dataset, GtSelection, PathRow, Song, SongId, SourceSelection};

use std::path::PathBuf;

/// Corpus loading, filtering and generation errors.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("dataset {dataset}: {message}")]
    DatasetStructure { dataset: String, message: String },

    #[error("dataset {dataset}, song {song}: {message}")]
    SongStructure {
        dataset: String,
        song: String,
        message: String,
    },

    #[error("dataset {dataset}, song {song}: instrument {instrument} not found")]
    InstrumentNotFound {
        dataset: String,
        song: String,
        instrument: String,
    },

    #[error("dataset {dataset}, song {song}: a single source needs exactly one target instrument")]
    NoTargetInstrument { dataset: String, song: String },

    #[error("row {row} out of range for path list of length {len}")]
    RowOutOfRange { row: usize, len: usize },

    #[error(transparent)]
    GroundTruth(#[from] groundtruth::Error),
}

pub type Result<T> = std::result::Result<T, CorpusError>;

impl Corpus {
    /// Load a corpus description from a JSON file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        loader::load_from_file(path.as_ref())
    }
}
