//! Ground-truth records for music annotation corpora.
//!
//! Partial records produced per source format are merged into canonical
//! [`GroundTruth`] records, which are then materialized into rectangular
//! numeric matrices:
//!
//! - [`score::materialize`] for notes, with ragged columns padded by [`SENTINEL`]
//! - [`pedal::materialize_events`] and [`pedal::materialize_frames`] for pedaling
//!
//! ```
//! use groundtruth::{score, AlignmentKind, GroundTruth, NoteArrays};
//!
//! let gt = GroundTruth {
//!     score: NoteArrays {
//!         pitches: vec![60.0, 64.0],
//!         onsets: vec![0.0, 0.5],
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! let mat = score::score_matrix(&[gt], &[AlignmentKind::PreciseAlignment, AlignmentKind::Score]);
//! assert_eq!(mat.len(), 2);
//! ```

pub mod alignment;
pub mod frames;
pub mod merge;
pub mod pedal;
pub mod score;
pub mod types;

pub use alignment::choose;
pub use merge::{merge, Merged, MergedField, MergedRecord, PartialRecord};
pub use pedal::{PedalEvent, PedalFrame, PedalKind, NOT_AFFECTED};
pub use score::{NoteRow, ScoreColumn, ScoreMatrix};
pub use types::{is_missing, AlignmentKind, GroundTruth, NoteArrays, PedalTrack, SENTINEL};

/// Errors from merging, decoding and materializing ground-truth records.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot merge record lists of different lengths: list {position} has {found}, expected {expected}")]
    LengthMismatch {
        expected: usize,
        found: usize,
        position: usize,
    },

    #[error("field {key} is a mapping in one record and a value in another")]
    ShapeMismatch { key: String },

    #[error("invalid ground-truth record: {0}")]
    Decode(String),
    #[error("invalid frame geometry: frame_len {frame_len}, hop {hop}")]
    InvalidFrames { frame_len: f64, hop: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;
