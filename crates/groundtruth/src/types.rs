use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Out-of-domain marker for a cell with no value.
///
/// Valid domains are pitch 0–127, velocity 0–127 and time ≥ 0, so consumers
/// compare against this exact value rather than testing the sign.
pub const SENTINEL: f64 = -255.0;

/// True when `value` is the missing-cell marker.
pub fn is_missing(value: f64) -> bool {
    value == SENTINEL
}

/// Temporal-accuracy class of an annotation variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentKind {
    /// Manually verified alignment
    PreciseAlignment,
    /// Coarser alignment
    BroadAlignment,
    /// Deliberately offset alignment
    Misaligned,
    /// Symbolic score, no timing guarantee
    Score,
}

impl AlignmentKind {
    pub const ALL: [AlignmentKind; 4] = [
        AlignmentKind::PreciseAlignment,
        AlignmentKind::BroadAlignment,
        AlignmentKind::Misaligned,
        AlignmentKind::Score,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlignmentKind::PreciseAlignment => "precise_alignment",
            AlignmentKind::BroadAlignment => "broad_alignment",
            AlignmentKind::Misaligned => "misaligned",
            AlignmentKind::Score => "score",
        }
    }
}

impl fmt::Display for AlignmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlignmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlignmentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown alignment kind: {}", s))
    }
}

/// Note columns of one annotation variant. Columns may be ragged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteArrays {
    #[serde(default)]
    pub pitches: Vec<f64>,
    #[serde(default)]
    pub onsets: Vec<f64>,
    #[serde(default)]
    pub offsets: Vec<f64>,
    #[serde(default)]
    pub velocities: Vec<f64>,
}

impl NoteArrays {
    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }
}

/// Sparse control-change stream for one pedal type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PedalTrack {
    #[serde(default)]
    pub times: Vec<f64>,
    #[serde(default)]
    pub values: Vec<f64>,
}

impl PedalTrack {
    /// `(time, value)` pairs, truncated to the shorter of the two columns.
    pub fn changes(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.values.iter().copied())
    }
}

/// Reference annotation for one source (instrument) of a recording.
///
/// The four alignment variants are required keys; everything else may be
/// absent from a record and defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    /// MIDI program of the source instrument
    #[serde(default)]
    pub instrument: u8,
    #[serde(default)]
    pub pitches: Vec<f64>,
    #[serde(default)]
    pub onsets: Vec<f64>,
    #[serde(default)]
    pub offsets: Vec<f64>,
    #[serde(default)]
    pub velocities: Vec<f64>,
    #[serde(default)]
    pub f0: Vec<f64>,
    #[serde(default)]
    pub sustain: PedalTrack,
    #[serde(default)]
    pub sostenuto: PedalTrack,
    #[serde(default)]
    pub soft: PedalTrack,
    pub precise_alignment: NoteArrays,
    pub broad_alignment: NoteArrays,
    pub misaligned: NoteArrays,
    pub score: NoteArrays,
}

impl GroundTruth {
    /// Note columns for one alignment variant.
    pub fn alignment(&self, kind: AlignmentKind) -> &NoteArrays {
        match kind {
            AlignmentKind::PreciseAlignment => &self.precise_alignment,
            AlignmentKind::BroadAlignment => &self.broad_alignment,
            AlignmentKind::Misaligned => &self.misaligned,
            AlignmentKind::Score => &self.score,
        }
    }

    pub fn alignment_mut(&mut self, kind: AlignmentKind) -> &mut NoteArrays {
        match kind {
            AlignmentKind::PreciseAlignment => &mut self.precise_alignment,
            AlignmentKind::BroadAlignment => &mut self.broad_alignment,
            AlignmentKind::Misaligned => &mut self.misaligned,
            AlignmentKind::Score => &mut self.score,
        }
    }

    /// Decode a record from JSON, naming the first missing or ill-typed field on failure.
    pub fn from_json(value: serde_json::Value) -> crate::Result<Self> {
        serde_json::from_value(value).map_err(|e| crate::Error::Decode(e.to_string()))
    }
}
