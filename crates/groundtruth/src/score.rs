use crate::alignment;
use crate::types::{is_missing, AlignmentKind, GroundTruth, SENTINEL};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One note of a materialized score. Absent cells hold [`SENTINEL`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteRow {
    pub pitch: f64,
    pub onset: f64,
    pub offset: f64,
    pub velocity: f64,
    pub program: f64,
    /// Position of the originating record in the song's ground-truth list
    pub source_index: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreColumn {
    Pitch,
    Onset,
    Offset,
    Velocity,
    Program,
    SourceIndex,
}

impl NoteRow {
    pub fn get(&self, column: ScoreColumn) -> f64 {
        match column {
            ScoreColumn::Pitch => self.pitch,
            ScoreColumn::Onset => self.onset,
            ScoreColumn::Offset => self.offset,
            ScoreColumn::Velocity => self.velocity,
            ScoreColumn::Program => self.program,
            ScoreColumn::SourceIndex => self.source_index,
        }
    }

    pub fn to_array(&self) -> [f64; 6] {
        [
            self.pitch,
            self.onset,
            self.offset,
            self.velocity,
            self.program,
            self.source_index,
        ]
    }
}

/// Canonical note matrix: `[pitch, onset, offset, velocity, program, source]`
/// per row, sorted by onset. Rows whose onset is missing come last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreMatrix {
    rows: Vec<NoteRow>,
}

impl ScoreMatrix {
    pub fn rows(&self) -> &[NoteRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, column: ScoreColumn) -> Vec<f64> {
        self.rows.iter().map(|r| r.get(column)).collect()
    }

    /// Latest offset, or latest onset when no offset is known, or 0.
    pub fn duration(&self) -> f64 {
        let latest = |column| {
            self.rows
                .iter()
                .map(|r| r.get(column))
                .filter(|v| !is_missing(*v))
                .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
        };
        latest(ScoreColumn::Offset)
            .or_else(|| latest(ScoreColumn::Onset))
            .unwrap_or(0.0)
    }

    /// Rescale onsets and offsets so their span matches `target`'s span.
    ///
    /// Missing cells are left untouched. A matrix with a zero-length span
    /// is moved to the start of the target span.
    pub fn stretch_to(&mut self, target: &ScoreMatrix) {
        let (Some((in_min, in_max)), Some((out_min, out_max))) = (self.time_span(), target.time_span())
        else {
            return;
        };

        let in_len = in_max - in_min;
        let out_len = out_max - out_min;
        let scale = |t: f64| {
            if is_missing(t) {
                t
            } else if in_len > 0.0 {
                (t - in_min) / in_len * out_len + out_min
            } else {
                out_min
            }
        };

        for row in &mut self.rows {
            row.onset = scale(row.onset);
            row.offset = scale(row.offset);
        }
    }

    fn time_span(&self) -> Option<(f64, f64)> {
        self.rows
            .iter()
            .flat_map(|r| [r.onset, r.offset])
            .filter(|t| !is_missing(*t))
            .fold(None, |acc, t| match acc {
                None => Some((t, t)),
                Some((lo, hi)) => Some((f64::min(lo, t), f64::max(hi, t))),
            })
    }
}

fn pad_to(column: &[f64], len: usize) -> Vec<f64> {
    let mut padded = column.to_vec();
    padded.resize(len, SENTINEL);
    padded
}

/// Build the note matrix of `kind` from every record of a song.
///
/// Each record is made rectangular on its own: the longest of its four
/// note columns sets the row count and every shorter column is padded with
/// [`SENTINEL`]; nothing is truncated. Blocks are concatenated in record
/// order and then stably sorted by onset, rows without an onset last.
pub fn materialize(gts: &[GroundTruth], kind: AlignmentKind) -> ScoreMatrix {
    let mut rows = Vec::new();

    for (source_index, gt) in gts.iter().enumerate() {
        let notes = gt.alignment(kind);
        let len = [
            notes.pitches.len(),
            notes.onsets.len(),
            notes.offsets.len(),
            notes.velocities.len(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0);

        if len != notes.pitches.len() || len != notes.onsets.len() {
            debug!(
                source_index,
                kind = %kind,
                pitches = notes.pitches.len(),
                onsets = notes.onsets.len(),
                offsets = notes.offsets.len(),
                velocities = notes.velocities.len(),
                "ragged note columns, padding"
            );
        }

        let pitches = pad_to(&notes.pitches, len);
        let onsets = pad_to(&notes.onsets, len);
        let offsets = pad_to(&notes.offsets, len);
        let velocities = pad_to(&notes.velocities, len);

        rows.extend((0..len).map(|i| NoteRow {
            pitch: pitches[i],
            onset: onsets[i],
            offset: offsets[i],
            velocity: velocities[i],
            program: gt.instrument as f64,
            source_index: source_index as f64,
        }));
    }

    rows.sort_by(|a, b| {
        is_missing(a.onset)
            .cmp(&is_missing(b.onset))
            .then(a.onset.total_cmp(&b.onset))
    });
    ScoreMatrix { rows }
}

/// Select the variant for `requested` and materialize it.
pub fn score_matrix(gts: &[GroundTruth], requested: &[AlignmentKind]) -> ScoreMatrix {
    materialize(gts, alignment::choose(requested, gts))
}

/// Span of the best-aligned score available for a song.
pub fn score_duration(gts: &[GroundTruth]) -> f64 {
    score_matrix(gts, &AlignmentKind::ALL).duration()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NoteArrays;
    use pretty_assertions::assert_eq;

    fn gt(kind: AlignmentKind, notes: NoteArrays, instrument: u8) -> GroundTruth {
        let mut gt = GroundTruth {
            instrument,
            ..Default::default()
        };
        *gt.alignment_mut(kind) = notes;
        gt
    }

    #[test]
    fn ragged_columns_are_padded_not_truncated() {
        let notes = NoteArrays {
            pitches: vec![60.0, 62.0],
            onsets: vec![0.0],
            offsets: vec![],
            velocities: vec![80.0, 90.0, 100.0],
        };
        let mat = materialize(&[gt(AlignmentKind::Score, notes, 0)], AlignmentKind::Score);

        assert_eq!(mat.len(), 3);
        assert_eq!(mat.column(ScoreColumn::Pitch), vec![60.0, 62.0, SENTINEL]);
        assert_eq!(mat.column(ScoreColumn::Onset), vec![0.0, SENTINEL, SENTINEL]);
        assert_eq!(mat.column(ScoreColumn::Offset), vec![SENTINEL; 3]);
        assert_eq!(mat.column(ScoreColumn::Velocity), vec![80.0, 90.0, 100.0]);
    }

    #[test]
    fn empty_onsets_become_sentinels() {
        let notes = NoteArrays {
            pitches: vec![60.0, 64.0],
            ..Default::default()
        };
        let mat = materialize(&[gt(AlignmentKind::Score, notes, 0)], AlignmentKind::Score);
        assert_eq!(mat.len(), 2);
        assert!(mat.rows().iter().all(|r| is_missing(r.onset) && is_missing(r.velocity)));
        assert_eq!(mat.column(ScoreColumn::Pitch), vec![60.0, 64.0]);
    }

    #[test]
    fn sources_interleave_by_onset_with_stable_ties() {
        let a = gt(
            AlignmentKind::PreciseAlignment,
            NoteArrays {
                pitches: vec![60.0, 67.0],
                onsets: vec![0.0, 1.0],
                offsets: vec![0.5, 1.5],
                velocities: vec![70.0, 71.0],
            },
            40,
        );
        let b = gt(
            AlignmentKind::PreciseAlignment,
            NoteArrays {
                pitches: vec![48.0, 55.0],
                onsets: vec![0.5, 1.0],
                offsets: vec![1.0, 2.0],
                velocities: vec![60.0, 61.0],
            },
            42,
        );

        let mat = materialize(&[a, b], AlignmentKind::PreciseAlignment);
        assert_eq!(mat.column(ScoreColumn::Pitch), vec![60.0, 48.0, 67.0, 55.0]);
        assert_eq!(mat.column(ScoreColumn::SourceIndex), vec![0.0, 1.0, 0.0, 1.0]);
        assert_eq!(mat.column(ScoreColumn::Program), vec![40.0, 42.0, 40.0, 42.0]);
        assert_eq!(mat.rows()[2].to_array(), [67.0, 1.0, 1.5, 71.0, 40.0, 0.0]);
    }

    #[test]
    fn duration_uses_best_alignment() {
        let mut record = gt(
            AlignmentKind::Score,
            NoteArrays {
                pitches: vec![60.0],
                onsets: vec![0.0],
                offsets: vec![8.0],
                velocities: vec![],
            },
            0,
        );
        record.broad_alignment = NoteArrays {
            pitches: vec![60.0],
            onsets: vec![0.2],
            offsets: vec![3.5],
            velocities: vec![],
        };
        assert_eq!(score_duration(&[record]), 3.5);
    }

    #[test]
    fn duration_without_offsets_uses_onsets() {
        let record = gt(
            AlignmentKind::Score,
            NoteArrays {
                pitches: vec![60.0, 62.0],
                onsets: vec![0.0, 2.0],
                ..Default::default()
            },
            0,
        );
        assert_eq!(score_duration(&[record]), 2.0);
        assert_eq!(score_duration(&[]), 0.0);
    }

    #[test]
    fn stretch_maps_span_onto_target() {
        let source = gt(
            AlignmentKind::Score,
            NoteArrays {
                pitches: vec![60.0, 62.0],
                onsets: vec![0.0, 1.0],
                offsets: vec![1.0, 2.0],
                velocities: vec![],
            },
            0,
        );
        let target = gt(
            AlignmentKind::Score,
            NoteArrays {
                pitches: vec![60.0],
                onsets: vec![10.0],
                offsets: vec![14.0],
                velocities: vec![],
            },
            0,
        );

        let mut mat = materialize(&[source], AlignmentKind::Score);
        mat.stretch_to(&materialize(&[target], AlignmentKind::Score));

        assert_eq!(mat.column(ScoreColumn::Onset), vec![10.0, 12.0]);
        assert_eq!(mat.column(ScoreColumn::Offset), vec![12.0, 14.0]);
        assert!(mat.rows().iter().all(|r| is_missing(r.velocity)));
    }
}
