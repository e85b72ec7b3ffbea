//! Pedal control-change materialization.
//!
//! Event mode lists every control change of a record with the value in the
//! column of its pedal type and [`NOT_AFFECTED`] elsewhere. Frame mode
//! reconstructs a fixed-rate signal per pedal type by zero-order hold over
//! the same event stream.

use crate::frames;
use crate::score;
use crate::types::GroundTruth;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Value of a pedal column that a control change does not touch.
pub const NOT_AFFECTED: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PedalKind {
    Sustain,
    Sostenuto,
    Soft,
}

impl PedalKind {
    /// Column order of event and frame matrices, after the time column.
    pub const ALL: [PedalKind; 3] = [PedalKind::Sustain, PedalKind::Sostenuto, PedalKind::Soft];

    pub fn index(self) -> usize {
        match self {
            PedalKind::Sustain => 0,
            PedalKind::Sostenuto => 1,
            PedalKind::Soft => 2,
        }
    }
}

/// One control change: `[time, sustain, sostenuto, soft]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PedalEvent {
    pub time: f64,
    pub sustain: f64,
    pub sostenuto: f64,
    pub soft: f64,
}

impl PedalEvent {
    fn new(time: f64, kind: PedalKind, value: f64) -> Self {
        let mut values = [NOT_AFFECTED; 3];
        values[kind.index()] = value;
        Self {
            time,
            sustain: values[0],
            sostenuto: values[1],
            soft: values[2],
        }
    }

    pub fn values(&self) -> [f64; 3] {
        [self.sustain, self.sostenuto, self.soft]
    }

    /// Pedal type of this change: the column holding the largest value.
    /// Exactly one column is real and the others are [`NOT_AFFECTED`].
    pub fn kind(&self) -> PedalKind {
        let values = self.values();
        let mut best = 0;
        for (i, v) in values.iter().enumerate().skip(1) {
            if *v > values[best] {
                best = i;
            }
        }
        PedalKind::ALL[best]
    }

    pub fn value(&self) -> f64 {
        self.values()[self.kind().index()]
    }
}

/// One frame of the held pedal state: `[centre time, sustain, sostenuto, soft]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PedalFrame {
    pub time: f64,
    pub sustain: f64,
    pub sostenuto: f64,
    pub soft: f64,
}

impl PedalFrame {
    pub fn get(&self, kind: PedalKind) -> f64 {
        match kind {
            PedalKind::Sustain => self.sustain,
            PedalKind::Sostenuto => self.sostenuto,
            PedalKind::Soft => self.soft,
        }
    }

    fn set(&mut self, kind: PedalKind, value: f64) {
        match kind {
            PedalKind::Sustain => self.sustain = value,
            PedalKind::Sostenuto => self.sostenuto = value,
            PedalKind::Soft => self.soft = value,
        }
    }
}

/// Time-sorted control changes of one record. Ties keep the order
/// sustain, sostenuto, soft.
pub fn events(gt: &GroundTruth) -> Vec<PedalEvent> {
    let tracks = [
        (PedalKind::Sustain, &gt.sustain),
        (PedalKind::Sostenuto, &gt.sostenuto),
        (PedalKind::Soft, &gt.soft),
    ];

    let mut events: Vec<PedalEvent> = tracks
        .iter()
        .flat_map(|(kind, track)| {
            track
                .changes()
                .map(move |(time, value)| PedalEvent::new(time, *kind, value))
        })
        .collect();
    events.sort_by(|a, b| a.time.total_cmp(&b.time));
    events
}

/// Event matrices, one per record of the song.
pub fn materialize_events(gts: &[GroundTruth]) -> Vec<Vec<PedalEvent>> {
    gts.iter().map(events).collect()
}

/// Frame matrices, one per record, spanning the song's best-aligned score.
///
/// The frame count is `floor((duration - frame_len) / hop) + 1` plus one
/// extra frame so the last event always lands inside the matrix. `hop` must
/// be positive and finite, `frame_len` finite.
pub fn materialize_frames(gts: &[GroundTruth], frame_len: f64, hop: f64) -> Result<Vec<Vec<PedalFrame>>> {
    if !(hop > 0.0 && hop.is_finite() && frame_len.is_finite()) {
        return Err(Error::InvalidFrames { frame_len, hop });
    }

    let duration = score::score_duration(gts);
    // float to int casts saturate; the sum must not overflow
    let n_frames = (frames::nframes(duration, hop, frame_len).floor() as i64)
        .saturating_add(1)
        .max(0) as usize;
    debug!(duration, n_frames, frame_len, hop, "materializing pedal frames");

    Ok(gts
        .iter()
        .map(|gt| hold(&events(gt), n_frames, frame_len, hop))
        .collect())
}

struct Held {
    frame: usize,
    value: f64,
}

/// Zero-order hold of each pedal column over `n_frames` frames.
fn hold(events: &[PedalEvent], n_frames: usize, frame_len: f64, hop: f64) -> Vec<PedalFrame> {
    let mut out: Vec<PedalFrame> = (0..n_frames)
        .map(|i| PedalFrame {
            time: frames::frame_to_time(i, hop, frame_len),
            sustain: 0.0,
            sostenuto: 0.0,
            soft: 0.0,
        })
        .collect();

    // control changes for different pedals are asynchronous
    let mut held: [Held; 3] = std::array::from_fn(|_| Held { frame: 0, value: 0.0 });

    for event in events {
        let frame = frames::time_to_frame(event.time, hop, frame_len).clamp(0, n_frames as i64) as usize;
        let kind = event.kind();
        let state = &mut held[kind.index()];

        for row in out.iter_mut().take(frame).skip(state.frame) {
            row.set(kind, state.value);
        }
        state.frame = frame;
        state.value = event.value();
    }

    if !events.is_empty() {
        for kind in PedalKind::ALL {
            let state = &held[kind.index()];
            for row in out.iter_mut().skip(state.frame) {
                row.set(kind, state.value);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NoteArrays, PedalTrack};
    use pretty_assertions::assert_eq;

    fn piano(duration: f64) -> GroundTruth {
        GroundTruth {
            score: NoteArrays {
                pitches: vec![60.0],
                onsets: vec![0.0],
                offsets: vec![duration],
                velocities: vec![],
            },
            ..Default::default()
        }
    }

    fn track(changes: &[(f64, f64)]) -> PedalTrack {
        PedalTrack {
            times: changes.iter().map(|c| c.0).collect(),
            values: changes.iter().map(|c| c.1).collect(),
        }
    }

    #[test]
    fn events_mark_untouched_columns() {
        let mut gt = piano(1.0);
        gt.sustain = track(&[(0.5, 127.0), (0.0, 0.0)]);
        gt.soft = track(&[(0.5, 64.0)]);
        gt.sostenuto = track(&[(0.5, 10.0)]);

        let matrices = materialize_events(&[gt]);
        assert_eq!(matrices.len(), 1);
        let rows: Vec<[f64; 4]> = matrices[0]
            .iter()
            .map(|e| [e.time, e.sustain, e.sostenuto, e.soft])
            .collect();
        assert_eq!(
            rows,
            vec![
                [0.0, 0.0, -1.0, -1.0],
                [0.5, 127.0, -1.0, -1.0],
                [0.5, -1.0, 10.0, -1.0],
                [0.5, -1.0, -1.0, 64.0],
            ]
        );
    }

    #[test]
    fn event_kind_is_argmax_column() {
        let event = PedalEvent::new(1.0, PedalKind::Soft, 0.0);
        assert_eq!(event.kind(), PedalKind::Soft);
        assert_eq!(event.value(), 0.0);
    }

    #[test]
    fn zero_order_hold_between_changes() {
        let mut gt = piano(2.0);
        gt.sustain = track(&[(0.0, 0.0), (1.0, 127.0)]);

        let matrices = materialize_frames(&[gt], 0.5, 0.5).unwrap();
        let frames = &matrices[0];

        assert_eq!(frames.len(), 5);
        let times: Vec<f64> = frames.iter().map(|f| f.time).collect();
        assert_eq!(times, vec![0.25, 0.75, 1.25, 1.75, 2.25]);
        let sustain: Vec<f64> = frames.iter().map(|f| f.sustain).collect();
        assert_eq!(sustain, vec![0.0, 0.0, 127.0, 127.0, 127.0]);
        assert!(frames.iter().all(|f| f.sostenuto == 0.0 && f.soft == 0.0));
    }

    #[test]
    fn zero_length_frames_use_change_frame_boundaries() {
        let mut gt = piano(2.0);
        gt.sustain = track(&[(0.0, 0.0), (1.0, 127.0)]);

        let frames = &materialize_frames(&[gt], 0.0, 0.5).unwrap()[0];
        assert_eq!(frames.len(), 6);
        assert_eq!(frames[1].time, 0.5);
        assert_eq!(frames[1].sustain, 0.0);
        assert_eq!(frames[2].time, 1.0);
        assert!(frames[2..].iter().all(|f| f.sustain == 127.0));
    }

    #[test]
    fn pedal_types_hold_independently() {
        let mut gt = piano(3.0);
        gt.sustain = track(&[(0.0, 100.0), (2.0, 0.0)]);
        gt.soft = track(&[(1.0, 50.0)]);

        let frames = &materialize_frames(&[gt], 0.0, 1.0).unwrap()[0];
        let sustain: Vec<f64> = frames.iter().map(|f| f.get(PedalKind::Sustain)).collect();
        let soft: Vec<f64> = frames.iter().map(|f| f.get(PedalKind::Soft)).collect();

        assert_eq!(sustain, vec![100.0, 100.0, 0.0, 0.0, 0.0]);
        assert_eq!(soft, vec![0.0, 50.0, 50.0, 50.0, 50.0]);
    }

    #[test]
    fn late_events_are_clamped_to_matrix() {
        let mut gt = piano(1.0);
        gt.sostenuto = track(&[(10.0, 90.0)]);

        let frames = &materialize_frames(&[gt], 0.0, 0.5).unwrap()[0];
        assert_eq!(frames.len(), 4);
        assert!(frames.iter().all(|f| f.sostenuto == 0.0));
    }

    #[test]
    fn non_positive_hop_is_rejected() {
        let mut gt = piano(1.0);
        gt.sustain = track(&[(0.0, 127.0)]);
        let gts = [gt];

        for hop in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                materialize_frames(&gts, 0.046, hop),
                Err(Error::InvalidFrames { .. })
            ));
        }
        assert!(materialize_frames(&gts, f64::NAN, 0.5).is_err());
    }

    #[test]
    fn one_matrix_per_record() {
        let gts = vec![piano(1.0), piano(1.0)];
        assert_eq!(materialize_frames(&gts, 0.046, 0.01).unwrap().len(), 2);
        assert_eq!(materialize_events(&gts), vec![Vec::new(), Vec::new()]);
    }
}
