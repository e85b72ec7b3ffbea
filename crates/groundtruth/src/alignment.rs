use crate::types::{AlignmentKind, GroundTruth};
use tracing::warn;

/// Kinds tried, in order, when more than one kind is requested.
/// `Score` is the fallback and is never tested for availability.
pub const PRIORITY: [AlignmentKind; 3] = [
    AlignmentKind::PreciseAlignment,
    AlignmentKind::BroadAlignment,
    AlignmentKind::Misaligned,
];

/// Pick which annotation variant to read from a song's ground truth.
///
/// A single requested kind is returned as is. Otherwise the requested kinds
/// are tried in [`PRIORITY`] order and the first whose pitches are non-empty
/// in the first record wins; if none does, `Score` is returned whether it
/// was requested or not.
pub fn choose(requested: &[AlignmentKind], gts: &[GroundTruth]) -> AlignmentKind {
    if let [only] = requested {
        return *only;
    }

    for kind in PRIORITY {
        if !requested.contains(&kind) {
            continue;
        }
        let available = gts
            .first()
            .map(|gt| !gt.alignment(kind).pitches.is_empty())
            .unwrap_or(false);
        if available {
            return kind;
        }
        warn!(kind = %kind, "requested alignment has no annotations, falling back");
    }

    AlignmentKind::Score
}
