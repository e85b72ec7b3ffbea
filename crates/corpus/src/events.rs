//! Progress events published while filtering and generating.

use crate::model::Chunk;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Event emitted as datasets and songs are processed
#[derive(Debug, Clone, PartialEq)]
pub enum CorpusEvent {
    DatasetIncluded {
        name: String,
        chunk: Chunk,
    },
    DatasetExcluded {
        name: String,
    },
    SongExcluded {
        dataset: String,
        song: String,
    },
    /// Song passed the predicates but its source could not be resolved
    SongSkipped {
        dataset: String,
        song: String,
        reason: String,
    },
    GenerationStarted {
        dataset: String,
    },
    DatasetSkipped {
        dataset: String,
    },
    RecordGenerated {
        dataset: String,
        song: String,
        output: PathBuf,
    },
}

/// Trait for receiving corpus events
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: CorpusEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPublisher;

impl EventPublisher for TracingPublisher {
    fn publish(&self, event: CorpusEvent) {
        match event {
            CorpusEvent::DatasetIncluded { name, chunk } => {
                info!(dataset = %name, start = chunk.start, end = chunk.end, "dataset included")
            }
            CorpusEvent::DatasetExcluded { name } => debug!(dataset = %name, "dataset excluded"),
            CorpusEvent::SongExcluded { dataset, song } => {
                debug!(dataset = %dataset, song = %song, "song excluded")
            }
            CorpusEvent::SongSkipped {
                dataset,
                song,
                reason,
            } => warn!(dataset = %dataset, song = %song, reason = %reason, "song skipped"),
            CorpusEvent::GenerationStarted { dataset } => {
                info!(dataset = %dataset, "generating ground truth")
            }
            CorpusEvent::DatasetSkipped { dataset } => info!(dataset = %dataset, "dataset skipped"),
            CorpusEvent::RecordGenerated {
                dataset,
                song,
                output,
            } => debug!(dataset = %dataset, song = %song, output = %output.display(), "record generated"),
        }
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

impl EventPublisher for NullPublisher {
    fn publish(&self, _event: CorpusEvent) {}
}
