//! Declarative filtering of a corpus down to a working subset.
//!
//! Filtering only ever clears `included` flags; it never touches annotation
//! content. The path list and chunk map are rebuilt from scratch on every
//! call, so filtering twice with the same criteria gives the same views.

use crate::events::{CorpusEvent, EventPublisher, TracingPublisher};
use crate::index::Corpus;
use crate::model::{Chunk, Dataset, GtSelection, PathRow, Song, SongId, SourceSelection};
use crate::CorpusError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Predicates applied by [`Corpus::filter`]. The default keeps everything
/// still included and returns mixed recordings only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Exact instrument set of a song; empty disables the check
    pub instruments: Vec<String>,
    /// Dataset ensemble flag; `None` accepts both
    pub ensemble: Option<bool>,
    /// Return the mixed recording of each song
    pub mixed: bool,
    /// Return source recordings where the song has them
    pub sources: bool,
    /// With `sources`, return every source instead of the first target instrument
    pub all_sources: bool,
    /// Substring of the composer name
    pub composer: String,
    /// Dataset allow-list; empty means every dataset
    pub datasets: Vec<String>,
    /// Groups every song must belong to
    pub groups: Vec<String>,
    /// Required level per annotation kind
    pub ground_truth: BTreeMap<String, u8>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            instruments: Vec::new(),
            ensemble: None,
            mixed: true,
            sources: false,
            all_sources: false,
            composer: String::new(),
            datasets: Vec::new(),
            groups: Vec::new(),
            ground_truth: BTreeMap::new(),
        }
    }
}

impl FilterCriteria {
    fn accepts_dataset(&self, dataset: &Dataset) -> bool {
        let listed = if self.datasets.is_empty() {
            dataset.included
        } else {
            self.datasets.contains(&dataset.name)
        };

        let ensemble = self.ensemble.map_or(true, |e| e == dataset.ensemble);

        // a kind the dataset does not declare never satisfies a requirement
        let levels = self
            .ground_truth
            .iter()
            .all(|(kind, level)| dataset.ground_truth.get(kind) == Some(level));

        listed && ensemble && levels
    }

    fn accepts_song(&self, song: &Song) -> bool {
        song.included
            && (self.instruments.is_empty() || same_instruments(&self.instruments, &song.instruments))
            && (self.composer.is_empty() || song.composer.contains(&self.composer))
            && self.groups.iter().all(|g| song.groups.contains(g))
    }
}

fn same_instruments(requested: &[String], actual: &[String]) -> bool {
    let mut requested = requested.to_vec();
    let mut actual = actual.to_vec();
    requested.sort();
    actual.sort();
    requested == actual
}

fn select_source(
    criteria: &FilterCriteria,
    dataset: &str,
    song: &Song,
) -> Result<(SourceSelection, GtSelection), CorpusError> {
    if !criteria.sources || song.sources.is_empty() {
        return Ok((SourceSelection::None, GtSelection::All));
    }

    if criteria.all_sources {
        return Ok((SourceSelection::All(song.sources.clone()), GtSelection::All));
    }

    let Some(target) = criteria.instruments.first() else {
        return Err(CorpusError::NoTargetInstrument {
            dataset: dataset.to_string(),
            song: song.title.clone(),
        });
    };

    song.instruments
        .iter()
        .position(|i| i == target)
        .and_then(|idx| song.sources.get(idx).map(|path| (idx, path)))
        .map(|(idx, path)| (SourceSelection::One(path.clone()), GtSelection::Source(idx)))
        .ok_or_else(|| CorpusError::InstrumentNotFound {
            dataset: dataset.to_string(),
            song: song.title.clone(),
            instrument: target.clone(),
        })
}

impl Corpus {
    /// Filter in place, reporting progress through `tracing`.
    pub fn filter(&mut self, criteria: &FilterCriteria) -> &mut Self {
        self.filter_with(criteria, &TracingPublisher)
    }

    /// Filter a copy, leaving `self` untouched.
    pub fn filtered(&self, criteria: &FilterCriteria) -> Corpus {
        let mut copy = self.clone();
        copy.filter(criteria);
        copy
    }

    /// Filter in place, publishing one event per dataset and per dropped song.
    pub fn filter_with(&mut self, criteria: &FilterCriteria, publisher: &dyn EventPublisher) -> &mut Self {
        // rows are collected per dataset and placed by a serial prefix sum below
        let mut accepted: Vec<(String, Vec<PathRow>)> = Vec::new();

        for d in 0..self.datasets().len() {
            let dataset = &self.datasets()[d];
            if !criteria.accepts_dataset(dataset) {
                let name = dataset.name.clone();
                self.datasets_mut()[d].included = false;
                publisher.publish(CorpusEvent::DatasetExcluded { name });
                continue;
            }

            let name = dataset.name.clone();
            let rows = self.filter_songs(d, &name, criteria, publisher);
            accepted.push((name, rows));
        }

        self.rows.clear();
        self.chunks.clear();
        for (name, rows) in accepted {
            let start = self.rows.len();
            self.rows.extend(rows);
            let chunk = Chunk {
                dataset: name.clone(),
                start,
                end: self.rows.len(),
            };
            self.chunks.push(chunk.clone());
            publisher.publish(CorpusEvent::DatasetIncluded { name, chunk });
        }

        debug!(rows = self.rows.len(), chunks = self.chunks.len(), "filter applied");
        self
    }

    fn filter_songs(
        &mut self,
        dataset: usize,
        name: &str,
        criteria: &FilterCriteria,
        publisher: &dyn EventPublisher,
    ) -> Vec<PathRow> {
        let mut rows = Vec::new();

        for song in 0..self.songs_of(dataset).len() {
            let id = SongId { dataset, song };
            let Some(entry) = self.song(id) else {
                continue;
            };

            if !criteria.accepts_song(entry) {
                let title = entry.title.clone();
                self.exclude(id);
                publisher.publish(CorpusEvent::SongExcluded {
                    dataset: name.to_string(),
                    song: title,
                });
                continue;
            }

            match select_source(criteria, name, entry) {
                Ok((source, ground_truth)) => rows.push(PathRow {
                    song: id,
                    mix: if criteria.mixed { entry.recording.clone() } else { None },
                    source,
                    ground_truth,
                }),
                Err(err) => {
                    let title = entry.title.clone();
                    self.exclude(id);
                    publisher.publish(CorpusEvent::SongSkipped {
                        dataset: name.to_string(),
                        song: title,
                        reason: err.to_string(),
                    });
                }
            }
        }

        rows
    }

    fn exclude(&mut self, id: SongId) {
        if let Some(song) = self.song_mut(id) {
            song.included = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    struct MockPublisher {
        events: Mutex<Vec<CorpusEvent>>,
    }

    impl MockPublisher {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }

        fn events(&self) -> Vec<CorpusEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl EventPublisher for MockPublisher {
        fn publish(&self, event: CorpusEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn song(title: &str, composer: &str, instruments: &[&str], groups: &[&str]) -> Song {
        let mut song = Song::new(title);
        song.composer = composer.to_string();
        song.instruments = instruments.iter().map(|s| s.to_string()).collect();
        song.groups = groups.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
        song.recording = Some(format!("{}/mix.wav", title).into());
        song
    }

    fn dataset(name: &str, ensemble: bool, levels: &[(&str, u8)]) -> Dataset {
        let mut dataset = Dataset::new(name);
        dataset.ensemble = ensemble;
        dataset.ground_truth = levels.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        dataset
    }

    fn corpus() -> Corpus {
        Corpus::builder(".")
            .dataset(
                dataset("Maestro", false, &[("precise_alignment", 1), ("score", 0)]),
                vec![
                    song("m1", "Chopin", &["piano"], &["train", "solo"]),
                    song("m2", "Bach", &["piano"], &["test"]),
                ],
            )
            .dataset(
                dataset("Bach10", true, &[("precise_alignment", 2), ("score", 1)]),
                vec![song("b1", "Bach", &["violin", "clarinet"], &[])],
            )
            .build()
    }

    #[test]
    fn composer_substring_narrows_rows() {
        let mut corpus = corpus();
        corpus.filter(&FilterCriteria {
            composer: "Bac".into(),
            ..Default::default()
        });

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.chunk("Maestro").map(Chunk::range), Some(0..1));
        assert_eq!(corpus.chunk("Bach10").map(Chunk::range), Some(1..2));
        assert!(!corpus.songs_of(0)[0].included);
    }

    #[test]
    fn ensemble_and_level_checks_exclude_datasets() {
        let mut corpus = corpus();
        let publisher = MockPublisher::new();
        let criteria = FilterCriteria {
            ensemble: Some(true),
            ground_truth: BTreeMap::from([("score".to_string(), 1)]),
            ..Default::default()
        };
        corpus.filter_with(&criteria, &publisher);

        assert_eq!(corpus.len(), 1);
        assert!(corpus.chunk("Maestro").is_none());
        assert!(!corpus.datasets()[0].included);
        // songs of an excluded dataset are left alone
        assert!(corpus.songs_of(0).iter().all(|s| s.included));
        assert_eq!(
            publisher.events()[0],
            CorpusEvent::DatasetExcluded {
                name: "Maestro".into()
            }
        );
    }

    #[test]
    fn unknown_annotation_kind_fails_closed() {
        let corpus = corpus().filtered(&FilterCriteria {
            ground_truth: BTreeMap::from([("f0".to_string(), 0)]),
            ..Default::default()
        });
        assert!(corpus.is_empty());
        assert!(corpus.chunks().is_empty());
    }

    #[test]
    fn groups_are_anded() {
        let mut corpus = corpus();
        corpus.filter(&FilterCriteria {
            groups: vec!["train".into(), "solo".into()],
            ..Default::default()
        });
        assert_eq!(corpus.len(), 1);

        corpus.filter(&FilterCriteria {
            groups: vec!["train".into(), "test".into()],
            ..Default::default()
        });
        assert!(corpus.is_empty());
        // datasets still pass, so their chunks exist with zero width
        assert_eq!(corpus.chunks().len(), 2);
        assert!(corpus.chunks().iter().all(Chunk::is_empty));
    }

    #[test]
    fn instrument_set_ignores_order() {
        let corpus = corpus().filtered(&FilterCriteria {
            instruments: vec!["clarinet".into(), "violin".into()],
            ..Default::default()
        });
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.dataset_of(0).unwrap().name, "Bach10");
    }

    #[test]
    fn allow_list_overrides_included_flag() {
        let mut corpus = corpus();
        corpus.filter(&FilterCriteria {
            datasets: vec!["Bach10".into()],
            ..Default::default()
        });
        assert!(!corpus.datasets()[0].included);

        corpus.filter(&FilterCriteria {
            datasets: vec!["Maestro".into()],
            ..Default::default()
        });
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.chunks().len(), 1);
        // the flag itself is never set back
        assert!(!corpus.datasets()[0].included);
    }

    #[test]
    fn mix_path_follows_mixed_flag() {
        let corpus = corpus().filtered(&FilterCriteria {
            mixed: false,
            ..Default::default()
        });
        assert!(corpus.rows().iter().all(|r| r.mix.is_none()));
    }

    #[test]
    fn select_source_requires_target_instrument() {
        let mut s = song("s", "", &["violin", "cello"], &[]);
        s.sources = vec!["violin.wav".into(), "cello.wav".into()];

        let criteria = FilterCriteria {
            sources: true,
            ..Default::default()
        };
        assert!(matches!(
            select_source(&criteria, "d", &s),
            Err(CorpusError::NoTargetInstrument { .. })
        ));

        let criteria = FilterCriteria {
            sources: true,
            instruments: vec!["cello".into()],
            ..Default::default()
        };
        assert_eq!(
            select_source(&criteria, "d", &s).unwrap(),
            (SourceSelection::One("cello.wav".into()), GtSelection::Source(1))
        );
    }

    fn quartets() -> Corpus {
        let mut full = song("q1", "Haydn", &["violin", "cello"], &[]);
        full.sources = vec!["q1/violin.wav".into(), "q1/cello.wav".into()];
        let mut short = song("q2", "Haydn", &["violin", "cello"], &[]);
        short.sources = vec!["q2/violin.wav".into()];

        Corpus::builder(".")
            .dataset(dataset("Quartets", true, &[]), vec![full, short])
            .build()
    }

    fn assert_partitioned(corpus: &Corpus) {
        let mut next = 0;
        for chunk in corpus.chunks() {
            assert_eq!(chunk.start, next, "{:?}", corpus.chunks());
            next = chunk.end;
        }
        assert_eq!(next, corpus.len());
    }

    fn skipped(events: &[CorpusEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                CorpusEvent::SongSkipped { song, .. } => Some(song.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn missing_source_skips_only_that_song() {
        let mut corpus = quartets();
        let publisher = MockPublisher::new();
        let criteria = FilterCriteria {
            instruments: vec!["cello".into(), "violin".into()],
            sources: true,
            ..Default::default()
        };
        corpus.filter_with(&criteria, &publisher);

        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.rows()[0].source, SourceSelection::One("q1/cello.wav".into()));
        assert!(corpus.songs_of(0)[0].included);
        assert!(!corpus.songs_of(0)[1].included);
        assert_eq!(skipped(&publisher.events()), vec!["q2"]);
        assert!(publisher.events().iter().any(|e| matches!(
            e,
            CorpusEvent::SongSkipped { reason, .. } if reason.contains("instrument cello not found")
        )));
        assert_partitioned(&corpus);

        let rows = corpus.rows().to_vec();
        let chunks = corpus.chunks().to_vec();
        corpus.filter_with(&criteria, &publisher);
        assert_eq!(corpus.rows(), rows.as_slice());
        assert_eq!(corpus.chunks(), chunks.as_slice());
    }

    #[test]
    fn single_source_without_target_skips_songs() {
        let mut corpus = quartets();
        let publisher = MockPublisher::new();
        let criteria = FilterCriteria {
            sources: true,
            ..Default::default()
        };
        corpus.filter_with(&criteria, &publisher);

        assert!(corpus.is_empty());
        assert!(corpus.songs_of(0).iter().all(|s| !s.included));
        assert_eq!(skipped(&publisher.events()), vec!["q1", "q2"]);
        assert_eq!(corpus.chunk("Quartets").map(Chunk::range), Some(0..0));
        assert_partitioned(&corpus);

        let chunks = corpus.chunks().to_vec();
        corpus.filter_with(&criteria, &publisher);
        assert!(corpus.is_empty());
        assert_eq!(corpus.chunks(), chunks.as_slice());
    }
}
