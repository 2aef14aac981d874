//! Per-store poll ordering, deduplication and horizon restriction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::{PollStatus, StatusPoll};

/// A store's polls prepared for extrapolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreTimeline {
    /// Status of the most recent poll strictly before the horizon, if any.
    /// Seeds the stretch of horizon before the first in-horizon sample.
    pub seed: Option<PollStatus>,

    /// Samples within `[horizon_start, now]`, ascending, one per instant.
    pub samples: Vec<(DateTime<Utc>, PollStatus)>,
}

/// Time-ordered poll sequences, one per store.
///
/// Polls are sorted ascending and deduplicated by identical instant with
/// last-seen-wins semantics. Nothing after the reference `now` is ever
/// handed to the extrapolator: future data never informs a report.
pub struct ObservationTimeline {
    by_store: HashMap<String, Vec<(DateTime<Utc>, PollStatus)>>,
}

impl ObservationTimeline {
    pub fn new(polls: &[StatusPoll]) -> Self {
        let mut by_store: HashMap<String, Vec<(DateTime<Utc>, PollStatus)>> = HashMap::new();
        for poll in polls {
            by_store
                .entry(poll.store_id.clone())
                .or_default()
                .push((poll.timestamp_utc, poll.status));
        }

        for samples in by_store.values_mut() {
            // Stable sort keeps input order within an instant, so keeping
            // the last of each equal run gives last-seen-wins dedup.
            samples.sort_by_key(|(ts, _)| *ts);
            let mut deduped: Vec<(DateTime<Utc>, PollStatus)> =
                Vec::with_capacity(samples.len());
            for sample in samples.drain(..) {
                match deduped.last_mut() {
                    Some(last) if last.0 == sample.0 => *last = sample,
                    _ => deduped.push(sample),
                }
            }
            *samples = deduped;
        }

        Self { by_store }
    }

    /// The store's timeline restricted to `[horizon_start, now]`, plus the
    /// seed poll immediately before the horizon when one exists.
    pub fn polls_for(
        &self,
        store_id: &str,
        horizon_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreTimeline {
        let Some(samples) = self.by_store.get(store_id) else {
            return StoreTimeline {
                seed: None,
                samples: Vec::new(),
            };
        };

        let first_in = samples.partition_point(|(ts, _)| *ts < horizon_start);
        let seed = first_in.checked_sub(1).map(|i| samples[i].1);
        let in_horizon = samples[first_in..]
            .iter()
            .take_while(|(ts, _)| *ts <= now)
            .copied()
            .collect();

        StoreTimeline {
            seed,
            samples: in_horizon,
        }
    }
}
