//! Bounded-parallel fetch rounds
//!
//! Each round issues `parallel_requests` windows against the same id filter,
//! at offsets `0, page_size, 2 * page_size, ...` within the filtered view.
//! Offsets therefore stay small no matter how far the sync has progressed;
//! the cursor, not the offset, carries the position between rounds.

use super::page::PageFetcher;
use super::types::{FetchOutcome, FetchWindow, RoundResult};
use crate::error::{Error, Result};
use crate::source::PageSource;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info};

/// Issues one round of concurrent page fetches and merges them in order
pub struct ParallelFetchCoordinator<S: ?Sized> {
    fetcher: PageFetcher<S>,
    page_size: u64,
    parallel_requests: usize,
}

impl<S: PageSource + ?Sized> ParallelFetchCoordinator<S> {
    /// Create a coordinator
    pub fn new(fetcher: PageFetcher<S>, page_size: u64, parallel_requests: usize) -> Self {
        Self {
            fetcher,
            page_size,
            parallel_requests: parallel_requests.max(1),
        }
    }

    /// The underlying page fetcher
    pub fn fetcher(&self) -> &PageFetcher<S> {
        &self.fetcher
    }

    /// Slot windows for a round starting after `id_cursor`
    pub fn slots(&self, template: &FetchWindow, id_cursor: Option<i64>) -> Vec<FetchWindow> {
        (0..self.parallel_requests as u64)
            .map(|i| {
                let mut window = template.at(i * self.page_size, self.page_size);
                window.id_cursor = id_cursor;
                window
            })
            .collect()
    }

    /// Run one round
    ///
    /// Waits for every slot, then processes them in ascending offset order.
    /// The first slot that comes back short ends the stream; slots after it
    /// are discarded. A fatal error from any slot aborts the round and
    /// cancels the slots still in flight. Records none of which carry an
    /// integer `id_field` fail the round, since the cursor could not move.
    pub async fn fetch_round(
        &self,
        template: &FetchWindow,
        id_cursor: Option<i64>,
        id_field: &str,
    ) -> Result<RoundResult> {
        let slots = self.slots(template, id_cursor);
        info!(
            "Parallel fetch: {} id_cursor={:?}, {} slots of {}",
            template.entity_type,
            id_cursor,
            slots.len(),
            self.page_size
        );

        let fetcher = &self.fetcher;
        let mut in_flight: FuturesUnordered<_> = slots
            .into_iter()
            .map(|window| async move {
                let outcome = fetcher.fetch(&window).await;
                (window.skip, outcome)
            })
            .collect();

        let mut completed: Vec<(u64, FetchOutcome)> = Vec::with_capacity(self.parallel_requests);
        while let Some((skip, outcome)) = in_flight.next().await {
            completed.push((skip, outcome?));
        }

        completed.sort_by_key(|(skip, _)| *skip);

        let round = merge_slots(completed, id_field);
        if round.max_id_seen.is_none() && !round.records.is_empty() {
            return Err(Error::MissingPrimaryKey {
                entity: template.entity_type.clone(),
                id_field: id_field.to_string(),
            });
        }
        info!(
            "Fetched {} {} records, max_id={:?}, errors={}, reached_end={}",
            round.records.len(),
            template.entity_type,
            round.max_id_seen,
            round.errors.len(),
            round.reached_end
        );
        Ok(round)
    }
}

/// Merge slot outcomes that are already sorted by offset
fn merge_slots(completed: Vec<(u64, FetchOutcome)>, id_field: &str) -> RoundResult {
    let mut round = RoundResult {
        requests: completed.iter().map(|(_, o)| o.requests).sum(),
        ..RoundResult::default()
    };

    for (skip, outcome) in completed {
        round.slots_used += 1;
        round.errors.extend(outcome.errors);

        for record in &outcome.records {
            if let Some(id) = record.id(id_field) {
                round.max_id_seen = Some(round.max_id_seen.map_or(id, |max| max.max(id)));
            }
        }
        round.records.extend(outcome.records);

        if outcome.end_of_data {
            debug!("End of data in slot at skip={skip}");
            round.reached_end = true;
            break;
        }
    }

    round
}

impl<S: ?Sized> std::fmt::Debug for ParallelFetchCoordinator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelFetchCoordinator")
            .field("fetcher", &self.fetcher)
            .field("page_size", &self.page_size)
            .field("parallel_requests", &self.parallel_requests)
            .finish()
    }
}
