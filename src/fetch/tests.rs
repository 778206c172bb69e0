//! Tests for adaptive and parallel fetching

use super::*;
use crate::error::Error;
use crate::test_support::MockSource;
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;

fn window(take: u64) -> FetchWindow {
    FetchWindow::new("gifts", take)
}

fn ids(records: &[crate::types::RawRecord]) -> Vec<i64> {
    records.iter().filter_map(|r| r.id("id")).collect()
}

// ============================================================================
// Page size sequence
// ============================================================================

#[test_case(1000 => Some(500) ; "from largest")]
#[test_case(500 => Some(250) ; "from middle")]
#[test_case(100 => Some(50) ; "size not in sequence")]
#[test_case(7 => Some(1) ; "below ten")]
#[test_case(1 => None ; "smallest")]
fn test_next_smaller(take: u64) -> Option<u64> {
    let fetcher = PageFetcher::with_default_sizes(Arc::new(MockSource::new([])));
    fetcher.next_smaller(take)
}

// ============================================================================
// PageFetcher
// ============================================================================

#[tokio::test]
async fn test_full_page_is_single_request() {
    let source = Arc::new(MockSource::new(1..=3000));
    let fetcher = PageFetcher::with_default_sizes(source.clone());

    let outcome = fetcher.fetch(&window(1000)).await.unwrap();

    assert_eq!(outcome.records.len(), 1000);
    assert!(!outcome.end_of_data);
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.requests, 1);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_short_page_marks_end_of_data() {
    let source = Arc::new(MockSource::new(1..=350));
    let fetcher = PageFetcher::with_default_sizes(source);

    let outcome = fetcher.fetch(&window(1000)).await.unwrap();

    assert_eq!(outcome.records.len(), 350);
    assert!(outcome.end_of_data);
}

#[tokio::test]
async fn test_permanent_failure_terminates_with_error_records() {
    let source = Arc::new(
        MockSource::new(1..=5000)
            .failing_when(|_, _| Some(Error::http_status(500, "internal error"))),
    );
    let fetcher = PageFetcher::with_default_sizes(source.clone());

    let outcome = fetcher.fetch(&window(1000)).await.unwrap();

    // 1 + 2 + 4 + 20 + 100 + 1000 attempts down the size sequence
    assert_eq!(source.calls(), 1127);
    assert_eq!(outcome.requests, 1127);
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.errors.len(), 1000);
    assert!(outcome.errors.iter().all(|e| e.take == 1));

    let skips: Vec<u64> = outcome.errors.iter().map(|e| e.skip).collect();
    assert_eq!(skips, (0..1000).collect::<Vec<_>>());
    assert!(!outcome.end_of_data);
}

#[tokio::test]
async fn test_poisoned_record_is_isolated() {
    let source = Arc::new(MockSource::new(1..=1000).poisoned(437));
    let fetcher = PageFetcher::with_default_sizes(source);

    let outcome = fetcher.fetch(&window(1000)).await.unwrap();

    assert_eq!(outcome.errors.len(), 1);
    let error = &outcome.errors[0];
    assert_eq!(error.skip, 436);
    assert_eq!(error.take, 1);
    assert!(error.error_message.contains("500"));

    let got = ids(&outcome.records);
    let expected: Vec<i64> = (1..=1000).filter(|id| *id != 437).collect();
    assert_eq!(got, expected);
}

#[tokio::test]
async fn test_split_stops_at_short_sub_window() {
    // 120 records, server rejects anything above 50
    let source = Arc::new(MockSource::new(1..=120).failing_when(|w, _| {
        (w.take > 50).then(|| Error::http_status(503, "too expensive"))
    }));
    let fetcher = PageFetcher::with_default_sizes(source.clone());

    let outcome = fetcher.fetch(&window(1000)).await.unwrap();

    assert_eq!(ids(&outcome.records), (1..=120).collect::<Vec<_>>());
    assert!(outcome.end_of_data);
    assert!(outcome.errors.is_empty());
    // 1000, 500, 250 fail; then 50@0, 50@50, 50@100 (short)
    assert_eq!(source.calls(), 6);

    let takes: Vec<u64> = source.windows().iter().map(|w| w.take).collect();
    assert_eq!(takes, vec![1000, 500, 250, 50, 50, 50]);
}

#[tokio::test]
async fn test_split_covers_tail_of_window() {
    let source = Arc::new(MockSource::new(1..=600).failing_when(|w, _| {
        (w.take >= 500).then(|| Error::http_status(504, "gateway timeout"))
    }));
    let fetcher = PageFetcher::with_default_sizes(source.clone());

    let outcome = fetcher.fetch(&window(1000)).await.unwrap();

    assert_eq!(outcome.records.len(), 600);
    assert!(outcome.end_of_data);

    let positions: Vec<(u64, u64)> = source.windows().iter().map(|w| (w.skip, w.take)).collect();
    assert_eq!(
        positions,
        vec![(0, 1000), (0, 500), (0, 250), (250, 250), (500, 500), (500, 250)]
    );
}

#[tokio::test]
async fn test_fatal_error_propagates_without_shrinking() {
    let source = Arc::new(
        MockSource::new(1..=5000)
            .failing_when(|_, _| Some(Error::http_status(401, "unauthorized"))),
    );
    let fetcher = PageFetcher::with_default_sizes(source.clone());

    let err = fetcher.fetch(&window(1000)).await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 401, .. }));
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_error_record_captures_window() {
    let source = Arc::new(MockSource::new(1..=10).poisoned(3));
    let fetcher = PageFetcher::new(source, vec![5, 1]);

    let outcome = fetcher
        .fetch(&window(5).with_id_cursor(Some(0)))
        .await
        .unwrap();

    assert_eq!(outcome.errors.len(), 1);
    let error = &outcome.errors[0];
    assert_eq!(error.entity_type, "gifts");
    assert_eq!(error.id_cursor, Some(0));
    assert_eq!(error.key(), "gifts:0:2:1");
    assert_eq!(ids(&outcome.records), vec![1, 2, 4, 5]);
}

#[test]
fn test_error_record_table_row() {
    let w = window(1).with_id_cursor(Some(41)).at(7, 1);
    let request = crate::source::RequestDescription {
        url: "https://api.example.com/gifts?skip=7&take=1".to_string(),
        body: Some(serde_json::json!({"sortBy": "Id"})),
    };
    let row = ErrorRecord::new(&w, request, "HTTP 500".to_string()).into_table_row("sync_errors");

    assert_eq!(row.table, "sync_errors");
    assert_eq!(row.primary_key("id").as_deref(), Some("gifts:41:7:1"));
    assert_eq!(row.row["request_body"], "{\"sortBy\":\"Id\"}");
    assert_eq!(row.row["skip"], 7);
    assert_eq!(row.row["error_message"], "HTTP 500");
}

// ============================================================================
// ParallelFetchCoordinator
// ============================================================================

fn coordinator(source: Arc<MockSource>, parallel: usize) -> ParallelFetchCoordinator<MockSource> {
    ParallelFetchCoordinator::new(PageFetcher::with_default_sizes(source), 1000, parallel)
}

#[tokio::test]
async fn test_round_reaches_end_mid_round() {
    let source = Arc::new(MockSource::new(1..=2350));
    let coordinator = coordinator(source.clone(), 4);

    let round = coordinator
        .fetch_round(&window(1000), None, "id")
        .await
        .unwrap();

    assert_eq!(ids(&round.records), (1..=2350).collect::<Vec<_>>());
    assert_eq!(round.max_id_seen, Some(2350));
    assert!(round.reached_end);
    assert_eq!(round.slots_used, 3);
    assert_eq!(source.calls(), 4);
}

#[tokio::test]
async fn test_round_uses_id_cursor_and_small_offsets() {
    let source = Arc::new(MockSource::new(1..=10_000));
    let coordinator = coordinator(source.clone(), 4);

    let round = coordinator
        .fetch_round(&window(1000), Some(5000), "id")
        .await
        .unwrap();

    assert_eq!(ids(&round.records), (5001..=9000).collect::<Vec<_>>());
    assert_eq!(round.max_id_seen, Some(9000));
    assert!(!round.reached_end);

    let mut skips: Vec<u64> = source.windows().iter().map(|w| w.skip).collect();
    skips.sort_unstable();
    assert_eq!(skips, vec![0, 1000, 2000, 3000]);
    assert!(source.windows().iter().all(|w| w.id_cursor == Some(5000)));
}

#[tokio::test]
async fn test_round_order_independent_of_completion_order() {
    // Earlier slots finish last
    let source = Arc::new(
        MockSource::new(1..=4000)
            .delayed_by(|w| Duration::from_millis(40 - (w.skip / 100).min(40))),
    );
    let coordinator = coordinator(source, 4);
    let parallel = coordinator
        .fetch_round(&window(1000), None, "id")
        .await
        .unwrap();

    let sequential_source = Arc::new(MockSource::new(1..=4000));
    let fetcher = PageFetcher::with_default_sizes(sequential_source);
    let mut sequential = Vec::new();
    for skip in [0, 1000, 2000, 3000] {
        let outcome = fetcher.fetch(&window(1000).at(skip, 1000)).await.unwrap();
        sequential.extend(outcome.records);
    }

    assert_eq!(parallel.records, sequential);
}

#[tokio::test]
async fn test_error_slot_does_not_end_round() {
    // Only the second slot fails, and the size sequence has nowhere to shrink
    let source = Arc::new(MockSource::new(1..=3000).failing_when(|w, _| {
        (w.skip == 1000).then(|| Error::http_status(500, "boom"))
    }));
    let fetcher = PageFetcher::new(source, vec![1000]);
    let coordinator = ParallelFetchCoordinator::new(fetcher, 1000, 4);

    let round = coordinator
        .fetch_round(&window(1000), None, "id")
        .await
        .unwrap();

    assert_eq!(round.errors.len(), 1);
    assert_eq!(round.errors[0].skip, 1000);
    assert_eq!(round.records.len(), 2000);
    assert_eq!(round.max_id_seen, Some(3000));
    assert!(round.reached_end);
}

#[tokio::test]
async fn test_slots_after_end_are_discarded() {
    // The fourth slot fails, but the stream already ended in the second
    let source = Arc::new(MockSource::new(1..=1500).failing_when(|w, _| {
        (w.skip == 3000).then(|| Error::http_status(500, "boom"))
    }));
    let fetcher = PageFetcher::new(source, vec![1000]);
    let coordinator = ParallelFetchCoordinator::new(fetcher, 1000, 4);

    let round = coordinator
        .fetch_round(&window(1000), None, "id")
        .await
        .unwrap();

    assert!(round.reached_end);
    assert_eq!(round.slots_used, 2);
    assert!(round.errors.is_empty());
    assert_eq!(round.records.len(), 1500);
}

#[tokio::test]
async fn test_fatal_slot_aborts_round() {
    let source = Arc::new(MockSource::new(1..=4000).failing_when(|w, _| {
        (w.skip == 2000).then(|| Error::http_status(403, "forbidden"))
    }));
    let coordinator = coordinator(source, 4);

    let err = coordinator
        .fetch_round(&window(1000), None, "id")
        .await
        .unwrap_err();

    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_round_without_readable_ids_is_fatal() {
    let source = Arc::new(MockSource::new(1..=5000));
    let coordinator = coordinator(source, 2);

    let err = coordinator
        .fetch_round(&window(100), None, "giftId")
        .await
        .unwrap_err();

    assert!(matches!(
        &err,
        Error::MissingPrimaryKey { entity, id_field } if entity == "gifts" && id_field == "giftId"
    ));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_empty_round_without_ids_is_not_an_error() {
    let coordinator = coordinator(Arc::new(MockSource::new([])), 2);
    let round = coordinator
        .fetch_round(&window(100), None, "giftId")
        .await
        .unwrap();
    assert!(round.reached_end);
    assert_eq!(round.max_id_seen, None);
}

#[test]
fn test_parallel_requests_minimum_one() {
    let coordinator = coordinator(Arc::new(MockSource::new([])), 0);
    assert_eq!(coordinator.slots(&window(1000), Some(3)).len(), 1);
}
