//! Coordinator behavior: dedup, polling, completion hooks, resilience.

use std::sync::Arc;
use std::time::Duration;

use job_coordinator::testing::{MockStatusFetcher, RecordingHook, ScriptedPoll};
use job_coordinator::{CoordinatorConfig, JobCoordinator, JobKind};

fn fast_config() -> CoordinatorConfig {
    CoordinatorConfig {
        poll_interval: Duration::from_millis(10),
    }
}

fn coordinator(
    fetcher: MockStatusFetcher,
) -> (JobCoordinator, Arc<RecordingHook>, Arc<MockStatusFetcher>) {
    let fetcher = Arc::new(fetcher);
    let hook = Arc::new(RecordingHook::new());
    let coordinator = JobCoordinator::with_config(fetcher.clone(), hook.clone(), fast_config());
    (coordinator, hook, fetcher)
}

async fn eventually<F: Fn() -> bool>(what: &str, condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for: {what}"));
}

#[tokio::test]
async fn register_is_idempotent_by_job_id() {
    let (coordinator, _hook, _fetcher) = coordinator(
        MockStatusFetcher::new().with_script("j1", vec![ScriptedPoll::running("PROCESSING")]),
    );

    assert!(coordinator.register("j1", JobKind::Import, vec!["r1".into()]));
    // Rediscovered via a deep link: same id, registered again.
    assert!(!coordinator.register("j1", JobKind::Import, vec![]));

    assert_eq!(coordinator.list().len(), 1);
    assert_eq!(coordinator.list()[0].subject_ids, vec!["r1".to_string()]);
    coordinator.shutdown();
}

#[tokio::test]
async fn completion_hook_fires_exactly_once() {
    let (coordinator, hook, _fetcher) = coordinator(MockStatusFetcher::new().with_script(
        "j1",
        vec![
            ScriptedPoll::running("PROCESSING"),
            ScriptedPoll::completed(),
        ],
    ));

    coordinator.register("j1", JobKind::Import, vec![]);
    eventually("job completion", || hook.completion_count("j1") > 0).await;

    // Give the scheduler several more intervals: no duplicate firing.
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(hook.completion_count("j1"), 1);

    let job = coordinator.get("j1").unwrap();
    assert!(job.is_complete);
    assert!(!coordinator.has_active());
    coordinator.shutdown();
}

#[tokio::test]
async fn unchanged_snapshots_do_not_fire_updates() {
    let (coordinator, hook, _fetcher) = coordinator(MockStatusFetcher::new().with_script(
        "j1",
        vec![
            ScriptedPoll::running("PROCESSING"),
            ScriptedPoll::running("PROCESSING"),
            ScriptedPoll::running("PROCESSING"),
            ScriptedPoll::completed(),
        ],
    ));

    coordinator.register("j1", JobKind::Import, vec![]);
    eventually("job completion", || hook.completion_count("j1") > 0).await;

    // One update for the first PROCESSING snapshot; the identical
    // follow-ups are diffed away.
    assert_eq!(hook.update_count("j1"), 1);
    coordinator.shutdown();
}

#[tokio::test]
async fn skipped_intermediate_states_are_a_normal_update() {
    // The job advanced several pipeline stages between ticks.
    let (coordinator, hook, _fetcher) = coordinator(MockStatusFetcher::new().with_script(
        "v1",
        vec![
            ScriptedPoll::running("DOWNLOADING"),
            ScriptedPoll::running("OCR_PROCESSING"),
            ScriptedPoll::completed(),
        ],
    ));

    coordinator.register("v1", JobKind::Video, vec![]);
    eventually("job completion", || hook.completion_count("v1") > 0).await;

    assert_eq!(hook.update_count("v1"), 2);
    assert_eq!(hook.completion_count("v1"), 1);
    coordinator.shutdown();
}

#[tokio::test]
async fn dismiss_mid_poll_drops_the_in_flight_response() {
    let fetcher = MockStatusFetcher::new().with_script("j1", vec![ScriptedPoll::completed()]);
    let gate = fetcher.gate();
    let (coordinator, hook, _fetcher) = coordinator(fetcher);

    coordinator.register("j1", JobKind::Import, vec![]);

    // Let the tick start and block inside the gated fetch.
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(coordinator.dismiss("j1"));

    // Release the fetch; its response must be dropped on the floor.
    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(coordinator.get("j1").is_none());
    assert_eq!(hook.completion_count("j1"), 0);
    coordinator.shutdown();
}

#[tokio::test]
async fn transport_failures_keep_the_job_and_mark_it_stale() {
    let (coordinator, hook, _fetcher) = coordinator(
        MockStatusFetcher::new().with_script("j1", vec![ScriptedPoll::TransportError]),
    );

    coordinator.register("j1", JobKind::Video, vec![]);
    eventually("three consecutive failures", || {
        coordinator
            .get("j1")
            .map(|j| j.consecutive_failures >= 3)
            .unwrap_or(false)
    })
    .await;

    let job = coordinator.get("j1").unwrap();
    assert!(job.is_stale());
    assert!(!job.is_complete);
    assert!(job.last_status.is_none());
    assert_eq!(hook.completion_count("j1"), 0);
    coordinator.shutdown();
}

#[tokio::test]
async fn a_successful_poll_resets_the_failure_counter() {
    let (coordinator, _hook, _fetcher) = coordinator(MockStatusFetcher::new().with_script(
        "j1",
        vec![
            ScriptedPoll::TransportError,
            ScriptedPoll::TransportError,
            ScriptedPoll::running("PROCESSING"),
        ],
    ));

    coordinator.register("j1", JobKind::Import, vec![]);
    eventually("snapshot recovery", || {
        coordinator
            .get("j1")
            .map(|j| j.last_status.is_some())
            .unwrap_or(false)
    })
    .await;

    let job = coordinator.get("j1").unwrap();
    assert_eq!(job.consecutive_failures, 0);
    assert!(!job.is_stale());
    coordinator.shutdown();
}

#[tokio::test]
async fn scheduler_goes_inert_and_restarts_on_new_registration() {
    let fetcher = MockStatusFetcher::new()
        .with_script("j1", vec![ScriptedPoll::completed()])
        .with_script("j2", vec![ScriptedPoll::completed()]);
    let (coordinator, hook, fetcher) = coordinator(fetcher);

    coordinator.register("j1", JobKind::Import, vec![]);
    eventually("first job completion", || hook.completion_count("j1") > 0).await;

    // With nothing incomplete the scheduler stops issuing fetches.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let settled = fetcher.fetch_count();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fetcher.fetch_count(), settled);

    // A new registration wakes it up again.
    coordinator.register("j2", JobKind::Video, vec![]);
    eventually("second job completion", || hook.completion_count("j2") > 0).await;
    coordinator.shutdown();
}

#[tokio::test]
async fn dismiss_works_on_completed_jobs_too() {
    let (coordinator, hook, _fetcher) = coordinator(
        MockStatusFetcher::new().with_script("j1", vec![ScriptedPoll::completed()]),
    );

    coordinator.register("j1", JobKind::Import, vec![]);
    eventually("job completion", || hook.completion_count("j1") > 0).await;

    assert!(coordinator.dismiss("j1"));
    assert!(coordinator.list().is_empty());
    coordinator.shutdown();
}

#[tokio::test]
async fn shutdown_clears_the_registry() {
    let (coordinator, _hook, _fetcher) = coordinator(
        MockStatusFetcher::new().with_script("j1", vec![ScriptedPoll::running("PROCESSING")]),
    );

    coordinator.register("j1", JobKind::Import, vec![]);
    coordinator.shutdown();
    assert!(coordinator.list().is_empty());
    assert!(!coordinator.has_active());
}
